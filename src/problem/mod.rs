//! Problem data model
//!
//! A problem is a similarity threshold, a set of pictures (square integer
//! matrices to search) and a set of object patterns (smaller square templates
//! to search for). The coordinator loads the problem once; the object set and
//! threshold are broadcast to every worker and never mutated afterwards.

pub mod loader;

use serde::{Deserialize, Serialize};

/// A square integer matrix being searched.
///
/// Cells are stored row-major; `cells.len() == size * size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    pub id: i32,
    /// Side length N (the matrix is N×N)
    pub size: usize,
    pub cells: Vec<i32>,
}

impl Picture {
    /// Cell at (row, col), both zero-indexed.
    pub fn at(&self, row: usize, col: usize) -> i32 {
        self.cells[row * self.size + col]
    }
}

/// A square template searched for inside pictures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPattern {
    pub id: i32,
    /// Side length M (the matrix is M×M)
    pub size: usize,
    pub cells: Vec<i32>,
}

impl ObjectPattern {
    /// Cell at (row, col), both zero-indexed.
    pub fn at(&self, row: usize, col: usize) -> i32 {
        self.cells[row * self.size + col]
    }
}

/// Zero-indexed top-left offset of a matched object within a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLocation {
    pub object_id: i32,
    pub row: usize,
    pub col: usize,
}

/// Outcome of searching one picture against the full object set.
///
/// Exactly one of these is produced per picture. `location` is `None` when no
/// object matched under the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub picture_id: i32,
    pub location: Option<MatchLocation>,
}

impl MatchResult {
    pub fn no_match(picture_id: i32) -> Self {
        Self {
            picture_id,
            location: None,
        }
    }

    pub fn found(&self) -> bool {
        self.location.is_some()
    }
}

/// The complete loaded problem: threshold, all pictures, all objects.
///
/// Immutable for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub threshold: f64,
    pub pictures: Vec<Picture>,
    pub objects: Vec<ObjectPattern>,
}

impl Problem {
    /// Print IDs and sizes only, never full matrices.
    pub fn print_summary(&self) {
        println!("Matching value (threshold): {:.6}", self.threshold);
        println!("Pictures: {}", self.pictures.len());
        for (idx, pic) in self.pictures.iter().enumerate() {
            println!(
                "  Picture #{}: id={}, N={} (matrix {}x{})",
                idx, pic.id, pic.size, pic.size, pic.size
            );
        }
        println!("Objects: {}", self.objects.len());
        for (idx, obj) in self.objects.iter().enumerate() {
            println!(
                "  Object  #{}: id={}, M={} (matrix {}x{})",
                idx, obj.id, obj.size, obj.size, obj.size
            );
        }
    }
}
