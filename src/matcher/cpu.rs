//! CPU reference matcher
//!
//! Scans every placement of the object inside the picture in row-major order
//! and accepts the first placement whose normalized difference score is
//! within the threshold. The score for a placement is the mean, over all M×M
//! overlapping cells, of `|p - o| / (|p| + 1)` where `p` is the picture cell
//! and `o` the object cell. A threshold of 0 therefore accepts only exact
//! cell-for-cell equality.

use super::Matcher;
use crate::problem::{ObjectPattern, Picture};
use crate::Result;

/// Sliding-window comparison on the local CPU.
pub struct CpuMatcher;

impl CpuMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Normalized difference score for the placement at (row, col).
    fn placement_score(picture: &Picture, object: &ObjectPattern, row: usize, col: usize) -> f64 {
        let m = object.size;
        let mut total = 0.0;
        for i in 0..m {
            for j in 0..m {
                let p = picture.at(row + i, col + j) as f64;
                let o = object.at(i, j) as f64;
                total += (p - o).abs() / (p.abs() + 1.0);
            }
        }
        total / (m * m) as f64
    }
}

impl Default for CpuMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher for CpuMatcher {
    fn find(
        &self,
        picture: &Picture,
        object: &ObjectPattern,
        threshold: f64,
        _device: usize,
    ) -> Result<Option<(usize, usize)>> {
        // An object larger than the picture has no valid placements.
        if object.size > picture.size {
            return Ok(None);
        }

        let span = picture.size - object.size;
        for row in 0..=span {
            for col in 0..=span {
                if Self::placement_score(picture, object, row, col) <= threshold {
                    return Ok(Some((row, col)));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picture(id: i32, size: usize, cells: Vec<i32>) -> Picture {
        assert_eq!(cells.len(), size * size);
        Picture { id, size, cells }
    }

    fn object(id: i32, size: usize, cells: Vec<i32>) -> ObjectPattern {
        assert_eq!(cells.len(), size * size);
        ObjectPattern { id, size, cells }
    }

    #[test]
    fn test_exact_submatrix_found_at_expected_offset() {
        // 2x2 block [5 6 / 8 9] sits at (1, 1) of the 3x3 picture.
        let pic = picture(1, 3, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let obj = object(10, 2, vec![5, 6, 8, 9]);

        let matcher = CpuMatcher::new();
        let hit = matcher.find(&pic, &obj, 0.0, 0).unwrap();
        assert_eq!(hit, Some((1, 1)));
    }

    #[test]
    fn test_all_zero_picture_and_object_match_at_origin() {
        // Threshold 0 accepts only exact equality; the all-zero object sits at (0,0).
        let pic = picture(5, 3, vec![0; 9]);
        let obj = object(2, 2, vec![0; 4]);

        let matcher = CpuMatcher::new();
        assert_eq!(matcher.find(&pic, &obj, 0.0, 0).unwrap(), Some((0, 0)));
    }

    #[test]
    fn test_no_match_under_tight_threshold() {
        let pic = picture(1, 2, vec![1, 2, 3, 4]);
        let obj = object(2, 1, vec![100]);

        let matcher = CpuMatcher::new();
        assert_eq!(matcher.find(&pic, &obj, 0.0, 0).unwrap(), None);
    }

    #[test]
    fn test_loose_threshold_accepts_first_placement() {
        // Every placement is acceptable at a huge threshold; row-major scan
        // means the first one reported is the origin.
        let pic = picture(1, 3, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let obj = object(2, 2, vec![0, 0, 0, 0]);

        let matcher = CpuMatcher::new();
        assert_eq!(matcher.find(&pic, &obj, 1000.0, 0).unwrap(), Some((0, 0)));
    }

    #[test]
    fn test_object_larger_than_picture_never_matches() {
        let pic = picture(1, 2, vec![0; 4]);
        let obj = object(2, 3, vec![0; 9]);

        let matcher = CpuMatcher::new();
        assert_eq!(matcher.find(&pic, &obj, 1000.0, 0).unwrap(), None);
    }

    #[test]
    fn test_device_hint_does_not_affect_verdict() {
        let pic = picture(1, 3, vec![0; 9]);
        let obj = object(2, 2, vec![0; 4]);

        let matcher = CpuMatcher::new();
        let a = matcher.find(&pic, &obj, 0.0, 0).unwrap();
        let b = matcher.find(&pic, &obj, 0.0, 7).unwrap();
        assert_eq!(a, b);
    }
}
