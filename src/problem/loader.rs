//! Strict line-oriented problem loader
//!
//! The input format carries exactly one numeric token per non-blank line
//! (blank lines are skipped), in fixed order:
//!
//! ```text
//! threshold
//! picture count
//! per picture: id, N, then N*N integers row-major
//! object count
//! per object: id, M, then M*M integers row-major
//! ```
//!
//! Any deviation is a hard parse error with a line-numbered diagnostic; the
//! run does not proceed on a malformed problem file.

use crate::problem::{ObjectPattern, Picture, Problem};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Parse failure taxonomy for problem files.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot open '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected a single integer, got '{text}'")]
    ExpectedInt { line: usize, text: String },

    #[error("line {line}: expected a single number, got '{text}'")]
    ExpectedNumber { line: usize, text: String },

    #[error("unexpected end of file while reading {what}")]
    UnexpectedEof { what: String },

    #[error("line {line}: {what} must be {bound}, got {value}")]
    OutOfRange {
        line: usize,
        what: &'static str,
        bound: &'static str,
        value: i64,
    },
}

/// Load and validate a problem description from disk.
pub fn load_problem(path: &Path) -> Result<Problem, ParseError> {
    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut cursor = TokenCursor::new(&text);

    let threshold = cursor.next_f64("threshold")?;

    let num_pictures = cursor.next_count("number of pictures")?;
    let mut pictures = Vec::with_capacity(num_pictures);
    for idx in 0..num_pictures {
        pictures.push(parse_picture(&mut cursor, idx)?);
    }

    let num_objects = cursor.next_count("number of objects")?;
    let mut objects = Vec::with_capacity(num_objects);
    for idx in 0..num_objects {
        objects.push(parse_object(&mut cursor, idx)?);
    }

    Ok(Problem {
        threshold,
        pictures,
        objects,
    })
}

fn parse_picture(cursor: &mut TokenCursor, idx: usize) -> Result<Picture, ParseError> {
    let id = cursor.next_i32(&format!("picture id at index {}", idx))?;
    let (size, line) = cursor.next_i32_with_line(&format!("picture N (id={})", id))?;
    if size <= 0 {
        return Err(ParseError::OutOfRange {
            line,
            what: "picture N",
            bound: "> 0",
            value: size as i64,
        });
    }
    let size = size as usize;
    let cells = cursor.next_matrix(size, &format!("picture id={}", id))?;
    Ok(Picture { id, size, cells })
}

fn parse_object(cursor: &mut TokenCursor, idx: usize) -> Result<ObjectPattern, ParseError> {
    let id = cursor.next_i32(&format!("object id at index {}", idx))?;
    let (size, line) = cursor.next_i32_with_line(&format!("object M (id={})", id))?;
    if size <= 0 {
        return Err(ParseError::OutOfRange {
            line,
            what: "object M",
            bound: "> 0",
            value: size as i64,
        });
    }
    let size = size as usize;
    let cells = cursor.next_matrix(size, &format!("object id={}", id))?;
    Ok(ObjectPattern { id, size, cells })
}

/// Walks the input one trimmed, non-blank line at a time, tracking the
/// one-based line number for diagnostics.
struct TokenCursor<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> TokenCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
        }
    }

    /// Next non-blank line, trimmed, with its one-based line number.
    fn next_line(&mut self, what: &str) -> Result<(usize, &'a str), ParseError> {
        for (idx, raw) in self.lines.by_ref() {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Ok((idx + 1, trimmed));
            }
        }
        Err(ParseError::UnexpectedEof {
            what: what.to_string(),
        })
    }

    fn next_i32_with_line(&mut self, what: &str) -> Result<(i32, usize), ParseError> {
        let (line, text) = self.next_line(what)?;
        let value = text
            .parse::<i32>()
            .map_err(|_| ParseError::ExpectedInt {
                line,
                text: text.to_string(),
            })?;
        Ok((value, line))
    }

    fn next_i32(&mut self, what: &str) -> Result<i32, ParseError> {
        self.next_i32_with_line(what).map(|(v, _)| v)
    }

    fn next_f64(&mut self, what: &str) -> Result<f64, ParseError> {
        let (line, text) = self.next_line(what)?;
        text.parse::<f64>().map_err(|_| ParseError::ExpectedNumber {
            line,
            text: text.to_string(),
        })
    }

    /// Non-negative count line (picture/object counts).
    fn next_count(&mut self, what: &str) -> Result<usize, ParseError> {
        let (value, line) = self.next_i32_with_line(what)?;
        if value < 0 {
            return Err(ParseError::OutOfRange {
                line,
                what: "count",
                bound: ">= 0",
                value: value as i64,
            });
        }
        Ok(value as usize)
    }

    /// size*size element lines in row-major order.
    fn next_matrix(&mut self, size: usize, owner: &str) -> Result<Vec<i32>, ParseError> {
        let total = size * size;
        let mut cells = Vec::with_capacity(total);
        for elem in 0..total {
            let what = format!("{}: element {} of {}", owner, elem + 1, total);
            cells.push(self.next_i32(&what)?);
        }
        Ok(cells)
    }
}
