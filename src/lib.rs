//! gridmatch - Distributed template matching for square integer grids
//!
//! gridmatch spreads a template-matching workload across a pool of worker
//! processes: for each picture (an N×N integer matrix), decide whether any of
//! a shared set of object templates (M×M integer matrices) occurs inside it
//! under a similarity threshold, and if so, where.
//!
//! # Architecture
//!
//! - **Pull-based scheduling**: the coordinator hands the next picture to
//!   whichever worker reports first, load-balancing heterogeneous per-picture
//!   cost
//! - **Concurrent object search**: each worker fans one comparison task per
//!   object across a bounded pool, with cooperative early exit and
//!   at-most-one-winner publication
//! - **Pluggable matchers**: the innermost picture/object comparison sits
//!   behind a trait, with a CPU reference backend
//! - **Message passing only**: coordinator and workers share nothing but a
//!   length-prefixed MessagePack protocol over TCP

pub mod config;
pub mod distributed;
pub mod engine;
pub mod matcher;
pub mod output;
pub mod problem;
pub mod stats;

// Re-export commonly used types
pub use config::Config;
pub use problem::{MatchResult, Problem};

/// Result type used throughout gridmatch
pub type Result<T> = anyhow::Result<T>;
