//! Picture/object comparison backends
//!
//! This module defines the seam between the search engine and the code that
//! actually compares one object template against one picture. The engine
//! fans one `find` call per object across its thread pool, so backends must
//! be stateless and safe to invoke concurrently with different objects and
//! devices.
//!
//! # Backends
//!
//! - **cpu**: sliding-window reference implementation (always available)
//! - **mock**: scripted backend for tests, no real comparison performed
//!
//! The `device` argument is a pure scheduling hint for backends that spread
//! concurrent work across multiple accelerator devices; it never affects the
//! verdict.

pub mod cpu;
pub mod mock;

use crate::config::MatcherKind;
use crate::problem::{ObjectPattern, Picture};
use crate::Result;
use std::sync::Arc;

/// Comparison backend for one object template against one picture.
///
/// # Contract
///
/// - Exactly one call per (picture, object) pair per search; the engine never
///   retries a backend failure.
/// - Returns `Ok(Some((row, col)))` with the zero-indexed top-left offset of
///   an acceptable placement, `Ok(None)` when the object does not occur in
///   the picture under `threshold`.
/// - Must hold no mutable state shared between calls; the engine's
///   parallelism depends on concurrent invocation being safe.
pub trait Matcher: Send + Sync {
    fn find(
        &self,
        picture: &Picture,
        object: &ObjectPattern,
        threshold: f64,
        device: usize,
    ) -> Result<Option<(usize, usize)>>;
}

/// Create a matcher backend for the configured kind.
pub fn create_matcher(kind: MatcherKind) -> Arc<dyn Matcher> {
    match kind {
        MatcherKind::Cpu => Arc::new(cpu::CpuMatcher::new()),
    }
}
