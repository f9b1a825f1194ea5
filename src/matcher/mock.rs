//! Mock matcher for testing
//!
//! Scripted per-object verdicts with no real comparison, making engine tests
//! fast and deterministic. The mock records every call so tests can verify
//! which objects were actually compared and which were skipped by the
//! engine's cooperative early exit.

use super::Matcher;
use crate::problem::{ObjectPattern, Picture};
use crate::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted response for one object id.
#[derive(Debug, Clone, Copy)]
enum Verdict {
    MatchAt(usize, usize),
    NoMatch,
    Fail,
}

/// Record of one `find` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRecord {
    pub picture_id: i32,
    pub object_id: i32,
    pub device: usize,
}

/// Matcher whose verdicts are scripted per object id.
///
/// Objects without a scripted verdict report no match.
#[derive(Clone, Default)]
pub struct MockMatcher {
    verdicts: HashMap<i32, Verdict>,
    /// Delay applied inside every call, to widen race windows in tests.
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<CallRecord>>>,
}

impl MockMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a match for `object_id` at (row, col).
    pub fn with_match(mut self, object_id: i32, row: usize, col: usize) -> Self {
        self.verdicts.insert(object_id, Verdict::MatchAt(row, col));
        self
    }

    /// Script an explicit no-match for `object_id`.
    pub fn with_no_match(mut self, object_id: i32) -> Self {
        self.verdicts.insert(object_id, Verdict::NoMatch);
        self
    }

    /// Script a backend failure for `object_id`.
    pub fn with_error(mut self, object_id: i32) -> Self {
        self.verdicts.insert(object_id, Verdict::Fail);
        self
    }

    /// Sleep inside every call for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// All calls made so far, in invocation order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `find` invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Matcher for MockMatcher {
    fn find(
        &self,
        picture: &Picture,
        object: &ObjectPattern,
        _threshold: f64,
        device: usize,
    ) -> Result<Option<(usize, usize)>> {
        self.calls.lock().unwrap().push(CallRecord {
            picture_id: picture.id,
            object_id: object.id,
            device,
        });

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match self.verdicts.get(&object.id) {
            Some(Verdict::MatchAt(row, col)) => Ok(Some((*row, *col))),
            Some(Verdict::Fail) => anyhow::bail!("scripted matcher failure for object {}", object.id),
            Some(Verdict::NoMatch) | None => Ok(None),
        }
    }
}
