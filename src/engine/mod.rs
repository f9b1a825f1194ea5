//! Per-picture concurrent object search
//!
//! Given one picture and the full object set, the engine launches one
//! comparison task per object across a bounded thread pool and returns a
//! single result with at-most-one-winner semantics.
//!
//! # Early exit and winner publication
//!
//! Each task checks a shared found flag before invoking the matcher; if a
//! winner is already committed the task performs no comparison and completes
//! as a no-op. The exit is cooperative, never preemptive: a task already
//! inside a matcher call always runs it to completion. A task that discovers
//! a match commits through a single mutex-guarded check-and-set of the
//! winner slot, so at most one commit ever succeeds and no torn result is
//! observable; the flag is only ever written while the lock is held.
//!
//! `search` returns only after every launched task has completed, including
//! tasks that started after a winner was committed and therefore no-op.
//! Which of several simultaneous discoverers wins is schedule-dependent and
//! deliberately unspecified.

use crate::matcher::Matcher;
use crate::problem::{MatchLocation, MatchResult, ObjectPattern, Picture};
use crate::Result;
use anyhow::Context;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Accelerator device hint for a comparison task.
///
/// A pure function of the task sequence index, spreading concurrent
/// accelerator use across devices. Purely a scheduling hint, never a
/// correctness concern.
pub fn device_for_task(task_index: usize, device_count: usize) -> usize {
    if device_count == 0 {
        0
    } else {
        task_index % device_count
    }
}

/// Concurrent multi-object search over a single picture.
pub struct SearchEngine {
    matcher: Arc<dyn Matcher>,
    pool: rayon::ThreadPool,
    devices: usize,
}

impl SearchEngine {
    /// Build an engine with a dedicated pool of `threads` comparison tasks.
    pub fn new(matcher: Arc<dyn Matcher>, threads: usize, devices: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("search-{}", idx))
            .build()
            .context("Failed to build search thread pool")?;

        Ok(Self {
            matcher,
            pool,
            devices,
        })
    }

    /// Search one picture against the full object set.
    ///
    /// Blocks until all launched tasks have completed, then reports the
    /// committed winner if any task found one. Matcher failures are treated
    /// as "no match from that object": the failure is logged to stderr and
    /// the picture result and the run continue.
    pub fn search(
        &self,
        picture: &Picture,
        objects: &[ObjectPattern],
        threshold: f64,
    ) -> MatchResult {
        if objects.is_empty() {
            return MatchResult::no_match(picture.id);
        }

        let winner: Mutex<Option<MatchLocation>> = Mutex::new(None);
        let found = AtomicBool::new(false);

        self.pool.install(|| {
            objects.par_iter().enumerate().for_each(|(task, object)| {
                // Cooperative early exit: skip the comparison entirely once a
                // winner is committed.
                if found.load(Ordering::Acquire) {
                    return;
                }

                let device = device_for_task(task, self.devices);
                match self.matcher.find(picture, object, threshold, device) {
                    Ok(Some((row, col))) => {
                        let mut slot = winner.lock().unwrap();
                        if slot.is_none() {
                            *slot = Some(MatchLocation {
                                object_id: object.id,
                                row,
                                col,
                            });
                            found.store(true, Ordering::Release);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        // Degraded to a non-match; not surfaced to the coordinator.
                        eprintln!(
                            "Warning: matcher failed on picture {} object {}: {:#}",
                            picture.id, object.id, err
                        );
                    }
                }
            });
        });

        let location = winner.into_inner().unwrap();
        MatchResult {
            picture_id: picture.id,
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::mock::MockMatcher;
    use std::time::Duration;

    fn picture(id: i32) -> Picture {
        Picture {
            id,
            size: 2,
            cells: vec![0; 4],
        }
    }

    fn objects(ids: &[i32]) -> Vec<ObjectPattern> {
        ids.iter()
            .map(|&id| ObjectPattern {
                id,
                size: 1,
                cells: vec![0],
            })
            .collect()
    }

    fn engine_with(matcher: MockMatcher, threads: usize, devices: usize) -> SearchEngine {
        SearchEngine::new(Arc::new(matcher), threads, devices).unwrap()
    }

    #[test]
    fn test_zero_objects_is_no_match() {
        let engine = engine_with(MockMatcher::new(), 2, 1);
        let result = engine.search(&picture(3), &[], 0.5);
        assert_eq!(result, MatchResult::no_match(3));
    }

    #[test]
    fn test_no_object_matches() {
        let mock = MockMatcher::new();
        let engine = engine_with(mock, 4, 1);
        let result = engine.search(&picture(1), &objects(&[10, 11, 12]), 0.5);
        assert!(!result.found());
        assert_eq!(result.picture_id, 1);
    }

    #[test]
    fn test_single_matching_object_is_deterministic() {
        let mock = MockMatcher::new().with_match(11, 2, 3);
        let engine = engine_with(mock, 4, 1);

        let result = engine.search(&picture(1), &objects(&[10, 11, 12]), 0.5);
        let loc = result.location.expect("expected a match");
        assert_eq!(loc.object_id, 11);
        assert_eq!((loc.row, loc.col), (2, 3));
    }

    #[test]
    fn test_multiple_matches_commit_exactly_one_winner() {
        let mock = MockMatcher::new()
            .with_match(1, 0, 0)
            .with_match(2, 1, 1)
            .with_match(3, 0, 1);
        let engine = engine_with(mock.clone(), 4, 1);

        for _ in 0..50 {
            let result = engine.search(&picture(9), &objects(&[1, 2, 3]), 0.5);
            let loc = result.location.expect("expected a winner");
            assert!([1, 2, 3].contains(&loc.object_id));
            // The committed slot is coherent with the scripted verdict.
            match loc.object_id {
                1 => assert_eq!((loc.row, loc.col), (0, 0)),
                2 => assert_eq!((loc.row, loc.col), (1, 1)),
                3 => assert_eq!((loc.row, loc.col), (0, 1)),
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn test_many_matching_objects_never_deadlock() {
        let ids: Vec<i32> = (0..64).collect();
        let mut mock = MockMatcher::new().with_delay(Duration::from_millis(1));
        for &id in &ids {
            mock = mock.with_match(id, 0, 0);
        }
        let engine = engine_with(mock, 8, 2);

        let result = engine.search(&picture(4), &objects(&ids), 0.5);
        assert!(result.found());
    }

    #[test]
    fn test_matcher_failure_degrades_to_no_match() {
        let mock = MockMatcher::new().with_error(10).with_error(11);
        let engine = engine_with(mock, 2, 1);

        let result = engine.search(&picture(1), &objects(&[10, 11]), 0.5);
        assert!(!result.found());
    }

    #[test]
    fn test_matcher_failure_does_not_mask_other_matches() {
        let mock = MockMatcher::new()
            .with_error(10)
            .with_match(11, 4, 5)
            .with_delay(Duration::from_millis(1));
        let engine = engine_with(mock, 1, 1);

        // Single-threaded pool: the failing object runs to completion and the
        // matching one still wins.
        let result = engine.search(&picture(1), &objects(&[10, 11]), 0.5);
        let loc = result.location.expect("expected a match");
        assert_eq!(loc.object_id, 11);
        assert_eq!((loc.row, loc.col), (4, 5));
    }

    #[test]
    fn test_every_object_compared_when_nothing_matches() {
        // With no winner the cooperative exit never triggers, so the engine
        // must have called the matcher once per object before returning.
        let mock = MockMatcher::new();
        let engine = engine_with(mock.clone(), 4, 3);

        let ids: Vec<i32> = (0..16).collect();
        let result = engine.search(&picture(2), &objects(&ids), 0.5);
        assert!(!result.found());
        assert_eq!(mock.call_count(), ids.len());

        // Device hints are the task index modulo the device count.
        for call in mock.calls() {
            assert!(call.device < 3);
        }
    }

    #[test]
    fn test_device_for_task_is_pure_modulo() {
        assert_eq!(device_for_task(0, 4), 0);
        assert_eq!(device_for_task(5, 4), 1);
        assert_eq!(device_for_task(7, 1), 0);
        // A zero device count degrades to device 0 rather than dividing by zero.
        assert_eq!(device_for_task(9, 0), 0);
    }
}
