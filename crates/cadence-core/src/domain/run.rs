//! Run accounting: per-task meta, in-flight entries, run lifecycle states.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{RunId, TaskId};

/// One in-flight run attempt of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningEntry {
    pub run_id: RunId,

    /// Scheduled time of the run, in unix seconds.
    pub scheduled_for: i64,

    /// Attempt number, starting at 1.
    pub attempt: u32,
}

/// Scheduling accounting for one task.
///
/// Invariants:
/// - `currently_running.len() <= max_concurrency`
/// - `last_completed` never decreases
///
/// Mutation is crate-private; callers only ever see copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMeta {
    max_concurrency: u32,
    currently_running: BTreeMap<RunId, RunningEntry>,
    last_completed: i64,
}

impl RunMeta {
    pub(crate) fn new(max_concurrency: u32) -> Self {
        Self {
            max_concurrency,
            currently_running: BTreeMap::new(),
            last_completed: 0,
        }
    }

    pub fn max_concurrency(&self) -> u32 {
        self.max_concurrency
    }

    /// In-flight runs, ordered by run ID (i.e. admission order).
    pub fn currently_running(&self) -> impl Iterator<Item = &RunningEntry> {
        self.currently_running.values()
    }

    pub fn running_count(&self) -> usize {
        self.currently_running.len()
    }

    pub fn is_running(&self, run_id: RunId) -> bool {
        self.currently_running.contains_key(&run_id)
    }

    /// Watermark: greatest `scheduled_for` among finished runs, 0 if none.
    ///
    /// The watermark starts at 0, so it acts as a floor: finishing runs
    /// scheduled before the Unix epoch leaves it at 0.
    pub fn last_completed(&self) -> i64 {
        self.last_completed
    }

    /// Is the concurrency ceiling reached?
    pub fn is_full(&self) -> bool {
        self.currently_running.len() >= self.max_concurrency as usize
    }

    /// Record an admitted run. The caller has already checked `is_full`.
    pub(crate) fn insert(&mut self, entry: RunningEntry) {
        debug_assert!(!self.is_full());
        self.currently_running.insert(entry.run_id, entry);
    }

    /// Remove a finished run and advance the watermark if it is newer.
    pub(crate) fn finish(&mut self, run_id: RunId) -> Option<RunningEntry> {
        let entry = self.currently_running.remove(&run_id)?;
        if entry.scheduled_for > self.last_completed {
            self.last_completed = entry.scheduled_for;
        }
        Some(entry)
    }
}

/// Result of a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRun {
    pub task_id: TaskId,
    pub run_id: RunId,
    pub scheduled_for: i64,
}

/// Lifecycle state of a run as recorded by the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Scheduled,
    Started,
    Failed,
    Success,
    Canceled,
}

impl RunStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Failed | RunStatus::Success | RunStatus::Canceled
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Scheduled => "scheduled",
            RunStatus::Started => "started",
            RunStatus::Failed => "failed",
            RunStatus::Success => "success",
            RunStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn run_id(n: u128) -> RunId {
        RunId::from_ulid(Ulid::from(n))
    }

    fn entry(n: u128, scheduled_for: i64) -> RunningEntry {
        RunningEntry {
            run_id: run_id(n),
            scheduled_for,
            attempt: 1,
        }
    }

    #[test]
    fn new_meta_is_empty() {
        let meta = RunMeta::new(2);
        assert_eq!(meta.max_concurrency(), 2);
        assert_eq!(meta.running_count(), 0);
        assert_eq!(meta.last_completed(), 0);
        assert!(!meta.is_full());
    }

    #[test]
    fn full_at_ceiling() {
        let mut meta = RunMeta::new(2);
        meta.insert(entry(1, 10));
        assert!(!meta.is_full());
        meta.insert(entry(2, 20));
        assert!(meta.is_full());
    }

    #[test]
    fn watermark_never_drops_below_zero() {
        let mut meta = RunMeta::new(1);
        meta.insert(entry(1, -500));
        assert!(meta.finish(run_id(1)).is_some());
        assert_eq!(meta.last_completed(), 0);
    }

    #[test]
    fn finish_out_of_order_keeps_the_maximum() {
        let mut meta = RunMeta::new(3);
        meta.insert(entry(1, 100));
        meta.insert(entry(2, 200));
        meta.insert(entry(3, 150));

        meta.finish(run_id(2)).unwrap();
        assert_eq!(meta.last_completed(), 200);

        meta.finish(run_id(1)).unwrap();
        assert_eq!(meta.last_completed(), 200);

        meta.finish(run_id(3)).unwrap();
        assert_eq!(meta.last_completed(), 200);
        assert_eq!(meta.running_count(), 0);
    }

    #[test]
    fn finish_unknown_run_is_none() {
        let mut meta = RunMeta::new(1);
        meta.insert(entry(1, 100));
        assert!(meta.finish(run_id(9)).is_none());
        assert_eq!(meta.running_count(), 1);
        assert_eq!(meta.last_completed(), 0);
    }

    #[test]
    fn terminal_states() {
        assert!(RunStatus::Success.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Canceled.is_terminal());
        assert!(!RunStatus::Scheduled.is_terminal());
        assert!(!RunStatus::Started.is_terminal());
    }
}
