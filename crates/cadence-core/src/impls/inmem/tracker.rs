//! Run tracker: per-task in-flight runs and completion watermark.
//!
//! A run attempt goes `absent -> running -> absent`. There is no waiting
//! state: admission is accept-or-reject, and backpressure belongs to the caller.

use std::collections::HashMap;

use crate::domain::{QueuedRun, RunId, RunMeta, RunningEntry, TaskId};
use crate::error::StoreError;
use crate::ports::IdGenerator;

#[derive(Debug, Default)]
pub(crate) struct RunTracker {
    metas: HashMap<TaskId, RunMeta>,
}

impl RunTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, task_id: TaskId, max_concurrency: u32) {
        self.metas.insert(task_id, RunMeta::new(max_concurrency));
    }

    pub(crate) fn get(&self, task_id: TaskId) -> Option<&RunMeta> {
        self.metas.get(&task_id)
    }

    pub(crate) fn remove(&mut self, task_id: TaskId) -> Option<RunMeta> {
        self.metas.remove(&task_id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.metas.len()
    }

    /// Admit a new run unless the concurrency ceiling is reached.
    ///
    /// A run ID is drawn only after the ceiling check passes, so a rejected
    /// attempt consumes no identifier and leaves the meta untouched.
    pub(crate) fn admit(
        &mut self,
        task_id: TaskId,
        scheduled_for: i64,
        id_gen: &dyn IdGenerator,
    ) -> Result<QueuedRun, StoreError> {
        let meta = self
            .metas
            .get_mut(&task_id)
            .ok_or_else(|| StoreError::NotFound(format!("taskRunner not found: {task_id}")))?;

        if meta.is_full() {
            return Err(StoreError::ResourceExhausted(format!(
                "MaxConcurrency reached: {task_id} has {} of {} runs in flight",
                meta.running_count(),
                meta.max_concurrency()
            )));
        }

        let run_id = id_gen.generate_run_id()?;
        meta.insert(RunningEntry {
            run_id,
            scheduled_for,
            attempt: 1,
        });

        Ok(QueuedRun {
            task_id,
            run_id,
            scheduled_for,
        })
    }

    /// Remove a finished run; the watermark only moves forward.
    pub(crate) fn finish(
        &mut self,
        task_id: TaskId,
        run_id: RunId,
    ) -> Result<RunningEntry, StoreError> {
        let meta = self
            .metas
            .get_mut(&task_id)
            .ok_or_else(|| StoreError::NotFound(format!("taskRunner not found: {task_id}")))?;

        meta.finish(run_id)
            .ok_or_else(|| StoreError::NotFound(format!("run not found: {run_id}")))
    }
}
