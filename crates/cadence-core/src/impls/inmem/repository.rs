//! Task repository: the authoritative, insertion-ordered list of tasks.
//!
//! Design:
//! - A `Vec` rather than a map, so paging has a stable order.
//! - IDs come from a monotonic generator, so insertion order == ID order.
//!   `insert` refuses an ID that would break this, which lets lookups and
//!   the `after` cursor use binary search instead of a sort step.

use tokio_util::sync::CancellationToken;

use crate::domain::{StoreTask, TaskId, TaskSearchParams};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub(crate) struct TaskRepository {
    tasks: Vec<StoreTask>,
}

impl TaskRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Append a task. Its ID must be greater than every stored ID.
    pub(crate) fn insert(&mut self, task: StoreTask) -> Result<(), StoreError> {
        if let Some(last) = self.tasks.last()
            && task.id <= last.id
        {
            return Err(StoreError::Internal(format!(
                "id generator is not monotonic: {} after {}",
                task.id, last.id
            )));
        }
        self.tasks.push(task);
        Ok(())
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.binary_search_by_key(&id, |t| t.id).ok()
    }

    pub(crate) fn get(&self, id: TaskId) -> Option<&StoreTask> {
        self.position(id).map(|i| &self.tasks[i])
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut StoreTask> {
        self.position(id).map(|i| &mut self.tasks[i])
    }

    pub(crate) fn remove(&mut self, id: TaskId) -> Option<StoreTask> {
        self.position(id).map(|i| self.tasks.remove(i))
    }

    /// Up to `limit` tasks passing the filters, strictly after `params.after`.
    pub(crate) fn page(&self, params: &TaskSearchParams, limit: usize) -> Vec<StoreTask> {
        let start = match params.after {
            Some(after) => self.tasks.partition_point(|t| t.id <= after),
            None => 0,
        };
        self.tasks[start..]
            .iter()
            .filter(|t| params.matches(t))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Build the collection that survives removing every task for which
    /// `doomed` is true. Nothing is changed here; the caller commits the
    /// result with `replace`.
    ///
    /// `cancel` is polled every `check_interval` records and once at the end.
    pub(crate) fn filter_out<F>(
        &self,
        doomed: F,
        cancel: &CancellationToken,
        check_interval: usize,
    ) -> Result<(Vec<StoreTask>, Vec<TaskId>), StoreError>
    where
        F: Fn(&StoreTask) -> bool,
    {
        let check_interval = check_interval.max(1);
        let mut survivors = Vec::with_capacity(self.tasks.len());
        let mut removed = Vec::new();

        for (i, task) in self.tasks.iter().enumerate() {
            if i % check_interval == 0 && cancel.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
            if doomed(task) {
                removed.push(task.id);
            } else {
                survivors.push(task.clone());
            }
        }

        // last check for cancellation
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok((survivors, removed))
    }

    pub(crate) fn replace(&mut self, tasks: Vec<StoreTask>) {
        self.tasks = tasks;
    }
}
