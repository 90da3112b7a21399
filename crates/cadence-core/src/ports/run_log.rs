//! Run log ports - run の状態遷移とログ行の記録
//!
//! Store とは独立しています。スケジューラ/実行側が書き込み、API 側が読み出します。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{RunId, RunStatus, TaskId};
use crate::error::StoreError;

/// A run as seen by the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub task_id: TaskId,
    pub run_id: RunId,
    pub status: RunStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// One log line of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub run_id: RunId,
    pub time: DateTime<Utc>,
    pub message: String,
}

/// Filter for `LogReader::list_runs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    /// Required.
    pub task_id: Option<TaskId>,
    /// Return runs after this ID.
    pub after: Option<RunId>,
    /// Zero picks the default limit.
    pub limit: usize,
}

/// Filter for `LogReader::list_logs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Required.
    pub task_id: Option<TaskId>,
    /// Only this run's lines; all runs of the task otherwise.
    pub run_id: Option<RunId>,
}

/// LogWriter writes task logs and run state changes.
#[async_trait]
pub trait LogWriter: Send + Sync {
    /// Set the run state and the respective time.
    async fn update_run_state(
        &self,
        task_id: TaskId,
        run_id: RunId,
        when: DateTime<Utc>,
        state: RunStatus,
    ) -> Result<(), StoreError>;

    /// Add a log line to the run.
    async fn add_run_log(
        &self,
        task_id: TaskId,
        run_id: RunId,
        when: DateTime<Utc>,
        line: &str,
    ) -> Result<(), StoreError>;
}

/// LogReader reads run records and log lines.
#[async_trait]
pub trait LogReader: Send + Sync {
    async fn list_runs(&self, filter: RunFilter) -> Result<Vec<RunRecord>, StoreError>;

    async fn find_run_by_id(&self, task_id: TaskId, run_id: RunId)
    -> Result<RunRecord, StoreError>;

    async fn list_logs(&self, filter: LogFilter) -> Result<Vec<LogLine>, StoreError>;
}

/// A LogWriter that does nothing. Useful for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogWriter;

#[async_trait]
impl LogWriter for NopLogWriter {
    async fn update_run_state(
        &self,
        _task_id: TaskId,
        _run_id: RunId,
        _when: DateTime<Utc>,
        _state: RunStatus,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn add_run_log(
        &self,
        _task_id: TaskId,
        _run_id: RunId,
        _when: DateTime<Utc>,
        _line: &str,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}
