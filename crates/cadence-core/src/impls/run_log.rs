//! InMemoryRunLog - run の状態とログ行をメモリ上に記録
//!
//! LogWriter と LogReader の両方を実装します。
//! - run は task ごとに RunId 順（= 作成順）で保持
//! - 終了状態（success / failed / canceled）からの遷移は拒否

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{RunId, RunStatus, TaskId};
use crate::error::StoreError;
use crate::ports::{LogFilter, LogLine, LogReader, LogWriter, RunFilter, RunRecord};

const DEFAULT_RUN_LIMIT: usize = 100;
const MAX_RUN_LIMIT: usize = 500;

#[derive(Debug, Clone)]
struct RunEntry {
    record: RunRecord,
    logs: Vec<LogLine>,
}

#[derive(Debug, Default)]
pub struct InMemoryRunLog {
    runs: RwLock<HashMap<TaskId, BTreeMap<RunId, RunEntry>>>,
}

impl InMemoryRunLog {
    pub fn new() -> Self {
        Self::default()
    }
}

fn require_task(task_id: Option<TaskId>) -> Result<TaskId, StoreError> {
    task_id.ok_or_else(|| StoreError::InvalidArgument("task ID is required".into()))
}

fn run_not_found(task_id: TaskId, run_id: RunId) -> StoreError {
    StoreError::NotFound(format!("run not found: {run_id} of {task_id}"))
}

#[async_trait]
impl LogWriter for InMemoryRunLog {
    async fn update_run_state(
        &self,
        task_id: TaskId,
        run_id: RunId,
        when: DateTime<Utc>,
        state: RunStatus,
    ) -> Result<(), StoreError> {
        let mut runs = self.runs.write().await;
        let entry = runs
            .entry(task_id)
            .or_default()
            .entry(run_id)
            .or_insert_with(|| RunEntry {
                record: RunRecord {
                    task_id,
                    run_id,
                    status: state,
                    scheduled_at: None,
                    started_at: None,
                    finished_at: None,
                },
                logs: Vec::new(),
            });

        let record = &mut entry.record;
        if record.status.is_terminal() && record.status != state {
            return Err(StoreError::InvalidArgument(format!(
                "run {run_id} already finished as {}, cannot become {state}",
                record.status
            )));
        }

        record.status = state;
        match state {
            RunStatus::Scheduled => record.scheduled_at = Some(when),
            RunStatus::Started => record.started_at = Some(when),
            RunStatus::Failed | RunStatus::Success | RunStatus::Canceled => {
                record.finished_at = Some(when)
            }
        }
        Ok(())
    }

    async fn add_run_log(
        &self,
        task_id: TaskId,
        run_id: RunId,
        when: DateTime<Utc>,
        line: &str,
    ) -> Result<(), StoreError> {
        let mut runs = self.runs.write().await;
        let entry = runs
            .get_mut(&task_id)
            .and_then(|task_runs| task_runs.get_mut(&run_id))
            .ok_or_else(|| run_not_found(task_id, run_id))?;

        entry.logs.push(LogLine {
            run_id,
            time: when,
            message: line.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl LogReader for InMemoryRunLog {
    async fn list_runs(&self, filter: RunFilter) -> Result<Vec<RunRecord>, StoreError> {
        let task_id = require_task(filter.task_id)?;
        if filter.limit > MAX_RUN_LIMIT {
            return Err(StoreError::InvalidArgument(format!(
                "ListRuns: limit exceeds maximum of {MAX_RUN_LIMIT}"
            )));
        }
        let limit = match filter.limit {
            0 => DEFAULT_RUN_LIMIT,
            n => n,
        };

        let runs = self.runs.read().await;
        let Some(task_runs) = runs.get(&task_id) else {
            return Ok(Vec::new());
        };

        let records = task_runs
            .values()
            .filter(|e| filter.after.is_none_or(|after| e.record.run_id > after))
            .take(limit)
            .map(|e| e.record.clone())
            .collect();
        Ok(records)
    }

    async fn find_run_by_id(
        &self,
        task_id: TaskId,
        run_id: RunId,
    ) -> Result<RunRecord, StoreError> {
        let runs = self.runs.read().await;
        runs.get(&task_id)
            .and_then(|task_runs| task_runs.get(&run_id))
            .map(|e| e.record.clone())
            .ok_or_else(|| run_not_found(task_id, run_id))
    }

    async fn list_logs(&self, filter: LogFilter) -> Result<Vec<LogLine>, StoreError> {
        let task_id = require_task(filter.task_id)?;
        let runs = self.runs.read().await;
        let task_runs = runs.get(&task_id);

        match filter.run_id {
            Some(run_id) => task_runs
                .and_then(|task_runs| task_runs.get(&run_id))
                .map(|e| e.logs.clone())
                .ok_or_else(|| run_not_found(task_id, run_id)),
            None => Ok(task_runs
                .into_iter()
                .flat_map(|task_runs| task_runs.values())
                .flat_map(|e| e.logs.iter().cloned())
                .collect()),
        }
    }
}
