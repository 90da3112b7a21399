//! Store port - 永続化されたタスクの正本
//!
//! Store は以下を管理します：
//! - Task（作成・スクリプト変更・検索・削除）
//! - RunMeta（同時実行数による受付制御と完了ウォーターマーク）
//!
//! # 設計原則
//! - 読み取りは常にコピーを返す（内部状態への参照は外に出さない）
//! - 変更系はすべて直列化される（単一ノードで線形化可能）
//! - リトライはしない（呼び出し側の責任）
//!
//! # 実装
//! - `InMemoryStore`: 参照実装（メモリ上、永続化なし）

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{OrgId, QueuedRun, RunId, RunMeta, StoreTask, TaskId, TaskSearchParams, UserId};
use crate::error::StoreError;

#[async_trait]
pub trait Store: Send + Sync {
    /// Validate and save a new task, returning its generated ID.
    async fn create_task(&self, org: OrgId, user: UserId, script: &str)
    -> Result<TaskId, StoreError>;

    /// Replace the script of an existing task.
    /// `NotFound` if no task matches `id`.
    async fn modify_task(&self, id: TaskId, new_script: &str) -> Result<(), StoreError>;

    /// List tasks matching `params`, in creation order, after `params.after`.
    async fn list_tasks(&self, params: TaskSearchParams) -> Result<Vec<StoreTask>, StoreError>;

    /// `Ok(None)` if no task matches `id`.
    async fn find_task_by_id(&self, id: TaskId) -> Result<Option<StoreTask>, StoreError>;

    /// `NotFound` if no task matches `id`.
    async fn find_task_meta_by_id(&self, id: TaskId) -> Result<RunMeta, StoreError>;

    /// Returns whether a task matching `id` was deleted.
    /// Deleting an absent task is `Ok(false)`, not an error.
    async fn delete_task(&self, id: TaskId) -> Result<bool, StoreError>;

    /// Admit a run for `scheduled_for` unless `max_concurrency` runs are in flight.
    /// Rejection (`ResourceExhausted`) changes nothing.
    async fn create_run(&self, task_id: TaskId, scheduled_for: i64)
    -> Result<QueuedRun, StoreError>;

    /// Remove `run_id` from the in-flight set; advance the watermark if its
    /// scheduled time is later than the current one.
    async fn finish_run(&self, task_id: TaskId, run_id: RunId) -> Result<(), StoreError>;

    /// Delete every task of the organization. Aborts with `Cancelled` (and no
    /// change) if `cancel` fires during the scan.
    async fn delete_org(&self, org: OrgId, cancel: &CancellationToken) -> Result<(), StoreError>;

    /// Delete every task owned by the user. Same cancellation rules as `delete_org`.
    async fn delete_user(&self, user: UserId, cancel: &CancellationToken)
    -> Result<(), StoreError>;

    /// Close the store. Later calls fail with `Closed`.
    async fn close(&self) -> Result<(), StoreError>;
}
