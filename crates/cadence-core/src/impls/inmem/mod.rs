//! InMemoryStore - Store の参照実装
//!
//! # 実装詳細
//! - TaskRepository（挿入順の Vec）と RunTracker（TaskId -> RunMeta）を
//!   1 つの `RwLock` で守られた集約として保持
//! - 読み取り（find / list）は read lock、変更系はすべて write lock
//! - ID は write lock の中で採番するので、挿入順 == ID 順が保たれる
//! - 読み取りは常に clone を返す
//!
//! # 使用例
//! ```ignore
//! let store = InMemoryStore::new();
//! let task_id = store.create_task(org, user, script).await?;
//! let run = store.create_run(task_id, now).await?;
//! store.finish_run(task_id, run.run_id).await?;
//! ```

mod repository;
mod tracker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use self::repository::TaskRepository;
use self::tracker::RunTracker;
use crate::config::StoreConfig;
use crate::domain::{OrgId, QueuedRun, RunId, RunMeta, StoreTask, TaskId, TaskSearchParams, UserId};
use crate::error::StoreError;
use crate::options::FluxOptionsParser;
use crate::ports::{IdGenerator, ScriptParser, Store, SystemClock, UlidGenerator};
use crate::validation::StoreValidator;

/// Everything guarded by the store's single lock.
struct InMemoryState {
    tasks: TaskRepository,
    runs: RunTracker,
}

/// In-memory task store.
pub struct InMemoryStore {
    state: RwLock<InMemoryState>,
    id_gen: Arc<dyn IdGenerator>,
    parser: Arc<dyn ScriptParser>,
    config: StoreConfig,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(InMemoryState {
                tasks: TaskRepository::new(),
                runs: RunTracker::new(),
            }),
            id_gen: Arc::new(UlidGenerator::new(SystemClock)),
            parser: Arc::new(FluxOptionsParser::new()),
            config: StoreConfig::default(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_id_generator(mut self, id_gen: Arc<dyn IdGenerator>) -> Self {
        self.id_gen = id_gen;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn ScriptParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of stored tasks.
    pub async fn task_count(&self) -> usize {
        self.state.read().await.tasks.len()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Cascade delete: build the surviving collection, then swap it in.
    /// On cancellation nothing is committed.
    async fn delete_where<F>(
        &self,
        scope: &str,
        doomed: F,
        cancel: &CancellationToken,
    ) -> Result<(), StoreError>
    where
        F: Fn(&StoreTask) -> bool + Send,
    {
        self.ensure_open()?;
        let mut state = self.state.write().await;

        let (survivors, removed) =
            match state
                .tasks
                .filter_out(doomed, cancel, self.config.cancel_check_interval)
            {
                Ok(result) => result,
                Err(err) => {
                    warn!(scope, "cascade delete cancelled, nothing removed");
                    return Err(err);
                }
            };

        for task_id in &removed {
            state.runs.remove(*task_id);
        }
        state.tasks.replace(survivors);

        debug!(scope, removed = removed.len(), "cascade delete committed");
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_task(
        &self,
        org: OrgId,
        user: UserId,
        script: &str,
    ) -> Result<TaskId, StoreError> {
        self.ensure_open()?;
        let opts = StoreValidator::create_args(self.parser.as_ref(), org, user, script)?;

        let mut state = self.state.write().await;
        let id = self.id_gen.generate_task_id()?;
        state.tasks.insert(StoreTask {
            id,
            org,
            user,
            name: opts.name,
            script: script.to_string(),
        })?;
        state.runs.register(id, opts.concurrency);

        debug!(task_id = %id, %org, %user, max_concurrency = opts.concurrency, "task created");
        Ok(id)
    }

    async fn modify_task(&self, id: TaskId, new_script: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        StoreValidator::modify_args(self.parser.as_ref(), id, new_script)?;

        let mut state = self.state.write().await;
        let task = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("ModifyTask: record not found for {id}")))?;
        task.script = new_script.to_string();

        debug!(task_id = %id, "task script modified");
        Ok(())
    }

    async fn list_tasks(&self, params: TaskSearchParams) -> Result<Vec<StoreTask>, StoreError> {
        self.ensure_open()?;
        if params.org.is_some() && params.user.is_some() {
            return Err(StoreError::InvalidArgument(
                "ListTasks: org and user filters are mutually exclusive".into(),
            ));
        }
        if params.page_size > self.config.max_page_size {
            return Err(StoreError::InvalidArgument(format!(
                "ListTasks: PageSize exceeds maximum of {}",
                self.config.max_page_size
            )));
        }
        let limit = match params.page_size {
            0 => self.config.default_page_size,
            n => n,
        };

        let state = self.state.read().await;
        Ok(state.tasks.page(&params, limit))
    }

    async fn find_task_by_id(&self, id: TaskId) -> Result<Option<StoreTask>, StoreError> {
        self.ensure_open()?;
        let state = self.state.read().await;
        Ok(state.tasks.get(id).cloned())
    }

    async fn find_task_meta_by_id(&self, id: TaskId) -> Result<RunMeta, StoreError> {
        self.ensure_open()?;
        let state = self.state.read().await;
        state
            .runs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("task meta not found: {id}")))
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        if state.tasks.remove(id).is_none() {
            return Ok(false);
        }
        state.runs.remove(id);

        debug!(task_id = %id, "task deleted");
        Ok(true)
    }

    async fn create_run(
        &self,
        task_id: TaskId,
        scheduled_for: i64,
    ) -> Result<QueuedRun, StoreError> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        match state.runs.admit(task_id, scheduled_for, self.id_gen.as_ref()) {
            Ok(queued) => {
                debug!(%task_id, run_id = %queued.run_id, scheduled_for, "run admitted");
                Ok(queued)
            }
            Err(err) => {
                warn!(%task_id, scheduled_for, error = %err, "run rejected");
                Err(err)
            }
        }
    }

    async fn finish_run(&self, task_id: TaskId, run_id: RunId) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        let entry = state.runs.finish(task_id, run_id)?;

        debug!(
            %task_id,
            %run_id,
            scheduled_for = entry.scheduled_for,
            "run finished"
        );
        Ok(())
    }

    async fn delete_org(&self, org: OrgId, cancel: &CancellationToken) -> Result<(), StoreError> {
        self.delete_where("org", |t| t.org == org, cancel).await
    }

    async fn delete_user(
        &self,
        user: UserId,
        cancel: &CancellationToken,
    ) -> Result<(), StoreError> {
        self.delete_where("user", |t| t.user == user, cancel).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        debug!("store closed");
        Ok(())
    }
}
