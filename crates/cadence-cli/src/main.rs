use std::sync::Arc;

use chrono::Utc;

use cadence_core::domain::{OrgId, RunStatus, TaskId, TaskSearchParams, UserId};
use cadence_core::ports::{LogReader, LogWriter, RunFilter};
use cadence_core::{InMemoryRunLog, InMemoryStore, Store, StoreConfig};
use serde::Serialize;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ulid::Ulid;

const TICKS: i64 = 6;
const TICK_SECS: i64 = 60;

/// 環境変数 CADENCE_* で StoreConfig を上書き
fn config_from_env() -> StoreConfig {
    fn read(key: &str, default: usize) -> usize {
        match std::env::var(key) {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(key, value = %raw, "ignoring invalid value");
                default
            }),
            Err(_) => default,
        }
    }

    let defaults = StoreConfig::default();
    StoreConfig::default()
        .with_default_page_size(read("CADENCE_DEFAULT_PAGE_SIZE", defaults.default_page_size))
        .with_max_page_size(read("CADENCE_MAX_PAGE_SIZE", defaults.max_page_size))
        .with_cancel_check_interval(read(
            "CADENCE_CANCEL_CHECK_INTERVAL",
            defaults.cancel_check_interval,
        ))
}

#[derive(Serialize)]
struct TaskSummary {
    id: TaskId,
    name: String,
    max_concurrency: u32,
    running: usize,
    last_completed: i64,
    runs_logged: usize,
}

/// worker：スケジューラの代わりに run を投入し、少し待って完了させる
async fn scheduler_worker(
    worker: usize,
    store: Arc<InMemoryStore>,
    run_log: Arc<InMemoryRunLog>,
    task_id: TaskId,
) {
    for tick in 0..TICKS {
        let scheduled_for = 1_700_000_000 + tick * TICK_SECS;

        // 1) 受付（上限に達していれば拒否される）
        let queued = match store.create_run(task_id, scheduled_for).await {
            Ok(queued) => queued,
            Err(err) if err.is_resource_exhausted() => {
                info!(worker, %task_id, scheduled_for, "busy, retrying on next tick");
                sleep(Duration::from_millis(15)).await;
                continue;
            }
            Err(err) => {
                warn!(worker, %task_id, error = %err, "create_run failed");
                return;
            }
        };

        // 2) run log に記録（実行そのものはしない）
        let now = Utc::now();
        let logged = async {
            run_log
                .update_run_state(task_id, queued.run_id, now, RunStatus::Started)
                .await?;
            run_log
                .add_run_log(task_id, queued.run_id, now, &format!("worker {worker} picked up run"))
                .await?;
            sleep(Duration::from_millis(20)).await;
            run_log
                .update_run_state(
                    task_id,
                    queued.run_id,
                    Utc::now(),
                    RunStatus::Success,
                )
                .await
        };
        if let Err(err) = logged.await {
            warn!(worker, run_id = %queued.run_id, error = %err, "run log write failed");
        }

        // 3) 完了（ウォーターマーク更新）
        if let Err(err) = store.finish_run(task_id, queued.run_id).await {
            warn!(worker, run_id = %queued.run_id, error = %err, "finish_run failed");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // (A) Store と RunLog を用意
    let store = Arc::new(InMemoryStore::new().with_config(config_from_env()));
    let run_log = Arc::new(InMemoryRunLog::new());

    let org = OrgId::from_ulid(Ulid::new());
    let user = UserId::from_ulid(Ulid::new());

    // (B) タスク登録
    let scripts = [
        r#"option task = {name: "cpu-rollup", every: 1m, concurrency: 1}
from(bucket: "telegraf") |> range(start: -1m) |> mean()"#,
        r#"option task = {name: "nightly-downsample", cron: "0 2 * * *", concurrency: 2}
from(bucket: "telegraf") |> range(start: -1d) |> aggregateWindow(every: 1h, fn: mean)"#,
    ];
    let mut task_ids = Vec::new();
    for script in scripts {
        let id = store.create_task(org, user, script).await?;
        info!(task_id = %id, "created task");
        task_ids.push(id);
    }

    // (C) worker を 2 本ずつ起動
    let mut workers = Vec::new();
    for (i, task_id) in task_ids.iter().copied().enumerate() {
        for w in 0..2 {
            workers.push(tokio::spawn(scheduler_worker(
                i * 2 + w,
                Arc::clone(&store),
                Arc::clone(&run_log),
                task_id,
            )));
        }
    }
    for worker in workers {
        worker.await?;
    }

    // (D) 結果を JSON で出力
    let mut summaries = Vec::new();
    for task in store.list_tasks(TaskSearchParams::for_org(org)).await? {
        let meta = store.find_task_meta_by_id(task.id).await?;
        let runs = run_log
            .list_runs(RunFilter {
                task_id: Some(task.id),
                ..RunFilter::default()
            })
            .await?;
        summaries.push(TaskSummary {
            id: task.id,
            name: task.name,
            max_concurrency: meta.max_concurrency(),
            running: meta.running_count(),
            last_completed: meta.last_completed(),
            runs_logged: runs.len(),
        });
    }
    println!("{}", serde_json::to_string_pretty(&summaries)?);

    // (E) 後片付け
    store.delete_org(org, &CancellationToken::new()).await?;
    info!(remaining = store.task_count().await, "org deleted");
    store.close().await?;
    Ok(())
}
