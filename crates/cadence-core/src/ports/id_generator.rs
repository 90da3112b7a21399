//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: 単調増加 ULID ベース（本番用）

use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use thiserror::Error;
use ulid::{Generator, Ulid};

use crate::domain::ids::{RunId, TaskId};
use crate::ports::Clock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    /// 同一ミリ秒内でランダム部が桁あふれした
    #[error("id space exhausted for the current millisecond")]
    Exhausted,
}

/// IdGenerator は一意で単調増加する ID を生成
///
/// # 要件
/// - 同じ generator から発行された ID は、種類を問わず常に前回より大きい
/// - nil（無効な ID）は返さない
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> Result<TaskId, IdError>;

    fn generate_run_id(&self) -> Result<RunId, IdError>;
}

/// UlidGenerator は単調増加 ULID の生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// `ulid::Generator` は前回と同じ（または過去の）時刻が来た場合に
/// 前回の ULID をインクリメントするため、時計が戻っても順序は崩れません。
pub struct UlidGenerator<C> {
    clock: C,
    inner: Mutex<Generator>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            inner: Mutex::new(Generator::new()),
        }
    }

    fn next(&self) -> Result<Ulid, IdError> {
        let now = SystemTime::from(self.clock.now());
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .generate_from_datetime(now)
            .map_err(|_| IdError::Exhausted)
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> Result<TaskId, IdError> {
        self.next().map(TaskId::from)
    }

    fn generate_run_id(&self) -> Result<RunId, IdError> {
        self.next().map(RunId::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_increasing_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let mut prev = id_gen.generate_task_id().unwrap();
        for _ in 0..1000 {
            let next = id_gen.generate_task_id().unwrap();
            assert!(next > prev);
            assert!(next.is_valid());
            prev = next;
        }
    }

    #[test]
    fn fixed_clock_still_yields_increasing_ids() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_task_id().unwrap();
        let id2 = id_gen.generate_task_id().unwrap();
        assert!(id2 > id1);

        // timestamp 部分は固定時刻のまま
        assert_eq!(
            id1.as_ulid().timestamp_ms(),
            fixed_time.timestamp_millis() as u64
        );
    }

    #[test]
    fn clock_going_backwards_does_not_break_order() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = std::sync::Arc::new(FixedClock::new(start));
        let id_gen = UlidGenerator::new(clock.clone());

        let before = id_gen.generate_task_id().unwrap();
        clock.advance(Duration::seconds(-60));
        let after = id_gen.generate_task_id().unwrap();

        assert!(after > before);
    }

    #[test]
    fn task_and_run_ids_share_one_sequence() {
        let id_gen = UlidGenerator::new(SystemClock);

        let task_id = id_gen.generate_task_id().unwrap();
        let run_id = id_gen.generate_run_id().unwrap();

        assert!(run_id.as_ulid() > task_id.as_ulid());
        assert!(task_id.to_string().starts_with("task-"));
        assert!(run_id.to_string().starts_with("run-"));
    }
}
