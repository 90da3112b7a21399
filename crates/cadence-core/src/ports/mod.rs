//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部の協調者（ID 生成、スクリプト解析、時刻、永続化）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod clock;
pub mod id_generator;
pub mod run_log;
pub mod script_parser;
pub mod store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdError, IdGenerator, UlidGenerator};
pub use self::run_log::{LogFilter, LogLine, LogReader, LogWriter, NopLogWriter, RunFilter, RunRecord};
pub use self::script_parser::ScriptParser;
pub use self::store::Store;
