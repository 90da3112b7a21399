//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStore**: Store の参照実装
//! - **InMemoryRunLog**: LogWriter / LogReader のメモリ実装
//!
//! 永続化する実装は同じ Store の契約（受付制御とウォーターマークの不変条件）を
//! 守る必要があります。

pub mod inmem;
pub mod run_log;

// 主要な型を再エクスポート
pub use self::inmem::InMemoryStore;
pub use self::run_log::InMemoryRunLog;
