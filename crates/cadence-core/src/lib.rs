//! cadence-core
//!
//! Persistence and admission-control core of a recurring task scheduler.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, run）
//! - **ports**: 抽象化レイヤー（Store, IdGenerator, ScriptParser, Clock, LogWriter/LogReader）
//! - **impls**: 実装（InMemoryStore, InMemoryRunLog）
//! - **options**: スクリプト中の `option task = {...}` の解析
//! - **validation**: create/modify 前の入力チェック
//! - **config**: ストアの設定値
//! - **error**: エラー型と分類

pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod options;
pub mod ports;
pub mod validation;

pub use config::StoreConfig;
pub use error::{ErrorKind, StoreError};
pub use impls::{InMemoryRunLog, InMemoryStore};
pub use ports::Store;
