//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + Phantom type
//! すべての ID は ULID (Universally Unique Lexicographically Sortable Identifier) です。
//! `Id<T>` というジェネリック型で共通実装を提供し、`T` は実行時には使わない
//! マーカー型としてコンパイル時の型安全性だけを提供します。
//!
//! ## 順序
//! - ULID は先頭に timestamp を持つため、生成順にソートできる
//! - `UlidGenerator` は同一ミリ秒内でも単調増加を保証する
//! - cursor pagination (`after`) はこの順序に依存している
//!
//! ## ゼロ値
//! nil ULID（全ビット 0）は「無効な ID」を表します。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"task-", "run-", ...）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// # 例
/// ```ignore
/// let task_id: TaskId = Id::from(Ulid::new());
/// let run_id: RunId = Id::from(Ulid::new());
/// // task_id と run_id は異なる型なので、混同できない
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 無効な ID（nil ULID）
    pub fn nil() -> Self {
        Self::from_ulid(Ulid::nil())
    }

    /// nil でなければ有効
    pub fn is_valid(&self) -> bool {
        !self.ulid.is_nil()
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Run のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// Organization のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Org {}

impl IdMarker for Org {
    fn prefix() -> &'static str {
        "org-"
    }
}

/// User のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn prefix() -> &'static str {
        "user-"
    }
}

// ========================================
// Type Alias（使いやすさのため）
// ========================================

/// Identifier of a stored Task.
pub type TaskId = Id<Task>;

/// Identifier of a Run (one execution attempt of a Task for a scheduled time).
pub type RunId = Id<Run>;

/// Identifier of the owning organization.
pub type OrgId = Id<Org>;

/// Identifier of the owning user.
pub type UserId = Id<User>;
