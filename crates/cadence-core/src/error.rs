//! Errors - ストアのエラー型と分類
//!
//! すべてのエラーは同期的に呼び出し元へ返されます。
//! リトライは呼び出し側（スケジューラ）の責任です。

use thiserror::Error;

use crate::ports::id_generator::IdError;

/// ErrorKind は呼び出し元が分岐に使う分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 入力の不足・矛盾（状態は変更されていない）
    InvalidArgument,
    /// 対象の task / run が存在しない
    NotFound,
    /// 同時実行数の上限に到達（後でリトライ）
    ResourceExhausted,
    /// 呼び出し元によるキャンセル
    Cancelled,
    /// ストアが閉じられている
    Unavailable,
    /// ID 生成などの内部エラー
    Internal,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ResourceExhausted(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("store is closed")]
    Closed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            StoreError::Cancelled => ErrorKind::Cancelled,
            StoreError::Closed => ErrorKind::Unavailable,
            StoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_resource_exhausted(&self) -> bool {
        self.kind() == ErrorKind::ResourceExhausted
    }
}

impl From<IdError> for StoreError {
    fn from(err: IdError) -> Self {
        StoreError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid(StoreError::InvalidArgument("x".into()), ErrorKind::InvalidArgument)]
    #[case::not_found(StoreError::NotFound("x".into()), ErrorKind::NotFound)]
    #[case::exhausted(StoreError::ResourceExhausted("x".into()), ErrorKind::ResourceExhausted)]
    #[case::cancelled(StoreError::Cancelled, ErrorKind::Cancelled)]
    #[case::closed(StoreError::Closed, ErrorKind::Unavailable)]
    #[case::internal(StoreError::Internal("x".into()), ErrorKind::Internal)]
    fn kind_matches_variant(#[case] err: StoreError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn id_exhaustion_is_internal() {
        let err: StoreError = IdError::Exhausted.into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("internal error"));
    }
}
