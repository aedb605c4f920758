//! Errors - ストレージ操作のエラー型と分類
//!
//! # 分類
//! - InvalidReference: URI / 名前の検証エラー（I/O 前に発生、リトライ無意味）
//! - AccessDenied: namespace 間アクセスの拒否
//! - NotFound: オブジェクトが存在しない（cache / exists 経路では正常系として扱う）
//! - Io / Backend: バックエンドの障害（facade はリトライしない）

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// StorageError は facade とバックエンドが共有するエラー型
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid internal storage reference: {0}")]
    InvalidReference(String),

    #[error("Namespace '{target}' is not allowed to be accessed from namespace '{caller}'")]
    AccessDenied { target: String, caller: String },

    #[error("Storage object not found: {0}")]
    NotFound(String),

    #[error("Storage object already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// ErrorKind は運用上の分類
///
/// facade 自体はリトライしないが、呼び出し側がリトライ方針を決めるために使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 入力が不正（何度やっても同じ結果）
    Permanent,
    /// 対象が存在しない
    Absent,
    /// インフラ障害（Blob / ディスク / ネットワーク）
    Infrastructure,
}

impl StorageError {
    pub fn invalid_reference(message: impl Into<String>) -> Self {
        StorageError::InvalidReference(message.into())
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        StorageError::NotFound(what.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidReference(_)
            | StorageError::AccessDenied { .. }
            | StorageError::AlreadyExists(_)
            | StorageError::Config(_) => ErrorKind::Permanent,
            StorageError::NotFound(_) => ErrorKind::Absent,
            StorageError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorKind::Absent,
            StorageError::Io(_) | StorageError::Backend(_) => ErrorKind::Infrastructure,
        }
    }

    /// NotFound（または I/O の NotFound）かどうか
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::Absent
    }
}
