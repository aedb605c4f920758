//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryStorage**: 開発用の StorageBackend
//! - **DenyCrossNamespace / AllowAllNamespaces / AllowedNamespaces**: NamespaceAccessGuard
//!
//! # 本番用実装
//! 本番用の StorageBackend（Local / S3 / GCS）は別クレートに配置します。

pub mod access;
pub mod inmem_storage;

pub use self::access::{AllowAllNamespaces, AllowedNamespaces, DenyCrossNamespace, NamespacePattern};
pub use self::inmem_storage::InMemoryStorage;
