//! App - アプリケーション層
//!
//! ports を組み合わせて namespace 付きストレージの操作を実装します。
//!
//! # 主要コンポーネント
//! - **StorageFacade**: URI の検証・解決とバックエンドへの委譲
//! - **FacadeBuilder**: StorageFacade の構築とワイヤリング
//! - **NamespaceHandle**: namespace ファイル（`_files` 配下）の操作
//! - cache 操作（TTL 付き読み込み）は `cache` に分割

pub mod builder;
mod cache;
pub mod facade;
pub mod namespace;
mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, FacadeBuilder};
pub use self::facade::StorageFacade;
pub use self::namespace::NamespaceHandle;
