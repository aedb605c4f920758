//! strata-core
//!
//! Namespaced object storage for workflow executions.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, uri, context, attributes, glob, errors）
//! - **ports**: 抽象化レイヤー（StorageBackend, NamespaceAccessGuard, Clock）
//! - **app**: アプリケーションロジック（StorageFacade, FacadeBuilder, NamespaceHandle）
//! - **impls**: 実装（InMemoryStorage, namespace access guards）
//! - **config**: TOML 設定（StorageConfig）
//!
//! # 設計原則
//! - facade に渡される URI はすべて `kestra` スキームで検証してから使う
//! - ストレージ操作は必ず (tenant, namespace) でスコープされる
//! - 自分以外の namespace へのアクセスは NamespaceAccessGuard を通す
//! - TTL は保存せず、読み込み時に Clock で判定する

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{BuildError, FacadeBuilder, NamespaceHandle, StorageFacade};
pub use config::StorageConfig;
pub use domain::{StorageContext, StorageError, StorageResult, StorageUri};
