//! FacadeBuilder - StorageFacade の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 安全側のデフォルト（namespace 間アクセスは拒否、時刻はシステム時計）

use std::sync::Arc;

use super::facade::StorageFacade;
use crate::config::StorageConfig;
use crate::domain::{StorageContext, StorageError};
use crate::impls::DenyCrossNamespace;
use crate::ports::{Clock, NamespaceAccessGuard, StorageBackend, SystemClock};

/// FacadeBuilder は StorageFacade を構築
///
/// # 使用例
/// ```ignore
/// let facade = FacadeBuilder::new()
///     .context(context)
///     .backend(Arc::new(InMemoryStorage::new()))
///     .config(&StorageConfig::from_toml_str(toml)?)?
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - context と backend は必須。無ければ build() が BuildError を返す
/// - access_guard を省略すると DenyCrossNamespace
/// - clock を省略すると SystemClock
#[derive(Default)]
pub struct FacadeBuilder {
    context: Option<StorageContext>,
    backend: Option<Arc<dyn StorageBackend>>,
    access_guard: Option<Arc<dyn NamespaceAccessGuard>>,
    clock: Option<Arc<dyn Clock>>,
}

/// BuildError は StorageFacade 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing storage context. Call `context()` before `build()`.")]
    MissingContext,

    #[error("Missing storage backend. Call `backend()` before `build()`.")]
    MissingBackend,

    #[error("Invalid configuration: {0}")]
    Config(#[from] StorageError),
}

impl FacadeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(mut self, context: StorageContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn access_guard(mut self, guard: Arc<dyn NamespaceAccessGuard>) -> Self {
        self.access_guard = Some(guard);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 設定ファイルから access guard を組み立てる
    ///
    /// 不正なルールはここで BuildError::Config になる。
    pub fn config(self, config: &StorageConfig) -> Result<Self, BuildError> {
        let guard = config.access_guard()?;
        Ok(self.access_guard(guard))
    }

    pub fn build(self) -> Result<StorageFacade, BuildError> {
        let context = self.context.ok_or(BuildError::MissingContext)?;
        let backend = self.backend.ok_or(BuildError::MissingBackend)?;
        let access_guard = self
            .access_guard
            .unwrap_or_else(|| Arc::new(DenyCrossNamespace));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        tracing::info!(
            namespace = %context.namespace(),
            execution_id = %context.execution_id(),
            "Storage facade ready"
        );
        Ok(StorageFacade::new(context, backend, access_guard, clock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{RecordingGuard, t0, task_context};
    use crate::impls::InMemoryStorage;
    use crate::ports::FixedClock;
    use std::time::Duration;

    #[test]
    fn test_build_success() {
        let facade = FacadeBuilder::new()
            .context(task_context())
            .backend(Arc::new(InMemoryStorage::new()))
            .build();
        assert!(facade.is_ok());
    }

    #[test]
    fn test_build_missing_context() {
        let facade = FacadeBuilder::new()
            .backend(Arc::new(InMemoryStorage::new()))
            .build();
        assert!(matches!(facade, Err(BuildError::MissingContext)));
    }

    #[test]
    fn test_build_missing_backend() {
        let facade = StorageFacade::builder().context(task_context()).build();
        assert!(matches!(facade, Err(BuildError::MissingBackend)));
    }

    #[tokio::test]
    async fn test_build_defaults_to_denying_other_namespaces() {
        let facade = FacadeBuilder::new()
            .context(task_context())
            .backend(Arc::new(InMemoryStorage::new()))
            .build()
            .unwrap();

        let result = facade.namespace_named("company.shared").await;
        assert!(matches!(result, Err(StorageError::AccessDenied { .. })));
        assert!(facade.namespace_named("company.team").await.is_ok());
    }

    #[tokio::test]
    async fn test_build_uses_explicit_guard() {
        let guard = Arc::new(RecordingGuard::allowing());
        let facade = FacadeBuilder::new()
            .context(task_context())
            .backend(Arc::new(InMemoryStorage::new()))
            .access_guard(guard.clone())
            .build()
            .unwrap();

        assert!(facade.namespace_named("company.shared").await.is_ok());
        assert_eq!(guard.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_build_uses_explicit_clock() {
        let clock = Arc::new(FixedClock::new(t0()));
        let storage = Arc::new(InMemoryStorage::with_clock(clock.clone()));
        let facade = FacadeBuilder::new()
            .context(task_context())
            .backend(storage)
            .clock(clock.clone())
            .build()
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.zip");
        std::fs::write(&path, b"zip").unwrap();
        facade.put_cache_file(&path, "deps", None).await.unwrap();

        clock.advance(chrono::TimeDelta::minutes(5));
        let cached = facade
            .get_cache_file("deps", None, Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_build_with_config() {
        let config = StorageConfig::from_toml_str(
            r#"
            [[namespace_access.rules]]
            namespace = "company.shared"
            allowed = ["company.*"]
            "#,
        )
        .unwrap();
        let facade = FacadeBuilder::new()
            .context(task_context())
            .backend(Arc::new(InMemoryStorage::new()))
            .config(&config)
            .unwrap()
            .build()
            .unwrap();

        assert!(facade.namespace_named("company.shared").await.is_ok());
        assert!(facade.namespace_named("finance").await.is_err());
    }

    #[test]
    fn test_build_with_invalid_config() {
        let config = StorageConfig::from_toml_str(
            r#"
            [namespace_access]
            mode = "unrestricted"

            [[namespace_access.rules]]
            namespace = "a"
            allowed = ["b"]
            "#,
        )
        .unwrap();
        let result = FacadeBuilder::new().config(&config);
        assert!(matches!(
            result,
            Err(BuildError::Config(StorageError::Config(_)))
        ));
    }
}
