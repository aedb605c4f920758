//! StorageFacade - namespace を意識したファイル操作
//!
//! # 役割
//! - StorageContext で論理 URI を解決・検証
//! - 必要なら NamespaceAccessGuard で namespace 間アクセスを認可
//! - (tenant, namespace) でスコープして StorageBackend に委譲
//!
//! facade 自身は状態を持たない（ロックもコンテンツのキャッシュもしない）。
//! cache 操作は `app::cache` に分けてある。

use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;

use super::builder::FacadeBuilder;
use super::namespace::NamespaceHandle;
use super::transfer::{LocalFileCleanup, buffer_reader, local_file_name};
use crate::domain::{
    FileAttributes, IntoStorageUri, Namespace, StorageContext, StorageResult, StorageUri,
    TenantId,
};
use crate::ports::{ByteStream, Clock, NamespaceAccessGuard, StorageBackend};

/// URI guard: 呼び出し側から受け取った URI はすべてここを通す
///
/// null / スキームなし / `kestra` 以外のスキームは InvalidReference。
/// バックエンドを呼ぶ前に必ず実行する。
fn uri_guard(uri: impl IntoStorageUri) -> StorageResult<StorageUri> {
    uri.into_storage_uri()
}

/// StorageFacade は StorageContext + StorageBackend + NamespaceAccessGuard を束ねる
///
/// # 使用例
/// ```ignore
/// let facade = StorageFacade::builder()
///     .context(context)
///     .backend(Arc::new(InMemoryStorage::new()))
///     .build()?;
///
/// let uri = facade.put_file(&b"hello"[..], "greeting.txt").await?;
/// let stream = facade.get_file(&uri).await?;
/// ```
pub struct StorageFacade {
    pub(super) context: StorageContext,
    pub(super) backend: Arc<dyn StorageBackend>,
    pub(super) access_guard: Arc<dyn NamespaceAccessGuard>,
    pub(super) clock: Arc<dyn Clock>,
}

impl StorageFacade {
    pub fn new(
        context: StorageContext,
        backend: Arc<dyn StorageBackend>,
        access_guard: Arc<dyn NamespaceAccessGuard>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            context,
            backend,
            access_guard,
            clock,
        }
    }

    pub fn builder() -> FacadeBuilder {
        FacadeBuilder::new()
    }

    pub fn context(&self) -> &StorageContext {
        &self.context
    }

    pub(super) fn tenant_id(&self) -> Option<&TenantId> {
        self.context.tenant_id()
    }

    pub(super) fn own_namespace(&self) -> &Namespace {
        self.context.namespace()
    }

    /// Handle on the context's own namespace.
    pub fn namespace(&self) -> NamespaceHandle {
        NamespaceHandle::new(
            self.tenant_id().cloned(),
            self.own_namespace().clone(),
            Arc::clone(&self.backend),
        )
    }

    /// Handle on `namespace`.
    ///
    /// 自 namespace 以外の場合は NamespaceAccessGuard で認可してからハンドルを返す。
    /// 拒否された場合は AccessDenied で、バックエンドは一切呼ばれない。
    pub async fn namespace_named(&self, namespace: &str) -> StorageResult<NamespaceHandle> {
        let target = Namespace::new(namespace)?;
        if target != *self.own_namespace() {
            self.access_guard
                .check_allowed_namespace(
                    self.tenant_id(),
                    &target,
                    self.tenant_id(),
                    self.own_namespace(),
                )
                .await?;
        }
        Ok(NamespaceHandle::new(
            self.tenant_id().cloned(),
            target,
            Arc::clone(&self.backend),
        ))
    }

    /// Scoped existence check. Absence is `Ok(false)`, never an error.
    pub async fn is_file_exist(&self, uri: impl IntoStorageUri) -> StorageResult<bool> {
        let uri = uri_guard(uri)?;
        self.backend
            .exists(self.tenant_id(), self.own_namespace(), &uri)
            .await
    }

    pub async fn get_file(&self, uri: impl IntoStorageUri) -> StorageResult<ByteStream> {
        let uri = uri_guard(uri)?;
        self.backend
            .get(self.tenant_id(), self.own_namespace(), &uri)
            .await
    }

    pub async fn get_attributes(&self, uri: impl IntoStorageUri) -> StorageResult<FileAttributes> {
        let uri = uri_guard(uri)?;
        self.backend
            .get_attributes(self.tenant_id(), self.own_namespace(), &uri)
            .await
    }

    /// Returns whether an object was actually removed.
    pub async fn delete_file(&self, uri: impl IntoStorageUri) -> StorageResult<bool> {
        let uri = uri_guard(uri)?;
        self.backend
            .delete(self.tenant_id(), self.own_namespace(), &uri)
            .await
    }

    /// Deletes every object stored under this execution's prefix.
    pub async fn delete_execution_files(&self) -> StorageResult<Vec<StorageUri>> {
        let prefix = self.context.execution_storage_uri();
        let deleted = self
            .backend
            .delete_by_prefix(self.tenant_id(), self.own_namespace(), &prefix)
            .await?;
        tracing::debug!(
            execution_id = %self.context.execution_id(),
            %prefix,
            deleted = deleted.len(),
            "Deleted execution files"
        );
        Ok(deleted)
    }

    pub fn context_base_uri(&self) -> StorageUri {
        self.context.context_storage_uri()
    }

    /// `name` をコンテキストのベース URI 配下に解決して書き込む
    pub async fn put_file<R>(&self, reader: R, name: &str) -> StorageResult<StorageUri>
    where
        R: AsyncRead + Unpin + Send,
    {
        let uri = StorageContext::resolve(&self.context_base_uri(), name)?;
        self.put_file_at(reader, uri).await
    }

    /// 呼び出し側が指定した URI にそのまま書き込む（名前解決なし）
    pub async fn put_file_at<R>(&self, reader: R, uri: impl IntoStorageUri) -> StorageResult<StorageUri>
    where
        R: AsyncRead + Unpin + Send,
    {
        let uri = uri_guard(uri)?;
        let content = buffer_reader(reader).await?;
        self.backend
            .put(self.tenant_id(), self.own_namespace(), &uri, content)
            .await
    }

    /// ローカルファイルを書き込み、成功・失敗にかかわらずローカルファイルを削除する
    ///
    /// `name` が無ければローカルファイルのファイル名を使う。
    pub async fn put_local_file(
        &self,
        path: impl AsRef<Path>,
        name: Option<&str>,
    ) -> StorageResult<StorageUri> {
        let path = path.as_ref();
        let _cleanup = LocalFileCleanup::new(path);

        let name = match name {
            Some(name) => name.to_owned(),
            None => local_file_name(path)?,
        };
        let uri = StorageContext::resolve(&self.context_base_uri(), &name)?;
        let file = tokio::fs::File::open(path).await?;
        self.put_file_at(file, uri).await
    }
}
