//! StorageBackend port - Blob ストレージ（Local / S3 / GCS / InMemory）
//!
//! facade はこの trait にだけ依存します。実装は外部クレートに置き、
//! このクレートには開発・テスト用の InMemoryStorage だけを含めます。
//!
//! # スコープ
//! すべての操作は (tenant, namespace, uri) でスコープされます。

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::domain::{FileAttributes, Namespace, StorageResult, StorageUri, StoredEntry, TenantId};

/// Byte stream returned by reads.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// StorageBackend は facade が消費するストレージ能力
///
/// # 実装への要求
/// - `Send + Sync`（複数タスクから同時に呼ばれる）
/// - `delete` は冪等（存在しなければ `Ok(false)`、エラーにしない）
/// - `get` / `get_attributes` は存在しなければ `StorageError::NotFound`
/// - 同一 URI に対する put → get は書き込んだ内容を返す（read-after-write）
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn exists(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<bool>;

    async fn get(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<ByteStream>;

    /// Stores `content` at `uri` (overwriting) and returns the stored URI.
    async fn put(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
        content: Bytes,
    ) -> StorageResult<StorageUri>;

    async fn delete(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<bool>;

    /// Deletes every entry at or under `prefix`, returning the removed URIs.
    async fn delete_by_prefix(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        prefix: &StorageUri,
    ) -> StorageResult<Vec<StorageUri>>;

    async fn get_attributes(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<FileAttributes>;

    /// Recursive listing under `prefix` (the prefix itself excluded).
    /// Returns an empty list when nothing exists there.
    async fn list(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        prefix: &StorageUri,
    ) -> StorageResult<Vec<StoredEntry>>;

    /// Returns `true` when the directory was created, `false` if it already existed.
    async fn create_directory(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<bool>;
}
