//! InMemoryStorage - 開発用・テスト用の StorageBackend
//!
//! # 実装詳細
//! - BTreeMap<(tenant, namespace, uri), StoredObject> でオブジェクトを管理
//! - tokio::sync::Mutex で排他制御
//! - 時刻は Clock から取得（TTL のテストで last_modified を固定するため）
//! - 呼び出し側が渡した URI が他 namespace を指していても、キーに namespace を
//!   含むので他 namespace のオブジェクトには届かない

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::domain::{
    FileAttributes, FileKind, Namespace, StorageError, StorageResult, StorageUri, StoredEntry,
    TenantId,
};
use crate::ports::{ByteStream, Clock, StorageBackend, SystemClock};

type ObjectKey = (Option<TenantId>, Namespace, StorageUri);

#[derive(Debug, Clone)]
struct StoredObject {
    content: Bytes,
    kind: FileKind,
    created_at: i64,
    modified_at: i64,
}

impl StoredObject {
    fn attributes(&self, uri: &StorageUri) -> FileAttributes {
        FileAttributes {
            file_name: uri.file_name().unwrap_or_default(),
            kind: self.kind,
            size: self.content.len() as u64,
            creation_time: self.created_at,
            last_modified_time: self.modified_at,
        }
    }
}

/// InMemoryStorage は開発用の StorageBackend
///
/// # 使用例
/// ```ignore
/// let storage = Arc::new(InMemoryStorage::new());
/// let facade = StorageFacade::builder()
///     .context(context)
///     .backend(storage.clone())
///     .build()?;
/// ```
pub struct InMemoryStorage {
    objects: Mutex<BTreeMap<ObjectKey, StoredObject>>,
    clock: Arc<dyn Clock>,
    /// バックエンド呼び出し回数（テストで「呼ばれていない」ことを確認する用）
    calls: AtomicUsize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            clock,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of backend operations served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of stored entries (files and directories) across all tenants.
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn record_call(&self, operation: &'static str, uri: &StorageUri) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(operation, %uri, "in-memory storage call");
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn key(tenant_id: Option<&TenantId>, namespace: &Namespace, uri: &StorageUri) -> ObjectKey {
        (tenant_id.cloned(), namespace.clone(), uri.clone())
    }

    fn in_scope(
        key: &ObjectKey,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        prefix: &StorageUri,
    ) -> bool {
        key.0.as_ref() == tenant_id && key.1 == *namespace && key.2.starts_with(prefix)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn exists(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<bool> {
        self.record_call("exists", uri);
        let objects = self.objects.lock().await;
        Ok(objects.contains_key(&Self::key(tenant_id, namespace, uri)))
    }

    async fn get(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<ByteStream> {
        self.record_call("get", uri);
        let objects = self.objects.lock().await;
        match objects.get(&Self::key(tenant_id, namespace, uri)) {
            Some(object) if object.kind == FileKind::File => {
                Ok(Box::new(Cursor::new(object.content.clone())))
            }
            Some(_) => Err(StorageError::Backend(format!("'{uri}' is a directory"))),
            None => Err(StorageError::not_found(uri)),
        }
    }

    async fn put(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
        content: Bytes,
    ) -> StorageResult<StorageUri> {
        self.record_call("put", uri);
        let now = self.now_millis();
        let mut objects = self.objects.lock().await;
        let key = Self::key(tenant_id, namespace, uri);

        let created_at = match objects.get(&key) {
            Some(existing) if existing.kind == FileKind::Directory => {
                return Err(StorageError::Backend(format!(
                    "cannot write '{uri}': a directory exists at this location"
                )));
            }
            Some(existing) => existing.created_at,
            None => now,
        };
        objects.insert(
            key,
            StoredObject {
                content,
                kind: FileKind::File,
                created_at,
                modified_at: now,
            },
        );
        Ok(uri.clone())
    }

    async fn delete(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<bool> {
        self.record_call("delete", uri);
        let mut objects = self.objects.lock().await;
        let removed = objects.remove(&Self::key(tenant_id, namespace, uri));

        // ディレクトリは配下ごと削除
        if let Some(removed) = &removed
            && removed.kind == FileKind::Directory
        {
            objects.retain(|key, _| !Self::in_scope(key, tenant_id, namespace, uri));
        }
        Ok(removed.is_some())
    }

    async fn delete_by_prefix(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        prefix: &StorageUri,
    ) -> StorageResult<Vec<StorageUri>> {
        self.record_call("delete_by_prefix", prefix);
        let mut objects = self.objects.lock().await;
        let doomed: Vec<ObjectKey> = objects
            .keys()
            .filter(|key| Self::in_scope(key, tenant_id, namespace, prefix))
            .cloned()
            .collect();

        let mut deleted = Vec::with_capacity(doomed.len());
        for key in doomed {
            objects.remove(&key);
            deleted.push(key.2);
        }
        Ok(deleted)
    }

    async fn get_attributes(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<FileAttributes> {
        self.record_call("get_attributes", uri);
        let objects = self.objects.lock().await;
        objects
            .get(&Self::key(tenant_id, namespace, uri))
            .map(|object| object.attributes(uri))
            .ok_or_else(|| StorageError::not_found(uri))
    }

    async fn list(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        prefix: &StorageUri,
    ) -> StorageResult<Vec<StoredEntry>> {
        self.record_call("list", prefix);
        let objects = self.objects.lock().await;
        let mut entries: BTreeMap<StorageUri, FileAttributes> = BTreeMap::new();
        let mut synthesized: BTreeMap<StorageUri, FileAttributes> = BTreeMap::new();

        for (key, object) in objects.iter() {
            if !Self::in_scope(key, tenant_id, namespace, prefix) {
                continue;
            }
            let uri = &key.2;
            let Some(relative) = uri.relative_to(prefix) else {
                continue;
            };
            if relative.is_empty() {
                continue;
            }

            // 明示的に作られていない中間ディレクトリも返す
            // 時刻は配下の最古の作成時刻と最新の更新時刻
            for depth in 1..relative.len() {
                let dir = prefix.join_segments(relative[..depth].iter().map(String::as_str));
                synthesized
                    .entry(dir)
                    .and_modify(|attrs| {
                        attrs.creation_time = attrs.creation_time.min(object.created_at);
                        attrs.last_modified_time =
                            attrs.last_modified_time.max(object.modified_at);
                    })
                    .or_insert_with(|| FileAttributes {
                        file_name: relative[depth - 1].clone(),
                        kind: FileKind::Directory,
                        size: 0,
                        creation_time: object.created_at,
                        last_modified_time: object.modified_at,
                    });
            }
            entries.insert(uri.clone(), object.attributes(uri));
        }
        for (dir, attrs) in synthesized {
            entries.entry(dir).or_insert(attrs);
        }

        Ok(entries
            .into_iter()
            .map(|(uri, attributes)| StoredEntry { uri, attributes })
            .collect())
    }

    async fn create_directory(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<bool> {
        self.record_call("create_directory", uri);
        let now = self.now_millis();
        let mut objects = self.objects.lock().await;
        let key = Self::key(tenant_id, namespace, uri);

        match objects.get(&key) {
            Some(existing) if existing.kind == FileKind::File => Err(
                StorageError::AlreadyExists(format!("'{uri}' exists and is not a directory")),
            ),
            Some(_) => Ok(false),
            None => {
                objects.insert(
                    key,
                    StoredObject {
                        content: Bytes::new(),
                        kind: FileKind::Directory,
                        created_at: now,
                        modified_at: now,
                    },
                );
                Ok(true)
            }
        }
    }
}
