//! Cache - (cache_id, object_id) で引くコンテンツキャッシュ
//!
//! # TTL の扱い
//! - TTL は永続化しない。読み込み時に呼び出し側が渡す
//! - 判定は「いま > last_modified + ttl」（Clock から now を取得）
//! - 期限切れなら同期的に削除してから「なし」を返す（削除失敗はログのみ）
//! - バックグラウンドの掃除はしない
//!
//! # 状態
//! - FRESH: 存在し、期限内（または TTL なし）→ `Some(stream)`
//! - EXPIRED: 期限切れ → 削除して `None`
//! - MISSING: 存在しない → `None`

use chrono::{DateTime, TimeDelta, Utc};
use std::path::Path;
use std::time::Duration;

use super::facade::StorageFacade;
use super::transfer::LocalFileCleanup;
use crate::domain::{StorageResult, StorageUri};
use crate::ports::ByteStream;

impl StorageFacade {
    /// Reads a cache entry, evicting it first when `ttl` says it is stale.
    pub async fn get_cache_file(
        &self,
        cache_id: &str,
        object_id: Option<&str>,
        ttl: Option<Duration>,
    ) -> StorageResult<Option<ByteStream>> {
        let uri = self.context.cache_uri(cache_id, object_id)?;

        if let Some(ttl) = ttl
            && let Some(last_modified) = self.cache_last_modified(&uri).await?
            && self.is_expired(last_modified, ttl)
        {
            tracing::debug!(
                cache_id,
                object_id,
                ttl_ms = ttl.as_millis() as u64,
                "Cache is expired, deleting it"
            );
            self.evict_expired(&uri).await;
            return Ok(None);
        }

        match self
            .backend
            .get(self.tenant_id(), self.own_namespace(), &uri)
            .await
        {
            Ok(stream) => Ok(Some(stream)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Uploads a local file as the cache entry and removes the local file.
    pub async fn put_cache_file(
        &self,
        path: impl AsRef<Path>,
        cache_id: &str,
        object_id: Option<&str>,
    ) -> StorageResult<StorageUri> {
        let path = path.as_ref();
        let _cleanup = LocalFileCleanup::new(path);

        let uri = self.context.cache_uri(cache_id, object_id)?;
        let file = tokio::fs::File::open(path).await?;
        self.put_file_at(file, uri).await
    }

    /// `None` if the entry never existed, otherwise the backend's delete result.
    pub async fn delete_cache_file(
        &self,
        cache_id: &str,
        object_id: Option<&str>,
    ) -> StorageResult<Option<bool>> {
        let uri = self.context.cache_uri(cache_id, object_id)?;
        let exists = self
            .backend
            .exists(self.tenant_id(), self.own_namespace(), &uri)
            .await?;
        if !exists {
            return Ok(None);
        }
        let deleted = self
            .backend
            .delete(self.tenant_id(), self.own_namespace(), &uri)
            .await?;
        Ok(Some(deleted))
    }

    async fn cache_last_modified(&self, uri: &StorageUri) -> StorageResult<Option<DateTime<Utc>>> {
        match self
            .backend
            .get_attributes(self.tenant_id(), self.own_namespace(), uri)
            .await
        {
            Ok(attributes) => Ok(attributes.last_modified()),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn is_expired(&self, last_modified: DateTime<Utc>, ttl: Duration) -> bool {
        // TimeDelta に収まらない TTL は期限なしとみなす
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| last_modified.checked_add_signed(ttl));
        match expires_at {
            Some(expires_at) => self.clock.now() > expires_at,
            None => false,
        }
    }

    /// Best-effort: the expiry decision stands even if the delete fails.
    async fn evict_expired(&self, uri: &StorageUri) {
        if let Err(error) = self
            .backend
            .delete(self.tenant_id(), self.own_namespace(), uri)
            .await
        {
            tracing::warn!(%uri, %error, "Failed to delete expired cache entry");
        }
    }
}
