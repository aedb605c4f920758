//! NamespaceHandle - namespace ファイル（`_files` 配下）の操作
//!
//! ハンドルは `StorageFacade::namespace()` / `namespace_named()` からのみ得られる。
//! namespace 間の認可はハンドル生成時に済んでいるので、ここでは再チェックしない。
//!
//! # パス
//! - パスは `_files` ルートからの相対パス（先頭の `/` は任意）
//! - `StorageContext::resolve` で解決するので `..` などでルート外には出られない

use std::sync::Arc;
use tokio::io::AsyncRead;

use super::transfer::buffer_reader;
use crate::domain::{
    Conflicts, Namespace, NamespaceFile, PathFilter, StorageContext, StorageError, StorageResult,
    StorageUri, TenantId,
};
use crate::ports::{ByteStream, StorageBackend};

/// Namespace-file view scoped to one (tenant, namespace).
pub struct NamespaceHandle {
    tenant_id: Option<TenantId>,
    namespace: Namespace,
    root: StorageUri,
    backend: Arc<dyn StorageBackend>,
}

impl NamespaceHandle {
    pub(crate) fn new(
        tenant_id: Option<TenantId>,
        namespace: Namespace,
        backend: Arc<dyn StorageBackend>,
    ) -> Self {
        let root = StorageContext::namespace_files_uri(&namespace);
        Self {
            tenant_id,
            namespace,
            root,
            backend,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    /// Root URI of this namespace's files.
    pub fn storage_uri(&self) -> StorageUri {
        self.root.clone()
    }

    fn resolve_path(&self, path: &str) -> StorageResult<StorageUri> {
        StorageContext::resolve(&self.root, path.trim_matches('/'))
    }

    fn to_namespace_file(&self, uri: StorageUri, directory: bool) -> StorageResult<NamespaceFile> {
        let relative = uri.relative_to(&self.root).ok_or_else(|| {
            StorageError::invalid_reference(format!("'{uri}' is outside of '{}'", self.root))
        })?;
        Ok(NamespaceFile {
            path: format!("/{}", relative.join("/")),
            uri,
            namespace: self.namespace.clone(),
            directory,
        })
    }

    /// Recursive listing under the root, or under `prefix` when given.
    pub async fn all(
        &self,
        prefix: Option<&str>,
        include_directories: bool,
    ) -> StorageResult<Vec<NamespaceFile>> {
        let base = match prefix.map(|p| p.trim_matches('/')) {
            Some(p) if !p.is_empty() => self.resolve_path(p)?,
            _ => self.root.clone(),
        };
        let entries = self
            .backend
            .list(self.tenant_id(), &self.namespace, &base)
            .await?;

        entries
            .into_iter()
            .filter(|entry| include_directories || !entry.attributes.is_directory())
            .map(|entry| {
                let directory = entry.attributes.is_directory();
                self.to_namespace_file(entry.uri, directory)
            })
            .collect()
    }

    /// Files whose namespace-relative path passes the include/exclude globs.
    pub async fn find_all_files_matching<S: AsRef<str>>(
        &self,
        includes: &[S],
        excludes: &[S],
    ) -> StorageResult<Vec<NamespaceFile>> {
        let filter = PathFilter::new(includes, excludes)?;
        let files = self.all(None, false).await?;
        Ok(files
            .into_iter()
            .filter(|file| filter.accepts(&file.path))
            .collect())
    }

    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        let uri = self.resolve_path(path)?;
        self.backend
            .exists(self.tenant_id(), &self.namespace, &uri)
            .await
    }

    pub async fn get_file_content(&self, path: &str) -> StorageResult<ByteStream> {
        let uri = self.resolve_path(path)?;
        self.backend
            .get(self.tenant_id(), &self.namespace, &uri)
            .await
    }

    /// Writes `path`, honouring `conflicts` when the file already exists.
    pub async fn put_file<R>(
        &self,
        path: &str,
        reader: R,
        conflicts: Conflicts,
    ) -> StorageResult<NamespaceFile>
    where
        R: AsyncRead + Unpin + Send,
    {
        let uri = self.resolve_path(path)?;

        if conflicts != Conflicts::Overwrite
            && self
                .backend
                .exists(self.tenant_id(), &self.namespace, &uri)
                .await?
        {
            match conflicts {
                Conflicts::Error => {
                    return Err(StorageError::AlreadyExists(format!(
                        "namespace file '{path}' already exists in '{}'",
                        self.namespace
                    )));
                }
                Conflicts::Skip => {
                    tracing::debug!(namespace = %self.namespace, path, "File already exists, skipping");
                    return self.to_namespace_file(uri, false);
                }
                Conflicts::Overwrite => {}
            }
        }

        let content = buffer_reader(reader).await?;
        let written = self
            .backend
            .put(self.tenant_id(), &self.namespace, &uri, content)
            .await?;
        self.to_namespace_file(written, false)
    }

    /// Creating an existing directory is not an error.
    pub async fn create_directory(&self, path: &str) -> StorageResult<StorageUri> {
        let uri = self.resolve_path(path)?;
        self.backend
            .create_directory(self.tenant_id(), &self.namespace, &uri)
            .await?;
        Ok(uri)
    }

    pub async fn delete(&self, path: &str) -> StorageResult<bool> {
        let uri = self.resolve_path(path)?;
        self.backend
            .delete(self.tenant_id(), &self.namespace, &uri)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{RecordingGuard, facade_with, read_string, task_context};
    use crate::impls::InMemoryStorage;
    use crate::ports::SystemClock;
    use rstest::rstest;

    fn handle(storage: Arc<InMemoryStorage>) -> NamespaceHandle {
        facade_with(
            task_context(),
            storage,
            Arc::new(RecordingGuard::allowing()),
            Arc::new(SystemClock),
        )
        .namespace()
    }

    async fn put(handle: &NamespaceHandle, path: &str, content: &'static [u8]) -> NamespaceFile {
        handle
            .put_file(path, content, Conflicts::Overwrite)
            .await
            .unwrap()
    }

    fn paths(files: &[NamespaceFile]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn storage_uri_is_namespace_files_root() {
        let handle = handle(Arc::new(InMemoryStorage::new()));
        assert_eq!(handle.storage_uri().as_str(), "kestra:///company/team/_files");
    }

    #[tokio::test]
    async fn put_then_read_back() {
        let handle = handle(Arc::new(InMemoryStorage::new()));
        let file = put(&handle, "/scripts/run.py", b"print('hi')").await;

        assert_eq!(file.path, "/scripts/run.py");
        assert_eq!(file.namespace.as_str(), "company.team");
        assert!(!file.directory);
        assert_eq!(
            file.uri.as_str(),
            "kestra:///company/team/_files/scripts/run.py"
        );
        assert!(handle.exists("scripts/run.py").await.unwrap());

        let content = read_string(handle.get_file_content("scripts/run.py").await.unwrap()).await;
        assert_eq!(content, "print('hi')");
    }

    #[tokio::test]
    async fn missing_file_content_is_not_found() {
        let handle = handle(Arc::new(InMemoryStorage::new()));
        let result = handle.get_file_content("nope.txt").await.map(|_| ());
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn conflicts_policy_is_honoured() {
        let handle = handle(Arc::new(InMemoryStorage::new()));
        put(&handle, "config.yml", b"v1").await;

        let error = handle
            .put_file("config.yml", &b"v2"[..], Conflicts::Error)
            .await;
        assert!(matches!(error, Err(StorageError::AlreadyExists(_))));

        let skipped = handle
            .put_file("config.yml", &b"v3"[..], Conflicts::Skip)
            .await
            .unwrap();
        assert_eq!(skipped.path, "/config.yml");
        let content = read_string(handle.get_file_content("config.yml").await.unwrap()).await;
        assert_eq!(content, "v1");

        handle
            .put_file("config.yml", &b"v4"[..], Conflicts::Overwrite)
            .await
            .unwrap();
        let content = read_string(handle.get_file_content("config.yml").await.unwrap()).await;
        assert_eq!(content, "v4");
    }

    #[tokio::test]
    async fn conflicts_error_writes_new_files() {
        let handle = handle(Arc::new(InMemoryStorage::new()));
        let file = handle
            .put_file("fresh.txt", &b"new"[..], Conflicts::Error)
            .await
            .unwrap();
        assert_eq!(file.path, "/fresh.txt");
    }

    #[tokio::test]
    async fn all_lists_recursively() {
        let handle = handle(Arc::new(InMemoryStorage::new()));
        put(&handle, "a.txt", b"a").await;
        put(&handle, "dir/b.txt", b"b").await;
        put(&handle, "dir/sub/c.txt", b"c").await;

        let files = handle.all(None, false).await.unwrap();
        assert_eq!(paths(&files), vec!["/a.txt", "/dir/b.txt", "/dir/sub/c.txt"]);

        let with_dirs = handle.all(None, true).await.unwrap();
        assert_eq!(
            paths(&with_dirs),
            vec!["/a.txt", "/dir", "/dir/b.txt", "/dir/sub", "/dir/sub/c.txt"]
        );
        assert!(with_dirs[1].directory);

        let under_dir = handle.all(Some("/dir/sub"), false).await.unwrap();
        assert_eq!(paths(&under_dir), vec!["/dir/sub/c.txt"]);
    }

    #[tokio::test]
    async fn find_all_files_matching_applies_globs() {
        let handle = handle(Arc::new(InMemoryStorage::new()));
        put(&handle, "flows/main.yml", b"").await;
        put(&handle, "flows/sub/child.yml", b"").await;
        put(&handle, "scripts/run.py", b"").await;
        put(&handle, "README.md", b"").await;

        let yaml = handle
            .find_all_files_matching(&["**/*.yml"], &["**/sub/**"])
            .await
            .unwrap();
        assert_eq!(paths(&yaml), vec!["/flows/main.yml"]);

        let none: [&str; 0] = [];
        let everything = handle.find_all_files_matching(&none, &none).await.unwrap();
        assert_eq!(everything.len(), 4);
    }

    #[tokio::test]
    async fn create_and_delete_directory() {
        let storage = Arc::new(InMemoryStorage::new());
        let handle = handle(storage.clone());

        let uri = handle.create_directory("/data/").await.unwrap();
        assert_eq!(uri.as_str(), "kestra:///company/team/_files/data");
        // 二回目も成功する
        handle.create_directory("data").await.unwrap();

        put(&handle, "data/x.csv", b"1").await;
        let dirs = handle.all(None, true).await.unwrap();
        assert!(dirs.iter().any(|f| f.path == "/data" && f.directory));

        assert!(handle.delete("data").await.unwrap());
        assert!(!handle.delete("data").await.unwrap());
        assert!(storage.is_empty().await);
    }

    #[rstest]
    #[case::parent("../other/_files/secret")]
    #[case::nested_parent("dir/../../escape")]
    #[case::empty("")]
    #[case::root_only("/")]
    #[tokio::test]
    async fn paths_cannot_escape_the_root(#[case] path: &str) {
        let storage = Arc::new(InMemoryStorage::new());
        let handle = handle(storage.clone());

        assert!(matches!(
            handle.exists(path).await,
            Err(StorageError::InvalidReference(_))
        ));
        assert!(matches!(
            handle.put_file(path, &b"x"[..], Conflicts::Overwrite).await,
            Err(StorageError::InvalidReference(_))
        ));
        assert_eq!(storage.call_count(), 0);
    }

    #[tokio::test]
    async fn namespaces_do_not_see_each_other() {
        let storage = Arc::new(InMemoryStorage::new());
        let facade = facade_with(
            task_context(),
            storage,
            Arc::new(RecordingGuard::allowing()),
            Arc::new(SystemClock),
        );
        let own = facade.namespace();
        let shared = facade.namespace_named("company.shared").await.unwrap();

        put(&own, "a.txt", b"own").await;
        put(&shared, "b.txt", b"shared").await;

        assert_eq!(paths(&own.all(None, false).await.unwrap()), vec!["/a.txt"]);
        assert_eq!(paths(&shared.all(None, false).await.unwrap()), vec!["/b.txt"]);
        assert!(!shared.exists("a.txt").await.unwrap());
    }
}
