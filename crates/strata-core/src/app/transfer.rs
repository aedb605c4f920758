//! ストリームとローカルファイルの受け渡し
//!
//! # 学習ポイント
//! - バックエンドへ渡す前に入力を全部読み切る（遅い producer による部分読み込みを避ける）
//! - Drop による後始末（成功・失敗・キャンセルのどの経路でも一時ファイルを消す）

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::domain::{StorageError, StorageResult};

/// Reads `reader` to the end through a buffer.
pub(crate) async fn buffer_reader<R>(reader: R) -> StorageResult<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut content = Vec::new();
    reader.read_to_end(&mut content).await?;
    Ok(Bytes::from(content))
}

/// The final path component of a local file, used as the default stored name.
pub(crate) fn local_file_name(path: &Path) -> StorageResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| {
            StorageError::invalid_reference(format!(
                "local file '{}' has no usable file name",
                path.display()
            ))
        })
}

/// Removes a local file. `Ok(false)` if it was already gone.
pub(crate) fn remove_local_file(path: &Path) -> std::io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}

/// Deletes a local temporary file when dropped.
///
/// 削除の失敗はログに残すだけで、元の操作の結果を上書きしない。
/// 削除は unlink 1 回なので Drop の中で同期的に行う。
pub(crate) struct LocalFileCleanup {
    path: PathBuf,
}

impl LocalFileCleanup {
    pub(crate) fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl Drop for LocalFileCleanup {
    fn drop(&mut self) {
        if let Err(error) = remove_local_file(&self.path) {
            tracing::warn!(
                path = %self.path.display(),
                %error,
                "Failed to delete temporary file"
            );
        }
    }
}
