//! StorageUri - 論理 URI（`kestra:///...`）
//!
//! facade に渡される URI は必ずここを通ります。
//! `StorageUri` の値が存在する時点で「スキームが `kestra` である」ことが保証されるため、
//! バックエンドに任意の外部ロケーション（ローカルパスや他プロトコル）が渡ることはありません。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

use super::errors::{StorageError, StorageResult};

/// 論理 URI のスキーム
pub const KESTRA_SCHEME: &str = "kestra";

static ROOT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("kestra:///").expect("kestra:/// is a valid url"));

/// Scheme-checked logical reference to a stored object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageUri(Url);

impl StorageUri {
    /// 文字列を URI としてパースし、スキームを検証
    ///
    /// `url` クレートはスキームを小文字に正規化するので、
    /// 入力文字列のスキーム部分もそのまま比較する（`KESTRA://` は不可）。
    pub fn parse(input: &str) -> StorageResult<Self> {
        match input.split_once(':') {
            Some((scheme, _)) if scheme == KESTRA_SCHEME => {}
            Some(_) => {
                return Err(StorageError::invalid_reference(format!(
                    "invalid internal storage scheme, got uri '{input}'"
                )));
            }
            None => {
                return Err(StorageError::invalid_reference(format!(
                    "invalid internal storage uri, got uri '{input}'"
                )));
            }
        }
        let url = Url::parse(input).map_err(|e| {
            StorageError::invalid_reference(format!(
                "invalid internal storage uri, got uri '{input}': {e}"
            ))
        })?;
        Self::from_url(url)
    }

    /// `Url` を検証して StorageUri に変換
    pub fn from_url(url: Url) -> StorageResult<Self> {
        if url.scheme() != KESTRA_SCHEME {
            return Err(StorageError::invalid_reference(format!(
                "invalid internal storage scheme, got uri '{url}'"
            )));
        }
        if url.cannot_be_a_base() {
            return Err(StorageError::invalid_reference(format!(
                "internal storage uri must be hierarchical, got uri '{url}'"
            )));
        }
        // prefix 判定はパスだけを見るので authority は持たせない
        let has_authority = url.host_str().is_some_and(|host| !host.is_empty())
            || url.port().is_some()
            || !url.username().is_empty()
            || url.password().is_some();
        if has_authority {
            return Err(StorageError::invalid_reference(format!(
                "internal storage uri must not have an authority, got uri '{url}'"
            )));
        }
        Ok(Self(url))
    }

    /// 検証済みセグメントから組み立てる（facade 内部専用）
    pub(crate) fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        Self(ROOT.clone()).join_segments(segments)
    }

    /// 末尾にセグメントを追加した新しい URI を返す
    ///
    /// 呼び出し側でセグメントを検証済みであること。
    pub(crate) fn join_segments<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Self {
        let mut url = self.0.clone();
        // from_url で cannot-be-a-base は弾いているので常に Ok
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        Self(url)
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// パス部分（パーセントエンコードされたまま）
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// パスセグメント（空セグメントは除く、エンコードされたまま）
    pub fn segments(&self) -> Vec<&str> {
        self.0
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// 最後のセグメントをデコードしたもの
    pub fn file_name(&self) -> Option<String> {
        self.segments()
            .last()
            .map(|segment| decode_segment(segment))
    }

    /// `prefix` 配下（または同一）かどうかをセグメント単位で判定
    ///
    /// `/a/exec-1` は `/a/exec-10` の prefix ではない。
    pub fn starts_with(&self, prefix: &StorageUri) -> bool {
        let own = self.segments();
        let prefix = prefix.segments();
        own.len() >= prefix.len() && own.iter().zip(prefix.iter()).all(|(a, b)| a == b)
    }

    /// `prefix` からの相対セグメント（デコード済み）
    pub fn relative_to(&self, prefix: &StorageUri) -> Option<Vec<String>> {
        if !self.starts_with(prefix) {
            return None;
        }
        let skip = prefix.segments().len();
        Some(
            self.segments()
                .into_iter()
                .skip(skip)
                .map(decode_segment)
                .collect(),
        )
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

impl fmt::Debug for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageUri({})", self.0)
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for StorageUri {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageUri::parse(s)
    }
}

impl Serialize for StorageUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StorageUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        StorageUri::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// IntoStorageUri は URI guard の入口
///
/// facade の公開メソッドは呼び出し側から受け取った URI を必ずこれで変換します。
/// `None` は「null の URI」として InvalidReference になります。
pub trait IntoStorageUri {
    fn into_storage_uri(self) -> StorageResult<StorageUri>;
}

impl IntoStorageUri for StorageUri {
    fn into_storage_uri(self) -> StorageResult<StorageUri> {
        Ok(self)
    }
}

impl IntoStorageUri for &StorageUri {
    fn into_storage_uri(self) -> StorageResult<StorageUri> {
        Ok(self.clone())
    }
}

impl IntoStorageUri for &str {
    fn into_storage_uri(self) -> StorageResult<StorageUri> {
        StorageUri::parse(self)
    }
}

impl IntoStorageUri for String {
    fn into_storage_uri(self) -> StorageResult<StorageUri> {
        StorageUri::parse(&self)
    }
}

impl IntoStorageUri for &String {
    fn into_storage_uri(self) -> StorageResult<StorageUri> {
        StorageUri::parse(self)
    }
}

impl IntoStorageUri for Url {
    fn into_storage_uri(self) -> StorageResult<StorageUri> {
        StorageUri::from_url(self)
    }
}

impl IntoStorageUri for &Url {
    fn into_storage_uri(self) -> StorageResult<StorageUri> {
        StorageUri::from_url(self.clone())
    }
}

impl<T: IntoStorageUri> IntoStorageUri for Option<T> {
    fn into_storage_uri(self) -> StorageResult<StorageUri> {
        match self {
            Some(uri) => uri.into_storage_uri(),
            None => Err(StorageError::invalid_reference(
                "invalid internal storage uri, got null",
            )),
        }
    }
}
