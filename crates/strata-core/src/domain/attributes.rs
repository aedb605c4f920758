//! Object attributes and namespace file descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::Namespace;
use super::uri::StorageUri;

/// Whether a stored entry is a regular object or a directory marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileKind {
    File,
    Directory,
}

/// Attributes reported by a backend for one stored entry.
///
/// Timestamps are epoch millis, as the backends report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    pub file_name: String,
    pub kind: FileKind,
    pub size: u64,
    pub creation_time: i64,
    pub last_modified_time: i64,
}

impl FileAttributes {
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_modified_time)
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

/// One entry returned by a backend listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub uri: StorageUri,
    pub attributes: FileAttributes,
}

/// A file (or directory) living under a namespace's `_files` root.
///
/// `path` is relative to that root and always starts with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceFile {
    pub path: String,
    pub uri: StorageUri,
    pub namespace: Namespace,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub directory: bool,
}

/// What `put_file` does when the target already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Conflicts {
    #[default]
    Overwrite,
    Error,
    Skip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_modified_converts_epoch_millis() {
        let attrs = FileAttributes {
            file_name: "cache.zip".to_string(),
            kind: FileKind::File,
            size: 3,
            creation_time: 1_704_110_400_000,
            last_modified_time: 1_704_110_400_123,
        };
        let ts = attrs.last_modified().unwrap();
        assert_eq!(ts.timestamp_millis(), 1_704_110_400_123);
        assert!(!attrs.is_directory());
    }

    #[test]
    fn namespace_file_serializes_without_directory_flag_for_files() {
        let file = NamespaceFile {
            path: "/scripts/run.py".to_string(),
            uri: StorageUri::parse("kestra:///company/_files/scripts/run.py").unwrap(),
            namespace: Namespace::new("company").unwrap(),
            directory: false,
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["path"], "/scripts/run.py");
        assert_eq!(json["uri"], "kestra:///company/_files/scripts/run.py");
        assert_eq!(json["namespace"], "company");
        assert!(json.get("directory").is_none());
    }
}
