//! Domain identifiers (strongly-typed, path-safe IDs).
//!
//! ストレージの URI は識別子をそのままパスセグメントとして埋め込むため、
//! ここで「パスとして安全な文字列」であることを保証します。
//!
//! ## Phantom Type パターン
//! `Id<T>` というジェネリック型で検証ロジックを共通化しつつ、
//! `T` はマーカー型（PhantomData）として FlowId と TaskId などの混同を防ぎます。
//!
//! ## Namespace
//! Namespace だけは `company.team.project` のようなドット区切りの階層を持つため、
//! 専用の型として定義しています。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

use super::errors::{StorageError, StorageResult};

/// IdKind は各 ID 型のマーカー trait
///
/// エラーメッセージで使うラベル（"tenant", "flow" など）を提供します。
pub trait IdKind: Send + Sync + 'static {
    fn label() -> &'static str;
}

/// 1 つのパスセグメントとして安全かを検証
///
/// - 空文字、`.`、`..` は不可
/// - 使える文字は `[A-Za-z0-9_.-]`
pub(crate) fn validate_segment(label: &str, value: &str) -> StorageResult<()> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(StorageError::invalid_reference(format!(
            "{label} must be a non-empty path segment, got '{value}'"
        )));
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(StorageError::invalid_reference(format!(
            "{label} contains forbidden character {c:?}, got '{value}'"
        )));
    }
    Ok(())
}

/// ジェネリック ID 型
///
/// # 例
/// ```ignore
/// let flow: FlowId = Id::new("daily-report")?;
/// let task: TaskId = Id::new("extract")?;
/// // flow と task は異なる型なので、混同できない
/// ```
pub struct Id<T: IdKind> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T: IdKind> Id<T> {
    /// 文字列から Id を作成（パスセグメントとして検証）
    pub fn new(value: impl Into<String>) -> StorageResult<Self> {
        let value = value.into();
        validate_segment(T::label(), &value)?;
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    /// ULID ベースの新しい Id を生成
    pub fn generate() -> Self {
        Self {
            value: Ulid::new().to_string(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

// derive だと T にも Clone / PartialEq などの境界が付くため手書きする
impl<T: IdKind> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: IdKind> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: IdKind> Eq for Id<T> {}

impl<T: IdKind> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: IdKind> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: IdKind> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T: IdKind> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::label(), self.value)
    }
}

impl<T: IdKind> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdKind> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T: IdKind> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

// ========================================
// マーカー型の定義
// ========================================

macro_rules! id_kind {
    ($(#[$meta:meta])* $name:ident => $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {}

        impl IdKind for $name {
            fn label() -> &'static str {
                $label
            }
        }
    };
}

id_kind!(
    /// Tenant のマーカー型
    Tenant => "tenant"
);
id_kind!(
    /// Flow のマーカー型
    Flow => "flow"
);
id_kind!(
    /// Execution のマーカー型
    Execution => "execution"
);
id_kind!(
    /// Task のマーカー型
    Task => "task"
);
id_kind!(
    /// TaskRun のマーカー型
    TaskRun => "task run"
);
id_kind!(
    /// Trigger のマーカー型
    Trigger => "trigger"
);

/// Identifier of a tenant (top-level isolation boundary).
pub type TenantId = Id<Tenant>;

/// Identifier of a flow within a namespace.
pub type FlowId = Id<Flow>;

/// Identifier of one flow execution.
pub type ExecutionId = Id<Execution>;

/// Identifier of a task within a flow.
pub type TaskId = Id<Task>;

/// Identifier of one run of a task within an execution.
pub type TaskRunId = Id<TaskRun>;

/// Identifier of a trigger within a flow.
pub type TriggerId = Id<Trigger>;

// ========================================
// Namespace
// ========================================

/// Namespace はテナント内の論理的なワークスペース
///
/// # 命名規約
/// - `.` 区切りの 1 つ以上のセグメント（例: `company.team.project`）
/// - 各セグメントは `[A-Za-z0-9_-]+`
/// - URI では `.` が `/` に置き換えられる（`company/team/project`）
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(value: impl Into<String>) -> StorageResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(StorageError::invalid_reference("namespace must not be empty"));
        }
        for segment in value.split('.') {
            if segment.is_empty()
                || !segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
            {
                return Err(StorageError::invalid_reference(format!(
                    "invalid namespace '{value}'"
                )));
            }
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URI のパスセグメントとして使う部分
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// `self` が `other` と同じか、その子孫かどうか
    pub fn is_within(&self, other: &Namespace) -> bool {
        self.0 == other.0
            || (self.0.len() > other.0.len()
                && self.0.starts_with(&other.0)
                && self.0.as_bytes()[other.0.len()] == b'.')
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "namespace({})", self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Namespace {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::new(s)
    }
}

impl Serialize for Namespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Namespace::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty("")]
    #[case::dot(".")]
    #[case::parent("..")]
    #[case::slash("a/b")]
    #[case::backslash("a\\b")]
    #[case::space("a b")]
    #[case::scheme("kestra:")]
    fn ids_reject_unsafe_segments(#[case] value: &str) {
        let result = FlowId::new(value);
        assert!(matches!(result, Err(StorageError::InvalidReference(_))));
    }

    #[test]
    fn ids_accept_path_safe_values() {
        let flow = FlowId::new("daily-report_v2.1").unwrap();
        assert_eq!(flow.as_str(), "daily-report_v2.1");
        assert_eq!(flow.to_string(), "daily-report_v2.1");
    }

    #[test]
    fn generated_ids_are_unique_and_valid() {
        let a = ExecutionId::generate();
        let b = ExecutionId::generate();
        assert_ne!(a, b);
        assert!(ExecutionId::new(a.as_str()).is_ok());
    }

    #[test]
    fn ids_deserialize_through_validation() {
        let ok: TaskId = serde_json::from_str("\"extract\"").unwrap();
        assert_eq!(ok.as_str(), "extract");

        let bad: Result<TaskId, _> = serde_json::from_str("\"../etc\"");
        assert!(bad.is_err());
    }

    #[rstest]
    #[case::empty("")]
    #[case::leading_dot(".company")]
    #[case::trailing_dot("company.")]
    #[case::double_dot("company..team")]
    #[case::slash("company/team")]
    #[case::traversal("..")]
    fn namespace_rejects_malformed_values(#[case] value: &str) {
        assert!(Namespace::new(value).is_err());
    }

    #[test]
    fn namespace_segments_follow_dots() {
        let ns = Namespace::new("company.team.project").unwrap();
        assert_eq!(ns.segments().collect::<Vec<_>>(), vec!["company", "team", "project"]);
    }

    #[rstest]
    #[case("company.team", "company.team", true)]
    #[case("company.team.sub", "company.team", true)]
    #[case("company.teammate", "company.team", false)]
    #[case("company", "company.team", false)]
    fn namespace_is_within(#[case] ns: &str, #[case] parent: &str, #[case] expected: bool) {
        let ns = Namespace::new(ns).unwrap();
        let parent = Namespace::new(parent).unwrap();
        assert_eq!(ns.is_within(&parent), expected);
    }
}
