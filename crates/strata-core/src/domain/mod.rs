//! Domain model (IDs, URIs, storage context, attributes, errors).
//!
//! - ids: パスとして安全な識別子（TenantId, FlowId, ... / Namespace）
//! - uri: スキーム検証済みの論理 URI（StorageUri）
//! - context: 論理 URI の計算（StorageContext）
//! - attributes: バックエンドが返す属性、namespace file
//! - glob: namespace file のフィルタ
//! - errors: エラー型

pub mod attributes;
pub mod context;
pub mod errors;
pub mod glob;
pub mod ids;
pub mod uri;

pub use attributes::{Conflicts, FileAttributes, FileKind, NamespaceFile, StoredEntry};
pub use context::{ContextScope, StorageContext, TaskScope};
pub use errors::{ErrorKind, StorageError, StorageResult};
pub use glob::{GlobPattern, PathFilter};
pub use ids::{
    ExecutionId, FlowId, Id, IdKind, Namespace, TaskId, TaskRunId, TenantId, TriggerId,
};
pub use uri::{IntoStorageUri, KESTRA_SCHEME, StorageUri};
