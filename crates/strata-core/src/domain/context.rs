//! StorageContext - 論理 URI の計算（I/O なし）
//!
//! # URI のレイアウト
//! - Execution: `kestra:///{ns}/{flow}/executions/{execution}`
//! - Task: `kestra:///{ns}/{flow}/executions/{execution}/tasks/{task}/{task_run}`
//! - Trigger: `kestra:///{ns}/{flow}/executions/{execution}/trigger/{trigger}`
//! - Cache: `kestra:///{ns}/{flow}[/{task}]/cache/{cache_id}[/{object_id}]/cache.zip`
//! - Namespace files: `kestra:///{ns}/_files`
//!
//! `{ns}` は namespace の `.` を `/` に置き換えたもの。
//! 識別子は型の時点で検証済みなので、ここで組み立てる URI は常に namespace 配下に収まる。

use super::errors::{StorageError, StorageResult};
use super::ids::{
    ExecutionId, FlowId, Namespace, TaskId, TaskRunId, TenantId, TriggerId, validate_segment,
};
use super::uri::StorageUri;

const EXECUTIONS_SEGMENT: &str = "executions";
const TASKS_SEGMENT: &str = "tasks";
const TRIGGER_SEGMENT: &str = "trigger";
const CACHE_SEGMENT: &str = "cache";
const CACHE_FILE_NAME: &str = "cache.zip";
const NAMESPACE_FILES_SEGMENT: &str = "_files";

/// Task 実行中のスコープ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskScope {
    pub task_id: TaskId,
    pub task_run_id: TaskRunId,
}

/// コンテキストがどの単位の実行に紐づくか
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextScope {
    Execution,
    Task(TaskScope),
    Trigger { trigger_id: TriggerId },
}

/// StorageContext は tenant / namespace / 実行識別子から論理 URI を導出する
///
/// # 不変条件
/// - 生成する URI のスキームは常に `kestra`
/// - 生成する URI は常に自身の namespace 配下
/// - 同じ引数からは常に同じ URI（cache の再参照のため）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageContext {
    tenant_id: Option<TenantId>,
    namespace: Namespace,
    flow_id: FlowId,
    execution_id: ExecutionId,
    scope: ContextScope,
}

impl StorageContext {
    pub fn for_execution(
        tenant_id: Option<TenantId>,
        namespace: Namespace,
        flow_id: FlowId,
        execution_id: ExecutionId,
    ) -> Self {
        Self {
            tenant_id,
            namespace,
            flow_id,
            execution_id,
            scope: ContextScope::Execution,
        }
    }

    pub fn for_task(
        tenant_id: Option<TenantId>,
        namespace: Namespace,
        flow_id: FlowId,
        execution_id: ExecutionId,
        task_id: TaskId,
        task_run_id: TaskRunId,
    ) -> Self {
        Self {
            tenant_id,
            namespace,
            flow_id,
            execution_id,
            scope: ContextScope::Task(TaskScope {
                task_id,
                task_run_id,
            }),
        }
    }

    pub fn for_trigger(
        tenant_id: Option<TenantId>,
        namespace: Namespace,
        flow_id: FlowId,
        execution_id: ExecutionId,
        trigger_id: TriggerId,
    ) -> Self {
        Self {
            tenant_id,
            namespace,
            flow_id,
            execution_id,
            scope: ContextScope::Trigger { trigger_id },
        }
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn flow_id(&self) -> &FlowId {
        &self.flow_id
    }

    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    pub fn scope(&self) -> &ContextScope {
        &self.scope
    }

    pub fn task_scope(&self) -> Option<&TaskScope> {
        match &self.scope {
            ContextScope::Task(task) => Some(task),
            _ => None,
        }
    }

    fn flow_uri(&self) -> StorageUri {
        StorageUri::from_segments(
            self.namespace
                .segments()
                .chain(std::iter::once(self.flow_id.as_str())),
        )
    }

    /// Prefix covering every object stored by this execution.
    pub fn execution_storage_uri(&self) -> StorageUri {
        self.flow_uri()
            .join_segments([EXECUTIONS_SEGMENT, self.execution_id.as_str()])
    }

    /// Base URI for files written from this context.
    pub fn context_storage_uri(&self) -> StorageUri {
        let execution = self.execution_storage_uri();
        match &self.scope {
            ContextScope::Execution => execution,
            ContextScope::Task(task) => execution.join_segments([
                TASKS_SEGMENT,
                task.task_id.as_str(),
                task.task_run_id.as_str(),
            ]),
            ContextScope::Trigger { trigger_id } => {
                execution.join_segments([TRIGGER_SEGMENT, trigger_id.as_str()])
            }
        }
    }

    /// Cache URI for `(cache_id, object_id)`.
    ///
    /// 同じ引数なら常に同じ URI。`cache_id` / `object_id` は 1 セグメントでなければならない。
    pub fn cache_uri(&self, cache_id: &str, object_id: Option<&str>) -> StorageResult<StorageUri> {
        validate_segment("cache id", cache_id)?;
        if let Some(object_id) = object_id {
            validate_segment("object id", object_id)?;
        }

        let mut uri = self.flow_uri();
        if let Some(task) = self.task_scope() {
            uri = uri.join_segments([task.task_id.as_str()]);
        }
        Ok(uri
            .join_segments([CACHE_SEGMENT, cache_id])
            .join_segments(object_id)
            .join_segments([CACHE_FILE_NAME]))
    }

    /// Root URI of a namespace's files.
    pub fn namespace_files_uri(namespace: &Namespace) -> StorageUri {
        StorageUri::from_segments(
            namespace
                .segments()
                .chain(std::iter::once(NAMESPACE_FILES_SEGMENT)),
        )
    }

    /// `name` を `base` 配下に解決する
    ///
    /// `name` は `/` で分割され、各セグメントが追加される。
    /// 空セグメント、`.`、`..`、バックスラッシュ、制御文字は拒否する。
    /// 絶対 URI を渡しても `base` を上書きすることはない。
    pub fn resolve(base: &StorageUri, name: &str) -> StorageResult<StorageUri> {
        if name.is_empty() {
            return Err(StorageError::invalid_reference("file name must not be empty"));
        }
        let segments: Vec<&str> = name.split('/').collect();
        for segment in &segments {
            let forbidden = segment.is_empty()
                || *segment == "."
                || *segment == ".."
                || segment.chars().any(|c| c == '\\' || c.is_control());
            if forbidden {
                return Err(StorageError::invalid_reference(format!(
                    "invalid file name '{name}': segments must not be empty, '.' or '..'"
                )));
            }
        }
        Ok(base.join_segments(segments))
    }
}
