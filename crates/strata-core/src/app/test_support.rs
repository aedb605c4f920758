//! Shared fixtures for facade tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;

use super::facade::StorageFacade;
use crate::domain::{
    ExecutionId, FileAttributes, FlowId, Namespace, StorageContext, StorageError, StorageResult,
    StorageUri, StoredEntry, TaskId, TaskRunId, TenantId,
};
use crate::impls::InMemoryStorage;
use crate::ports::{ByteStream, Clock, NamespaceAccessGuard, StorageBackend, SystemClock};

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub(crate) fn task_context() -> StorageContext {
    StorageContext::for_task(
        Some(TenantId::new("acme").unwrap()),
        Namespace::new("company.team").unwrap(),
        FlowId::new("daily").unwrap(),
        ExecutionId::new("exec-1").unwrap(),
        TaskId::new("extract").unwrap(),
        TaskRunId::new("run-1").unwrap(),
    )
}

pub(crate) fn execution_context(execution_id: &str) -> StorageContext {
    StorageContext::for_execution(
        Some(TenantId::new("acme").unwrap()),
        Namespace::new("company.team").unwrap(),
        FlowId::new("daily").unwrap(),
        ExecutionId::new(execution_id).unwrap(),
    )
}

pub(crate) fn facade_with(
    context: StorageContext,
    backend: Arc<dyn StorageBackend>,
    guard: Arc<dyn NamespaceAccessGuard>,
    clock: Arc<dyn Clock>,
) -> StorageFacade {
    StorageFacade::new(context, backend, guard, clock)
}

pub(crate) async fn read_string(mut stream: ByteStream) -> String {
    let mut content = String::new();
    stream.read_to_string(&mut content).await.unwrap();
    content
}

type GuardCall = (Option<String>, String, Option<String>, String);

/// Guard that records its arguments and answers with a fixed decision.
pub(crate) struct RecordingGuard {
    allow: bool,
    calls: Mutex<Vec<GuardCall>>,
}

impl RecordingGuard {
    pub(crate) fn allowing() -> Self {
        Self {
            allow: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn denying() -> Self {
        Self {
            allow: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<GuardCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NamespaceAccessGuard for RecordingGuard {
    async fn check_allowed_namespace(
        &self,
        target_tenant: Option<&TenantId>,
        target_namespace: &Namespace,
        caller_tenant: Option<&TenantId>,
        caller_namespace: &Namespace,
    ) -> StorageResult<()> {
        self.calls.lock().unwrap().push((
            target_tenant.map(|t| t.to_string()),
            target_namespace.to_string(),
            caller_tenant.map(|t| t.to_string()),
            caller_namespace.to_string(),
        ));
        if self.allow {
            Ok(())
        } else {
            Err(StorageError::AccessDenied {
                target: target_namespace.to_string(),
                caller: caller_namespace.to_string(),
            })
        }
    }
}

/// In-memory backend whose writes or deletes fail on demand.
pub(crate) struct FailingBackend {
    inner: InMemoryStorage,
    fail_puts: bool,
    fail_deletes: bool,
}

impl FailingBackend {
    pub(crate) fn failing_puts() -> Self {
        Self {
            inner: InMemoryStorage::with_clock(Arc::new(SystemClock)),
            fail_puts: true,
            fail_deletes: false,
        }
    }

    pub(crate) fn failing_deletes(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: InMemoryStorage::with_clock(clock),
            fail_puts: false,
            fail_deletes: true,
        }
    }
}

#[async_trait]
impl StorageBackend for FailingBackend {
    async fn exists(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<bool> {
        self.inner.exists(tenant_id, namespace, uri).await
    }

    async fn get(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<ByteStream> {
        self.inner.get(tenant_id, namespace, uri).await
    }

    async fn put(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
        content: Bytes,
    ) -> StorageResult<StorageUri> {
        if self.fail_puts {
            return Err(StorageError::Backend("simulated put failure".to_string()));
        }
        self.inner.put(tenant_id, namespace, uri, content).await
    }

    async fn delete(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<bool> {
        if self.fail_deletes {
            return Err(StorageError::Backend("simulated delete failure".to_string()));
        }
        self.inner.delete(tenant_id, namespace, uri).await
    }

    async fn delete_by_prefix(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        prefix: &StorageUri,
    ) -> StorageResult<Vec<StorageUri>> {
        self.inner.delete_by_prefix(tenant_id, namespace, prefix).await
    }

    async fn get_attributes(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<FileAttributes> {
        self.inner.get_attributes(tenant_id, namespace, uri).await
    }

    async fn list(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        prefix: &StorageUri,
    ) -> StorageResult<Vec<StoredEntry>> {
        self.inner.list(tenant_id, namespace, prefix).await
    }

    async fn create_directory(
        &self,
        tenant_id: Option<&TenantId>,
        namespace: &Namespace,
        uri: &StorageUri,
    ) -> StorageResult<bool> {
        self.inner.create_directory(tenant_id, namespace, uri).await
    }
}
