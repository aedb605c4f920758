//! NamespaceAccessGuard の実装
//!
//! - **DenyCrossNamespace**: 自 namespace 以外はすべて拒否（builder のデフォルト）
//! - **AllowAllNamespaces**: 明示的なオプトアウト（単一テナントの開発環境など）
//! - **AllowedNamespaces**: target namespace ごとに許可する caller のパターンを持つ

use async_trait::async_trait;

use crate::domain::{Namespace, StorageError, StorageResult, TenantId};
use crate::ports::NamespaceAccessGuard;

fn denied(
    target_tenant: Option<&TenantId>,
    target_namespace: &Namespace,
    caller_tenant: Option<&TenantId>,
    caller_namespace: &Namespace,
) -> StorageError {
    let qualify = |tenant: Option<&TenantId>, ns: &Namespace| match tenant {
        Some(tenant) => format!("{tenant}/{ns}"),
        None => ns.to_string(),
    };
    StorageError::AccessDenied {
        target: qualify(target_tenant, target_namespace),
        caller: qualify(caller_tenant, caller_namespace),
    }
}

/// Denies every cross-namespace access.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyCrossNamespace;

#[async_trait]
impl NamespaceAccessGuard for DenyCrossNamespace {
    async fn check_allowed_namespace(
        &self,
        target_tenant: Option<&TenantId>,
        target_namespace: &Namespace,
        caller_tenant: Option<&TenantId>,
        caller_namespace: &Namespace,
    ) -> StorageResult<()> {
        if target_tenant == caller_tenant && target_namespace == caller_namespace {
            return Ok(());
        }
        Err(denied(
            target_tenant,
            target_namespace,
            caller_tenant,
            caller_namespace,
        ))
    }
}

/// Allows every access. Deployments must opt into this explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllNamespaces;

#[async_trait]
impl NamespaceAccessGuard for AllowAllNamespaces {
    async fn check_allowed_namespace(
        &self,
        _target_tenant: Option<&TenantId>,
        _target_namespace: &Namespace,
        _caller_tenant: Option<&TenantId>,
        _caller_namespace: &Namespace,
    ) -> StorageResult<()> {
        Ok(())
    }
}

/// caller namespace のパターン
///
/// - `*`: すべて
/// - `company.team.*`: `company.team` とその子孫
/// - それ以外: 完全一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespacePattern {
    Any,
    Subtree(Namespace),
    Exact(Namespace),
}

impl NamespacePattern {
    pub fn parse(pattern: &str) -> StorageResult<Self> {
        if pattern == "*" {
            return Ok(NamespacePattern::Any);
        }
        match pattern.strip_suffix(".*") {
            Some(parent) => Ok(NamespacePattern::Subtree(Namespace::new(parent)?)),
            None => Ok(NamespacePattern::Exact(Namespace::new(pattern)?)),
        }
    }

    pub fn matches(&self, namespace: &Namespace) -> bool {
        match self {
            NamespacePattern::Any => true,
            NamespacePattern::Subtree(parent) => namespace.is_within(parent),
            NamespacePattern::Exact(expected) => namespace == expected,
        }
    }
}

/// Rule-based guard: for each target namespace, the callers allowed to read it.
///
/// Cross-tenant access is always denied.
#[derive(Debug, Clone, Default)]
pub struct AllowedNamespaces {
    rules: Vec<(Namespace, Vec<NamespacePattern>)>,
}

impl AllowedNamespaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// `target` へのアクセスを `caller` パターンに許可する
    pub fn allow(mut self, target: Namespace, caller: NamespacePattern) -> Self {
        match self.rules.iter_mut().find(|(ns, _)| *ns == target) {
            Some((_, callers)) => callers.push(caller),
            None => self.rules.push((target, vec![caller])),
        }
        self
    }

    pub fn is_allowed(&self, target: &Namespace, caller: &Namespace) -> bool {
        self.rules
            .iter()
            .filter(|(ns, _)| ns == target)
            .flat_map(|(_, callers)| callers.iter())
            .any(|pattern| pattern.matches(caller))
    }
}

#[async_trait]
impl NamespaceAccessGuard for AllowedNamespaces {
    async fn check_allowed_namespace(
        &self,
        target_tenant: Option<&TenantId>,
        target_namespace: &Namespace,
        caller_tenant: Option<&TenantId>,
        caller_namespace: &Namespace,
    ) -> StorageResult<()> {
        let same_tenant = target_tenant == caller_tenant;
        if same_tenant
            && (target_namespace == caller_namespace
                || self.is_allowed(target_namespace, caller_namespace))
        {
            return Ok(());
        }
        tracing::debug!(
            target_namespace = %target_namespace,
            caller_namespace = %caller_namespace,
            same_tenant,
            "namespace access denied"
        );
        Err(denied(
            target_tenant,
            target_namespace,
            caller_tenant,
            caller_namespace,
        ))
    }
}
