//! NamespaceAccessGuard port - namespace 間アクセスの認可
//!
//! facade が自身のコンテキスト以外の namespace のハンドルを返す前に必ず呼ばれます。
//! マルチテナント分離の唯一の関門です。

use async_trait::async_trait;

use crate::domain::{Namespace, StorageResult, TenantId};

/// NamespaceAccessGuard は caller namespace から target namespace へのアクセスを認可する
///
/// # 契約
/// - 許可なら `Ok(())`
/// - 拒否なら `StorageError::AccessDenied`
/// - target と caller の namespace が異なる場合にのみ呼ばれる
#[async_trait]
pub trait NamespaceAccessGuard: Send + Sync {
    async fn check_allowed_namespace(
        &self,
        target_tenant: Option<&TenantId>,
        target_namespace: &Namespace,
        caller_tenant: Option<&TenantId>,
        caller_namespace: &Namespace,
    ) -> StorageResult<()>;
}
