//! StorageConfig - TOML から読み込む設定
//!
//! ```toml
//! [namespace_access]
//! mode = "enforced"            # or "unrestricted"
//!
//! [[namespace_access.rules]]
//! namespace = "company.shared"
//! allowed = ["company.*"]
//! ```
//!
//! - `enforced` でルールなし → DenyCrossNamespace
//! - `enforced` でルールあり → AllowedNamespaces
//! - `unrestricted` → AllowAllNamespaces（ルールを書くと設定エラー）

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::domain::{Namespace, StorageError, StorageResult};
use crate::impls::{AllowAllNamespaces, AllowedNamespaces, DenyCrossNamespace, NamespacePattern};
use crate::ports::NamespaceAccessGuard;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub namespace_access: NamespaceAccessConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamespaceAccessConfig {
    #[serde(default)]
    pub mode: AccessMode,
    #[serde(default)]
    pub rules: Vec<AccessRuleConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    Enforced,
    Unrestricted,
}

/// Callers matching `allowed` may open `namespace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessRuleConfig {
    pub namespace: String,
    pub allowed: Vec<String>,
}

impl StorageConfig {
    pub fn from_toml_str(input: &str) -> StorageResult<Self> {
        toml::from_str(input).map_err(|e| StorageError::Config(e.to_string()))
    }

    pub async fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let input = tokio::fs::read_to_string(path).await.map_err(|e| {
            StorageError::Config(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&input)
    }

    /// Builds the namespace access guard this configuration describes.
    pub fn access_guard(&self) -> StorageResult<Arc<dyn NamespaceAccessGuard>> {
        let access = &self.namespace_access;
        match access.mode {
            AccessMode::Unrestricted if !access.rules.is_empty() => Err(StorageError::Config(
                "namespace access rules have no effect in unrestricted mode".to_string(),
            )),
            AccessMode::Unrestricted => Ok(Arc::new(AllowAllNamespaces)),
            AccessMode::Enforced if access.rules.is_empty() => Ok(Arc::new(DenyCrossNamespace)),
            AccessMode::Enforced => {
                let mut guard = AllowedNamespaces::new();
                for rule in &access.rules {
                    let target = Namespace::new(&rule.namespace).map_err(config_error)?;
                    for allowed in &rule.allowed {
                        let pattern = NamespacePattern::parse(allowed).map_err(config_error)?;
                        guard = guard.allow(target.clone(), pattern);
                    }
                }
                Ok(Arc::new(guard))
            }
        }
    }
}

fn config_error(error: StorageError) -> StorageError {
    StorageError::Config(error.to_string())
}
