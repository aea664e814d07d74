//! Resource types served by the provider.
//!
//! Each resource translates its declared attributes into CQL and reads the
//! cluster back into the same attribute shape. A read that finds nothing
//! returns `Value::Null`, which tells the host the resource is gone.

pub mod grant;
pub mod keyspace;
pub mod role;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cluster::Cluster;
use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};

pub use grant::GrantResource;
pub use keyspace::KeyspaceResource;
pub use role::RoleResource;

/// Lifecycle of one resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name as used in configuration, e.g. `cassandra_keyspace`.
    fn type_name(&self) -> &'static str;

    /// Attribute schema.
    fn schema(&self) -> Schema;

    /// Resource-specific checks on declared attributes, run after the
    /// schema's type checks pass. Never touches the cluster.
    fn validate(&self, config: &Value) -> Vec<Diagnostic>;

    /// Create the resource and return its state as read back.
    async fn create(&self, cluster: &dyn Cluster, planned: Value) -> Result<Value, ProviderError>;

    /// Read the resource, or `Value::Null` if it no longer exists.
    async fn read(&self, cluster: &dyn Cluster, current: Value) -> Result<Value, ProviderError>;

    /// Apply changed attributes in place.
    async fn update(
        &self,
        cluster: &dyn Cluster,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Remove the resource.
    async fn delete(&self, cluster: &dyn Cluster, current: Value) -> Result<(), ProviderError>;

    /// Skeleton state for an existing resource, completed by a read.
    fn import(&self, id: &str) -> Result<Value, ProviderError>;
}

/// Every resource the provider serves.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(KeyspaceResource),
        Box::new(RoleResource),
        Box::new(GrantResource),
    ]
}

pub(crate) fn from_state<T: DeserializeOwned>(value: Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(value)?)
}

pub(crate) fn to_state<T: Serialize>(state: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(state)?)
}

/// Fail with the error diagnostics, if any.
pub(crate) fn ensure_valid(diagnostics: Vec<Diagnostic>) -> Result<(), ProviderError> {
    let errors: Vec<String> = diagnostics
        .into_iter()
        .filter(Diagnostic::is_error)
        .map(|d| match d.detail {
            Some(detail) => format!("{}: {}", d.summary, detail),
            None => d.summary,
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::Validation(errors.join("; ")))
    }
}

/// Match a string against a pattern compiled once per call site.
macro_rules! pattern {
    ($re:literal) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).expect("valid regex literal"))
    }};
}
pub(crate) use pattern;
