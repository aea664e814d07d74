//! The Cassandra provider: configuration, planning and dispatch to resources.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cluster::{Cluster, ScyllaCluster};
use crate::config::{provider_schema, ClusterConfig, ProviderConfig};
use crate::error::ProviderError;
use crate::resources::{self, Resource};
use crate::schema::{has_errors, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation;

/// Builds a cluster handle from validated settings.
pub type Connector =
    Box<dyn Fn(ClusterConfig) -> Result<Arc<dyn Cluster>, ProviderError> + Send + Sync>;

/// Provider serving `cassandra_keyspace`, `cassandra_role` and `cassandra_grant`.
pub struct CassandraProvider {
    cluster: RwLock<Option<Arc<dyn Cluster>>>,
    connector: Connector,
    resources: Vec<Box<dyn Resource>>,
}

impl Default for CassandraProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CassandraProvider {
    /// A provider connecting through the `scylla` driver.
    pub fn new() -> Self {
        Self::with_connector(Box::new(|config| {
            Ok(Arc::new(ScyllaCluster::new(config)?) as Arc<dyn Cluster>)
        }))
    }

    /// A provider using `connector` to build its cluster handle.
    pub fn with_connector(connector: Connector) -> Self {
        Self {
            cluster: RwLock::new(None),
            connector,
            resources: resources::all(),
        }
    }

    /// Whether `configure` has succeeded.
    pub async fn is_configured(&self) -> bool {
        self.cluster.read().await.is_some()
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .iter()
            .find(|r| r.type_name() == resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    async fn cluster(&self) -> Result<Arc<dyn Cluster>, ProviderError> {
        self.cluster.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })
    }

    fn check_provider_config(
        config: &Value,
    ) -> Result<(Option<ClusterConfig>, Vec<Diagnostic>), ProviderError> {
        let diagnostics = validation::validate(&provider_schema(), config);
        if has_errors(&diagnostics) {
            return Ok((None, diagnostics));
        }
        Ok(ProviderConfig::from_value(config)?.resolve())
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Attribute changes between two states, in schema order.
fn diff(schema: &Schema, before: &Value, after: &Value) -> Vec<AttributeChange> {
    schema
        .attributes
        .keys()
        .filter_map(|name| {
            let b = non_null(before.get(name));
            let a = non_null(after.get(name));
            match (b, a) {
                (None, Some(a)) => Some(AttributeChange::added(name, a.clone())),
                (Some(b), None) => Some(AttributeChange::removed(name, b.clone())),
                (Some(b), Some(a)) if b != a => {
                    Some(AttributeChange::modified(name, b.clone(), a.clone()))
                },
                _ => None,
            }
        })
        .collect()
}

fn plan_against(schema: &Schema, prior: Option<Value>, proposed: Value) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());

    if proposed.is_null() {
        let changes = prior
            .as_ref()
            .map(|prior| diff(schema, prior, &Value::Null))
            .unwrap_or_default();
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let mut planned = schema.apply_defaults(proposed);
    let Some(prior) = prior else {
        let changes = diff(schema, &Value::Null, &planned);
        return PlanResult::with_changes(planned, changes, false);
    };

    if let (Some(map), Some(id)) = (planned.as_object_mut(), non_null(prior.get("id"))) {
        if non_null(map.get("id")).is_none() {
            map.insert("id".to_string(), id.clone());
        }
    }

    let changes = diff(schema, &prior, &planned);
    let requires_replace = changes.iter().any(|change| {
        schema
            .attributes
            .get(&change.path)
            .is_some_and(|attr| attr.force_new)
    });
    if changes.is_empty() {
        PlanResult::no_change(planned)
    } else {
        PlanResult::with_changes(planned, changes, requires_replace)
    }
}

#[async_trait::async_trait]
impl ProviderService for CassandraProvider {
    fn schema(&self) -> ProviderSchema {
        self.resources.iter().fold(
            ProviderSchema::new().with_provider_config(provider_schema()),
            |schema, resource| schema.with_resource(resource.type_name(), resource.schema()),
        )
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(Self::check_provider_config(&config)?.1)
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let (cluster_config, diagnostics) = Self::check_provider_config(&config)?;
        let Some(cluster_config) = cluster_config else {
            return Ok(diagnostics);
        };

        info!(
            hosts = ?cluster_config.hosts,
            port = cluster_config.port,
            tls = cluster_config.tls.is_some(),
            "Configuring cluster"
        );
        let cluster = (self.connector)(cluster_config)?;
        *self.cluster.write().await = Some(cluster);
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        info!("Provider stopping");
        self.cluster.write().await.take();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut diagnostics = validation::validate(&resource.schema(), &config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(resource.validate(&config));
        }
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let plan = plan_against(&resource.schema(), prior_state, proposed_state);
        debug!(
            resource_type,
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Planned"
        );
        Ok(plan)
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let cluster = self.cluster().await?;
        resource.create(cluster.as_ref(), planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        if current_state.is_null() {
            return Ok(Value::Null);
        }
        let cluster = self.cluster().await?;
        resource.read(cluster.as_ref(), current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let cluster = self.cluster().await?;
        resource
            .update(cluster.as_ref(), prior_state, planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let cluster = self.cluster().await?;
        resource.delete(cluster.as_ref(), current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let state = resource.import(id)?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }
}
