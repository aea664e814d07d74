//! `cassandra_keyspace`: a keyspace and its replication settings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{ensure_valid, from_state, pattern, to_state, Resource};
use crate::cluster::{open_session, Cluster, KeyspaceRow};
use crate::cql::Statement;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Resource type name.
pub const TYPE_NAME: &str = "cassandra_keyspace";

/// Package prefix Cassandra reports on replication classes.
const LOCATOR_PREFIX: &str = "org.apache.cassandra.locator.";

/// Replication strategies a keyspace may be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationStrategy {
    /// Replicas on consecutive nodes of the ring; takes `replication_factor`.
    SimpleStrategy,
    /// Replicas per data center; takes one entry per data center.
    NetworkTopologyStrategy,
}

impl ReplicationStrategy {
    /// Class name as written in CQL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SimpleStrategy => "SimpleStrategy",
            Self::NetworkTopologyStrategy => "NetworkTopologyStrategy",
        }
    }
}

impl fmt::Display for ReplicationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplicationStrategy {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SimpleStrategy" => Ok(Self::SimpleStrategy),
            "NetworkTopologyStrategy" => Ok(Self::NetworkTopologyStrategy),
            other => Err(ProviderError::Validation(format!(
                "{}: invalid replication strategy - must be one of SimpleStrategy or NetworkTopologyStrategy",
                other
            ))),
        }
    }
}

/// A keyspace definition ready to be rendered as CQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceSpec {
    /// Keyspace name.
    pub name: String,
    /// Replication class.
    pub strategy: ReplicationStrategy,
    /// Replication options other than `class`.
    pub options: BTreeMap<String, String>,
    /// Whether writes go through the commit log.
    pub durable_writes: bool,
}

fn default_durable_writes() -> bool {
    true
}

/// Keyspace attributes as stored by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyspaceState {
    /// Same as `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Keyspace name.
    #[serde(default)]
    pub name: String,
    /// Replication class without its package prefix.
    #[serde(default)]
    pub replication_strategy: String,
    /// Replication options.
    #[serde(default)]
    pub strategy_options: BTreeMap<String, String>,
    /// Whether writes go through the commit log.
    #[serde(default = "default_durable_writes")]
    pub durable_writes: bool,
}

impl KeyspaceState {
    fn from_row(row: KeyspaceRow) -> Self {
        let mut options = row.replication;
        let class = options.remove("class").unwrap_or_default();
        let strategy = class
            .strip_prefix(LOCATOR_PREFIX)
            .unwrap_or(&class)
            .to_string();

        Self {
            id: Some(row.name.clone()),
            name: row.name,
            replication_strategy: strategy,
            strategy_options: options,
            durable_writes: row.durable_writes,
        }
    }

    /// The name to look the keyspace up by: the id once created.
    fn identity(&self) -> &str {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.name)
    }

    fn spec(&self) -> Result<KeyspaceSpec, ProviderError> {
        ensure_valid(check(self))?;
        if self.strategy_options.is_empty() {
            return Err(ProviderError::Configuration(format!(
                "must specify strategy options for keyspace {}",
                self.name
            )));
        }
        Ok(KeyspaceSpec {
            name: self.name.clone(),
            strategy: self.replication_strategy.parse()?,
            options: self.strategy_options.clone(),
            durable_writes: self.durable_writes,
        })
    }
}

/// Check a keyspace name: 1 to 49 word characters, not starting with `_`,
/// and never `system`.
pub fn validate_name(name: &str) -> Option<Diagnostic> {
    if name == "system" {
        return Some(
            Diagnostic::error("Invalid keyspace name")
                .with_detail("Cannot manage system keyspace")
                .with_attribute("name"),
        );
    }
    if !pattern!(r"^[a-zA-Z0-9][a-zA-Z0-9_]{0,48}$").is_match(name) {
        return Some(
            Diagnostic::error("Invalid keyspace name")
                .with_detail(format!(
                    "{}: name must contain between 1 and 49 letters, digits or underscores and must not start with an underscore",
                    name
                ))
                .with_attribute("name"),
        );
    }
    None
}

fn check(state: &KeyspaceState) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = validate_name(&state.name).into_iter().collect();

    if let Err(err) = state.replication_strategy.parse::<ReplicationStrategy>() {
        diagnostics.push(
            Diagnostic::error("Invalid replication strategy")
                .with_detail(err.message())
                .with_attribute("replication_strategy"),
        );
    }

    if state.strategy_options.contains_key("class") {
        diagnostics.push(
            Diagnostic::error("Invalid strategy options")
                .with_detail("class is set by replication_strategy")
                .with_attribute("strategy_options.class"),
        );
    }

    diagnostics
}

async fn read_keyspace(
    cluster: &dyn Cluster,
    name: &str,
) -> Result<Option<KeyspaceState>, ProviderError> {
    let session = open_session(cluster).await?;
    Ok(session.keyspace(name).await?.map(KeyspaceState::from_row))
}

async fn read_back(cluster: &dyn Cluster, name: &str) -> Result<Value, ProviderError> {
    match read_keyspace(cluster, name).await? {
        Some(state) => to_state(&state),
        None => Err(ProviderError::NotFound(format!(
            "keyspace {} is missing after it was written",
            name
        ))),
    }
}

/// The `cassandra_keyspace` resource.
pub struct KeyspaceResource;

#[async_trait]
impl Resource for KeyspaceResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A Cassandra keyspace")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name of keyspace")
                    .with_force_new(),
            )
            .with_attribute(
                "replication_strategy",
                Attribute::required_string()
                    .with_description("Keyspace replication strategy - must be one of SimpleStrategy or NetworkTopologyStrategy"),
            )
            .with_attribute(
                "strategy_options",
                Attribute::required_string_map()
                    .with_description("strategy options used with replication strategy"),
            )
            .with_attribute(
                "durable_writes",
                Attribute::optional_bool()
                    .with_default(json!(true))
                    .with_description("Enable or disable durable writes - disabling is not recommended"),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let Ok(state) = serde_json::from_value::<KeyspaceState>(config.clone()) else {
            return Vec::new();
        };
        let mut diagnostics = check(&state);
        if state.strategy_options.is_empty() {
            diagnostics.push(
                Diagnostic::error("Missing strategy options")
                    .with_detail("must specify strategy options")
                    .with_attribute("strategy_options"),
            );
        }
        diagnostics
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn create(&self, cluster: &dyn Cluster, planned: Value) -> Result<Value, ProviderError> {
        let spec = from_state::<KeyspaceState>(planned)?.spec()?;
        let name = spec.name.clone();

        let session = open_session(cluster).await?;
        session.execute(&Statement::CreateKeyspace(spec)).await?;
        drop(session);

        info!(keyspace = %name, "Created keyspace");
        read_back(cluster, &name).await
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn read(&self, cluster: &dyn Cluster, current: Value) -> Result<Value, ProviderError> {
        let state: KeyspaceState = from_state(current)?;
        let name = state.identity().to_string();

        match read_keyspace(cluster, &name).await? {
            Some(state) => to_state(&state),
            None => {
                info!(keyspace = %name, "Keyspace not found");
                Ok(Value::Null)
            },
        }
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn update(
        &self,
        cluster: &dyn Cluster,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let spec = from_state::<KeyspaceState>(planned)?.spec()?;
        let name = spec.name.clone();

        let session = open_session(cluster).await?;
        session.execute(&Statement::AlterKeyspace(spec)).await?;
        drop(session);

        info!(keyspace = %name, "Altered keyspace");
        read_back(cluster, &name).await
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn delete(&self, cluster: &dyn Cluster, current: Value) -> Result<(), ProviderError> {
        let state: KeyspaceState = from_state(current)?;
        let name = state.identity().to_string();

        let session = open_session(cluster).await?;
        session.execute(&Statement::DropKeyspace(name.clone())).await?;

        info!(keyspace = %name, "Dropped keyspace");
        Ok(())
    }

    fn import(&self, id: &str) -> Result<Value, ProviderError> {
        if let Some(diagnostic) = validate_name(id) {
            ensure_valid(vec![diagnostic])?;
        }
        Ok(json!({ "id": id, "name": id }))
    }
}
