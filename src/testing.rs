//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] without a gRPC server, and
//! [`MemoryCluster`] stands in for Cassandra: it applies CQL statements to an
//! in-memory catalog and answers with the messages Cassandra would send.
//!
//! # Example
//!
//! ```ignore
//! use terraform_provider_cassandra::testing::{MemoryCluster, ProviderTester};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_keyspace() {
//!     let cluster = MemoryCluster::shared();
//!     let tester = ProviderTester::new(cluster.provider());
//!     tester.configure(json!({"hosts": ["127.0.0.1"]})).await.unwrap();
//!
//!     let state = tester.lifecycle_create("cassandra_keyspace", json!({
//!         "name": "ks",
//!         "replication_strategy": "SimpleStrategy",
//!         "strategy_options": {"replication_factor": "1"}
//!     })).await.unwrap();
//!
//!     assert_eq!(state["id"], "ks");
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::cluster::{Cluster, CqlSession, KeyspaceRow, RoleRow};
use crate::cql::Statement;
use crate::error::ProviderError;
use crate::provider::CassandraProvider;
use crate::resources::grant::{GrantSpec, GrantTarget};
use crate::resources::keyspace::{KeyspaceSpec, ReplicationStrategy};
use crate::resources::role::RoleSpec;
use crate::schema::{has_errors, Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A test harness for provider implementations.
///
/// Wraps a `ProviderService` and exposes each operation with test-friendly
/// signatures, plus helpers that chain plan, apply and read the way the host
/// does.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource; `Value::Null` means absent.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan → update → read.
    ///
    /// Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read(resource_type, updated_state).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Import a resource by id, then read it: the host's import flow.
    ///
    /// Returns `Value::Null` if the resource does not exist.
    pub async fn lifecycle_import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Value, ProviderError> {
        let imported = self.import_resource(resource_type, id).await?;
        let Some(resource) = imported.into_iter().next() else {
            return Ok(Value::Null);
        };
        self.read(&resource.resource_type, resource.state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

impl TestError {
    /// The error diagnostics, empty for provider errors.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            TestError::Diagnostics(diags) => diags,
            TestError::Provider(_) => &[],
        }
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    if has_errors(&diagnostics) {
        Err(TestError::Diagnostics(
            diagnostics.into_iter().filter(Diagnostic::is_error).collect(),
        ))
    } else {
        Ok(())
    }
}

const LOCATOR_PREFIX: &str = "org.apache.cassandra.locator.";

/// bcrypt cost used for stored hashes; low to keep tests fast.
const HASH_COST: u32 = 4;

#[derive(Debug, Default)]
struct Catalog {
    keyspaces: BTreeMap<String, KeyspaceRow>,
    roles: BTreeMap<String, RoleRow>,
    /// Permissions per grantee and resource.
    permissions: HashMap<(String, GrantTarget), BTreeSet<String>>,
    statements: Vec<String>,
}

/// In-memory stand-in for a Cassandra cluster.
///
/// Applies the statements the provider issues to a catalog of keyspaces,
/// roles and permissions, rejecting them the way Cassandra does.
#[derive(Debug, Default)]
pub struct MemoryCluster {
    catalog: Arc<Mutex<Catalog>>,
    sessions: AtomicUsize,
}

impl MemoryCluster {
    /// An empty cluster behind an `Arc`, ready to hand to a provider.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A provider whose `configure` connects to this cluster.
    pub fn provider(self: &Arc<Self>) -> CassandraProvider {
        let cluster = Arc::clone(self);
        CassandraProvider::with_connector(Box::new(move |_| {
            Ok(Arc::clone(&cluster) as Arc<dyn Cluster>)
        }))
    }

    /// Number of sessions opened so far.
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Statements applied so far, passwords redacted.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Apply a statement out of band, as another client would.
    pub fn apply(&self, statement: &Statement) -> Result<(), ProviderError> {
        let mut catalog = self.lock();
        catalog.apply(statement)?;
        catalog.statements.push(statement.redacted());
        Ok(())
    }

    /// The stored keyspace row, if any.
    pub fn keyspace(&self, name: &str) -> Option<KeyspaceRow> {
        self.lock().keyspaces.get(name).cloned()
    }

    /// The stored role row, if any.
    pub fn role(&self, name: &str) -> Option<RoleRow> {
        self.lock().roles.get(name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn invalid(message: impl Into<String>) -> ProviderError {
    ProviderError::Query(message.into())
}

impl Catalog {
    fn apply(&mut self, statement: &Statement) -> Result<(), ProviderError> {
        match statement {
            Statement::CreateKeyspace(spec) => {
                if self.keyspaces.contains_key(&spec.name) {
                    return Err(invalid(format!("Cannot add existing keyspace \"{}\"", spec.name)));
                }
                let row = keyspace_row(spec)?;
                self.keyspaces.insert(spec.name.clone(), row);
            },
            Statement::AlterKeyspace(spec) => {
                if !self.keyspaces.contains_key(&spec.name) {
                    return Err(invalid(format!(
                        "Cannot alter non existing keyspace {}",
                        spec.name
                    )));
                }
                let row = keyspace_row(spec)?;
                self.keyspaces.insert(spec.name.clone(), row);
            },
            Statement::DropKeyspace(name) => {
                if self.keyspaces.remove(name).is_none() {
                    return Err(invalid(format!("Cannot drop non existing keyspace '{}'.", name)));
                }
                self.permissions
                    .retain(|(_, target), _| target.keyspace() != Some(name.as_str()));
            },
            Statement::CreateRole(spec) => {
                if self.roles.contains_key(&spec.name) {
                    return Err(invalid(format!("{} already exists", spec.name)));
                }
                let row = role_row(spec)?;
                self.roles.insert(spec.name.clone(), row);
            },
            Statement::AlterRole(spec) => {
                if !self.roles.contains_key(&spec.name) {
                    return Err(invalid(format!("{} doesn't exist", spec.name)));
                }
                let row = role_row(spec)?;
                self.roles.insert(spec.name.clone(), row);
            },
            Statement::DropRole(name) => {
                if self.roles.remove(name).is_none() {
                    return Err(invalid(format!("{} doesn't exist", name)));
                }
                self.permissions.retain(|(grantee, _), _| grantee != name);
            },
            Statement::Grant(spec) => {
                self.check_grantee(&spec.grantee)?;
                self.check_target(&spec.target)?;
                self.permissions
                    .entry(permission_key(&spec.grantee, &spec.target))
                    .or_default()
                    .extend(expanded(spec));
            },
            Statement::Revoke(spec) => {
                self.check_grantee(&spec.grantee)?;
                self.check_target(&spec.target)?;
                let key = permission_key(&spec.grantee, &spec.target);
                if let Some(held) = self.permissions.get_mut(&key) {
                    for permission in expanded(spec) {
                        held.remove(&permission);
                    }
                    if held.is_empty() {
                        self.permissions.remove(&key);
                    }
                }
            },
        }
        Ok(())
    }

    fn check_grantee(&self, grantee: &str) -> Result<(), ProviderError> {
        if self.roles.contains_key(grantee) {
            Ok(())
        } else {
            Err(invalid(format!("Role {} doesn't exist", grantee)))
        }
    }

    /// Tables and functions are not tracked, only their keyspace.
    fn check_target(&self, target: &GrantTarget) -> Result<(), ProviderError> {
        match target.keyspace() {
            Some(keyspace) if !self.keyspaces.contains_key(keyspace) => Err(invalid(format!(
                "Resource <keyspace {}> doesn't exist",
                keyspace
            ))),
            _ => Ok(()),
        }
    }

    fn permissions(
        &self,
        grantee: &str,
        target: &GrantTarget,
    ) -> Result<BTreeSet<String>, ProviderError> {
        self.check_grantee(grantee)?;
        self.check_target(target)?;
        Ok(self
            .permissions
            .get(&permission_key(grantee, target))
            .cloned()
            .unwrap_or_default())
    }
}

fn keyspace_row(spec: &KeyspaceSpec) -> Result<KeyspaceRow, ProviderError> {
    let has_factor = spec.options.contains_key("replication_factor");
    match spec.strategy {
        ReplicationStrategy::NetworkTopologyStrategy if has_factor => {
            return Err(invalid(
                "replication_factor is an option for SimpleStrategy, not NetworkTopologyStrategy",
            ));
        },
        ReplicationStrategy::SimpleStrategy if !has_factor => {
            return Err(invalid(
                "SimpleStrategy requires a replication_factor strategy option.",
            ));
        },
        _ => {},
    }

    let mut replication = spec.options.clone();
    replication.insert(
        "class".to_string(),
        format!("{}{}", LOCATOR_PREFIX, spec.strategy.as_str()),
    );
    Ok(KeyspaceRow {
        name: spec.name.clone(),
        durable_writes: spec.durable_writes,
        replication,
    })
}

fn role_row(spec: &RoleSpec) -> Result<RoleRow, ProviderError> {
    let hash = bcrypt::hash(spec.password.expose(), HASH_COST)
        .map_err(|e| invalid(format!("unable to hash password: {}", e)))?;
    Ok(RoleRow {
        name: spec.name.clone(),
        can_login: spec.login,
        is_superuser: spec.super_user,
        salted_hash: Some(hash),
    })
}

fn permission_key(grantee: &str, target: &GrantTarget) -> (String, GrantTarget) {
    (grantee.to_string(), target.clone())
}

fn expanded(spec: &GrantSpec) -> impl Iterator<Item = String> {
    spec.privilege
        .expand(&spec.target)
        .into_iter()
        .map(str::to_string)
}

#[async_trait]
impl Cluster for MemoryCluster {
    async fn session(&self) -> Result<Box<dyn CqlSession>, ProviderError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            catalog: Arc::clone(&self.catalog),
        }))
    }
}

struct MemorySession {
    catalog: Arc<Mutex<Catalog>>,
}

impl MemorySession {
    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CqlSession for MemorySession {
    async fn execute(&self, statement: &Statement) -> Result<(), ProviderError> {
        let mut catalog = self.lock();
        catalog.apply(statement)?;
        catalog.statements.push(statement.redacted());
        Ok(())
    }

    async fn keyspace(&self, name: &str) -> Result<Option<KeyspaceRow>, ProviderError> {
        Ok(self.lock().keyspaces.get(name).cloned())
    }

    async fn role(&self, name: &str) -> Result<Option<RoleRow>, ProviderError> {
        Ok(self.lock().roles.get(name).cloned())
    }

    async fn permissions(
        &self,
        grantee: &str,
        target: &GrantTarget,
    ) -> Result<BTreeSet<String>, ProviderError> {
        self.lock().permissions(grantee, target)
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use crate::resources::grant::Privilege;
    use serde_json::json;

    fn keyspace_spec(strategy: ReplicationStrategy, options: &[(&str, &str)]) -> KeyspaceSpec {
        KeyspaceSpec {
            name: "ks".to_string(),
            strategy,
            options: options
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            durable_writes: true,
        }
    }

    fn role_spec(name: &str) -> RoleSpec {
        RoleSpec {
            name: name.to_string(),
            password: Secret::new("pw"),
            login: true,
            super_user: false,
        }
    }

    #[test]
    fn test_memory_cluster_keyspaces() {
        let cluster = MemoryCluster::default();
        let spec =
            keyspace_spec(ReplicationStrategy::SimpleStrategy, &[("replication_factor", "1")]);
        cluster.apply(&Statement::CreateKeyspace(spec.clone())).unwrap();

        let row = cluster.keyspace("ks").unwrap();
        assert_eq!(
            row.replication["class"],
            "org.apache.cassandra.locator.SimpleStrategy"
        );
        assert!(cluster.apply(&Statement::CreateKeyspace(spec)).is_err());

        cluster.apply(&Statement::DropKeyspace("ks".to_string())).unwrap();
        assert!(cluster.keyspace("ks").is_none());
        assert_eq!(cluster.statements().len(), 2);
    }

    #[test]
    fn test_memory_cluster_rejects_misplaced_replication_factor() {
        let cluster = MemoryCluster::default();
        let err = cluster
            .apply(&Statement::CreateKeyspace(keyspace_spec(
                ReplicationStrategy::NetworkTopologyStrategy,
                &[("replication_factor", "1")],
            )))
            .unwrap_err();
        assert!(err
            .message()
            .contains("replication_factor is an option for SimpleStrategy, not NetworkTopologyStrategy"));
    }

    #[test]
    fn test_memory_cluster_roles_and_grants() {
        let cluster = MemoryCluster::default();
        let grant = GrantSpec {
            privilege: Privilege::Select,
            target: GrantTarget::Keyspace {
                keyspace: "ks".to_string(),
            },
            grantee: "app".to_string(),
        };
        assert!(cluster.apply(&Statement::Grant(grant.clone())).is_err());

        cluster.apply(&Statement::CreateRole(role_spec("app"))).unwrap();
        let row = cluster.role("app").unwrap();
        assert!(bcrypt::verify("pw", row.salted_hash.as_deref().unwrap()).unwrap());

        let err = cluster.apply(&Statement::Grant(grant.clone())).unwrap_err();
        assert_eq!(err.message(), "Resource <keyspace ks> doesn't exist");

        let keyspace =
            keyspace_spec(ReplicationStrategy::SimpleStrategy, &[("replication_factor", "1")]);
        cluster.apply(&Statement::CreateKeyspace(keyspace)).unwrap();
        cluster.apply(&Statement::Grant(grant.clone())).unwrap();
        cluster.apply(&Statement::Revoke(grant)).unwrap();
        cluster.apply(&Statement::DropRole("app".to_string())).unwrap();
        assert!(cluster.statements().iter().all(|s| !s.contains("'pw'")));
    }

    #[tokio::test]
    async fn test_sessions_are_counted() {
        let cluster = MemoryCluster::shared();
        let session = cluster.session().await.unwrap();
        assert!(session.keyspace("ks").await.unwrap().is_none());
        let _ = cluster.session().await.unwrap();
        assert_eq!(cluster.sessions(), 2);
    }

    #[tokio::test]
    async fn test_tester_keyspace_lifecycle() {
        let cluster = MemoryCluster::shared();
        let tester = ProviderTester::new(cluster.provider());
        tester
            .configure(json!({"hosts": ["127.0.0.1"], "port": 9042}))
            .await
            .unwrap();
        assert_eq!(
            tester.resource_types(),
            vec!["cassandra_grant", "cassandra_keyspace", "cassandra_role"]
        );

        let config = json!({
            "name": "ks",
            "replication_strategy": "SimpleStrategy",
            "strategy_options": {"replication_factor": "1"}
        });
        let plan = tester.plan_create("cassandra_keyspace", config.clone()).await.unwrap();
        assert_plan_creates(&plan);

        let state = tester
            .lifecycle_create("cassandra_keyspace", config.clone())
            .await
            .unwrap();
        assert_eq!(state["id"], "ks");

        let plan = tester
            .plan_update("cassandra_keyspace", state.clone(), config)
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        tester
            .lifecycle_delete("cassandra_keyspace", state.clone())
            .await
            .unwrap();
        assert!(tester.read("cassandra_keyspace", state).await.unwrap().is_null());
    }

    #[tokio::test]
    async fn test_tester_reports_configuration_diagnostics() {
        let tester = ProviderTester::new(MemoryCluster::shared().provider());
        let err = tester
            .configure(json!({"hosts": ["127.0.0.1"], "port": 0}))
            .await
            .unwrap_err();
        assert_error_contains(err.diagnostics(), "Invalid port number");
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("Invalid port number").with_attribute("port"),
            Diagnostic::error("Invalid TLS").with_detail("TLS9: invalid value"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("Invalid port number"));
        assert!(display.contains("(at port)"));
        assert!(display.contains("TLS9: invalid value"));
    }
}
