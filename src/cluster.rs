//! Cluster handle and CQL sessions.
//!
//! `configure` builds one [`Cluster`] and every resource operation opens a
//! fresh [`CqlSession`] from it, runs its statements and drops it. The traits
//! keep the resources independent of the driver; [`ScyllaCluster`] is the
//! implementation backed by the `scylla` driver.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use openssl::ssl::{SslContext, SslContextBuilder, SslMethod, SslVerifyMode};
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::policies::host_filter::AllowListHostFilter;
use tracing::{debug, instrument};

use crate::config::{parse_root_ca, ClusterConfig, TlsConfig};
use crate::cql::{self, Statement};
use crate::error::ProviderError;
use crate::resources::grant::GrantTarget;

/// Keyspace sessions are bound to.
pub const SESSION_KEYSPACE: &str = "system";

const SELECT_KEYSPACE: &str =
    "SELECT keyspace_name, durable_writes, replication FROM system_schema.keyspaces WHERE keyspace_name = ?";

const SELECT_ROLE: &str =
    "SELECT role, can_login, is_superuser, salted_hash FROM system_auth.roles WHERE role = ?";

/// A row of `system_schema.keyspaces`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceRow {
    /// Keyspace name.
    pub name: String,
    /// Whether writes go through the commit log.
    pub durable_writes: bool,
    /// Replication map, including its `class` entry.
    pub replication: BTreeMap<String, String>,
}

/// A row of `system_auth.roles`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRow {
    /// Role name.
    pub name: String,
    /// Whether the role may log in.
    pub can_login: bool,
    /// Whether the role is a superuser.
    pub is_superuser: bool,
    /// bcrypt hash of the password, absent for roles without one.
    pub salted_hash: Option<String>,
}

/// Connection factory shared by all resource operations.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Open a new session.
    async fn session(&self) -> Result<Box<dyn CqlSession>, ProviderError>;
}

/// An open CQL session.
#[async_trait]
pub trait CqlSession: Send + Sync {
    /// Run a schema or access-control statement.
    async fn execute(&self, statement: &Statement) -> Result<(), ProviderError>;

    /// Look up a keyspace by exact name.
    async fn keyspace(&self, name: &str) -> Result<Option<KeyspaceRow>, ProviderError>;

    /// Look up a role by exact name.
    async fn role(&self, name: &str) -> Result<Option<RoleRow>, ProviderError>;

    /// Permission names (e.g. `SELECT`) held directly by `grantee` on `target`.
    ///
    /// Cassandra answers with a "doesn't exist" query error when the grantee
    /// or the resource is gone.
    async fn permissions(
        &self,
        grantee: &str,
        target: &GrantTarget,
    ) -> Result<BTreeSet<String>, ProviderError>;
}

/// Open a session, logging how long it took.
pub async fn open_session(cluster: &dyn Cluster) -> Result<Box<dyn CqlSession>, ProviderError> {
    let start = Instant::now();
    let session = cluster.session().await?;
    debug!(elapsed = ?start.elapsed(), "Getting a session took");
    Ok(session)
}

/// Build the OpenSSL context for a TLS connection.
///
/// The peer certificate is always verified, against `root_ca` when given and
/// the system trust store otherwise.
pub fn tls_context(tls: &TlsConfig) -> Result<SslContext, ProviderError> {
    let mut builder = SslContextBuilder::new(SslMethod::tls())?;
    builder.set_min_proto_version(Some(tls.min_version.ssl_version()))?;
    match &tls.root_ca {
        Some(pem) => {
            for cert in parse_root_ca(pem)? {
                builder.cert_store_mut().add_cert(cert)?;
            }
        },
        None => builder.set_default_verify_paths()?,
    }
    builder.set_verify(SslVerifyMode::PEER);
    Ok(builder.build())
}

/// [`Cluster`] backed by the `scylla` driver.
pub struct ScyllaCluster {
    config: ClusterConfig,
    tls: Option<SslContext>,
}

impl ScyllaCluster {
    /// Prepare a cluster handle. No connection is made until a session is opened.
    pub fn new(config: ClusterConfig) -> Result<Self, ProviderError> {
        let tls = config.tls.as_ref().map(tls_context).transpose()?;
        Ok(Self { config, tls })
    }

    fn builder(&self) -> Result<SessionBuilder, ProviderError> {
        let profile = ExecutionProfile::builder()
            .request_timeout(Some(self.config.request_timeout))
            .build();

        let mut builder = SessionBuilder::new()
            .known_nodes(self.config.contact_points())
            .connection_timeout(self.config.connection_timeout)
            .default_execution_profile_handle(profile.into_handle())
            .use_keyspace(SESSION_KEYSPACE, false)
            .tls_context(self.tls.clone());

        if !self.config.username.is_empty() {
            builder = builder.user(
                self.config.username.as_str(),
                self.config.password.expose(),
            );
        }

        if self.config.host_filter {
            let filter = AllowListHostFilter::new(self.config.contact_points()).map_err(|e| {
                ProviderError::Session(format!("unable to resolve hosts for host filter: {}", e))
            })?;
            builder = builder.host_filter(Arc::new(filter));
        }

        Ok(builder)
    }
}

#[async_trait]
impl Cluster for ScyllaCluster {
    #[instrument(skip(self), fields(hosts = ?self.config.hosts))]
    async fn session(&self) -> Result<Box<dyn CqlSession>, ProviderError> {
        let session = self.builder()?.build().await?;
        Ok(Box::new(ScyllaSession { session }))
    }
}

struct ScyllaSession {
    session: Session,
}

fn decode_error(err: impl std::fmt::Display) -> ProviderError {
    ProviderError::Decode(err.to_string())
}

#[async_trait]
impl CqlSession for ScyllaSession {
    async fn execute(&self, statement: &Statement) -> Result<(), ProviderError> {
        debug!(cql = %statement.redacted(), "Executing statement");
        self.session
            .query_unpaged(statement.to_string(), &[])
            .await?;
        Ok(())
    }

    async fn keyspace(&self, name: &str) -> Result<Option<KeyspaceRow>, ProviderError> {
        let rows = self
            .session
            .query_unpaged(SELECT_KEYSPACE, (name,))
            .await?
            .into_rows_result()
            .map_err(decode_error)?;
        let row = rows
            .maybe_first_row::<(String, Option<bool>, Option<BTreeMap<String, String>>)>()
            .map_err(decode_error)?;

        Ok(row.map(|(name, durable_writes, replication)| KeyspaceRow {
            name,
            durable_writes: durable_writes.unwrap_or(true),
            replication: replication.unwrap_or_default(),
        }))
    }

    async fn role(&self, name: &str) -> Result<Option<RoleRow>, ProviderError> {
        let rows = self
            .session
            .query_unpaged(SELECT_ROLE, (name,))
            .await?
            .into_rows_result()
            .map_err(decode_error)?;
        let row = rows
            .maybe_first_row::<(String, Option<bool>, Option<bool>, Option<String>)>()
            .map_err(decode_error)?;

        Ok(row.map(|(name, can_login, is_superuser, salted_hash)| RoleRow {
            name,
            can_login: can_login.unwrap_or(false),
            is_superuser: is_superuser.unwrap_or(false),
            salted_hash,
        }))
    }

    async fn permissions(
        &self,
        grantee: &str,
        target: &GrantTarget,
    ) -> Result<BTreeSet<String>, ProviderError> {
        let cql = cql::list_permissions(grantee, target);
        debug!(cql = %cql, "Listing permissions");

        let result = self.session.query_unpaged(cql, &[]).await?;

        let rows = result.into_rows_result().map_err(decode_error)?;
        let mut permissions = BTreeSet::new();
        for row in rows
            .rows::<(Option<String>, Option<String>, Option<String>, String)>()
            .map_err(decode_error)?
        {
            let (_role, _username, _resource, permission) = row.map_err(decode_error)?;
            permissions.insert(permission.to_uppercase());
        }
        Ok(permissions)
    }
}
