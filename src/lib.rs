//! Cassandra provider plugin
//!
//! Manages Cassandra keyspaces, roles and grants from infrastructure-as-code
//! declarations. The host spawns the provider binary, reads the handshake
//! line from stdout and drives it over gRPC; every lifecycle call is
//! translated into CQL against the configured cluster.
//!
//! # Overview
//!
//! - **Provider configuration** ([`config`]): hosts, credentials, TLS and
//!   timeouts, with `CASSANDRA_*` environment defaults
//! - **Cluster access** ([`cluster`]): one driver session per operation
//! - **CQL rendering** ([`cql`]): the statements each resource issues
//! - **Resources** ([`resources`]): `cassandra_keyspace`, `cassandra_role`
//!   and `cassandra_grant`
//! - **Server** ([`server`]): the `plugin.v1.Provider` gRPC service and the
//!   handshake
//!
//! # Quick Start
//!
//! ```ignore
//! use terraform_provider_cassandra::{serve, CassandraProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     terraform_provider_cassandra::init_logging();
//!     serve(CassandraProvider::new()).await
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! Once listening, the provider prints one line to stdout:
//!
//! ```text
//! PLUGIN|1|127.0.0.1:50051
//! ```
//!
//! Format: `PLUGIN|<protocol_version>|<address>`
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: resource type names
//! - **GetSchema**: schemas of the provider block and every resource
//! - **ValidateProviderConfig**: checks the provider block without connecting
//! - **Configure**: builds the cluster handle
//! - **Stop**: releases the cluster handle
//! - **ValidateResourceConfig**: checks a resource block without connecting
//! - **Plan**: computes the planned state and whether it forces replacement
//! - **Create/Read/Update/Delete**: CQL lifecycle; an empty Read state means
//!   the resource is gone
//! - **ImportResourceState**: skeleton state from a resource id

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cluster;
pub mod config;
pub mod cql;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use cluster::{Cluster, CqlSession, ScyllaCluster};
pub use config::{ClusterConfig, ProviderConfig};
pub use error::ProviderError;
pub use logging::{init_logging, try_init_logging};
pub use provider::CassandraProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX,
    PROTOCOL_VERSION,
};
pub use validation::validate;
