//! CQL statements issued by the resources.
//!
//! Statements are built as values and rendered through [`std::fmt::Display`],
//! so the text sent to Cassandra can be checked without a cluster and a test
//! cluster can interpret the statement instead of parsing CQL.

use std::fmt;

use crate::resources::grant::{GrantSpec, GrantTarget};
use crate::resources::keyspace::KeyspaceSpec;
use crate::resources::role::RoleSpec;

/// Replacement text for passwords in logged statements.
const REDACTED: &str = "'********'";

/// A schema or access-control statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `CREATE KEYSPACE`
    CreateKeyspace(KeyspaceSpec),
    /// `ALTER KEYSPACE`
    AlterKeyspace(KeyspaceSpec),
    /// `DROP KEYSPACE`
    DropKeyspace(String),
    /// `CREATE ROLE`
    CreateRole(RoleSpec),
    /// `ALTER ROLE`
    AlterRole(RoleSpec),
    /// `DROP ROLE`
    DropRole(String),
    /// `GRANT`
    Grant(GrantSpec),
    /// `REVOKE`
    Revoke(GrantSpec),
}

impl Statement {
    /// The statement text with any password replaced, for logging.
    pub fn redacted(&self) -> String {
        match self {
            Self::CreateRole(spec) => role_statement("CREATE", spec, REDACTED),
            Self::AlterRole(spec) => role_statement("ALTER", spec, REDACTED),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateKeyspace(spec) => f.write_str(&keyspace_statement("CREATE", spec)),
            Self::AlterKeyspace(spec) => f.write_str(&keyspace_statement("ALTER", spec)),
            Self::DropKeyspace(name) => write!(f, "DROP KEYSPACE {}", quote_identifier(name)),
            Self::CreateRole(spec) => {
                f.write_str(&role_statement("CREATE", spec, &quote_literal(spec.password.expose())))
            },
            Self::AlterRole(spec) => {
                f.write_str(&role_statement("ALTER", spec, &quote_literal(spec.password.expose())))
            },
            Self::DropRole(name) => write!(f, "DROP ROLE {}", quote_literal(name)),
            Self::Grant(spec) => write!(
                f,
                "GRANT {} ON {} TO {}",
                spec.privilege.cql(),
                spec.target.clause(),
                quote_identifier(&spec.grantee)
            ),
            Self::Revoke(spec) => write!(
                f,
                "REVOKE {} ON {} FROM {}",
                spec.privilege.cql(),
                spec.target.clause(),
                quote_identifier(&spec.grantee)
            ),
        }
    }
}

fn keyspace_statement(action: &str, spec: &KeyspaceSpec) -> String {
    let mut cql = format!(
        "{} KEYSPACE {} WITH REPLICATION = {{ 'class' : {}",
        action,
        quote_identifier(&spec.name),
        quote_literal(spec.strategy.as_str())
    );
    for (key, value) in &spec.options {
        cql.push_str(&format!(", {} : {}", quote_literal(key), quote_literal(value)));
    }
    cql.push_str(&format!(" }} AND DURABLE_WRITES = {}", spec.durable_writes));
    cql
}

fn role_statement(action: &str, spec: &RoleSpec, password: &str) -> String {
    format!(
        "{} ROLE {} WITH PASSWORD = {} AND LOGIN = {} AND SUPERUSER = {}",
        action,
        quote_literal(&spec.name),
        password,
        spec.login,
        spec.super_user
    )
}

/// `LIST ALL PERMISSIONS` query for one grantee on one resource.
pub fn list_permissions(grantee: &str, target: &GrantTarget) -> String {
    format!(
        "LIST ALL PERMISSIONS ON {} OF {} NORECURSIVE",
        target.clause(),
        quote_identifier(grantee)
    )
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote an identifier so its case is preserved, doubling embedded double quotes.
pub fn quote_identifier(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
