//! `cassandra_role`: a role using Cassandra internal authentication.
//!
//! Cassandra only stores a bcrypt hash of the password. A read keeps the
//! declared password while it still matches that hash and otherwise stores
//! the hash itself, which the host then reports as a change.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use super::{ensure_valid, from_state, pattern, to_state, Resource};
use crate::cluster::{open_session, Cluster, RoleRow};
use crate::config::Secret;
use crate::cql::Statement;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Resource type name.
pub const TYPE_NAME: &str = "cassandra_role";

/// A role definition ready to be rendered as CQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    /// Role name.
    pub name: String,
    /// Plaintext password.
    pub password: Secret,
    /// Whether the role may log in.
    pub login: bool,
    /// Whether the role is a superuser.
    pub super_user: bool,
}

fn default_login() -> bool {
    true
}

/// Role attributes as stored by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleState {
    /// Same as `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Role name.
    #[serde(default)]
    pub name: String,
    /// Whether the role is a superuser.
    #[serde(default)]
    pub super_user: bool,
    /// Whether the role may log in.
    #[serde(default = "default_login")]
    pub login: bool,
    /// Declared password, or the stored hash once they diverge.
    #[serde(default)]
    pub password: Secret,
}

impl RoleState {
    fn identity(&self) -> &str {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.name)
    }

    fn spec(&self) -> Result<RoleSpec, ProviderError> {
        ensure_valid(check(self))?;
        Ok(RoleSpec {
            name: self.name.clone(),
            password: self.password.clone(),
            login: self.login,
            super_user: self.super_user,
        })
    }

    /// State for a role row, given the password the host last knew.
    fn from_row(row: RoleRow, known_password: &Secret) -> Self {
        let hash = row.salted_hash.unwrap_or_default();
        let password = if password_matches(known_password.expose(), &hash) {
            known_password.clone()
        } else {
            debug!(role = %row.name, "Stored password hash differs from the declared password");
            Secret::new(hash)
        };

        Self {
            id: Some(row.name.clone()),
            name: row.name,
            super_user: row.is_superuser,
            login: row.can_login,
            password,
        }
    }
}

fn password_matches(password: &str, hash: &str) -> bool {
    !password.is_empty() && bcrypt::verify(password, hash).unwrap_or(false)
}

/// Check a role name: 1 to 256 characters without double quotes.
pub fn validate_name(name: &str) -> Option<Diagnostic> {
    if pattern!(r#"^[^"]{1,256}$"#).is_match(name) {
        return None;
    }
    Some(
        Diagnostic::error("Invalid role name")
            .with_detail("name must contain between 1 and 256 chars and must not contain double quote character")
            .with_attribute("name"),
    )
}

/// Check a password: 1 to 512 characters without double quotes.
pub fn validate_password(password: &str) -> Option<Diagnostic> {
    if pattern!(r#"^[^"]{1,512}$"#).is_match(password) {
        return None;
    }
    Some(
        Diagnostic::error("Invalid password")
            .with_detail("password must contain between 1 and 512 chars and must not contain double quote character")
            .with_attribute("password"),
    )
}

fn check(state: &RoleState) -> Vec<Diagnostic> {
    validate_name(&state.name)
        .into_iter()
        .chain(validate_password(state.password.expose()))
        .collect()
}

async fn read_role(
    cluster: &dyn Cluster,
    name: &str,
    known_password: &Secret,
) -> Result<Option<RoleState>, ProviderError> {
    let session = open_session(cluster).await?;
    let row = session.role(name).await?;
    Ok(row.map(|row| RoleState::from_row(row, known_password)))
}

async fn write_role(cluster: &dyn Cluster, statement: Statement) -> Result<(), ProviderError> {
    let session = open_session(cluster).await?;
    session.execute(&statement).await
}

async fn read_back(cluster: &dyn Cluster, spec: &RoleSpec) -> Result<Value, ProviderError> {
    match read_role(cluster, &spec.name, &spec.password).await? {
        Some(state) => to_state(&state),
        None => Err(ProviderError::NotFound(format!(
            "role {} is missing after it was written",
            spec.name
        ))),
    }
}

/// The `cassandra_role` resource.
pub struct RoleResource;

#[async_trait]
impl Resource for RoleResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A Cassandra role")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name of role - must contain between 1 and 256 characters")
                    .with_force_new(),
            )
            .with_attribute(
                "super_user",
                Attribute::optional_bool()
                    .with_default(json!(false))
                    .with_description("Allow role to create and manage other roles"),
            )
            .with_attribute(
                "login",
                Attribute::optional_bool()
                    .with_default(json!(true))
                    .with_description("Enables role to be able to login"),
            )
            .with_attribute(
                "password",
                Attribute::required_string()
                    .with_description("Password for user when using Cassandra internal authentication")
                    .sensitive(),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        match serde_json::from_value::<RoleState>(config.clone()) {
            Ok(state) => check(&state),
            Err(_) => Vec::new(),
        }
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn create(&self, cluster: &dyn Cluster, planned: Value) -> Result<Value, ProviderError> {
        let spec = from_state::<RoleState>(planned)?.spec()?;
        write_role(cluster, Statement::CreateRole(spec.clone())).await?;
        info!(role = %spec.name, "Created role");
        read_back(cluster, &spec).await
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn read(&self, cluster: &dyn Cluster, current: Value) -> Result<Value, ProviderError> {
        let state: RoleState = from_state(current)?;
        let name = state.identity().to_string();

        match read_role(cluster, &name, &state.password).await? {
            Some(state) => to_state(&state),
            None => {
                info!(role = %name, "Role not found");
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
        let spec = from_state::<RoleState>(planned)?.spec()?;
        write_role(cluster, Statement::AlterRole(spec.clone())).await?;
        info!(role = %spec.name, "Altered role");
        read_back(cluster, &spec).await
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn delete(&self, cluster: &dyn Cluster, current: Value) -> Result<(), ProviderError> {
        let state: RoleState = from_state(current)?;
        let name = state.identity().to_string();
        write_role(cluster, Statement::DropRole(name.clone())).await?;
        info!(role = %name, "Dropped role");
        Ok(())
    }

    fn import(&self, id: &str) -> Result<Value, ProviderError> {
        ensure_valid(validate_name(id).into_iter().collect())?;
        Ok(json!({ "id": id, "name": id }))
    }
}
