//! `cassandra_grant`: one privilege on one resource for one role.
//!
//! Grants are immutable. Changing any attribute replaces the grant, so
//! update is never planned.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{ensure_valid, from_state, pattern, role, to_state, Resource};
use crate::cluster::{open_session, Cluster};
use crate::cql::{quote_identifier, quote_literal, Statement};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Resource type name.
pub const TYPE_NAME: &str = "cassandra_grant";

/// Separator between the parts of a grant id.
pub const ID_SEPARATOR: &str = "|";

/// A permission that can be granted.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    /// Every permission applicable to the resource.
    All,
    Alter,
    Authorize,
    Create,
    Describe,
    Drop,
    Execute,
    Modify,
    Select,
}

use Privilege::{All, Alter, Authorize, Create, Describe, Drop, Execute, Modify, Select};

const FUNCTIONS: &[Privilege] = &[All, Create, Alter, Drop, Authorize, Execute];
const FUNCTION: &[Privilege] = &[All, Alter, Drop, Authorize, Execute];
const KEYSPACES: &[Privilege] = &[All, Create, Alter, Drop, Select, Modify, Authorize];
const TABLE: &[Privilege] = &[All, Alter, Drop, Select, Modify, Authorize];
const ALL_ROLES: &[Privilege] = &[All, Create, Alter, Drop, Authorize, Describe];
const ROLE: &[Privilege] = &[All, Alter, Drop, Authorize];
const MBEANS: &[Privilege] = &[All, Select, Modify, Describe, Authorize];

impl Privilege {
    /// Every privilege, in configuration spelling.
    pub const NAMES: [&'static str; 9] = [
        "all", "alter", "authorize", "create", "describe", "drop", "execute", "modify", "select",
    ];

    /// Configuration spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            All => "all",
            Alter => "alter",
            Authorize => "authorize",
            Create => "create",
            Describe => "describe",
            Drop => "drop",
            Execute => "execute",
            Modify => "modify",
            Select => "select",
        }
    }

    /// Name Cassandra reports when listing permissions.
    pub fn permission(&self) -> &'static str {
        match self {
            All => "ALL",
            Alter => "ALTER",
            Authorize => "AUTHORIZE",
            Create => "CREATE",
            Describe => "DESCRIBE",
            Drop => "DROP",
            Execute => "EXECUTE",
            Modify => "MODIFY",
            Select => "SELECT",
        }
    }

    /// Text used in `GRANT` and `REVOKE`.
    pub fn cql(&self) -> &'static str {
        match self {
            All => "ALL PERMISSIONS",
            other => other.permission(),
        }
    }

    /// Permissions held once this privilege is granted on `target`.
    pub fn expand(&self, target: &GrantTarget) -> Vec<&'static str> {
        match self {
            All => target
                .privileges()
                .iter()
                .filter(|p| **p != All)
                .map(Privilege::permission)
                .collect(),
            other => vec![other.permission()],
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privilege {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "all" => All,
            "alter" => Alter,
            "authorize" => Authorize,
            "create" => Create,
            "describe" => Describe,
            "drop" => Drop,
            "execute" => Execute,
            "modify" => Modify,
            "select" => Select,
            other => {
                return Err(ProviderError::Validation(format!(
                    "{}: invalid privilege - must be one of {}",
                    other,
                    Self::NAMES.join(", ")
                )))
            },
        })
    }
}

/// The resource a grant applies to.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GrantTarget {
    AllFunctions,
    AllFunctionsInKeyspace { keyspace: String },
    /// `function` is the signature, e.g. `avg(int)`.
    Function { keyspace: String, function: String },
    AllKeyspaces,
    Keyspace { keyspace: String },
    Table { keyspace: String, table: String },
    AllRoles,
    Role { role: String },
    AllMbeans,
    Mbean { name: String },
    Mbeans { pattern: String },
}

/// Attributes naming the target, in id order.
const NAME_ATTRIBUTES: [&str; 6] = [
    "keyspace_name",
    "function_name",
    "table_name",
    "role_name",
    "mbean_name",
    "mbean_pattern",
];

/// Every `resource_type` value.
pub const RESOURCE_TYPES: [&str; 11] = [
    "all_functions",
    "all_functions_in_keyspace",
    "function",
    "all_keyspaces",
    "keyspace",
    "table",
    "all_roles",
    "role",
    "all_mbeans",
    "mbean",
    "mbeans",
];

/// Name attributes a resource type needs, `None` for unknown types.
fn required_attributes(resource_type: &str) -> Option<&'static [&'static str]> {
    Some(match resource_type {
        "all_functions" | "all_keyspaces" | "all_roles" | "all_mbeans" => &[],
        "all_functions_in_keyspace" | "keyspace" => &["keyspace_name"],
        "function" => &["keyspace_name", "function_name"],
        "table" => &["keyspace_name", "table_name"],
        "role" => &["role_name"],
        "mbean" => &["mbean_name"],
        "mbeans" => &["mbean_pattern"],
        _ => return None,
    })
}

impl GrantTarget {
    /// The `resource_type` value for this target.
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::AllFunctions => "all_functions",
            Self::AllFunctionsInKeyspace { .. } => "all_functions_in_keyspace",
            Self::Function { .. } => "function",
            Self::AllKeyspaces => "all_keyspaces",
            Self::Keyspace { .. } => "keyspace",
            Self::Table { .. } => "table",
            Self::AllRoles => "all_roles",
            Self::Role { .. } => "role",
            Self::AllMbeans => "all_mbeans",
            Self::Mbean { .. } => "mbean",
            Self::Mbeans { .. } => "mbeans",
        }
    }

    /// Keyspace the target lives in, if it is scoped to one.
    pub fn keyspace(&self) -> Option<&str> {
        match self {
            Self::AllFunctionsInKeyspace { keyspace }
            | Self::Function { keyspace, .. }
            | Self::Keyspace { keyspace }
            | Self::Table { keyspace, .. } => Some(keyspace),
            _ => None,
        }
    }

    /// Resource clause of `GRANT ... ON <clause>`.
    pub fn clause(&self) -> String {
        match self {
            Self::AllFunctions => "ALL FUNCTIONS".to_string(),
            Self::AllFunctionsInKeyspace { keyspace } => {
                format!("ALL FUNCTIONS IN KEYSPACE {}", quote_identifier(keyspace))
            },
            Self::Function { keyspace, function } => {
                format!("FUNCTION {}.{}", quote_identifier(keyspace), function)
            },
            Self::AllKeyspaces => "ALL KEYSPACES".to_string(),
            Self::Keyspace { keyspace } => format!("KEYSPACE {}", quote_identifier(keyspace)),
            Self::Table { keyspace, table } => format!(
                "TABLE {}.{}",
                quote_identifier(keyspace),
                quote_identifier(table)
            ),
            Self::AllRoles => "ALL ROLES".to_string(),
            Self::Role { role } => format!("ROLE {}", quote_identifier(role)),
            Self::AllMbeans => "ALL MBEANS".to_string(),
            Self::Mbean { name } => format!("MBEAN {}", quote_literal(name)),
            Self::Mbeans { pattern } => format!("MBEANS {}", quote_literal(pattern)),
        }
    }

    /// Privileges that may be granted on this target.
    pub fn privileges(&self) -> &'static [Privilege] {
        match self {
            Self::AllFunctions | Self::AllFunctionsInKeyspace { .. } => FUNCTIONS,
            Self::Function { .. } => FUNCTION,
            Self::AllKeyspaces | Self::Keyspace { .. } => KEYSPACES,
            Self::Table { .. } => TABLE,
            Self::AllRoles => ALL_ROLES,
            Self::Role { .. } => ROLE,
            Self::AllMbeans | Self::Mbean { .. } | Self::Mbeans { .. } => MBEANS,
        }
    }

    fn names(&self) -> Vec<&str> {
        match self {
            Self::AllFunctions | Self::AllKeyspaces | Self::AllRoles | Self::AllMbeans => vec![],
            Self::AllFunctionsInKeyspace { keyspace } | Self::Keyspace { keyspace } => {
                vec![keyspace.as_str()]
            },
            Self::Function { keyspace, function } => vec![keyspace.as_str(), function.as_str()],
            Self::Table { keyspace, table } => vec![keyspace.as_str(), table.as_str()],
            Self::Role { role } => vec![role.as_str()],
            Self::Mbean { name } => vec![name.as_str()],
            Self::Mbeans { pattern } => vec![pattern.as_str()],
        }
    }
}

/// A grant ready to be rendered as CQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantSpec {
    /// What is granted.
    pub privilege: Privilege,
    /// What it is granted on.
    pub target: GrantTarget,
    /// Role receiving the privilege.
    pub grantee: String,
}

impl GrantSpec {
    /// `<grantee>|<privilege>|<resource_type>[|<name>...]`
    pub fn id(&self) -> String {
        let mut parts = vec![
            self.grantee.as_str(),
            self.privilege.as_str(),
            self.target.resource_type(),
        ];
        parts.extend(self.target.names());
        parts.join(ID_SEPARATOR)
    }
}

/// Grant attributes as stored by the host.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub privilege: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub grantee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyspace_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbean_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbean_pattern: Option<String>,
}

impl GrantState {
    fn attribute(&self, name: &str) -> Option<&str> {
        let value = match name {
            "keyspace_name" => &self.keyspace_name,
            "function_name" => &self.function_name,
            "table_name" => &self.table_name,
            "role_name" => &self.role_name,
            "mbean_name" => &self.mbean_name,
            "mbean_pattern" => &self.mbean_pattern,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    fn set_attribute(&mut self, name: &str, value: String) {
        let slot = match name {
            "keyspace_name" => &mut self.keyspace_name,
            "function_name" => &mut self.function_name,
            "table_name" => &mut self.table_name,
            "role_name" => &mut self.role_name,
            "mbean_name" => &mut self.mbean_name,
            "mbean_pattern" => &mut self.mbean_pattern,
            _ => return,
        };
        *slot = Some(value);
    }

    fn target(&self) -> Option<GrantTarget> {
        let name = |attribute| self.attribute(attribute).map(str::to_string);
        Some(match self.resource_type.as_str() {
            "all_functions" => GrantTarget::AllFunctions,
            "all_functions_in_keyspace" => GrantTarget::AllFunctionsInKeyspace {
                keyspace: name("keyspace_name")?,
            },
            "function" => GrantTarget::Function {
                keyspace: name("keyspace_name")?,
                function: name("function_name")?,
            },
            "all_keyspaces" => GrantTarget::AllKeyspaces,
            "keyspace" => GrantTarget::Keyspace {
                keyspace: name("keyspace_name")?,
            },
            "table" => GrantTarget::Table {
                keyspace: name("keyspace_name")?,
                table: name("table_name")?,
            },
            "all_roles" => GrantTarget::AllRoles,
            "role" => GrantTarget::Role {
                role: name("role_name")?,
            },
            "all_mbeans" => GrantTarget::AllMbeans,
            "mbean" => GrantTarget::Mbean {
                name: name("mbean_name")?,
            },
            "mbeans" => GrantTarget::Mbeans {
                pattern: name("mbean_pattern")?,
            },
            _ => return None,
        })
    }

    fn spec(&self) -> Result<GrantSpec, ProviderError> {
        ensure_valid(check(self))?;
        let target = self.target().ok_or_else(|| {
            ProviderError::Validation(format!(
                "incomplete grant target for resource_type {}",
                self.resource_type
            ))
        })?;
        Ok(GrantSpec {
            privilege: self.privilege.parse()?,
            target,
            grantee: self.grantee.clone(),
        })
    }

    fn from_spec(spec: &GrantSpec) -> Self {
        let mut state = Self {
            id: Some(spec.id()),
            privilege: spec.privilege.as_str().to_string(),
            resource_type: spec.target.resource_type().to_string(),
            grantee: spec.grantee.clone(),
            ..Default::default()
        };
        let attributes = required_attributes(spec.target.resource_type()).unwrap_or(&[]);
        for (attribute, name) in attributes.iter().zip(spec.target.names()) {
            state.set_attribute(attribute, name.to_string());
        }
        state
    }

    /// Rebuild the attributes from a grant id.
    fn from_id(id: &str) -> Result<Self, ProviderError> {
        let parts: Vec<&str> = id.split(ID_SEPARATOR).collect();
        let invalid = || {
            ProviderError::Validation(format!(
                "{}: grant id must be <grantee>|<privilege>|<resource_type>[|<name>...]",
                id
            ))
        };
        let [grantee, privilege, resource_type, names @ ..] = parts.as_slice() else {
            return Err(invalid());
        };
        let attributes = required_attributes(resource_type).ok_or_else(invalid)?;
        if attributes.len() != names.len() {
            return Err(invalid());
        }

        let mut state = Self {
            privilege: privilege.to_string(),
            resource_type: resource_type.to_string(),
            grantee: grantee.to_string(),
            ..Default::default()
        };
        for (attribute, name) in attributes.iter().zip(names) {
            state.set_attribute(attribute, name.to_string());
        }
        let spec = state.spec()?;
        Ok(Self::from_spec(&spec))
    }
}

fn invalid_identifier(value: &str) -> bool {
    !pattern!(r"^[a-zA-Z0-9][a-zA-Z0-9_]{0,48}$").is_match(value)
}

fn invalid_signature(value: &str) -> bool {
    !pattern!(r"^[a-zA-Z0-9][a-zA-Z0-9_]*\([a-zA-Z0-9_, <>]*\)$").is_match(value)
}

fn check(state: &GrantState) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let privilege = match state.privilege.parse::<Privilege>() {
        Ok(privilege) => Some(privilege),
        Err(err) => {
            diagnostics.push(
                Diagnostic::error("Invalid privilege")
                    .with_detail(err.message())
                    .with_attribute("privilege"),
            );
            None
        },
    };

    if let Some(diagnostic) = role::validate_name(&state.grantee) {
        diagnostics.push(Diagnostic {
            attribute: Some("grantee".to_string()),
            summary: "Invalid grantee".to_string(),
            ..diagnostic
        });
    }

    let Some(required) = required_attributes(&state.resource_type) else {
        diagnostics.push(
            Diagnostic::error("Invalid resource type")
                .with_detail(format!(
                    "{}: invalid resource type - must be one of {}",
                    state.resource_type,
                    RESOURCE_TYPES.join(", ")
                ))
                .with_attribute("resource_type"),
        );
        return diagnostics;
    };

    for attribute in NAME_ATTRIBUTES {
        let needed = required.contains(&attribute);
        match (needed, state.attribute(attribute)) {
            (true, None) => diagnostics.push(
                Diagnostic::error("Missing attribute")
                    .with_detail(format!(
                        "{} is required when resource_type is {}",
                        attribute, state.resource_type
                    ))
                    .with_attribute(attribute),
            ),
            (false, Some(_)) => diagnostics.push(
                Diagnostic::error("Unexpected attribute")
                    .with_detail(format!(
                        "{} cannot be used when resource_type is {}",
                        attribute, state.resource_type
                    ))
                    .with_attribute(attribute),
            ),
            _ => {},
        }
    }

    for attribute in ["keyspace_name", "table_name"] {
        if let Some(value) = state.attribute(attribute).filter(|v| invalid_identifier(v)) {
            diagnostics.push(
                Diagnostic::error("Invalid identifier")
                    .with_detail(format!("{}: not a valid {}", value, attribute))
                    .with_attribute(attribute),
            );
        }
    }
    if let Some(function) = state.attribute("function_name").filter(|v| invalid_signature(v)) {
        diagnostics.push(
            Diagnostic::error("Invalid function signature")
                .with_detail(format!(
                    "{}: function_name must be a signature such as avg(int)",
                    function
                ))
                .with_attribute("function_name"),
        );
    }
    if let Some(role_name) = state.attribute("role_name") {
        if role::validate_name(role_name).is_some() {
            diagnostics.push(
                Diagnostic::error("Invalid role name")
                    .with_detail(format!("{}: not a valid role_name", role_name))
                    .with_attribute("role_name"),
            );
        }
    }

    if let (Some(privilege), Some(target)) = (privilege, state.target()) {
        let allowed = target.privileges();
        if !allowed.contains(&privilege) {
            let names: Vec<&str> = allowed.iter().map(Privilege::as_str).collect();
            diagnostics.push(
                Diagnostic::error("Invalid privilege")
                    .with_detail(format!(
                        "{} cannot be granted on {} - must be one of {}",
                        privilege,
                        target.resource_type(),
                        names.join(", ")
                    ))
                    .with_attribute("privilege"),
            );
        }
    }

    diagnostics
}

fn target_missing(err: &ProviderError) -> bool {
    matches!(err, ProviderError::Query(msg) if msg.contains("doesn't exist"))
}

async fn is_granted(cluster: &dyn Cluster, spec: &GrantSpec) -> Result<bool, ProviderError> {
    let session = open_session(cluster).await?;
    let held = match session.permissions(&spec.grantee, &spec.target).await {
        Ok(held) => held,
        // The grantee or the granted resource is gone, and the grant with it.
        Err(err) if target_missing(&err) => {
            debug!(error = %err, "Permission target missing");
            return Ok(false);
        },
        Err(err) => return Err(err),
    };
    Ok(spec
        .privilege
        .expand(&spec.target)
        .iter()
        .all(|permission| held.contains(*permission)))
}

/// The `cassandra_grant` resource.
pub struct GrantResource;

#[async_trait]
impl Resource for GrantResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let name = |description: &str| {
            Attribute::optional_string()
                .with_description(description)
                .with_force_new()
        };
        Schema::v0()
            .with_description("A privilege granted to a Cassandra role")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "privilege",
                Attribute::required_string()
                    .with_description(format!("One of {}", Privilege::NAMES.join(", ")))
                    .with_force_new(),
            )
            .with_attribute(
                "resource_type",
                Attribute::required_string()
                    .with_description(format!("One of {}", RESOURCE_TYPES.join(", ")))
                    .with_force_new(),
            )
            .with_attribute(
                "grantee",
                Attribute::required_string()
                    .with_description("Role receiving the privilege")
                    .with_force_new(),
            )
            .with_attribute(
                "keyspace_name",
                name("Keyspace, for all_functions_in_keyspace, function, keyspace and table"),
            )
            .with_attribute("function_name", name("Function signature, e.g. avg(int)"))
            .with_attribute("table_name", name("Table name, for table"))
            .with_attribute("role_name", name("Role name, for role"))
            .with_attribute("mbean_name", name("MBean name, for mbean"))
            .with_attribute("mbean_pattern", name("MBean name pattern, for mbeans"))
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        match serde_json::from_value::<GrantState>(config.clone()) {
            Ok(state) => check(&state),
            Err(_) => Vec::new(),
        }
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn create(&self, cluster: &dyn Cluster, planned: Value) -> Result<Value, ProviderError> {
        let spec = from_state::<GrantState>(planned)?.spec()?;

        let session = open_session(cluster).await?;
        session.execute(&Statement::Grant(spec.clone())).await?;
        drop(session);
        info!(grant = %spec.id(), "Granted");

        if !is_granted(cluster, &spec).await? {
            return Err(ProviderError::NotFound(format!(
                "grant {} is missing after it was written",
                spec.id()
            )));
        }
        to_state(&GrantState::from_spec(&spec))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn read(&self, cluster: &dyn Cluster, current: Value) -> Result<Value, ProviderError> {
        let spec = from_state::<GrantState>(current)?.spec()?;

        if is_granted(cluster, &spec).await? {
            to_state(&GrantState::from_spec(&spec))
        } else {
            info!(grant = %spec.id(), "Grant not found");
            Ok(Value::Null)
        }
    }

    async fn update(
        &self,
        _cluster: &dyn Cluster,
        _prior: Value,
        _planned: Value,
    ) -> Result<Value, ProviderError> {
        Err(ProviderError::Unimplemented(
            "grants cannot be updated in place".to_string(),
        ))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn delete(&self, cluster: &dyn Cluster, current: Value) -> Result<(), ProviderError> {
        let spec = from_state::<GrantState>(current)?.spec()?;

        let session = open_session(cluster).await?;
        session.execute(&Statement::Revoke(spec.clone())).await?;
        info!(grant = %spec.id(), "Revoked");
        Ok(())
    }

    fn import(&self, id: &str) -> Result<Value, ProviderError> {
        to_state(&GrantState::from_id(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> GrantState {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_privilege_parsing() {
        for name in Privilege::NAMES {
            assert_eq!(name.parse::<Privilege>().unwrap().as_str(), name);
        }
        assert!("SELECT".parse::<Privilege>().is_err());
        assert_eq!(All.cql(), "ALL PERMISSIONS");
        assert_eq!(Modify.cql(), "MODIFY");
    }

    #[test]
    fn test_expand_all() {
        let table = GrantTarget::Table {
            keyspace: "ks".to_string(),
            table: "t".to_string(),
        };
        assert_eq!(
            All.expand(&table),
            vec!["ALTER", "DROP", "SELECT", "MODIFY", "AUTHORIZE"]
        );
        assert_eq!(Select.expand(&table), vec!["SELECT"]);
    }

    #[test]
    fn test_clauses() {
        let cases = [
            (GrantTarget::AllFunctions, "ALL FUNCTIONS"),
            (
                GrantTarget::AllFunctionsInKeyspace { keyspace: "ks".to_string() },
                "ALL FUNCTIONS IN KEYSPACE \"ks\"",
            ),
            (
                GrantTarget::Function {
                    keyspace: "ks".to_string(),
                    function: "avg(int)".to_string(),
                },
                "FUNCTION \"ks\".avg(int)",
            ),
            (GrantTarget::AllKeyspaces, "ALL KEYSPACES"),
            (GrantTarget::Keyspace { keyspace: "ks".to_string() }, "KEYSPACE \"ks\""),
            (GrantTarget::AllRoles, "ALL ROLES"),
            (GrantTarget::Role { role: "app".to_string() }, "ROLE \"app\""),
            (GrantTarget::AllMbeans, "ALL MBEANS"),
            (
                GrantTarget::Mbean { name: "org.apache.cassandra.db:type=Tables".to_string() },
                "MBEAN 'org.apache.cassandra.db:type=Tables'",
            ),
            (
                GrantTarget::Mbeans { pattern: "org.apache.cassandra.db:*".to_string() },
                "MBEANS 'org.apache.cassandra.db:*'",
            ),
        ];
        for (target, clause) in cases {
            assert_eq!(target.clause(), clause);
        }
    }

    #[test]
    fn test_check_accepts_valid_grants() {
        let valid = [
            json!({"privilege": "select", "resource_type": "table", "grantee": "reader",
                   "keyspace_name": "ks", "table_name": "events"}),
            json!({"privilege": "all", "resource_type": "all_keyspaces", "grantee": "admin"}),
            json!({"privilege": "execute", "resource_type": "function", "grantee": "app",
                   "keyspace_name": "ks", "function_name": "avg(int)"}),
            json!({"privilege": "describe", "resource_type": "all_roles", "grantee": "ops"}),
            json!({"privilege": "modify", "resource_type": "mbeans", "grantee": "ops",
                   "mbean_pattern": "org.apache.cassandra.db:*"}),
        ];
        for value in valid {
            assert!(check(&state(value.clone())).is_empty(), "{}", value);
        }
    }

    #[test]
    fn test_check_rejects_wrong_privilege_for_family() {
        let diagnostics = check(&state(json!({
            "privilege": "execute",
            "resource_type": "table",
            "grantee": "reader",
            "keyspace_name": "ks",
            "table_name": "events",
        })));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid privilege");
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("must be one of all, alter, drop, select, modify, authorize"));

        let diagnostics = check(&state(json!({
            "privilege": "describe",
            "resource_type": "role",
            "grantee": "ops",
            "role_name": "app",
        })));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_check_attribute_combinations() {
        let diagnostics = check(&state(json!({
            "privilege": "select",
            "resource_type": "table",
            "grantee": "reader",
            "keyspace_name": "ks",
            "role_name": "app",
        })));
        let summaries: Vec<_> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Missing attribute", "Unexpected attribute"]);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("table_name"));
        assert_eq!(diagnostics[1].attribute.as_deref(), Some("role_name"));

        let diagnostics = check(&state(json!({
            "privilege": "select",
            "resource_type": "view",
            "grantee": "reader",
        })));
        assert_eq!(diagnostics[0].summary, "Invalid resource type");

        let diagnostics = check(&state(json!({
            "privilege": "select",
            "resource_type": "keyspace",
            "grantee": "bad\"name",
            "keyspace_name": "bad-ks",
        })));
        let summaries: Vec<_> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Invalid grantee", "Invalid identifier"]);
    }

    #[test]
    fn test_check_function_signatures() {
        for signature in ["avg(int)", "sum(bigint, int)", "f()", "merge(map<text, int>)"] {
            assert!(!invalid_signature(signature), "{}", signature);
        }
        let rejected = [
            "avg",
            "avg(int",
            "f(int) TO \"admin\" --",
            "f(int); DROP ROLE x",
            "(int)",
        ];
        for signature in rejected {
            assert!(invalid_signature(signature), "{}", signature);
        }

        let diagnostics = check(&state(json!({
            "privilege": "execute",
            "resource_type": "function",
            "grantee": "app",
            "keyspace_name": "ks",
            "function_name": "f(int) TO \"admin\" --",
        })));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid function signature");
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("function_name"));
    }

    #[test]
    fn test_missing_target_errors() {
        assert!(target_missing(&ProviderError::Query(
            "Resource <keyspace ks> doesn't exist".to_string()
        )));
        assert!(target_missing(&ProviderError::Query("Role app doesn't exist".to_string())));
        assert!(!target_missing(&ProviderError::Query("Unauthorized".to_string())));
        assert!(!target_missing(&ProviderError::Session("doesn't exist".to_string())));
    }

    #[test]
    fn test_id_round_trip_through_import() {
        let imported = GrantResource
            .import("reader|select|table|ks|events")
            .unwrap();
        assert_eq!(
            imported,
            json!({
                "id": "reader|select|table|ks|events",
                "privilege": "select",
                "resource_type": "table",
                "grantee": "reader",
                "keyspace_name": "ks",
                "table_name": "events",
            })
        );

        let all = GrantResource.import("admin|all|all_keyspaces").unwrap();
        assert_eq!(all["id"], json!("admin|all|all_keyspaces"));
        assert!(all.get("keyspace_name").is_none());
    }

    #[test]
    fn test_import_rejects_malformed_ids() {
        assert!(GrantResource.import("reader").is_err());
        assert!(GrantResource.import("reader|select|table|ks").is_err());
        assert!(GrantResource.import("reader|select|view|ks").is_err());
        assert!(GrantResource.import("reader|execute|table|ks|events").is_err());
    }

    #[test]
    fn test_schema_is_all_force_new() {
        let schema = GrantResource.schema();
        for (name, attribute) in &schema.attributes {
            if name != "id" {
                assert!(attribute.force_new, "{} should force replacement", name);
            }
        }
    }
}
