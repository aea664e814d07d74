//! Provider configuration.
//!
//! The host sends the `provider "cassandra" { ... }` block as JSON. It is
//! deserialized into [`ProviderConfig`], topped up from `CASSANDRA_*`
//! environment variables and checked, producing either a [`ClusterConfig`]
//! ready to connect with or a list of diagnostics.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use openssl::ssl::SslVersion;
use openssl::x509::X509;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::schema::{has_errors, Attribute, Diagnostic, Schema};

/// Environment variable for the default username.
pub const USERNAME_ENV: &str = "CASSANDRA_USERNAME";
/// Environment variable for the default password.
pub const PASSWORD_ENV: &str = "CASSANDRA_PASSWORD";
/// Environment variable for the default host.
pub const HOST_ENV: &str = "CASSANDRA_HOST";
/// Environment variable for the default port.
pub const PORT_ENV: &str = "CASSANDRA_PORT";

/// Default CQL native transport port.
pub const DEFAULT_PORT: i64 = 9042;
/// Default connection timeout in milliseconds.
pub const DEFAULT_CONNECTION_TIMEOUT_MS: i64 = 1000;
/// Default CQL protocol version.
pub const DEFAULT_PROTOCOL_VERSION: i64 = 4;
/// Per-request timeout applied to every statement.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A string that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The wrapped value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Minimum TLS protocol version accepted when connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsVersion {
    /// `SSL3.0`
    Ssl3,
    /// `TLS1.0`
    Tls10,
    /// `TLS1.1`
    Tls11,
    /// `TLS1.2`
    #[default]
    Tls12,
    /// `TLS1.3`
    Tls13,
}

impl TlsVersion {
    /// Every accepted spelling, lowest first.
    pub const NAMES: [&'static str; 5] = ["SSL3.0", "TLS1.0", "TLS1.1", "TLS1.2", "TLS1.3"];

    /// The configuration spelling of this version.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssl3 => "SSL3.0",
            Self::Tls10 => "TLS1.0",
            Self::Tls11 => "TLS1.1",
            Self::Tls12 => "TLS1.2",
            Self::Tls13 => "TLS1.3",
        }
    }

    /// The matching OpenSSL protocol version.
    pub fn ssl_version(&self) -> SslVersion {
        match self {
            Self::Ssl3 => SslVersion::SSL3,
            Self::Tls10 => SslVersion::TLS1,
            Self::Tls11 => SslVersion::TLS1_1,
            Self::Tls12 => SslVersion::TLS1_2,
            Self::Tls13 => SslVersion::TLS1_3,
        }
    }
}

impl FromStr for TlsVersion {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SSL3.0" => Ok(Self::Ssl3),
            "TLS1.0" => Ok(Self::Tls10),
            "TLS1.1" => Ok(Self::Tls11),
            "TLS1.2" => Ok(Self::Tls12),
            "TLS1.3" => Ok(Self::Tls13),
            other => Err(ProviderError::Validation(format!(
                "{}: invalid value - must be one of {}",
                other,
                Self::NAMES.join(", ")
            ))),
        }
    }
}

/// Parse every certificate in a PEM bundle.
///
/// A bundle that parses but holds no certificate is rejected too.
pub fn parse_root_ca(pem: &str) -> Result<Vec<X509>, ProviderError> {
    let certs = X509::stack_from_pem(pem.as_bytes())?;
    if certs.is_empty() {
        return Err(ProviderError::Validation(
            "no certificate found in PEM data".to_string(),
        ));
    }
    Ok(certs)
}

/// The provider block as declared by the user.
///
/// Every field is optional; unset fields fall back to the environment or
/// to the defaults above when resolved.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub username: Option<String>,
    pub password: Option<Secret>,
    #[serde(deserialize_with = "integer")]
    pub port: Option<i64>,
    pub host: Option<String>,
    pub hosts: Option<Vec<String>>,
    pub host_filter: Option<bool>,
    /// Milliseconds.
    #[serde(deserialize_with = "integer")]
    pub connection_timeout: Option<i64>,
    pub root_ca: Option<String>,
    pub use_ssl: Option<bool>,
    pub min_tls_version: Option<String>,
    #[serde(deserialize_with = "integer")]
    pub protocol_version: Option<i64>,
}

/// Whole numbers may arrive as floats (`9042.0`); the schema accepts them too.
fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_i64() {
        return Ok(Some(n));
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Ok(Some(f as i64))
        },
        _ => Err(de::Error::custom(format!("expected an integer, got {}", number))),
    }
}

/// TLS settings for the cluster connection.
#[derive(Debug, Clone, PartialEq)]
pub struct TlsConfig {
    /// Lowest protocol version offered.
    pub min_version: TlsVersion,
    /// PEM bundle of trusted roots; the system store is used when unset.
    pub root_ca: Option<String>,
}

/// Validated connection settings.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct ClusterConfig {
    pub hosts: Vec<String>,
    pub port: u16,
    /// Empty when the cluster does not require authentication.
    pub username: String,
    pub password: Secret,
    /// Only talk to the configured hosts, ignoring discovered peers.
    pub host_filter: bool,
    pub connection_timeout: Duration,
    pub request_timeout: Duration,
    pub protocol_version: u8,
    pub tls: Option<TlsConfig>,
}

impl ClusterConfig {
    /// `host:port` for every configured host.
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|host| format!("{}:{}", host, self.port))
            .collect()
    }
}

impl ProviderConfig {
    /// Deserialize the host's JSON; `null` is an empty block.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Check the configuration without connecting.
    pub fn validate(&self) -> Vec<Diagnostic> {
        self.resolve().1
    }

    /// Apply environment defaults and validate.
    ///
    /// Returns the cluster settings when there are no errors, along with any
    /// diagnostics (warnings included).
    pub fn resolve(&self) -> (Option<ClusterConfig>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();

        let port = self.resolve_port(&mut diagnostics);
        let hosts = self.resolve_hosts(&mut diagnostics);
        let min_version = self.resolve_tls_version(&mut diagnostics);
        let root_ca = self.resolve_root_ca(&mut diagnostics);
        let protocol_version = self.resolve_protocol_version(&mut diagnostics);
        let connection_timeout = self.resolve_connection_timeout(&mut diagnostics);

        let (Some(port), Some(hosts), Some(min_version), Some(protocol_version), Some(timeout)) =
            (port, hosts, min_version, protocol_version, connection_timeout)
        else {
            return (None, diagnostics);
        };
        if has_errors(&diagnostics) {
            return (None, diagnostics);
        }

        let use_ssl = self.use_ssl.unwrap_or(false);
        if root_ca.is_some() && !use_ssl {
            diagnostics.push(
                Diagnostic::warning("root_ca is ignored")
                    .with_detail("set use_ssl = true to connect with TLS")
                    .with_attribute("root_ca"),
            );
        }

        let cluster = ClusterConfig {
            hosts,
            port,
            username: self
                .username
                .clone()
                .or_else(|| env_default(USERNAME_ENV))
                .unwrap_or_default(),
            password: self
                .password
                .clone()
                .or_else(|| env_default(PASSWORD_ENV).map(Secret::new))
                .unwrap_or_default(),
            host_filter: self.host_filter.unwrap_or(false),
            connection_timeout: timeout,
            request_timeout: REQUEST_TIMEOUT,
            protocol_version,
            tls: use_ssl.then(|| TlsConfig {
                min_version,
                root_ca,
            }),
        };
        (Some(cluster), diagnostics)
    }

    fn resolve_port(&self, diagnostics: &mut Vec<Diagnostic>) -> Option<u16> {
        let port = match self.port {
            Some(port) => port,
            None => match env_default(PORT_ENV) {
                Some(raw) => match raw.trim().parse::<i64>() {
                    Ok(port) => port,
                    Err(_) => {
                        diagnostics.push(
                            Diagnostic::error("Invalid port number")
                                .with_detail(format!("{}: {} is not a number", raw, PORT_ENV))
                                .with_attribute("port"),
                        );
                        return None;
                    },
                },
                None => DEFAULT_PORT,
            },
        };

        if port <= 0 || port >= 65535 {
            diagnostics.push(
                Diagnostic::error("Invalid port number")
                    .with_detail(format!(
                        "{}: invalid value - must be between 1 and 65534",
                        port
                    ))
                    .with_attribute("port"),
            );
            return None;
        }
        u16::try_from(port).ok()
    }

    fn resolve_hosts(&self, diagnostics: &mut Vec<Diagnostic>) -> Option<Vec<String>> {
        let hosts = match (&self.host, &self.hosts) {
            (Some(_), Some(_)) => {
                diagnostics.push(
                    Diagnostic::error("Conflicting host configuration")
                        .with_detail("only one of host or hosts may be set")
                        .with_attribute("hosts"),
                );
                return None;
            },
            (Some(host), None) => vec![host.clone()],
            (None, Some(hosts)) => {
                if hosts.is_empty() {
                    diagnostics.push(
                        Diagnostic::error("Missing hosts")
                            .with_detail("hosts must contain at least one host")
                            .with_attribute("hosts"),
                    );
                    return None;
                }
                hosts.clone()
            },
            (None, None) => match env_default(HOST_ENV) {
                Some(host) => vec![host],
                None => {
                    diagnostics.push(
                        Diagnostic::error("Missing host")
                            .with_detail(format!(
                                "one of host or hosts must be set, or {} exported",
                                HOST_ENV
                            ))
                            .with_attribute("host"),
                    );
                    return None;
                },
            },
        };

        if let Some(index) = hosts.iter().position(|h| h.trim().is_empty()) {
            diagnostics.push(
                Diagnostic::error("Invalid host")
                    .with_detail("host names must not be empty")
                    .with_attribute(format!("hosts.{}", index)),
            );
            return None;
        }
        Some(hosts)
    }

    fn resolve_tls_version(&self, diagnostics: &mut Vec<Diagnostic>) -> Option<TlsVersion> {
        let Some(name) = &self.min_tls_version else {
            return Some(TlsVersion::default());
        };
        match name.parse() {
            Ok(version) => Some(version),
            Err(err) => {
                diagnostics.push(
                    Diagnostic::error("Invalid TLS")
                        .with_detail(err.message())
                        .with_attribute("min_tls_version"),
                );
                None
            },
        }
    }

    fn resolve_root_ca(&self, diagnostics: &mut Vec<Diagnostic>) -> Option<String> {
        let pem = self.root_ca.as_deref().filter(|pem| !pem.trim().is_empty())?;
        if let Err(err) = parse_root_ca(pem) {
            diagnostics.push(
                Diagnostic::error("Invalid PEM")
                    .with_detail(format!("root_ca: {}", err.message()))
                    .with_attribute("root_ca"),
            );
            return None;
        }
        Some(pem.to_string())
    }

    fn resolve_protocol_version(&self, diagnostics: &mut Vec<Diagnostic>) -> Option<u8> {
        match self.protocol_version.unwrap_or(DEFAULT_PROTOCOL_VERSION) {
            4 => Some(4),
            3 => {
                diagnostics.push(
                    Diagnostic::warning("Protocol version 3 requested")
                        .with_detail("the driver negotiates protocol version 4")
                        .with_attribute("protocol_version"),
                );
                Some(3)
            },
            other => {
                diagnostics.push(
                    Diagnostic::error("Invalid protocol version")
                        .with_detail(format!("{}: must be 3 or 4", other))
                        .with_attribute("protocol_version"),
                );
                None
            },
        }
    }

    fn resolve_connection_timeout(&self, diagnostics: &mut Vec<Diagnostic>) -> Option<Duration> {
        let millis = self
            .connection_timeout
            .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_MS);
        match u64::try_from(millis) {
            Ok(millis) if millis > 0 => Some(Duration::from_millis(millis)),
            _ => {
                diagnostics.push(
                    Diagnostic::error("Invalid connection timeout")
                        .with_detail(format!(
                            "{}: must be a positive number of milliseconds",
                            millis
                        ))
                        .with_attribute("connection_timeout"),
                );
                None
            },
        }
    }
}

fn env_default(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Schema of the provider block.
pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_description("Connection settings for a Cassandra cluster")
        .with_attribute(
            "username",
            Attribute::optional_string()
                .with_description(format!("Cassandra username, defaults to ${}", USERNAME_ENV)),
        )
        .with_attribute(
            "password",
            Attribute::optional_string()
                .with_description(format!("Cassandra password, defaults to ${}", PASSWORD_ENV))
                .sensitive(),
        )
        .with_attribute(
            "port",
            Attribute::optional_int64()
                .with_description(format!("CQL native port, defaults to ${} or 9042", PORT_ENV)),
        )
        .with_attribute(
            "host",
            Attribute::optional_string().with_description(format!(
                "Cassandra host, defaults to ${}; conflicts with hosts",
                HOST_ENV
            )),
        )
        .with_attribute(
            "hosts",
            Attribute::optional_string_list().with_description("Cassandra hosts"),
        )
        .with_attribute(
            "host_filter",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("Only connect to the configured hosts"),
        )
        .with_attribute(
            "connection_timeout",
            Attribute::optional_int64()
                .with_default(json!(DEFAULT_CONNECTION_TIMEOUT_MS))
                .with_description("Connection timeout in milliseconds"),
        )
        .with_attribute(
            "root_ca",
            Attribute::optional_string().with_description("PEM encoded root certificates"),
        )
        .with_attribute(
            "use_ssl",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("Connect with TLS"),
        )
        .with_attribute(
            "min_tls_version",
            Attribute::optional_string()
                .with_default(json!(TlsVersion::default().as_str()))
                .with_description(format!(
                    "Minimum TLS version, one of {}",
                    TlsVersion::NAMES.join(", ")
                )),
        )
        .with_attribute(
            "protocol_version",
            Attribute::optional_int64()
                .with_default(json!(DEFAULT_PROTOCOL_VERSION))
                .with_description("CQL protocol version"),
        )
}
