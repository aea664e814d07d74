//! Error types for the Cassandra provider.

use thiserror::Error;

/// Errors raised while serving a provider operation.
///
/// Driver failures are carried as the driver's own message so that the host
/// shows exactly what Cassandra reported.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Declared attributes failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is misconfigured, or used before `configure`.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is not served by this provider.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A session to the cluster could not be opened.
    #[error("Unable to open session: {0}")]
    Session(String),

    /// Cassandra rejected or failed a CQL statement.
    #[error("CQL execution failed: {0}")]
    Query(String),

    /// A row returned by Cassandra did not have the expected shape.
    #[error("Unexpected row: {0}")]
    Decode(String),

    /// TLS material could not be loaded.
    #[error("TLS error: {0}")]
    Tls(#[from] openssl::error::ErrorStack),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The operation is not supported for this resource type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Get the error message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::Session(msg)
            | Self::Query(msg)
            | Self::Decode(msg)
            | Self::Unimplemented(msg) => msg.clone(),
            Self::Tls(err) => err.to_string(),
            Self::Serialization(err) => err.to_string(),
        }
    }
}

impl From<scylla::errors::NewSessionError> for ProviderError {
    fn from(err: scylla::errors::NewSessionError) -> Self {
        Self::Session(err.to_string())
    }
}

impl From<scylla::errors::ExecutionError> for ProviderError {
    fn from(err: scylla::errors::ExecutionError) -> Self {
        Self::Query(err.to_string())
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Session(msg) => tonic::Status::unavailable(msg),
            ProviderError::Query(msg) => tonic::Status::aborted(msg),
            ProviderError::Decode(msg) => tonic::Status::internal(msg),
            ProviderError::Tls(err) => {
                tonic::Status::failed_precondition(format!("TLS error: {}", err))
            },
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("keyspace ks".to_string());
        assert_eq!(format!("{}", err), "Resource not found: keyspace ks");

        let err = ProviderError::UnknownResource("cassandra_table".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: cassandra_table");

        let err = ProviderError::Session("no hosts".to_string());
        assert_eq!(format!("{}", err), "Unable to open session: no hosts");
    }

    #[test]
    fn test_query_error_keeps_driver_message() {
        let err = ProviderError::Query(
            "replication_factor is an option for SimpleStrategy, not NetworkTopologyStrategy"
                .to_string(),
        );
        assert!(err
            .to_string()
            .contains("replication_factor is an option for SimpleStrategy"));
        assert_eq!(
            err.message(),
            "replication_factor is an option for SimpleStrategy, not NetworkTopologyStrategy"
        );
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::Validation("bad".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::Configuration("bad".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::Session("down".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let status: tonic::Status = ProviderError::Query("rejected".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Aborted);

        let status: tonic::Status = ProviderError::Unimplemented("update".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Unimplemented);
    }
}
