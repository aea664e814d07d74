//! Logging setup for the provider binary.
//!
//! Logs are written to **stderr**: stdout carries the handshake line the host
//! reads to find the gRPC address, so nothing else may be printed there.
//!
//! `RUST_LOG` controls filtering, e.g.
//!
//! ```bash
//! RUST_LOG=terraform_provider_cassandra=debug,scylla=warn ./terraform-provider-cassandra
//! ```
//!
//! At `debug` the provider logs every CQL statement it sends (with passwords
//! redacted) and how long each session took to open.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Initialize the global subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Tests share one process, so they use this instead of [`init_logging`].
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}
