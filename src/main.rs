use std::net::SocketAddr;

use terraform_provider_cassandra::{init_logging, serve, serve_on, CassandraProvider};

/// Fixed listen address; an ephemeral localhost port is used when unset.
const ADDR_ENV: &str = "CASSANDRA_PROVIDER_ADDR";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let provider = CassandraProvider::new();
    match std::env::var(ADDR_ENV) {
        Ok(addr) if !addr.is_empty() => {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| format!("{}={}: {}", ADDR_ENV, addr, e))?;
            serve_on(provider, addr).await
        },
        _ => serve(provider).await,
    }
}
