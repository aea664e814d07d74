use std::sync::Arc;

use serde_json::{json, Value};
use terraform_provider_cassandra::testing::{MemoryCluster, ProviderTester};
use terraform_provider_cassandra::CassandraProvider;

/// A provider configured against a fresh in-memory cluster.
#[allow(dead_code)]
pub async fn configured() -> (ProviderTester<CassandraProvider>, Arc<MemoryCluster>) {
    terraform_provider_cassandra::try_init_logging();

    let cluster = MemoryCluster::shared();
    let tester = ProviderTester::new(cluster.provider());
    tester
        .configure(json!({"hosts": ["127.0.0.1"], "port": 9042}))
        .await
        .unwrap();
    (tester, cluster)
}

#[allow(dead_code)]
pub fn simple_keyspace(name: &str) -> Value {
    json!({
        "name": name,
        "replication_strategy": "SimpleStrategy",
        "strategy_options": {"replication_factor": "1"}
    })
}

#[allow(dead_code)]
pub fn role(name: &str, password: &str) -> Value {
    json!({"name": name, "password": password})
}
