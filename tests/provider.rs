mod common;

use serde_json::{json, Value};
use terraform_provider_cassandra::generated::provider_server::Provider;
use terraform_provider_cassandra::generated::{self, diagnostic::Severity};
use terraform_provider_cassandra::server::ProviderGrpcService;
use terraform_provider_cassandra::testing::{assert_error_contains, MemoryCluster, ProviderTester};
use terraform_provider_cassandra::ProviderService;

use common::simple_keyspace;

const ENV: [&str; 4] = [
    "CASSANDRA_HOST",
    "CASSANDRA_PORT",
    "CASSANDRA_USERNAME",
    "CASSANDRA_PASSWORD",
];

fn bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

#[test]
fn port_range_is_enforced() {
    temp_env::with_vars_unset(ENV, || {
        tokio_test::block_on(async {
            let tester = ProviderTester::new(MemoryCluster::shared().provider());
            for port in [1, 9042, 65534] {
                tester
                    .validate_provider_config(json!({"host": "10.0.0.1", "port": port}))
                    .await
                    .unwrap_or_else(|e| panic!("port {}: {}", port, e));
            }
            for port in [0, -1, 65535, 70000] {
                let err = tester
                    .configure(json!({"host": "10.0.0.1", "port": port}))
                    .await
                    .unwrap_err();
                assert_error_contains(err.diagnostics(), "Invalid port number");
            }
            assert!(!tester.provider().is_configured().await);
        })
    });
}

#[test]
fn whole_float_port_is_accepted() {
    temp_env::with_vars_unset(ENV, || {
        tokio_test::block_on(async {
            let tester = ProviderTester::new(MemoryCluster::shared().provider());
            tester
                .validate_provider_config(json!({"hosts": ["127.0.0.1"], "port": 9042.0}))
                .await
                .unwrap();

            let err = tester
                .validate_provider_config(json!({"hosts": ["127.0.0.1"], "port": 9042.5}))
                .await
                .unwrap_err();
            assert!(err.diagnostics().iter().any(|d| d.attribute.as_deref() == Some("port")));

            tester
                .configure(json!({"hosts": ["127.0.0.1"], "port": 9042.0}))
                .await
                .unwrap();
            assert!(tester.provider().is_configured().await);
        })
    });
}

#[test]
fn host_comes_from_the_environment() {
    temp_env::with_vars(
        [
            ("CASSANDRA_HOST", Some("10.0.0.7")),
            ("CASSANDRA_PORT", Some("19042")),
            ("CASSANDRA_USERNAME", None),
            ("CASSANDRA_PASSWORD", None),
        ],
        || {
            tokio_test::block_on(async {
                let tester = ProviderTester::new(MemoryCluster::shared().provider());
                tester.configure(json!({})).await.unwrap();
                assert!(tester.provider().is_configured().await);
            })
        },
    );
}

#[test]
fn missing_host_is_reported() {
    temp_env::with_vars_unset(ENV, || {
        tokio_test::block_on(async {
            let tester = ProviderTester::new(MemoryCluster::shared().provider());
            let err = tester.configure(json!({})).await.unwrap_err();
            assert_error_contains(err.diagnostics(), "Missing host");

            let err = tester
                .configure(json!({"host": "a", "hosts": ["b"]}))
                .await
                .unwrap_err();
            assert_error_contains(err.diagnostics(), "Conflicting host configuration");
        })
    });
}

#[test]
fn tls_settings_are_checked() {
    temp_env::with_vars_unset(ENV, || {
        tokio_test::block_on(async {
            let tester = ProviderTester::new(MemoryCluster::shared().provider());
            let err = tester
                .validate_provider_config(json!({"host": "a", "min_tls_version": "TLS9"}))
                .await
                .unwrap_err();
            assert_error_contains(err.diagnostics(), "Invalid TLS");

            let err = tester
                .validate_provider_config(json!({
                    "host": "a",
                    "use_ssl": true,
                    "root_ca": "not a pem"
                }))
                .await
                .unwrap_err();
            assert_error_contains(err.diagnostics(), "Invalid PEM");
        })
    });
}

#[tokio::test]
async fn grpc_lifecycle_ends_with_empty_state() {
    let cluster = MemoryCluster::shared();
    let service = ProviderGrpcService::new(cluster.provider());

    let configure = service
        .configure(tonic::Request::new(generated::ConfigureRequest {
            config: bytes(&json!({"hosts": ["127.0.0.1"], "port": 9042})),
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(configure.diagnostics.is_empty());

    let plan = service
        .plan(tonic::Request::new(generated::PlanRequest {
            resource_type: "cassandra_keyspace".to_string(),
            prior_state: vec![],
            proposed_state: bytes(&simple_keyspace("ks")),
            config: bytes(&simple_keyspace("ks")),
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(!plan.requires_replace);

    let created = service
        .create(tonic::Request::new(generated::CreateRequest {
            resource_type: "cassandra_keyspace".to_string(),
            planned_state: plan.planned_state,
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(created.diagnostics.is_empty());
    let state: Value = serde_json::from_slice(&created.state).unwrap();
    assert_eq!(state["id"], "ks");

    let deleted = service
        .delete(tonic::Request::new(generated::DeleteRequest {
            resource_type: "cassandra_keyspace".to_string(),
            current_state: created.state.clone(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(deleted.diagnostics.is_empty());

    let read = service
        .read(tonic::Request::new(generated::ReadRequest {
            resource_type: "cassandra_keyspace".to_string(),
            current_state: created.state,
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(read.state.is_empty());
    assert!(read.diagnostics.is_empty());
}

#[tokio::test]
async fn grpc_reports_cluster_errors_as_diagnostics() {
    let cluster = MemoryCluster::shared();
    let service = ProviderGrpcService::new(cluster.provider());

    // Not configured yet.
    let created = service
        .create(tonic::Request::new(generated::CreateRequest {
            resource_type: "cassandra_keyspace".to_string(),
            planned_state: bytes(&simple_keyspace("ks")),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(created.diagnostics[0].severity, Severity::Error as i32);
    assert!(created.diagnostics[0].summary.starts_with("Configuration error"));

    service
        .provider()
        .configure(json!({"hosts": ["127.0.0.1"], "port": 9042}))
        .await
        .unwrap();

    let created = service
        .create(tonic::Request::new(generated::CreateRequest {
            resource_type: "cassandra_keyspace".to_string(),
            planned_state: bytes(&json!({
                "name": "ks",
                "replication_strategy": "NetworkTopologyStrategy",
                "strategy_options": {"replication_factor": "1"}
            })),
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(created.state.is_empty());
    assert!(created.diagnostics[0]
        .summary
        .contains("replication_factor is an option for SimpleStrategy, not NetworkTopologyStrategy"));
}

#[tokio::test]
async fn grpc_schema_marks_sensitive_attributes() {
    let service = ProviderGrpcService::new(MemoryCluster::shared().provider());
    let schema = service
        .get_schema(tonic::Request::new(generated::GetSchemaRequest {}))
        .await
        .unwrap()
        .into_inner();

    let provider = schema.provider.unwrap();
    let password = provider
        .attributes
        .iter()
        .find(|a| a.name == "password")
        .unwrap();
    assert!(password.sensitive);

    let role = &schema.resources["cassandra_role"];
    let name = role.attributes.iter().find(|a| a.name == "name").unwrap();
    assert!(name.force_new);
    assert!(name.required);
}
