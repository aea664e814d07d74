mod common;

use serde_json::json;
use terraform_provider_cassandra::cql::Statement;
use terraform_provider_cassandra::testing::{
    assert_error_contains, assert_plan_changes_attribute, assert_plan_replaces,
    assert_plan_updates_in_place,
};
use terraform_provider_cassandra::ProviderError;
use tokio_test::{assert_err, assert_ok};

use common::{configured, simple_keyspace};

const KEYSPACE: &str = "cassandra_keyspace";

#[tokio::test]
async fn create_then_read_round_trips() {
    let (tester, _cluster) = configured().await;

    let state = assert_ok!(tester.lifecycle_create(KEYSPACE, simple_keyspace("Events")).await);
    assert_eq!(
        state,
        json!({
            "id": "Events",
            "name": "Events",
            "replication_strategy": "SimpleStrategy",
            "strategy_options": {"replication_factor": "1"},
            "durable_writes": true
        })
    );
}

#[tokio::test]
async fn create_issues_quoted_cql() {
    let (tester, cluster) = configured().await;
    let mut config = simple_keyspace("ks");
    config["durable_writes"] = json!(false);

    assert_ok!(tester.lifecycle_create(KEYSPACE, config).await);
    assert_eq!(
        cluster.statements(),
        vec![
            "CREATE KEYSPACE \"ks\" WITH REPLICATION = { 'class' : 'SimpleStrategy', 'replication_factor' : '1' } AND DURABLE_WRITES = false"
        ]
    );
}

#[tokio::test]
async fn network_topology_rejects_replication_factor() {
    let (tester, _cluster) = configured().await;
    let config = json!({
        "name": "ks",
        "replication_strategy": "NetworkTopologyStrategy",
        "strategy_options": {"replication_factor": "1"}
    });

    let plan = tester.plan_create(KEYSPACE, config).await.unwrap();
    let err = assert_err!(tester.create(KEYSPACE, plan.planned_state).await);
    assert!(matches!(err, ProviderError::Query(_)));
    assert!(err
        .to_string()
        .contains("replication_factor is an option for SimpleStrategy, not NetworkTopologyStrategy"));
}

#[tokio::test]
async fn network_topology_with_data_centers() {
    let (tester, _cluster) = configured().await;
    let config = json!({
        "name": "multi_dc",
        "replication_strategy": "NetworkTopologyStrategy",
        "strategy_options": {"dc1": "3", "dc2": "2"}
    });

    let state = assert_ok!(tester.lifecycle_create(KEYSPACE, config).await);
    assert_eq!(state["replication_strategy"], "NetworkTopologyStrategy");
    assert_eq!(state["strategy_options"], json!({"dc1": "3", "dc2": "2"}));
}

#[tokio::test]
async fn invalid_names_fail_without_a_session() {
    let (tester, cluster) = configured().await;

    let too_long = "k".repeat(50);
    for name in ["system", "_hidden", "has-dash", "", too_long.as_str()] {
        let err = assert_err!(tester.create(KEYSPACE, simple_keyspace(name)).await);
        assert!(matches!(err, ProviderError::Validation(_)), "{}: {}", name, err);

        let err = assert_err!(
            tester
                .validate_resource_config(KEYSPACE, simple_keyspace(name))
                .await
        );
        assert!(!err.diagnostics().is_empty(), "{}", name);
    }
    assert_eq!(cluster.sessions(), 0);
}

#[tokio::test]
async fn empty_strategy_options_fail_before_connecting() {
    let (tester, cluster) = configured().await;
    let config = json!({
        "name": "ks",
        "replication_strategy": "SimpleStrategy",
        "strategy_options": {}
    });

    let err = assert_err!(tester.validate_resource_config(KEYSPACE, config.clone()).await);
    assert_error_contains(err.diagnostics(), "Missing strategy options");

    let err = assert_err!(tester.create(KEYSPACE, config).await);
    assert!(matches!(err, ProviderError::Configuration(_)));
    assert_eq!(cluster.sessions(), 0);
}

#[tokio::test]
async fn update_alters_in_place() {
    let (tester, cluster) = configured().await;
    let state = tester
        .lifecycle_create(KEYSPACE, simple_keyspace("ks"))
        .await
        .unwrap();

    let mut proposed = simple_keyspace("ks");
    proposed["strategy_options"] = json!({"replication_factor": "3"});
    let plan = tester
        .plan_update(KEYSPACE, state.clone(), proposed.clone())
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);
    assert_plan_changes_attribute(&plan, "strategy_options");

    let updated = assert_ok!(tester.lifecycle_update(KEYSPACE, state, proposed).await);
    assert_eq!(updated["strategy_options"]["replication_factor"], "3");
    assert!(cluster.statements()[1].starts_with("ALTER KEYSPACE \"ks\""));
}

#[tokio::test]
async fn rename_requires_replacement() {
    let (tester, _cluster) = configured().await;
    let state = tester
        .lifecycle_create(KEYSPACE, simple_keyspace("ks"))
        .await
        .unwrap();

    let plan = tester
        .plan_update(KEYSPACE, state, simple_keyspace("renamed"))
        .await
        .unwrap();
    assert_plan_replaces(&plan);
}

#[tokio::test]
async fn delete_then_read_reports_absence() {
    let (tester, _cluster) = configured().await;
    let state = tester
        .lifecycle_create(KEYSPACE, simple_keyspace("ks"))
        .await
        .unwrap();

    assert_ok!(tester.lifecycle_delete(KEYSPACE, state.clone()).await);
    assert!(tester.read(KEYSPACE, state).await.unwrap().is_null());
}

#[tokio::test]
async fn drop_outside_the_provider_reports_absence() {
    let (tester, cluster) = configured().await;
    let state = tester
        .lifecycle_create(KEYSPACE, simple_keyspace("ks"))
        .await
        .unwrap();

    cluster
        .apply(&Statement::DropKeyspace("ks".to_string()))
        .unwrap();
    assert!(tester.read(KEYSPACE, state).await.unwrap().is_null());
}

#[tokio::test]
async fn import_then_read_reconstructs_state() {
    let (tester, _cluster) = configured().await;
    let created = tester
        .lifecycle_create(KEYSPACE, simple_keyspace("ks"))
        .await
        .unwrap();

    let imported = assert_ok!(tester.lifecycle_import(KEYSPACE, "ks").await);
    assert_eq!(imported, created);

    assert!(tester.lifecycle_import(KEYSPACE, "missing").await.unwrap().is_null());
    assert_err!(tester.import_resource(KEYSPACE, "system").await);
}

#[tokio::test]
async fn each_operation_opens_its_own_session() {
    let (tester, cluster) = configured().await;
    let planned = tester
        .plan_create(KEYSPACE, simple_keyspace("ks"))
        .await
        .unwrap()
        .planned_state;

    let state = tester.create(KEYSPACE, planned).await.unwrap();
    assert_eq!(cluster.sessions(), 2);

    tester.read(KEYSPACE, state.clone()).await.unwrap();
    assert_eq!(cluster.sessions(), 3);

    tester.delete(KEYSPACE, state).await.unwrap();
    assert_eq!(cluster.sessions(), 4);
}
