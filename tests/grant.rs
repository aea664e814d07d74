mod common;

use std::sync::Arc;

use serde_json::{json, Value};
use terraform_provider_cassandra::cql::Statement;
use terraform_provider_cassandra::testing::{
    assert_error_contains, assert_plan_replaces, MemoryCluster, ProviderTester,
};
use terraform_provider_cassandra::{CassandraProvider, ProviderError};
use tokio_test::{assert_err, assert_ok};

use common::{configured, role, simple_keyspace};

const GRANT: &str = "cassandra_grant";

fn select_on_table() -> Value {
    json!({
        "privilege": "select",
        "resource_type": "table",
        "grantee": "app",
        "keyspace_name": "ks",
        "table_name": "events"
    })
}

/// Role `app` and keyspace `ks`, both created through the provider.
async fn with_grantee() -> (ProviderTester<CassandraProvider>, Arc<MemoryCluster>) {
    let (tester, cluster) = configured().await;
    tester
        .lifecycle_create("cassandra_role", role("app", "secret"))
        .await
        .unwrap();
    tester
        .lifecycle_create("cassandra_keyspace", simple_keyspace("ks"))
        .await
        .unwrap();
    (tester, cluster)
}

#[tokio::test]
async fn grant_then_read() {
    let (tester, cluster) = with_grantee().await;

    let state = assert_ok!(tester.lifecycle_create(GRANT, select_on_table()).await);
    assert_eq!(
        state,
        json!({
            "id": "app|select|table|ks|events",
            "privilege": "select",
            "resource_type": "table",
            "grantee": "app",
            "keyspace_name": "ks",
            "table_name": "events"
        })
    );
    assert_eq!(
        cluster.statements().last().unwrap(),
        "GRANT SELECT ON TABLE \"ks\".\"events\" TO \"app\""
    );
}

#[tokio::test]
async fn revoke_then_read_reports_absence() {
    let (tester, cluster) = with_grantee().await;
    let state = tester
        .lifecycle_create(GRANT, select_on_table())
        .await
        .unwrap();

    assert_ok!(tester.lifecycle_delete(GRANT, state.clone()).await);
    assert_eq!(
        cluster.statements().last().unwrap(),
        "REVOKE SELECT ON TABLE \"ks\".\"events\" FROM \"app\""
    );
    assert!(tester.read(GRANT, state).await.unwrap().is_null());
}

#[tokio::test]
async fn all_needs_every_permission_of_the_family() {
    let (tester, cluster) = with_grantee().await;

    let all = json!({
        "privilege": "all",
        "resource_type": "keyspace",
        "grantee": "app",
        "keyspace_name": "ks"
    });
    let state = assert_ok!(tester.lifecycle_create(GRANT, all.clone()).await);
    assert_eq!(state["id"], "app|all|keyspace|ks");
    assert_eq!(
        cluster.statements().last().unwrap(),
        "GRANT ALL PERMISSIONS ON KEYSPACE \"ks\" TO \"app\""
    );

    // Revoking one permission out of band breaks `all`.
    let mut select = all;
    select["privilege"] = json!("select");
    let select_state = tester.lifecycle_create(GRANT, select).await.unwrap();
    tester.delete(GRANT, select_state).await.unwrap();
    assert!(tester.read(GRANT, state).await.unwrap().is_null());
}

#[tokio::test]
async fn dropping_the_grantee_removes_the_grant() {
    let (tester, cluster) = with_grantee().await;
    let state = tester
        .lifecycle_create(GRANT, select_on_table())
        .await
        .unwrap();

    cluster.apply(&Statement::DropRole("app".to_string())).unwrap();
    assert!(tester.read(GRANT, state).await.unwrap().is_null());
}

#[tokio::test]
async fn dropping_the_keyspace_removes_the_grant() {
    let (tester, cluster) = with_grantee().await;
    let state = tester
        .lifecycle_create(
            GRANT,
            json!({
                "privilege": "modify",
                "resource_type": "keyspace",
                "grantee": "app",
                "keyspace_name": "ks"
            }),
        )
        .await
        .unwrap();

    cluster
        .apply(&Statement::DropKeyspace("ks".to_string()))
        .unwrap();
    assert!(cluster.keyspace("ks").is_none());
    assert!(tester.read(GRANT, state).await.unwrap().is_null());
}

#[tokio::test]
async fn missing_keyspace_is_a_query_error() {
    let (tester, _cluster) = configured().await;
    tester
        .lifecycle_create("cassandra_role", role("app", "secret"))
        .await
        .unwrap();

    let err = assert_err!(tester.create(GRANT, select_on_table()).await);
    assert!(matches!(err, ProviderError::Query(_)));
    assert!(err.message().contains("<keyspace ks> doesn't exist"));
}

#[tokio::test]
async fn unknown_grantee_is_a_query_error() {
    let (tester, _cluster) = configured().await;

    let err = assert_err!(tester.create(GRANT, select_on_table()).await);
    assert!(matches!(err, ProviderError::Query(_)));
    assert!(err.message().contains("doesn't exist"));
}

#[tokio::test]
async fn invalid_combinations_fail_before_connecting() {
    let (tester, cluster) = configured().await;

    let mut execute_on_table = select_on_table();
    execute_on_table["privilege"] = json!("execute");
    let err = assert_err!(tester.validate_resource_config(GRANT, execute_on_table.clone()).await);
    assert_error_contains(err.diagnostics(), "Invalid privilege");
    assert_err!(tester.create(GRANT, execute_on_table).await);

    let mut stray_role = select_on_table();
    stray_role["role_name"] = json!("other");
    let err = assert_err!(tester.validate_resource_config(GRANT, stray_role).await);
    assert_error_contains(err.diagnostics(), "Unexpected attribute");

    let missing_table = json!({
        "privilege": "select",
        "resource_type": "table",
        "grantee": "app",
        "keyspace_name": "ks"
    });
    let err = assert_err!(tester.validate_resource_config(GRANT, missing_table).await);
    assert_error_contains(err.diagnostics(), "Missing attribute");

    assert_eq!(cluster.sessions(), 0);
}

#[tokio::test]
async fn function_signature_cannot_carry_extra_cql() {
    let (tester, cluster) = configured().await;

    let injected = json!({
        "privilege": "execute",
        "resource_type": "function",
        "grantee": "app",
        "keyspace_name": "ks",
        "function_name": "f(int) TO \"admin\" --"
    });
    let err = assert_err!(tester.validate_resource_config(GRANT, injected.clone()).await);
    assert_error_contains(err.diagnostics(), "Invalid function signature");
    assert_err!(tester.create(GRANT, injected.clone()).await);

    let mut unbalanced = injected;
    unbalanced["function_name"] = json!("avg(int");
    let err = assert_err!(tester.validate_resource_config(GRANT, unbalanced).await);
    assert_error_contains(err.diagnostics(), "Invalid function signature");

    assert_eq!(cluster.sessions(), 0);
    assert!(cluster.statements().is_empty());
}

#[tokio::test]
async fn function_grants_use_the_signature() {
    let (tester, cluster) = with_grantee().await;

    let config = json!({
        "privilege": "execute",
        "resource_type": "function",
        "grantee": "app",
        "keyspace_name": "ks",
        "function_name": "avg(int)"
    });
    let state = assert_ok!(tester.lifecycle_create(GRANT, config).await);
    assert_eq!(state["id"], "app|execute|function|ks|avg(int)");
    assert_eq!(
        cluster.statements().last().unwrap(),
        "GRANT EXECUTE ON FUNCTION \"ks\".avg(int) TO \"app\""
    );
}

#[tokio::test]
async fn every_attribute_forces_replacement() {
    let (tester, _cluster) = with_grantee().await;
    let state = tester
        .lifecycle_create(GRANT, select_on_table())
        .await
        .unwrap();

    let mut modify = select_on_table();
    modify["privilege"] = json!("modify");
    let plan = tester.plan_update(GRANT, state.clone(), modify).await.unwrap();
    assert_plan_replaces(&plan);

    let err = assert_err!(tester.update(GRANT, state.clone(), state).await);
    assert!(matches!(err, ProviderError::Unimplemented(_)));
}

#[tokio::test]
async fn import_then_read_reconstructs_state() {
    let (tester, _cluster) = with_grantee().await;
    let created = tester
        .lifecycle_create(GRANT, select_on_table())
        .await
        .unwrap();

    let imported = assert_ok!(tester.lifecycle_import(GRANT, "app|select|table|ks|events").await);
    assert_eq!(imported, created);

    assert_err!(tester.import_resource(GRANT, "app|select").await);
    assert_err!(tester.import_resource(GRANT, "app|select|table|ks").await);
}
