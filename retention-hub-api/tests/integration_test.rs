use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use retention_hub_api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

fn app() -> axum::Router {
    create_router(Arc::new(AppState::new()))
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Create a connection, warehouse, and policy; returns their ids.
async fn create_base_records(app: &axum::Router) -> (String, String, String) {
    let (status, connection) = send(
        app,
        "POST",
        "/v1/connections",
        Some(json!({
            "name": "pg_conn",
            "driver": "postgres",
            "jdbc_url": "jdbc:postgresql://host:5432/docs"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, warehouse) = send(
        app,
        "POST",
        "/v1/warehouses",
        Some(json!({
            "name": "dev_warehouse",
            "s3_uri": "s3://archive-vault"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, policy) = send(
        app,
        "POST",
        "/v1/policies",
        Some(json!({
            "name": "default_6m",
            "retention_value": "6m"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        connection["id"].as_str().unwrap().to_string(),
        warehouse["id"].as_str().unwrap().to_string(),
        policy["id"].as_str().unwrap().to_string(),
    )
}

async fn create_source(
    app: &axum::Router,
    name: &str,
    connection_id: &str,
    warehouse_id: &str,
    policy_id: &str,
) -> String {
    let (status, source) = send(
        app,
        "POST",
        "/v1/sources",
        Some(json!({
            "name": name,
            "env": "dev",
            "connection_id": connection_id,
            "warehouse_id": warehouse_id,
            "default_policy_id": policy_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "failed to create source {}", name);
    source["id"].as_str().unwrap().to_string()
}

async fn create_rule(app: &axum::Router, source_id: &str, body: Value) -> Value {
    let (status, rule) = send(
        app,
        "POST",
        &format!("/v1/sources/{}/rules", source_id),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    rule
}

#[tokio::test]
async fn test_full_source_lifecycle_and_export() {
    let app = app();
    let (connection_id, warehouse_id, policy_id) = create_base_records(&app).await;
    let source_id = create_source(&app, "pg_docs", &connection_id, &warehouse_id, &policy_id).await;

    // Include rules inserted out of order; a schema-level exclude carries no
    // table and must not surface in the export.
    for (schema, table) in [("b", "t2"), ("b", "t1"), ("a", "t3")] {
        create_rule(
            &app,
            &source_id,
            json!({ "type": "include", "schema": schema, "table": table }),
        )
        .await;
    }
    create_rule(&app, &source_id, json!({ "type": "exclude", "schema": "a" })).await;

    let (status, export) = send(
        &app,
        "GET",
        &format!("/v1/sources/{}/export", source_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(export["id"], "pg_docs");
    assert_eq!(export["env"], "dev");
    assert_eq!(export["connection"], "pg_conn");
    assert_eq!(export["warehouse"], "dev_warehouse");
    assert_eq!(export["default_policy"], "default_6m");
    assert_eq!(export["legal_hold_default"], false);
    assert_eq!(
        export["include"]["schemas"],
        json!([
            { "name": "a", "tables": [{ "name": "t3" }] },
            { "name": "b", "tables": [{ "name": "t1" }, { "name": "t2" }] }
        ])
    );
    // No exclude rule carries a table, so the block is an empty object.
    assert_eq!(export["exclude"], json!({}));

    // A table-level exclude makes the schemas list appear.
    create_rule(
        &app,
        &source_id,
        json!({ "type": "exclude", "schema": "a", "table": "scratch" }),
    )
    .await;

    let (_, export) = send(
        &app,
        "GET",
        &format!("/v1/sources/{}/export", source_id),
        None,
    )
    .await;
    assert_eq!(
        export["exclude"]["schemas"],
        json!([{ "name": "a", "tables": [{ "name": "scratch" }] }])
    );

    // With no overrides the effective policy is the source default.
    let (status, effective) = send(
        &app,
        "GET",
        &format!(
            "/v1/sources/{}/policy/effective?schema=b&table=t1",
            source_id
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(effective["scope"], "default");
    assert_eq!(effective["policy"]["name"], "default_6m");
    assert_eq!(effective["policy"]["retention_value"], "6m");
    assert_eq!(effective["policy"]["has_rules"], false);
    assert_eq!(effective["policy"]["rules_json"], Value::Null);
    assert_eq!(effective["legal_hold"], false);
    assert_eq!(effective["source_name"], "pg_docs");
}

#[tokio::test]
async fn test_duplicate_names_are_conflicts() {
    let app = app();
    let (connection_id, warehouse_id, policy_id) = create_base_records(&app).await;
    create_source(&app, "pg_docs", &connection_id, &warehouse_id, &policy_id).await;

    let (status, body) = send(
        &app,
        "POST",
        "/v1/connections",
        Some(json!({ "name": "pg_conn" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, _) = send(
        &app,
        "POST",
        "/v1/warehouses",
        Some(json!({ "name": "dev_warehouse", "s3_uri": "s3://other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/policies",
        Some(json!({ "name": "default_6m", "retention_value": "1y" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/sources",
        Some(json!({
            "name": "pg_docs",
            "connection_id": connection_id,
            "warehouse_id": warehouse_id,
            "default_policy_id": policy_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_references_are_rejected() {
    let app = app();
    let (connection_id, warehouse_id, policy_id) = create_base_records(&app).await;

    let bogus = uuid::Uuid::new_v4().to_string();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/sources",
        Some(json!({
            "name": "pg_docs",
            "connection_id": bogus,
            "warehouse_id": warehouse_id,
            "default_policy_id": policy_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_reference");

    let source_id = create_source(&app, "pg_docs", &connection_id, &warehouse_id, &policy_id).await;

    // override_policy must reference an existing policy.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/sources/{}/rules", source_id),
        Some(json!({
            "type": "override_policy",
            "schema": "sales",
            "policy_id": uuid::Uuid::new_v4().to_string()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_reference");

    // ... and must carry one at all.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/sources/{}/rules", source_id),
        Some(json!({ "type": "override_policy", "schema": "sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    // override_hold requires a legal-hold value.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/sources/{}/rules", source_id),
        Some(json!({ "type": "override_hold", "schema": "sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_guards() {
    let app = app();
    let (connection_id, warehouse_id, policy_id) = create_base_records(&app).await;
    let source_id = create_source(&app, "pg_docs", &connection_id, &warehouse_id, &policy_id).await;
    let rule = create_rule(
        &app,
        &source_id,
        json!({ "type": "include", "schema": "a", "table": "t1" }),
    )
    .await;

    // Referenced records refuse to go.
    for uri in [
        format!("/v1/connections/{}", connection_id),
        format!("/v1/warehouses/{}", warehouse_id),
        format!("/v1/policies/{}", policy_id),
        format!("/v1/sources/{}", source_id),
    ] {
        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT, "expected conflict for {}", uri);
        assert_eq!(body["error"], "conflict");
    }

    // Unwind from the leaves and everything deletes cleanly.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/v1/sources/{}/rules/{}", source_id, rule["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for uri in [
        format!("/v1/sources/{}", source_id),
        format!("/v1/connections/{}", connection_id),
        format!("/v1/warehouses/{}", warehouse_id),
        format!("/v1/policies/{}", policy_id),
    ] {
        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "expected delete of {}", uri);
    }
}

#[tokio::test]
async fn test_rule_update_renormalizes_payload() {
    let app = app();
    let (connection_id, warehouse_id, policy_id) = create_base_records(&app).await;
    let source_id = create_source(&app, "pg_docs", &connection_id, &warehouse_id, &policy_id).await;

    let rule = create_rule(
        &app,
        &source_id,
        json!({
            "type": "override_policy",
            "schema": "sales",
            "table": "orders",
            "policy_id": policy_id
        }),
    )
    .await;
    assert_eq!(rule["policy_id"], policy_id.as_str());
    assert_eq!(rule["legal_hold"], Value::Null);
    let rule_uri = format!(
        "/v1/sources/{}/rules/{}",
        source_id,
        rule["id"].as_str().unwrap()
    );

    // Switching type drops the now-irrelevant policy reference.
    let (status, updated) = send(
        &app,
        "PATCH",
        &rule_uri,
        Some(json!({ "type": "override_hold", "legal_hold": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["type"], "override_hold");
    assert_eq!(updated["legal_hold"], true);
    assert_eq!(updated["policy_id"], Value::Null);

    // Include rules carry no payload at all.
    let (status, updated) = send(&app, "PATCH", &rule_uri, Some(json!({ "type": "include" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["type"], "include");
    assert_eq!(updated["policy_id"], Value::Null);
    assert_eq!(updated["legal_hold"], Value::Null);

    // The dropped payload does not resurface on the way back.
    let (status, body) = send(
        &app,
        "PATCH",
        &rule_uri,
        Some(json!({ "type": "override_policy" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_effective_policy_precedence_over_http() {
    let app = app();
    let (connection_id, warehouse_id, default_policy) = create_base_records(&app).await;
    let source_id =
        create_source(&app, "pg_docs", &connection_id, &warehouse_id, &default_policy).await;

    let (_, schema_policy) = send(
        &app,
        "POST",
        "/v1/policies",
        Some(json!({ "name": "schema_1y", "retention_value": "1y" })),
    )
    .await;
    let (_, table_policy) = send(
        &app,
        "POST",
        "/v1/policies",
        Some(json!({ "name": "table_10y", "retention_value": "10y" })),
    )
    .await;

    create_rule(
        &app,
        &source_id,
        json!({
            "type": "override_policy",
            "schema": "s",
            "policy_id": schema_policy["id"]
        }),
    )
    .await;
    let table_rule = create_rule(
        &app,
        &source_id,
        json!({
            "type": "override_policy",
            "schema": "s",
            "table": "x",
            "policy_id": table_policy["id"]
        }),
    )
    .await;

    let resolve = |schema: &str, table: &str| {
        format!(
            "/v1/sources/{}/policy/effective?schema={}&table={}",
            source_id, schema, table
        )
    };

    let (_, at_table) = send(&app, "GET", &resolve("s", "x"), None).await;
    assert_eq!(at_table["scope"], "override_table");
    assert_eq!(at_table["policy"]["name"], "table_10y");

    let (_, at_schema) = send(&app, "GET", &resolve("s", "y"), None).await;
    assert_eq!(at_schema["scope"], "override_schema");
    assert_eq!(at_schema["policy"]["name"], "schema_1y");

    let (_, elsewhere) = send(&app, "GET", &resolve("other", "x"), None).await;
    assert_eq!(elsewhere["scope"], "default");
    assert_eq!(elsewhere["policy"]["name"], "default_6m");

    // Demote the table rule to schema level: it is now the later of two
    // schema-level overrides on "s", so the earlier one still wins.
    let (status, demoted) = send(
        &app,
        "PATCH",
        &format!(
            "/v1/sources/{}/rules/{}",
            source_id,
            table_rule["id"].as_str().unwrap()
        ),
        Some(json!({ "table": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(demoted["table"], Value::Null);

    let (_, after) = send(&app, "GET", &resolve("s", "x"), None).await;
    assert_eq!(after["scope"], "override_schema");
    assert_eq!(after["policy"]["name"], "schema_1y");
}

#[tokio::test]
async fn test_effective_legal_hold_chain_over_http() {
    let app = app();
    let (connection_id, warehouse_id, policy_id) = create_base_records(&app).await;
    let source_id = create_source(&app, "pg_docs", &connection_id, &warehouse_id, &policy_id).await;

    create_rule(
        &app,
        &source_id,
        json!({ "type": "override_hold", "schema": "s", "legal_hold": true }),
    )
    .await;
    create_rule(
        &app,
        &source_id,
        json!({
            "type": "override_hold",
            "schema": "s",
            "table": "x",
            "legal_hold": false
        }),
    )
    .await;

    let (_, at_table) = send(
        &app,
        "GET",
        &format!(
            "/v1/sources/{}/policy/effective?schema=s&table=x",
            source_id
        ),
        None,
    )
    .await;
    assert_eq!(at_table["legal_hold"], false);
    // Hold overrides never move the policy scope.
    assert_eq!(at_table["scope"], "default");

    let (_, sibling) = send(
        &app,
        "GET",
        &format!(
            "/v1/sources/{}/policy/effective?schema=s&table=y",
            source_id
        ),
        None,
    )
    .await;
    assert_eq!(sibling["legal_hold"], true);
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let app = app();
    let bogus = uuid::Uuid::new_v4();

    let (status, body) = send(&app, "GET", &format!("/v1/sources/{}", bogus), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/v1/sources/{}/export", bogus),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/v1/sources/{}/policy/effective?schema=s&table=t", bogus),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/sources/{}/rules", bogus),
        Some(json!({ "type": "include", "schema": "s", "table": "t" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rules_are_scoped_to_their_source() {
    let app = app();
    let (connection_id, warehouse_id, policy_id) = create_base_records(&app).await;
    let first = create_source(&app, "src_a", &connection_id, &warehouse_id, &policy_id).await;
    let second = create_source(&app, "src_b", &connection_id, &warehouse_id, &policy_id).await;

    let rule = create_rule(
        &app,
        &first,
        json!({ "type": "include", "schema": "a", "table": "t1" }),
    )
    .await;

    // Fetching through the wrong source is a 404.
    let (status, _) = send(
        &app,
        "GET",
        &format!("/v1/sources/{}/rules/{}", second, rule["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = send(&app, "GET", &format!("/v1/sources/{}/rules", second), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 0);
}
