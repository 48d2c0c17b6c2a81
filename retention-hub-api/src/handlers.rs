//! API request handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use retention_hub_core::{
    Connection, CreateConnectionRequest, CreatePolicyRequest, CreateRuleRequest,
    CreateSourceRequest, CreateWarehouseRequest, Policy, Rule, RuleKind, Source,
    UpdateConnectionRequest, UpdatePolicyRequest, UpdateRuleRequest, UpdateSourceRequest,
    UpdateWarehouseRequest, Warehouse,
};
use retention_hub_storage::{
    ConnectionStorage, PolicyStorage, RuleStorage, SourceStorage, WarehouseStorage,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{ApiError, AppState};

/// Load a source or fail with 404. Rule routes and the engine entry points
/// all require the source to exist.
async fn load_source(state: &AppState, id: Uuid) -> Result<Source, ApiError> {
    SourceStorage::get_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Source {} not found", id)))
}

// ==================== Connection Handlers ====================

/// Create a new connection
pub async fn create_connection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateConnectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if ConnectionStorage::get_by_name(state.store.as_ref(), &req.name)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Connection name already exists".to_string()));
    }

    let connection = Connection::new(req.name, req.driver, req.jdbc_url);
    let saved = ConnectionStorage::save(state.store.as_ref(), connection).await?;

    tracing::info!("Created connection '{}'", saved.name);

    Ok((StatusCode::CREATED, Json(saved)))
}

/// List all connections
pub async fn list_connections(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let connections = ConnectionStorage::list(state.store.as_ref()).await?;
    Ok(Json(connections))
}

/// Get a connection by ID
pub async fn get_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let connection = ConnectionStorage::get_by_id(state.store.as_ref(), id).await?;

    match connection {
        Some(c) => Ok(Json(c)),
        None => Err(ApiError::NotFound(format!("Connection {} not found", id))),
    }
}

/// Update a connection
pub async fn update_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateConnectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut connection = ConnectionStorage::get_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Connection {} not found", id)))?;

    if let Some(name) = req.name {
        if name != connection.name {
            if ConnectionStorage::get_by_name(state.store.as_ref(), &name)
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict("Connection name already exists".to_string()));
            }
            connection.name = name;
        }
    }
    if let Some(driver) = req.driver {
        connection.driver = driver;
    }
    if let Some(jdbc_url) = req.jdbc_url {
        connection.jdbc_url = jdbc_url;
    }

    let saved = ConnectionStorage::update(state.store.as_ref(), connection).await?;
    Ok(Json(saved))
}

/// Delete a connection
pub async fn delete_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    ConnectionStorage::get_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Connection {} not found", id)))?;

    if SourceStorage::any_with_connection(state.store.as_ref(), id).await? {
        return Err(ApiError::Conflict("Connection in use by sources".to_string()));
    }

    ConnectionStorage::delete(state.store.as_ref(), id).await?;
    tracing::info!("Deleted connection {}", id);

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Warehouse Handlers ====================

/// Create a new warehouse
pub async fn create_warehouse(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateWarehouseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if WarehouseStorage::get_by_name(state.store.as_ref(), &req.name)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Warehouse name already exists".to_string()));
    }

    let warehouse = Warehouse::new(req.name, req.s3_uri);
    let saved = WarehouseStorage::save(state.store.as_ref(), warehouse).await?;

    tracing::info!("Created warehouse '{}'", saved.name);

    Ok((StatusCode::CREATED, Json(saved)))
}

/// List all warehouses
pub async fn list_warehouses(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let warehouses = WarehouseStorage::list(state.store.as_ref()).await?;
    Ok(Json(warehouses))
}

/// Get a warehouse by ID
pub async fn get_warehouse(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let warehouse = WarehouseStorage::get_by_id(state.store.as_ref(), id).await?;

    match warehouse {
        Some(w) => Ok(Json(w)),
        None => Err(ApiError::NotFound(format!("Warehouse {} not found", id))),
    }
}

/// Update a warehouse
pub async fn update_warehouse(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateWarehouseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut warehouse = WarehouseStorage::get_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Warehouse {} not found", id)))?;

    if let Some(name) = req.name {
        if name != warehouse.name {
            if WarehouseStorage::get_by_name(state.store.as_ref(), &name)
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict("Warehouse name already exists".to_string()));
            }
            warehouse.name = name;
        }
    }
    if let Some(s3_uri) = req.s3_uri {
        warehouse.s3_uri = s3_uri;
    }

    let saved = WarehouseStorage::update(state.store.as_ref(), warehouse).await?;
    Ok(Json(saved))
}

/// Delete a warehouse
pub async fn delete_warehouse(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    WarehouseStorage::get_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Warehouse {} not found", id)))?;

    if SourceStorage::any_with_warehouse(state.store.as_ref(), id).await? {
        return Err(ApiError::Conflict("Warehouse in use by sources".to_string()));
    }

    WarehouseStorage::delete(state.store.as_ref(), id).await?;
    tracing::info!("Deleted warehouse {}", id);

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Policy Handlers ====================

/// Create a new policy
pub async fn create_policy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePolicyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if PolicyStorage::get_by_name(state.store.as_ref(), &req.name)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Policy name already exists".to_string()));
    }

    let policy = Policy::new(req.name, req.retention_value, req.rules_json);
    let saved = PolicyStorage::save(state.store.as_ref(), policy).await?;

    tracing::info!("Created policy '{}'", saved.name);

    Ok((StatusCode::CREATED, Json(saved)))
}

/// List all policies
pub async fn list_policies(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let policies = PolicyStorage::list(state.store.as_ref()).await?;
    Ok(Json(policies))
}

/// Get a policy by ID
pub async fn get_policy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let policy = PolicyStorage::get_by_id(state.store.as_ref(), id).await?;

    match policy {
        Some(p) => Ok(Json(p)),
        None => Err(ApiError::NotFound(format!("Policy {} not found", id))),
    }
}

/// Update a policy
pub async fn update_policy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePolicyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut policy = PolicyStorage::get_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Policy {} not found", id)))?;

    if let Some(name) = req.name {
        if name != policy.name {
            if PolicyStorage::get_by_name(state.store.as_ref(), &name)
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict("Policy name already exists".to_string()));
            }
            policy.name = name;
        }
    }
    if let Some(retention_value) = req.retention_value {
        policy.retention_value = retention_value;
    }
    if let Some(rules_json) = req.rules_json {
        policy.rules_json = rules_json;
    }

    let saved = PolicyStorage::update(state.store.as_ref(), policy).await?;
    Ok(Json(saved))
}

/// Delete a policy
pub async fn delete_policy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    PolicyStorage::get_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Policy {} not found", id)))?;

    let in_use_source = SourceStorage::any_with_policy(state.store.as_ref(), id).await?;
    let in_use_rule = RuleStorage::any_with_policy(state.store.as_ref(), id).await?;
    if in_use_source || in_use_rule {
        return Err(ApiError::Conflict("Policy in use by sources or rules".to_string()));
    }

    PolicyStorage::delete(state.store.as_ref(), id).await?;
    tracing::info!("Deleted policy {}", id);

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Source Handlers ====================

/// Validate that every foreign key on a source points at an existing record.
async fn validate_source_refs(
    state: &AppState,
    connection_id: Option<Uuid>,
    warehouse_id: Option<Uuid>,
    default_policy_id: Option<Uuid>,
) -> Result<(), ApiError> {
    if let Some(id) = connection_id {
        if ConnectionStorage::get_by_id(state.store.as_ref(), id)
            .await?
            .is_none()
        {
            return Err(ApiError::InvalidReference(format!(
                "Invalid reference id: Connection={}",
                id
            )));
        }
    }
    if let Some(id) = warehouse_id {
        if WarehouseStorage::get_by_id(state.store.as_ref(), id)
            .await?
            .is_none()
        {
            return Err(ApiError::InvalidReference(format!(
                "Invalid reference id: Warehouse={}",
                id
            )));
        }
    }
    if let Some(id) = default_policy_id {
        if PolicyStorage::get_by_id(state.store.as_ref(), id)
            .await?
            .is_none()
        {
            return Err(ApiError::InvalidReference(format!(
                "Invalid reference id: Policy={}",
                id
            )));
        }
    }
    Ok(())
}

/// Create a new source
pub async fn create_source(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSourceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if SourceStorage::get_by_name(state.store.as_ref(), &req.name)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Source name already exists".to_string()));
    }

    validate_source_refs(
        &state,
        Some(req.connection_id),
        Some(req.warehouse_id),
        Some(req.default_policy_id),
    )
    .await?;

    let source = Source::new(
        req.name,
        req.env,
        req.connection_id,
        req.warehouse_id,
        req.default_policy_id,
        req.legal_hold_default,
    );
    let saved = SourceStorage::save(state.store.as_ref(), source).await?;

    tracing::info!("Created source '{}'", saved.name);

    Ok((StatusCode::CREATED, Json(saved)))
}

/// List all sources
pub async fn list_sources(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sources = SourceStorage::list(state.store.as_ref()).await?;
    Ok(Json(sources))
}

/// Get a source by ID
pub async fn get_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let source = SourceStorage::get_by_id(state.store.as_ref(), id).await?;

    match source {
        Some(s) => Ok(Json(s)),
        None => Err(ApiError::NotFound(format!("Source {} not found", id))),
    }
}

/// Update a source
pub async fn update_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSourceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut source = load_source(&state, id).await?;

    if let Some(name) = req.name {
        if name != source.name {
            if SourceStorage::get_by_name(state.store.as_ref(), &name)
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict("Source name already exists".to_string()));
            }
            source.name = name;
        }
    }

    validate_source_refs(
        &state,
        req.connection_id,
        req.warehouse_id,
        req.default_policy_id,
    )
    .await?;

    if let Some(env) = req.env {
        source.env = env;
    }
    if let Some(connection_id) = req.connection_id {
        source.connection_id = connection_id;
    }
    if let Some(warehouse_id) = req.warehouse_id {
        source.warehouse_id = warehouse_id;
    }
    if let Some(default_policy_id) = req.default_policy_id {
        source.default_policy_id = default_policy_id;
    }
    if let Some(legal_hold_default) = req.legal_hold_default {
        source.legal_hold_default = legal_hold_default;
    }

    let saved = SourceStorage::update(state.store.as_ref(), source).await?;
    Ok(Json(saved))
}

/// Delete a source
pub async fn delete_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    load_source(&state, id).await?;

    if RuleStorage::any_for_source(state.store.as_ref(), id).await? {
        return Err(ApiError::Conflict(
            "Source has rules; delete rules first".to_string(),
        ));
    }

    SourceStorage::delete(state.store.as_ref(), id).await?;
    tracing::info!("Deleted source {}", id);

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Rule Handlers ====================

/// Load a rule scoped to its source or fail with 404.
async fn load_rule(state: &AppState, source_id: Uuid, rule_id: Uuid) -> Result<Rule, ApiError> {
    let rule = RuleStorage::get_by_id(state.store.as_ref(), rule_id).await?;
    match rule {
        Some(r) if r.source_id == source_id => Ok(r),
        _ => Err(ApiError::NotFound(format!("Rule {} not found", rule_id))),
    }
}

/// Validate the policy referenced by an override_policy kind, if any.
async fn validate_rule_policy(state: &AppState, kind: &RuleKind) -> Result<(), ApiError> {
    if let Some(policy_id) = kind.policy_override() {
        if PolicyStorage::get_by_id(state.store.as_ref(), policy_id)
            .await?
            .is_none()
        {
            return Err(ApiError::InvalidReference(format!(
                "Invalid reference id: Policy={}",
                policy_id
            )));
        }
    }
    Ok(())
}

/// List all rules of a source
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    Path(source_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    load_source(&state, source_id).await?;
    let rules = RuleStorage::list_for_source(state.store.as_ref(), source_id).await?;
    Ok(Json(rules))
}

/// Create a rule under a source
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Path(source_id): Path<Uuid>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    load_source(&state, source_id).await?;

    let kind = RuleKind::from_parts(req.rule_type, req.policy_id, req.legal_hold)?;
    validate_rule_policy(&state, &kind).await?;

    let rule = Rule::new(source_id, req.schema, req.table, kind);
    let saved = RuleStorage::save(state.store.as_ref(), rule).await?;

    tracing::info!(
        "Created {:?} rule on {}.{} for source {}",
        saved.kind.rule_type(),
        saved.schema,
        saved.table.as_deref().unwrap_or("*"),
        source_id
    );

    Ok((StatusCode::CREATED, Json(saved)))
}

/// Get a rule by ID
pub async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path((source_id, rule_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    load_source(&state, source_id).await?;
    let rule = load_rule(&state, source_id, rule_id).await?;
    Ok(Json(rule))
}

/// Update a rule.
///
/// The payload is re-normalized for the resulting type: the type-mandated
/// field must be present after merging the patch over the existing rule,
/// and the other payload field is dropped.
pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path((source_id, rule_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateRuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    load_source(&state, source_id).await?;
    let mut rule = load_rule(&state, source_id, rule_id).await?;

    let rule_type = req.rule_type.unwrap_or_else(|| rule.kind.rule_type());
    // An explicit null clears the field; an absent field keeps the value the
    // current kind carries, if any.
    let policy_id = match req.policy_id {
        Some(value) => value,
        None => rule.kind.policy_override(),
    };
    let legal_hold = match req.legal_hold {
        Some(value) => value,
        None => rule.kind.hold_override(),
    };

    let kind = RuleKind::from_parts(rule_type, policy_id, legal_hold)?;
    validate_rule_policy(&state, &kind).await?;

    if let Some(schema) = req.schema {
        rule.schema = schema;
    }
    if let Some(table) = req.table {
        rule.table = table;
    }
    rule.kind = kind;

    let saved = RuleStorage::update(state.store.as_ref(), rule).await?;
    Ok(Json(saved))
}

/// Delete a rule
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path((source_id, rule_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    load_source(&state, source_id).await?;
    let rule = load_rule(&state, source_id, rule_id).await?;

    RuleStorage::delete(state.store.as_ref(), rule.id).await?;
    tracing::info!("Deleted rule {} from source {}", rule.id, source_id);

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Engine Handlers ====================

#[derive(Debug, Deserialize)]
pub struct EffectiveQuery {
    pub schema: String,
    pub table: String,
}

/// Resolve the effective policy and legal hold for a (schema, table)
/// coordinate under a source
pub async fn effective_policy(
    State(state): State<Arc<AppState>>,
    Path(source_id): Path<Uuid>,
    Query(query): Query<EffectiveQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let effective = state
        .engine
        .resolve(source_id, &query.schema, &query.table)
        .await?;
    Ok(Json(effective))
}

/// Export the orchestration document for a source
pub async fn export_source_config(
    State(state): State<Arc<AppState>>,
    Path(source_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.engine.export_config(source_id).await?;
    Ok(Json(document))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "retention-hub"
    }))
}
