//! Retention Hub API Server
//!
//! REST API for managing connections, warehouses, policies, sources, and
//! rules, plus the effective-policy resolution and orchestration export
//! endpoints.

pub mod error;
pub mod handlers;
pub mod seed;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Connections
        .route(
            "/v1/connections",
            post(handlers::create_connection).get(handlers::list_connections),
        )
        .route(
            "/v1/connections/:id",
            get(handlers::get_connection)
                .patch(handlers::update_connection)
                .delete(handlers::delete_connection),
        )
        // Warehouses
        .route(
            "/v1/warehouses",
            post(handlers::create_warehouse).get(handlers::list_warehouses),
        )
        .route(
            "/v1/warehouses/:id",
            get(handlers::get_warehouse)
                .patch(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
        // Policies
        .route(
            "/v1/policies",
            post(handlers::create_policy).get(handlers::list_policies),
        )
        .route(
            "/v1/policies/:id",
            get(handlers::get_policy)
                .patch(handlers::update_policy)
                .delete(handlers::delete_policy),
        )
        // Sources
        .route(
            "/v1/sources",
            post(handlers::create_source).get(handlers::list_sources),
        )
        .route(
            "/v1/sources/:source_id",
            get(handlers::get_source)
                .patch(handlers::update_source)
                .delete(handlers::delete_source),
        )
        // Engine entry points
        .route(
            "/v1/sources/:source_id/export",
            get(handlers::export_source_config),
        )
        .route(
            "/v1/sources/:source_id/policy/effective",
            get(handlers::effective_policy),
        )
        // Rules
        .route(
            "/v1/sources/:source_id/rules",
            post(handlers::create_rule).get(handlers::list_rules),
        )
        .route(
            "/v1/sources/:source_id/rules/:rule_id",
            get(handlers::get_rule)
                .patch(handlers::update_rule)
                .delete(handlers::delete_rule),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
