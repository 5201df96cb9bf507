//! API Route Configuration
//!
//! Central route definition for all ipamsrv endpoints

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::health_handlers::health_check;
use crate::api::ipam_handlers::{
    create_ipam, delete_ipam, get_ipam, list_ipams, sync_ipam, test_ipam, update_ipam,
};
use crate::api::probe_handlers::probe_host;
use crate::app_state::AppState;

/// Create all API routes
pub fn create_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // IPAM integrations
        .route("/api/ipams", get(list_ipams).post(create_ipam))
        .route(
            "/api/ipams/{id}",
            get(get_ipam).put(update_ipam).delete(delete_ipam),
        )
        .route("/api/ipams/{id}/test", post(test_ipam))
        .route("/api/ipams/{id}/sync", post(sync_ipam))
        // Device reachability
        .route("/api/probe", post(probe_host))
        .layer(axum::middleware::from_fn(common::logging::http_request_logger))
        .with_state(state)
}
