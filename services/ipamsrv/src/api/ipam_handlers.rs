//! IPAM Integration API Handlers
//!
//! Connector CRUD, connection tests and collection syncs.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

use crate::api::dto::{
    DeleteResponse, IpamCreatedResponse, IpamDetailsResponse, IpamListResponse, IpamResponse,
};
use crate::app_state::AppState;
use crate::error::{IpamsrvError, Result};
use crate::models::{ConnectionTest, ConnectorInput, SyncSummary};

/// List connectors with their cached collections
///
/// @route GET /api/ipams
/// @output Json<IpamListResponse> - `{ipams, collections: {"<id>": {...}}}`
/// @status 500 - Database error
/// @side-effects None (read-only operation)
pub async fn list_ipams(State(state): State<Arc<AppState>>) -> Result<Json<IpamListResponse>> {
    let ipams = state.store.list_connectors().await?;
    let collections = state.store.all_collections().await?;
    Ok(Json(IpamListResponse { ipams, collections }))
}

/// Register a phpIPAM integration and test it right away
///
/// @route POST /api/ipams
/// @input Json(input): ConnectorInput - name, baseUrl, appId, appCode (+ optional permissions/security)
/// @output (201, Json<IpamCreatedResponse>) - stored connector and test outcome
/// @status 400 - Missing field or invalid baseUrl
/// @status 409 - Same baseUrl and appId already registered
/// @side-effects Inserts the connector, calls phpIPAM `user/`, records the status
pub async fn create_ipam(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ConnectorInput>,
) -> Result<(StatusCode, Json<IpamCreatedResponse>)> {
    let draft = input.into_new_draft()?;
    let created = state.store.create_connector(&draft).await?;

    let test = state.synchronizer.test_connection(created.id).await?;
    let ipam = state
        .store
        .get_connector(created.id)
        .await?
        .ok_or_else(|| IpamsrvError::connector_not_found(created.id))?;

    Ok((StatusCode::CREATED, Json(IpamCreatedResponse { ipam, test })))
}

/// One connector with its cached collections
///
/// @route GET /api/ipams/{id}
/// @output Json<IpamDetailsResponse>
/// @status 404 - Unknown connector
pub async fn get_ipam(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<IpamDetailsResponse>> {
    let ipam = state
        .store
        .get_connector(id)
        .await?
        .ok_or_else(|| IpamsrvError::connector_not_found(id))?;
    let collections = state.store.list_collections(id).await?;
    Ok(Json(IpamDetailsResponse { ipam, collections }))
}

/// Update connector settings
///
/// A blank or missing appCode keeps the stored one.
///
/// @route PUT /api/ipams/{id}
/// @input Json(input): ConnectorInput
/// @output Json<IpamResponse>
/// @status 400 - Missing field or invalid baseUrl
/// @status 404 - Unknown connector
/// @status 409 - Collides with another connector
pub async fn update_ipam(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<ConnectorInput>,
) -> Result<Json<IpamResponse>> {
    let draft = input.into_draft()?;
    let ipam = state.store.update_connector(id, &draft).await?;
    Ok(Json(IpamResponse { ipam }))
}

/// Delete a connector and its cached collections
///
/// @route DELETE /api/ipams/{id}
/// @output Json<DeleteResponse>
/// @status 404 - Unknown connector
pub async fn delete_ipam(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    state.store.delete_connector(id).await?;
    state.synchronizer.forget(id);
    Ok(Json(DeleteResponse { success: true }))
}

/// Test the stored credentials against phpIPAM
///
/// phpIPAM failures are reported in the body, not as an error status.
///
/// @route POST /api/ipams/{id}/test
/// @output Json<ConnectionTest> - `{ok, status, message}`
/// @status 404 - Unknown connector
/// @side-effects Updates lastStatus and lastCheckedAt
pub async fn test_ipam(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ConnectionTest>> {
    let result = state.synchronizer.test_connection(id).await?;
    info!("IPAM integration {} test: {}", id, result.status);
    Ok(Json(result))
}

/// Mirror sections, locations and subnets into the cache
///
/// @route POST /api/ipams/{id}/sync
/// @output Json<SyncSummary> - `{sections, datacenters, ranges}`
/// @status 404 - Unknown connector
/// @status 502 - Sections fetch failed; cache left untouched
/// @side-effects Replaces the connector's collections, updates lastStatus
pub async fn sync_ipam(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SyncSummary>> {
    let summary = state.synchronizer.sync(id).await?;
    Ok(Json(summary))
}
