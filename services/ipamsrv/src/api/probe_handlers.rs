//! Device Probe API Handler

use std::sync::Arc;

use axum::{extract::State, response::Json};

use crate::api::dto::ProbeRequest;
use crate::app_state::AppState;
use crate::error::{IpamsrvError, Result};
use crate::probe::{probe_device, DeviceProbe, ProbeSettings};

/// Check whether a router's API and SSH ports accept TCP connections
///
/// @route POST /api/probe
/// @input Json(request): ProbeRequest - host, optional apiPort/sshPort
/// @output Json<DeviceProbe> - `{host, api: {port, ok, error}, ssh: {port, ok, error}}`
/// @status 400 - Blank host
/// @side-effects Opens (and drops) two TCP connections
pub async fn probe_host(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProbeRequest>,
) -> Result<Json<DeviceProbe>> {
    let host = request
        .host
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| IpamsrvError::validation("host is required"))?;

    let settings = ProbeSettings {
        api_port: request.api_port.unwrap_or(state.probe.api_port),
        ssh_port: request.ssh_port.unwrap_or(state.probe.ssh_port),
        timeout: state.probe.timeout,
    };

    Ok(Json(probe_device(host, &settings).await))
}
