//! Request and response bodies of the REST API

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{CollectionSet, ConnectionTest, IpamConnector};

/// `GET /api/ipams`
#[derive(Debug, Serialize)]
pub struct IpamListResponse {
    pub ipams: Vec<IpamConnector>,
    /// Keyed by connector id (serialised as a string key)
    pub collections: BTreeMap<i64, CollectionSet>,
}

/// `GET /api/ipams/{id}`: the connector fields plus its cached rows
#[derive(Debug, Serialize)]
pub struct IpamDetailsResponse {
    #[serde(flatten)]
    pub ipam: IpamConnector,
    pub collections: CollectionSet,
}

/// `POST /api/ipams`
#[derive(Debug, Serialize)]
pub struct IpamCreatedResponse {
    pub ipam: IpamConnector,
    pub test: ConnectionTest,
}

#[derive(Debug, Serialize)]
pub struct IpamResponse {
    pub ipam: IpamConnector,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// `POST /api/probe`; ports default to the configured ones
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRequest {
    pub host: Option<String>,
    pub api_port: Option<u16>,
    pub ssh_port: Option<u16>,
}
