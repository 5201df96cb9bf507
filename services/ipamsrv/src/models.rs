//! Connector and cached collection types

use std::fmt;

use phpipam::ApiTarget;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IpamsrvError, Result};

pub const DEFAULT_APP_PERMISSIONS: &str = "Read";
pub const DEFAULT_APP_SECURITY: &str = "SSL with App code token";

/// Outcome of the most recent test or sync of a connector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorStatus {
    #[default]
    Unknown,
    Connected,
    Failed,
}

impl ConnectorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }

    /// Unrecognised stored values read back as `Unknown`
    pub fn from_db(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "connected" => Self::Connected,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored phpIPAM integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpamConnector {
    pub id: i64,
    pub name: String,
    pub base_url: String,
    pub app_id: String,
    pub app_code: String,
    pub app_permissions: String,
    pub app_security: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_status: ConnectorStatus,
    pub last_checked_at: Option<String>,
}

impl IpamConnector {
    pub fn target(&self) -> ApiTarget {
        ApiTarget::new(&self.base_url, &self.app_id, &self.app_code)
    }
}

/// Create/update payload as received from the API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorInput {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub app_id: Option<String>,
    pub app_code: Option<String>,
    pub app_permissions: Option<String>,
    pub app_security: Option<String>,
}

/// Validated connector fields ready for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorDraft {
    pub name: String,
    pub base_url: String,
    pub app_id: String,
    /// `None` on update keeps the stored app code
    pub app_code: Option<String>,
    pub app_permissions: String,
    pub app_security: String,
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required(value: Option<&str>, field: &str) -> Result<String> {
    trimmed(value).ok_or_else(|| IpamsrvError::validation(format!("{} is required", field)))
}

/// Trim, require an absolute http(s) URL and drop trailing slashes
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let candidate = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(candidate)
        .map_err(|_| IpamsrvError::validation("baseUrl must be an absolute http(s) URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(IpamsrvError::validation(
            "baseUrl must be an absolute http(s) URL",
        ));
    }
    Ok(candidate.to_string())
}

impl ConnectorInput {
    /// Validate for creation: every credential field is required
    pub fn into_new_draft(self) -> Result<ConnectorDraft> {
        let draft = self.into_draft()?;
        if draft.app_code.is_none() {
            return Err(IpamsrvError::validation("appCode is required"));
        }
        Ok(draft)
    }

    /// Validate for update: a blank app code keeps the current one
    pub fn into_draft(self) -> Result<ConnectorDraft> {
        let name = required(self.name.as_deref(), "name")?;
        let base_url = normalize_base_url(&required(self.base_url.as_deref(), "baseUrl")?)?;
        let app_id = required(self.app_id.as_deref(), "appId")?;
        Ok(ConnectorDraft {
            name,
            base_url,
            app_id,
            app_code: trimmed(self.app_code.as_deref()),
            app_permissions: trimmed(self.app_permissions.as_deref())
                .unwrap_or_else(|| DEFAULT_APP_PERMISSIONS.to_string()),
            app_security: trimmed(self.app_security.as_deref())
                .unwrap_or_else(|| DEFAULT_APP_SECURITY.to_string()),
        })
    }
}

/// Tier of a cached phpIPAM object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    Section,
    Datacenter,
    Range,
}

impl CollectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Section => "section",
            Self::Datacenter => "datacenter",
            Self::Range => "range",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "section" => Some(Self::Section),
            "datacenter" => Some(Self::Datacenter),
            "range" => Some(Self::Range),
            _ => None,
        }
    }
}

/// Canonical record produced by a sync, before it gets a row id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRecord {
    pub name: String,
    pub description: Option<String>,
    pub metadata: Value,
}

/// Everything one sync writes for a connector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionBatch {
    pub sections: Vec<CollectionRecord>,
    pub datacenters: Vec<CollectionRecord>,
    pub ranges: Vec<CollectionRecord>,
}

impl CollectionBatch {
    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            sections: self.sections.len(),
            datacenters: self.datacenters.len(),
            ranges: self.ranges.len(),
        }
    }

    /// Records paired with their tier, in write order
    pub fn iter(&self) -> impl Iterator<Item = (CollectionType, &CollectionRecord)> {
        self.sections
            .iter()
            .map(|record| (CollectionType::Section, record))
            .chain(
                self.datacenters
                    .iter()
                    .map(|record| (CollectionType::Datacenter, record)),
            )
            .chain(self.ranges.iter().map(|record| (CollectionType::Range, record)))
    }
}

/// A cached row as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub id: i64,
    pub ipam_id: i64,
    pub collection_type: CollectionType,
    pub name: String,
    pub description: Option<String>,
    pub metadata: Value,
}

/// Cached rows of one connector grouped by tier
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionSet {
    pub sections: Vec<CollectionItem>,
    pub datacenters: Vec<CollectionItem>,
    pub ranges: Vec<CollectionItem>,
}

impl CollectionSet {
    pub fn push(&mut self, item: CollectionItem) {
        match item.collection_type {
            CollectionType::Section => self.sections.push(item),
            CollectionType::Datacenter => self.datacenters.push(item),
            CollectionType::Range => self.ranges.push(item),
        }
    }
}

/// Counts returned by a sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub sections: usize,
    pub datacenters: usize,
    pub ranges: usize,
}

/// Result of a connection test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub ok: bool,
    pub status: ConnectorStatus,
    pub message: String,
}
