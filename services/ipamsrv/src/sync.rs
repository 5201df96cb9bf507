//! phpIPAM synchronisation
//!
//! A sync mirrors one connector's sections, locations and subnets into the
//! local cache:
//!
//! ```text
//! sections/ ──(fatal)──┐
//! tools/locations/ ─┐  │
//!   └─ tools/sites/ ┴──┼──▶ replace_collections (one tx) ──▶ status
//! sections/<id>/subnets/ (per section, tolerated)
//! ```
//!
//! Only the sections call is required. Location and per-section subnet
//! failures are logged and contribute nothing.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use phpipam::{
    normalise_list, resolve_id, text_field, value_to_text, ApiTarget, FetchOptions, PhpIpamApi,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{IpamsrvError, Result};
use crate::models::{
    CollectionBatch, ConnectionTest, ConnectorStatus, IpamConnector, SyncSummary,
};
use crate::records;
use crate::storage::IpamStore;

pub const SECTIONS_ENDPOINT: &str = "sections/";
pub const LOCATIONS_ENDPOINT: &str = "tools/locations/";
pub const SITES_ENDPOINT: &str = "tools/sites/";
pub const USER_ENDPOINT: &str = "user/";

/// Keys that identify the authenticated principal in a `user/` answer
const PRINCIPAL_KEYS: &[&str] = &["username", "real_name", "name"];

fn subnets_endpoint(section_id: &Value) -> String {
    format!("sections/{}/subnets/", value_to_text(section_id))
}

/// Runs connection tests and syncs against phpIPAM
pub struct IpamSynchronizer {
    store: IpamStore,
    api: Arc<dyn PhpIpamApi>,
    timeout: Duration,
    /// One async mutex per connector; same-connector syncs queue up
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl IpamSynchronizer {
    pub fn new(store: IpamStore, api: Arc<dyn PhpIpamApi>, timeout: Duration) -> Self {
        Self {
            store,
            api,
            timeout,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &IpamStore {
        &self.store
    }

    fn strict(&self) -> FetchOptions {
        FetchOptions::default().with_timeout(self.timeout)
    }

    fn lenient(&self) -> FetchOptions {
        self.strict().allow_not_found()
    }

    fn connector_lock(&self, id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry of a deleted connector
    pub fn forget(&self, id: i64) {
        self.locks.remove(&id);
    }

    async fn load(&self, id: i64) -> Result<IpamConnector> {
        self.store
            .get_connector(id)
            .await?
            .ok_or_else(|| IpamsrvError::connector_not_found(id))
    }

    /// Mirror a connector's phpIPAM data into the cache
    ///
    /// On success the connector is marked `connected`; any failure after the
    /// connector was loaded marks it `failed` and is returned.
    ///
    /// # Errors
    /// `NotFound` for an unknown id (status untouched), `Upstream` when the
    /// sections call fails, `Database` when the replace fails.
    pub async fn sync(&self, id: i64) -> Result<SyncSummary> {
        // no lock entry for ids that do not exist
        self.load(id).await?;

        let lock = self.connector_lock(id);
        let _guard = lock.lock().await;

        // deleted while queued
        let connector = match self.load(id).await {
            Ok(connector) => connector,
            Err(e) => {
                self.forget(id);
                return Err(e);
            },
        };
        info!("Syncing IPAM integration {} ({})", id, connector.name);

        match self.run_sync(&connector).await {
            Ok(summary) => {
                self.store
                    .update_status(id, ConnectorStatus::Connected)
                    .await?;
                info!(
                    "IPAM integration {} synced: {} sections, {} datacenters, {} ranges",
                    id, summary.sections, summary.datacenters, summary.ranges
                );
                Ok(summary)
            },
            Err(e) => {
                warn!("IPAM integration {} sync failed: {}", id, e);
                if let Err(status_err) = self.store.update_status(id, ConnectorStatus::Failed).await
                {
                    warn!(
                        "Could not record failed status for integration {}: {}",
                        id, status_err
                    );
                }
                Err(e)
            },
        }
    }

    async fn run_sync(&self, connector: &IpamConnector) -> Result<SyncSummary> {
        let target = connector.target();

        let raw_sections = normalise_list(
            self.api
                .fetch(&target, SECTIONS_ENDPOINT, &self.strict())
                .await?,
        );
        let sections = raw_sections
            .iter()
            .map(records::section_record)
            .collect::<serde_json::Result<Vec<_>>>()?;

        let datacenters = self
            .fetch_locations(&target)
            .await
            .iter()
            .map(records::location_record)
            .collect::<serde_json::Result<Vec<_>>>()?;

        let mut ranges = Vec::new();
        for section in &raw_sections {
            let Some(section_id) = resolve_id(section, &[]) else {
                continue;
            };
            for subnet in self
                .fetch_tolerated(&target, &subnets_endpoint(&section_id))
                .await
            {
                ranges.push(records::range_record(&subnet, section, &section_id)?);
            }
        }

        let batch = CollectionBatch {
            sections,
            datacenters,
            ranges,
        };
        self.store.replace_collections(connector.id, &batch).await
    }

    /// Locations, falling back to sites on older phpIPAM releases
    async fn fetch_locations(&self, target: &ApiTarget) -> Vec<Value> {
        let locations = self.fetch_tolerated(target, LOCATIONS_ENDPOINT).await;
        if !locations.is_empty() {
            return locations;
        }
        self.fetch_tolerated(target, SITES_ENDPOINT).await
    }

    /// A call whose failure only costs its own records
    async fn fetch_tolerated(&self, target: &ApiTarget, endpoint: &str) -> Vec<Value> {
        match self.api.fetch(target, endpoint, &self.lenient()).await {
            Ok(data) => normalise_list(data),
            Err(e) => {
                warn!(endpoint, "Skipping phpIPAM {}: {}", endpoint, e);
                Vec::new()
            },
        }
    }

    /// Check credentials against `user/` and record the outcome
    pub async fn test_connection(&self, id: i64) -> Result<ConnectionTest> {
        let connector = self.load(id).await?;

        let (status, message) = match self
            .api
            .fetch(&connector.target(), USER_ENDPOINT, &self.strict())
            .await
        {
            Ok(payload) => (ConnectorStatus::Connected, success_message(&payload)),
            Err(e) => {
                warn!("IPAM integration {} test failed: {}", id, e);
                (ConnectorStatus::Failed, e.to_string())
            },
        };

        self.store.update_status(id, status).await?;

        Ok(ConnectionTest {
            ok: status == ConnectorStatus::Connected,
            status,
            message,
        })
    }
}

fn success_message(payload: &Value) -> String {
    let record = match payload {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    match record.and_then(|r| text_field(r, PRINCIPAL_KEYS)) {
        Some(principal) => format!("Authenticated as {}", principal),
        None => "Connection successful".to_string(),
    }
}
