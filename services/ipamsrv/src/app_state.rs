//! Application State Management
//!
//! Shared by every API handler through `State<Arc<AppState>>`

use std::sync::Arc;

use phpipam::PhpIpamApi;
use tracing::info;

use crate::config::IpamsrvConfig;
use crate::probe::ProbeSettings;
use crate::storage::IpamStore;
use crate::sync::IpamSynchronizer;

pub struct AppState {
    pub config: Arc<IpamsrvConfig>,

    /// Connector registry and collection cache
    pub store: IpamStore,

    /// Connection tests and syncs (owns the per-connector locks)
    pub synchronizer: Arc<IpamSynchronizer>,

    pub probe: ProbeSettings,
}

impl AppState {
    pub fn new(config: Arc<IpamsrvConfig>, store: IpamStore, api: Arc<dyn PhpIpamApi>) -> Self {
        let synchronizer = Arc::new(IpamSynchronizer::new(
            store.clone(),
            api,
            config.phpipam_timeout(),
        ));
        let probe = config.probe_settings();

        info!(
            "App state ready (phpIPAM timeout {} ms, probe ports {}/{})",
            config.phpipam.timeout_ms, probe.api_port, probe.ssh_port
        );

        Self {
            config,
            store,
            synchronizer,
            probe,
        }
    }
}
