//! ipamsrv library exports for testing
//!
//! phpIPAM integrations for the router console: a connector registry,
//! connection tests, and a sync that mirrors sections, locations and subnets
//! into SQLite. Also hosts a TCP reachability probe for RouterOS devices.

pub mod api;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod models;
pub mod probe;
pub mod records;
pub mod routes;
pub mod storage;
pub mod sync;

pub use app_state::AppState;
pub use config::IpamsrvConfig;
pub use error::{IpamsrvError, Result};
pub use storage::IpamStore;
pub use sync::IpamSynchronizer;
