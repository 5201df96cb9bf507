//! Shared building blocks for the IPAM services
//!
//! - logging (console + rolling files, HTTP access log middleware)
//! - SQLite connection pool
//! - layered configuration loading
//! - service bootstrap and shutdown helpers

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod config_loader;
pub mod logging;
pub mod service_bootstrap;
pub mod shutdown;

pub use config_loader::{load_config, ConfigLoadError};
pub use service_bootstrap::{ServiceInfo, LoggingOptions};
