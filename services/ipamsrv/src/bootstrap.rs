//! Service Bootstrap and Initialization
//!
//! Command line, configuration, logging and component setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use common::service_bootstrap::{self, LoggingOptions, ServiceInfo};
use common::sqlite::SqliteClient;
use phpipam::PhpIpamClient;
use tracing::{debug, info};

use crate::app_state::AppState;
use crate::config::{IpamsrvConfig, DEFAULT_PORT, SERVICE_NAME};
use crate::error::{IpamsrvError, Result};
use crate::storage::IpamStore;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "ipamsrv - phpIPAM integration service")]
pub struct Args {
    /// Extra configuration file (toml, yaml or json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Listen address, `host:port`
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<String>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Load and validate the configuration, then exit
    #[arg(long)]
    pub validate: bool,
}

pub fn create_service_info() -> ServiceInfo {
    ServiceInfo::new(
        SERVICE_NAME,
        env!("CARGO_PKG_VERSION"),
        "phpIPAM Integration Service",
        DEFAULT_PORT,
    )
}

/// Split `host:port`; the last colon separates the port
fn parse_bind(bind: &str) -> Result<(String, u16)> {
    let (host, port) = bind
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| IpamsrvError::Config(format!("--bind expects host:port, got '{}'", bind)))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| IpamsrvError::Config(format!("invalid port in --bind '{}'", bind)))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    Ok((host.to_string(), port))
}

/// Layered configuration with command line overrides on top
pub fn load_configuration(args: &Args) -> Result<IpamsrvConfig> {
    let mut config = IpamsrvConfig::load(args.config.as_deref())?;
    apply_overrides(&mut config, args)?;
    Ok(config)
}

fn apply_overrides(config: &mut IpamsrvConfig, args: &Args) -> Result<()> {
    if let Some(bind) = &args.bind {
        let (host, port) = parse_bind(bind)?;
        config.api.host = host;
        config.api.port = port;
    }
    if let Some(path) = &args.db_path {
        config.database.path = path.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    Ok(())
}

/// Initialize logging and print the banner
pub fn init_environment(service_info: &ServiceInfo, config: &IpamsrvConfig) -> Result<()> {
    service_bootstrap::load_development_env();

    service_bootstrap::init_logging(
        service_info,
        &LoggingOptions {
            dir: Some(config.logging.dir.as_str()),
            level: &config.logging.level,
            enable_api_log: config.logging.enable_api_log,
            json: config.logging.json,
        },
    )
    .map_err(|e| IpamsrvError::Config(format!("Failed to initialize logging: {}", e)))?;

    service_bootstrap::print_startup_banner(service_info);
    Ok(())
}

pub fn validate_configuration(config: &IpamsrvConfig) -> Result<()> {
    debug!("Validating config");
    config.validate()?;
    debug!("Config valid");
    Ok(())
}

/// Open SQLite, create the schema and wire the phpIPAM client
pub async fn create_app_state(config: IpamsrvConfig) -> Result<Arc<AppState>> {
    info!("SQLite: {}", config.database.path);
    let sqlite = SqliteClient::with_max_connections(
        &config.database.path,
        config.database.max_connections,
    )
    .await?;

    let store = IpamStore::new(sqlite.pool().clone());
    store.init_schema().await?;

    let client = PhpIpamClient::new()?;
    Ok(Arc::new(AppState::new(
        Arc::new(config),
        store,
        Arc::new(client),
    )))
}
