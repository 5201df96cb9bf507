//! Service bootstrap utilities
//!
//! Startup banner, logging initialization and development environment setup
//! shared by the service binaries.

use crate::logging::{self, LogConfig};
use tracing::{info, Level};

/// Service metadata for startup
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// Service name (e.g., "ipamsrv")
    pub name: String,
    /// Service version from Cargo.toml
    pub version: String,
    /// Service description
    pub description: String,
    /// Default port
    pub default_port: u16,
}

impl ServiceInfo {
    /// Create new service info; `version` is the calling crate's version
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        default_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            default_port,
        }
    }
}

/// Print startup banner for a service
pub fn print_startup_banner(service: &ServiceInfo) {
    info!("");
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    info!(" Default Port: {}", service.default_port);
    info!("");
}

/// Options that shape the service logger
#[derive(Debug, Clone)]
pub struct LoggingOptions<'a> {
    /// Log directory from configuration (env `IPAMSRV_LOG_DIR` still wins)
    pub dir: Option<&'a str>,
    /// Default level when `RUST_LOG` is not set
    pub level: &'a str,
    /// Write `api_access` events to their own file
    pub enable_api_log: bool,
    /// JSON lines in the business log file
    pub json: bool,
}

/// Initialize logging for a service with standard configuration
pub fn init_logging(service: &ServiceInfo, options: &LoggingOptions<'_>) -> anyhow::Result<()> {
    logging::init_log_root(options.dir);

    logging::init_with_config(log_config(service, options))
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

fn log_config(service: &ServiceInfo, options: &LoggingOptions<'_>) -> LogConfig {
    LogConfig {
        service_name: service.name.clone(),
        log_dir: logging::get_log_root().join(&service.name),
        console_level: options.level.parse::<Level>().unwrap_or(Level::INFO),
        enable_json: options.json,
        enable_api_log: options.enable_api_log,
        ..Default::default()
    }
}

/// Load environment variables in development mode
///
/// In debug builds, reads `.env` and sets variables that are not already set.
/// Release builds expect the environment to be provided externally.
pub fn load_development_env() {
    #[cfg(debug_assertions)]
    {
        if let Ok(content) = std::fs::read_to_string(".env") {
            for (key, value) in parse_env_lines(&content) {
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }
}

/// Parse `KEY=VALUE` lines, skipping comments and blank lines
fn parse_env_lines(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"')))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
