//! ipamsrv configuration
//!
//! Loaded through `common::config_loader`: built-in defaults, then
//! `config/ipamsrv.toml`, `config/ipamsrv.yaml`, an optional `--config` file
//! and finally `IPAMSRV_*` environment variables (`IPAMSRV_API__PORT=4100`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IpamsrvError, Result};
use crate::probe::ProbeSettings;

pub const SERVICE_NAME: &str = "ipamsrv";
pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IpamsrvConfig {
    pub service: ServiceSection,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub phpipam: PhpIpamConfig,
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceSection {
    pub name: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: SERVICE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/ipamsrv.db".to_string(),
            max_connections: common::sqlite::DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub level: String,
    pub enable_api_log: bool,
    /// Write the business log file as JSON lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            level: "info".to_string(),
            enable_api_log: true,
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhpIpamConfig {
    /// Per-call timeout for phpIPAM requests
    pub timeout_ms: u64,
}

impl Default for PhpIpamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: phpipam::DEFAULT_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_ms: u64,
    /// RouterOS API port
    pub api_port: u16,
    pub ssh_port: u16,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            api_port: 8728,
            ssh_port: 22,
        }
    }
}

impl IpamsrvConfig {
    /// Load the layered configuration
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Ok(common::load_config(SERVICE_NAME, explicit)?)
    }

    /// Load from a specific config directory (used by tests)
    pub fn load_from_dir(config_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        Ok(common::config_loader::load_config_from_dir(
            SERVICE_NAME,
            config_dir,
            explicit,
        )?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.port == 0 {
            return Err(IpamsrvError::Config("api.port must not be 0".to_string()));
        }
        if self.api.host.trim().is_empty() {
            return Err(IpamsrvError::Config("api.host must not be empty".to_string()));
        }
        if self.database.path.trim().is_empty() {
            return Err(IpamsrvError::Config(
                "database.path must not be empty".to_string(),
            ));
        }
        if self.phpipam.timeout_ms == 0 {
            return Err(IpamsrvError::Config(
                "phpipam.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.probe.timeout_ms == 0 {
            return Err(IpamsrvError::Config(
                "probe.timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn phpipam_timeout(&self) -> Duration {
        Duration::from_millis(self.phpipam.timeout_ms)
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            api_port: self.probe.api_port,
            ssh_port: self.probe.ssh_port,
            timeout: Duration::from_millis(self.probe.timeout_ms),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IpamsrvConfig::default();
        assert_eq!(config.api.port, 4000);
        assert_eq!(config.phpipam.timeout_ms, 7000);
        assert_eq!(config.probe.api_port, 8728);
        assert_eq!(config.probe.ssh_port, 22);
        assert_eq!(config.bind_address(), "0.0.0.0:4000");
        assert!(!config.logging.json);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ipamsrv.yaml"),
            "api:\n  port: 4100\nphpipam:\n  timeout_ms: 2500\nlogging:\n  json: true\n",
        )
        .unwrap();

        let config = IpamsrvConfig::load_from_dir(dir.path(), None).unwrap();
        assert_eq!(config.api.port, 4100);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.phpipam_timeout(), Duration::from_millis(2500));
        assert_eq!(config.database.path, "data/ipamsrv.db");
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = IpamsrvConfig::default();
        config.phpipam.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(IpamsrvError::Config(_))));

        let mut config = IpamsrvConfig::default();
        config.api.port = 0;
        assert!(config.validate().is_err());

        let mut config = IpamsrvConfig::default();
        config.database.path = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
