//! Layered configuration loading
//!
//! Priority (highest to lowest):
//! 1. Environment variables `<SERVICE>_...` (nested keys split on `__`)
//! 2. Explicit config file passed on the command line
//! 3. `config/<service>.yaml`
//! 4. `config/<service>.toml`
//! 5. Built-in defaults

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Config file must have an extension: {0}")]
    MissingExtension(PathBuf),

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String),

    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),
}

impl From<figment::Error> for ConfigLoadError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Environment variable prefix for a service, e.g. `ipamsrv` -> `IPAMSRV_`
pub fn env_prefix(service_name: &str) -> String {
    format!("{}_", service_name.to_uppercase())
}

/// Merge a single config file, choosing the provider by extension
fn merge_file(figment: Figment, path: &Path) -> Result<Figment, ConfigLoadError> {
    if !path.exists() {
        return Err(ConfigLoadError::FileNotFound(path.to_path_buf()));
    }
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ConfigLoadError::MissingExtension(path.to_path_buf()))?;

    match extension {
        "toml" => Ok(figment.merge(Toml::file(path))),
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        "json" => Ok(figment.merge(Json::file(path))),
        other => Err(ConfigLoadError::UnsupportedFormat(other.to_string())),
    }
}

/// Build the layered figment for a service without extracting it
pub fn layered_figment<T: Serialize>(
    service_name: &str,
    defaults: &T,
    config_dir: &Path,
    explicit: Option<&Path>,
) -> Result<Figment, ConfigLoadError> {
    let mut figment = Figment::from(Serialized::defaults(defaults))
        .merge(Toml::file(config_dir.join(format!("{}.toml", service_name))))
        .merge(Yaml::file(config_dir.join(format!("{}.yaml", service_name))));

    if let Some(path) = explicit {
        figment = merge_file(figment, path)?;
    }

    Ok(figment.merge(Env::prefixed(&env_prefix(service_name)).split("__")))
}

/// Load a service configuration from `config/` plus environment overrides
pub fn load_config<T>(service_name: &str, explicit: Option<&Path>) -> Result<T, ConfigLoadError>
where
    T: Serialize + DeserializeOwned + Default,
{
    load_config_from_dir(service_name, Path::new("config"), explicit)
}

/// Same as [`load_config`] with a custom config directory
pub fn load_config_from_dir<T>(
    service_name: &str,
    config_dir: &Path,
    explicit: Option<&Path>,
) -> Result<T, ConfigLoadError>
where
    T: Serialize + DeserializeOwned + Default,
{
    let figment = layered_figment(service_name, &T::default(), config_dir, explicit)?;
    Ok(figment.extract()?)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Sample {
        port: u16,
        nested: Nested,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Nested {
        timeout_ms: u64,
        label: String,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                port: 4000,
                nested: Nested {
                    timeout_ms: 7000,
                    label: "default".to_string(),
                },
            }
        }
    }

    #[test]
    fn test_defaults_when_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg: Sample = load_config_from_dir("cfgtest_defaults", dir.path(), None).unwrap();
        assert_eq!(cfg, Sample::default());
    }

    #[test]
    fn test_file_layers_and_env_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cfgtest_layers.toml"),
            "port = 5000\n[nested]\nlabel = \"from-toml\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("cfgtest_layers.yaml"),
            "nested:\n  label: from-yaml\n",
        )
        .unwrap();
        std::env::set_var("CFGTEST_LAYERS_NESTED__TIMEOUT_MS", "1234");

        let cfg: Sample = load_config_from_dir("cfgtest_layers", dir.path(), None).unwrap();
        std::env::remove_var("CFGTEST_LAYERS_NESTED__TIMEOUT_MS");

        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.nested.label, "from-yaml");
        assert_eq!(cfg.nested.timeout_ms, 1234);
    }

    #[test]
    fn test_explicit_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("override.json");
        std::fs::write(&explicit, r#"{"port": 6000}"#).unwrap();

        let cfg: Sample =
            load_config_from_dir("cfgtest_explicit", dir.path(), Some(&explicit)).unwrap();
        assert_eq!(cfg.port, 6000);
        assert_eq!(cfg.nested.timeout_ms, 7000);

        let bad = dir.path().join("override.ini");
        std::fs::write(&bad, "port=1").unwrap();
        let err = load_config_from_dir::<Sample>("cfgtest_explicit", dir.path(), Some(&bad))
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedFormat(ext) if ext == "ini"));

        let missing = dir.path().join("absent.toml");
        let err = load_config_from_dir::<Sample>("cfgtest_explicit", dir.path(), Some(&missing))
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound(_)));
    }
}
