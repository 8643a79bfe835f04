//! Configuration for migration runs.
//!
//! [`ShiftConfig::load`] reads `config/config.toml` (optional) and then `DBSHIFT__*`
//! environment variables, so `DBSHIFT__DATABASE_URL` overrides `database_url` from
//! the file. Command-line flags are applied on top by the caller.

use crate::migration::{CatalogLayout, DEFAULT_VERSION_TABLE};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "DBSHIFT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShiftConfig {
    /// Connection string; unset means the caller must supply one
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default)]
    pub layout: CatalogLayout,
    #[serde(default = "default_version_table")]
    pub version_table: String,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_version_table() -> String {
    DEFAULT_VERSION_TABLE.to_string()
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            catalog_path: default_catalog_path(),
            layout: CatalogLayout::default(),
            version_table: default_version_table(),
        }
    }
}

impl ShiftConfig {
    /// Load from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the given TOML file (which may be missing), then env vars.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // A file that exists but cannot be parsed is skipped with a warning.
                if path.exists() {
                    log::warn!(
                        "Failed to load config file {}, falling back to env: {}",
                        path.display(),
                        err
                    );
                }
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        settings.try_deserialize::<ShiftConfig>().map_err(|e| {
            ConfigError::Message(format!(
                "Migration configuration could not be loaded from file or environment: {}",
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ShiftConfig::default();
        assert_eq!(config.database_url, None);
        assert_eq!(config.catalog_path, PathBuf::from("migrations"));
        assert_eq!(config.layout, CatalogLayout::Directory);
        assert_eq!(config.version_table, "dbshift_version");
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "database_url = \"postgres://app@db/app\"\ncatalog_path = \"schema\"\nlayout = \"plain\"\nversion_table = \"app_version\"\n",
        )
        .unwrap();

        let config = ShiftConfig::load_from(&path).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://app@db/app"));
        assert_eq!(config.catalog_path, PathBuf::from("schema"));
        assert_eq!(config.layout, CatalogLayout::Plain);
        assert_eq!(config.version_table, "app_version");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ShiftConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.catalog_path, PathBuf::from("migrations"));
        assert_eq!(config.version_table, "dbshift_version");
    }
}
