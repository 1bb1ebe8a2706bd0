//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/everwiki/config.toml)
//! 3. Explicit config file (--config)
//! 4. Environment variables (EVERWIKI_* prefix, `__` as section separator)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::debug;

use super::types::Config;
use crate::types::{Result, WikiError};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain:
    /// defaults → global config → explicit file → env vars
    pub fn load(config_file: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = config_file
            && path.exists()
        {
            debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        // EVERWIKI_SERVER__PORT=8080 -> server.port
        figment = figment.merge(Env::prefixed("EVERWIKI_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| WikiError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file only (plus defaults)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| WikiError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Path to the global config file, if a home directory exists
    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "everwiki").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[server]\nport = 8123\n\n[llm]\nmodel = \"test-model\"").unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.llm.model, "test-model");
        // Untouched sections keep defaults
        assert_eq!(config.cache.image_ttl_hours, 168);
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[llm]\ntemperature = 9.5").unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }
}
