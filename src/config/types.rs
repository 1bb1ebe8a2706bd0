//! Configuration Types
//!
//! All configuration structures with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{cache, server};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// On-disk storage layout
    pub storage: StorageConfig,

    /// Cache expiry tuning
    pub cache: CacheConfig,

    /// Language-model collaborator settings
    pub llm: LlmConfig,

    /// Image-generation collaborator settings
    pub image: ImageConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `WikiError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(crate::types::WikiError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(crate::types::WikiError::Config(
                "llm.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.image.timeout_secs == 0 {
            return Err(crate::types::WikiError::Config(
                "image.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root data directory; the cache directory and registry file live here
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl StorageConfig {
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("valid_pages.json")
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum age for cached article pages (hours)
    pub page_ttl_hours: u64,

    /// Maximum age for cached images (hours)
    pub image_ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            page_ttl_hours: cache::PAGE_TTL_HOURS,
            image_ttl_hours: cache::IMAGE_TTL_HOURS,
        }
    }
}

// =============================================================================
// LLM Collaborator Configuration
// =============================================================================

/// Configuration for the language-model collaborator
///
/// Note: API keys are handled securely - they are never serialized to output
/// and the provider converts the key to SecretString internally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name
    pub model: String,

    /// API base URL
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate per call
    pub max_tokens: usize,

    /// API key; falls back to the OPENAI_API_KEY environment variable
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            timeout_secs: 120,
            temperature: 0.7,
            max_tokens: 4096,
            api_key: None,
        }
    }
}

// =============================================================================
// Image Collaborator Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Image model name
    pub model: String,

    /// API base URL
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// API key; falls back to the OPENAI_API_KEY environment variable
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            timeout_secs: 180,
            api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.llm.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_paths_derive_from_data_dir() {
        let storage = StorageConfig {
            data_dir: PathBuf::from("/var/lib/everwiki"),
        };
        assert_eq!(storage.cache_dir(), PathBuf::from("/var/lib/everwiki/cache"));
        assert_eq!(
            storage.registry_path(),
            PathBuf::from("/var/lib/everwiki/valid_pages.json")
        );
    }
}
