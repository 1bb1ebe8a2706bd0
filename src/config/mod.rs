//! Configuration
//!
//! Layered configuration: built-in defaults, TOML files, and
//! `EVERWIKI_`-prefixed environment variables.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{CacheConfig, Config, ImageConfig, LlmConfig, ServerConfig, StorageConfig};
