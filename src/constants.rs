//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Cache constants
pub mod cache {
    /// Maximum age for cached article pages (hours)
    pub const PAGE_TTL_HOURS: u64 = 24;

    /// Maximum age for cached images (hours, 1 week)
    pub const IMAGE_TTL_HOURS: u64 = 168;

    /// File extension for text cache entries
    pub const TEXT_EXT: &str = "json";

    /// File extension for binary cache entries
    pub const BINARY_EXT: &str = "bin";

    /// File suffix for binary sidecar metadata
    pub const META_SUFFIX: &str = "meta.json";
}

/// Image pipeline constants
pub mod image {
    /// Aspect ratio used when the request does not specify one
    pub const DEFAULT_ASPECT: &str = "4:3";

    /// Image formats the `/images` route will serve
    pub const SUPPORTED_EXTENSIONS: &[&str] = &["webp", "png", "jpg", "jpeg"];

    /// Cache-Control max-age for served images (seconds, 7 days)
    pub const CACHE_CONTROL_MAX_AGE_SECS: u64 = 604_800;

    /// Interval the client waits between readiness probes (milliseconds)
    pub const CLIENT_POLL_INTERVAL_MS: u64 = 2_000;

    /// Cache key prefix for image prompt records
    pub const PROMPT_KEY_PREFIX: &str = "prompt_";

    /// Cache key prefix for generated image binaries
    pub const BINARY_KEY_PREFIX: &str = "image_";
}

/// Content pipeline constants
pub mod content {
    /// Heading of the fixed closing section appended to every article
    pub const SEE_ALSO_HEADING: &str = "See also";

    /// Upper bound on outline sections accepted from the model
    pub const MAX_SECTIONS: usize = 12;

    /// Number of cross-reference links rendered in the "See also" section
    pub const SEE_ALSO_LINKS: usize = 6;
}

/// Search constants
pub mod search {
    /// Minimum trimmed query length before the LLM is consulted
    pub const MIN_QUERY_LEN: usize = 2;

    /// Maximum suggestions returned per query
    pub const MAX_SUGGESTIONS: usize = 8;
}

/// Server constants
pub mod server {
    /// Default bind address
    pub const DEFAULT_HOST: &str = "127.0.0.1";

    /// Default bind port
    pub const DEFAULT_PORT: u16 = 3000;
}
