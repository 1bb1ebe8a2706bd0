//! Everwiki - On-Demand AI Encyclopedia Server
//!
//! A web server that writes encyclopedia-style pages the moment they are
//! requested: a language model produces the outline, infobox, opening, and
//! section bodies; an image model illustrates them lazily; everything is
//! cached as flat files.
//!
//! ## Core Features
//!
//! - **Content Pipeline**: validate → outline → parallel section generation
//!   → assemble → cache → stream-to-client
//! - **Streaming Responses**: the document shell is sent while generation
//!   is still in flight
//! - **Flat-File Cache**: TTL-on-read key→content store for pages and
//!   image binaries
//! - **Valid-Page Registry**: persistent allow-list that skips repeat
//!   validation calls
//! - **Two-Phase Images**: prompt preparation during assembly, lazy
//!   generation on first request
//!
//! ## Modules
//!
//! - [`ai`]: collaborator providers and model-output repair
//! - [`content`]: the page generation pipeline
//! - [`images`]: the two-phase image pipeline
//! - [`cache`] / [`registry`]: persistent state
//! - [`server`]: axum routes and streaming handlers

pub mod ai;
pub mod cache;
pub mod config;
pub mod constants;
pub mod content;
pub mod images;
pub mod registry;
pub mod server;
pub mod slug;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::{Result, WikiError};

// Persistent State
pub use cache::{CacheStats, PageCache};
pub use registry::ValidPageRegistry;

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use content::{ContentPipeline, GeneratedPage, PageOutcome, PageResolution, Suggestion};
pub use images::{ImagePipeline, ImagePromptRecord, ImageServeOutcome};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    GeneratedImage, ImageGenerator, OpenAiImageProvider, OpenAiTextProvider,
    SharedImageGenerator, SharedTextGenerator, TextGenerator,
};
