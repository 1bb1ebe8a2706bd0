//! Collaborator Provider Abstraction
//!
//! Traits for the two external collaborators the pipeline drives: a
//! language-model service for article text and an image-generation service
//! for illustrations. Both are fallible request/response contracts (topic
//! in, text/JSON/binary out), and the core never retries them; failures
//! propagate as the terminal outcome of the calling request.
//!
//! Tests inject in-memory fakes through these traits; production wires the
//! OpenAI-style implementations below.

mod image;
mod openai;

pub use image::{OpenAiImageProvider, aspect_to_size};
pub use openai::OpenAiTextProvider;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::ai::validation::parse_or_repair;
use crate::types::Result;

/// Shared handle passed into the pipelines
pub type SharedTextGenerator = Arc<dyn TextGenerator>;
pub type SharedImageGenerator = Arc<dyn ImageGenerator>;

// =============================================================================
// Language Model Collaborator
// =============================================================================

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Free-form completion: structured instruction plus topic input.
    async fn complete(&self, instruction: &str, input: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// JSON completion: free-form call followed by one structural repair
    /// pass. A parse failure after repair is a hard error for this call.
    async fn complete_json(&self, instruction: &str, input: &str) -> Result<Value> {
        let raw = self.complete(instruction, input).await?;
        parse_or_repair(&raw).map(|(value, _)| value)
    }
}

// =============================================================================
// Image Generation Collaborator
// =============================================================================

/// An image resolved to raw bytes, ready for caching
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    /// Image format as served (file extension without the dot)
    pub format: String,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image for a stored prompt at the requested aspect ratio.
    /// The provider resolves whatever reference the API returns (URL or
    /// payload) down to raw bytes.
    async fn generate(&self, prompt: &str, aspect: &str) -> Result<GeneratedImage>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
