//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! The taxonomy mirrors the request lifecycle: collaborator failures
//! (LLM, image API), malformed model output, topic rejection, and the
//! image pipeline's consistency errors. Cache misses are deliberately
//! NOT errors; the cache layer returns `Option` and degrades corrupt
//! entries to misses.
//!
//! ## Design Principles
//!
//! - Single unified error type (WikiError) for the entire application
//! - Structured variants with context for better debugging
//! - No panic/unwrap in non-test code - all errors are recoverable
//! - Collaborator failures are never silently retried by the core

use thiserror::Error;

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum WikiError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // Collaborator Errors
    // -------------------------------------------------------------------------
    /// The LLM API returned a non-success status or an unusable payload.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// JSON from the model could not be parsed even after structural repair.
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    /// The validation collaborator judged the topic unacceptable.
    /// Surfaced to the client as 404, never retried.
    #[error("Topic rejected: {0}")]
    TopicRejected(String),

    /// Any failure in outline/opening/section/infobox generation.
    /// Fatal for the whole page request; there is no partial-article fallback.
    #[error("Generation failed during {stage}: {reason}")]
    Generation { stage: &'static str, reason: String },

    // -------------------------------------------------------------------------
    // Image Pipeline Errors
    // -------------------------------------------------------------------------
    /// A referenced image has no registered prompt record. This indicates a
    /// pipeline consistency gap, not a transient condition.
    #[error("No prompt registered for image '{0}'")]
    PromptMissing(String),

    /// Image generation or download failed. Affects only that image request.
    #[error("Image generation failed for '{slug}': {reason}")]
    ImageGeneration { slug: String, reason: String },

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WikiError>;

// =============================================================================
// Helper Constructors
// =============================================================================

impl WikiError {
    /// Create a generation error for a named pipeline stage
    pub fn generation(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Generation {
            stage,
            reason: reason.into(),
        }
    }

    /// Create an image generation error
    pub fn image(slug: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImageGeneration {
            slug: slug.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error maps to a client-facing 404 rather than a 500
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TopicRejected(_) | Self::PromptMissing(_))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        let err = WikiError::generation("outline", "empty response");
        assert_eq!(
            err.to_string(),
            "Generation failed during outline: empty response"
        );
    }

    #[test]
    fn test_not_found_mapping() {
        assert!(WikiError::TopicRejected("gibberish".into()).is_not_found());
        assert!(WikiError::PromptMissing("Eiffel_Tower".into()).is_not_found());
        assert!(!WikiError::LlmApi("boom".into()).is_not_found());
        assert!(!WikiError::generation("section", "x").is_not_found());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: WikiError = io.into();
        assert!(matches!(err, WikiError::Io(_)));
    }
}
