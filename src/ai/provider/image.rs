//! OpenAI-Style Image Generation Provider
//!
//! Image collaborator using an OpenAI-compatible image-generation endpoint.
//! The API returns a URL reference; the provider downloads it so the caller
//! always receives raw bytes ready for the binary cache.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{GeneratedImage, ImageGenerator};
use crate::config::ImageConfig;
use crate::types::{Result, WikiError};

/// Map an aspect-ratio string to the closest size the API accepts.
/// Unknown ratios fall back to the landscape default.
pub fn aspect_to_size(aspect: &str) -> &'static str {
    match aspect {
        "1:1" => "1024x1024",
        "16:9" | "4:3" | "3:2" => "1792x1024",
        "9:16" | "3:4" | "2:3" => "1024x1792",
        _ => "1792x1024",
    }
}

pub struct OpenAiImageProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiImageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiImageProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiImageProvider {
    pub fn new(config: ImageConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                WikiError::Config(
                    "Image API key not found. Set OPENAI_API_KEY env var or image.api_key in config"
                        .to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WikiError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base: config.api_base,
            model: config.model,
            client,
        })
    }

    /// Resolve the URL reference returned by the API down to raw bytes.
    async fn download(&self, reference: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(reference)
            .map_err(|e| WikiError::LlmApi(format!("Invalid image URL '{}': {}", reference, e)))?;

        debug!("Downloading generated image from {}", parsed.host_str().unwrap_or("?"));

        let response = self.client.get(parsed).send().await?;
        if !response.status().is_success() {
            return Err(WikiError::LlmApi(format!(
                "Image download failed ({})",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageProvider {
    async fn generate(&self, prompt: &str, aspect: &str) -> Result<GeneratedImage> {
        let url = format!("{}/images/generations", self.api_base);
        let size = aspect_to_size(aspect);

        info!("Generating image (model: {}, size: {})", self.model, size);

        let request = ImageGenerationRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: size.to_string(),
            response_format: "url".to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| WikiError::LlmApi(format!("Image request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WikiError::LlmApi(format!(
                "Image API error ({}): {}",
                status, body
            )));
        }

        let body: ImageGenerationResponse = response
            .json()
            .await
            .map_err(|e| WikiError::LlmApi(format!("Failed to parse image response: {}", e)))?;

        let reference = body
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or_else(|| WikiError::LlmApi("No image reference in response".to_string()))?;

        let bytes = self.download(&reference).await?;

        Ok(GeneratedImage {
            bytes,
            format: "png".to_string(),
        })
    }

    fn name(&self) -> &str {
        "openai-images"
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ImageGenerationRequest {
    model: String,
    prompt: String,
    n: u8,
    size: String,
    response_format: String,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_mapping() {
        assert_eq!(aspect_to_size("1:1"), "1024x1024");
        assert_eq!(aspect_to_size("4:3"), "1792x1024");
        assert_eq!(aspect_to_size("9:16"), "1024x1792");
        assert_eq!(aspect_to_size("weird"), "1792x1024");
    }
}
