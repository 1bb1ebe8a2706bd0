//! Image Pipeline
//!
//! Two-phase illustration generation, decoupled from page-render latency.
//!
//! **Phase A (prompt preparation)** runs after content assembly: the page
//! pipeline returns its discovered image references, the server pre-registers
//! a *generating* record per image, and a single batched LLM call produces
//! one short prompt per image. If the batch fails, deterministic fallback
//! prompts derived from the captions are stored instead; prompt preparation
//! never fails permanently for an image that was referenced in rendered
//! content.
//!
//! **Phase B (image serving)** runs on `GET /images/{slug}.{ext}`: a cached
//! binary within the TTL is served directly; otherwise the prompt record
//! gates the call to the image collaborator. A missing record is a
//! consistency bug surfaced as 404; a not-yet-ready record answers 202 so
//! the client can poll.
//!
//! Records live in a `DashMap` and are mirrored through the disk cache, so
//! a restart does not orphan images referenced by already-cached pages.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ai::{SharedImageGenerator, SharedTextGenerator};
use crate::cache::PageCache;
use crate::constants::image::{BINARY_KEY_PREFIX, PROMPT_KEY_PREFIX, SUPPORTED_EXTENSIONS};
use crate::content::figures::ImageReference;
use crate::content::prompts::Prompts;
use crate::types::{Result, WikiError};

// =============================================================================
// Prompt Records
// =============================================================================

/// Lifecycle record for one image's prompt.
///
/// Two states: *generating* (prompt None, ready false) and *ready* (prompt
/// Some, ready true). A record never transitions back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePromptRecord {
    pub image_slug: String,
    pub prompt: Option<String>,
    pub article_title: String,
    pub ready: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImagePromptRecord {
    fn generating(slug: &str, article_title: &str) -> Self {
        let now = Utc::now();
        Self {
            image_slug: slug.to_string(),
            prompt: None,
            article_title: article_title.to_string(),
            ready: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of a Phase B serve attempt
#[derive(Debug)]
pub enum ImageServeOutcome {
    /// Bytes ready to send with long-lived cache headers
    Ready { bytes: Vec<u8>, format: String },
    /// Prompt still generating; the route answers 202
    Pending,
}

/// Whether the `/images` route serves this extension at all
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

// =============================================================================
// Pipeline
// =============================================================================

pub struct ImagePipeline {
    llm: SharedTextGenerator,
    generator: SharedImageGenerator,
    cache: Arc<PageCache>,
    records: DashMap<String, ImagePromptRecord>,
    image_ttl_hours: u64,
}

impl ImagePipeline {
    pub fn new(
        llm: SharedTextGenerator,
        generator: SharedImageGenerator,
        cache: Arc<PageCache>,
        image_ttl_hours: u64,
    ) -> Self {
        Self {
            llm,
            generator,
            cache,
            records: DashMap::new(),
            image_ttl_hours,
        }
    }

    // =========================================================================
    // Phase A: prompt preparation
    // =========================================================================

    /// Pre-register a *generating* marker for every reference that has no
    /// record yet. Runs before the page body is streamed, so a concurrent
    /// image request observes 202 rather than 404. Ready records are never
    /// downgraded.
    pub async fn register_pending(&self, article_title: &str, refs: &[ImageReference]) {
        for reference in refs {
            if self.lookup(&reference.slug).await.is_some() {
                continue;
            }
            let record = ImagePromptRecord::generating(&reference.slug, article_title);
            self.store(record).await;
        }
        debug!(
            "Registered pending prompts for {} image(s) of '{}'",
            refs.len(),
            article_title
        );
    }

    /// One batched LLM call producing a prompt per image; falls back to
    /// deterministic caption-derived prompts if the batch fails. Every
    /// referenced image ends ready.
    pub async fn prepare_prompts(&self, article_title: &str, refs: &[ImageReference]) {
        let pending: Vec<&ImageReference> = {
            let mut pending = Vec::new();
            for reference in refs {
                match self.lookup(&reference.slug).await {
                    Some(record) if record.ready => {}
                    _ => pending.push(reference),
                }
            }
            pending
        };

        if pending.is_empty() {
            return;
        }

        let prompts = match self.request_prompt_batch(article_title, &pending).await {
            Ok(prompts) => prompts,
            Err(e) => {
                warn!(
                    "Batched prompt generation failed for '{}', using fallbacks: {}",
                    article_title, e
                );
                HashMap::new()
            }
        };

        for reference in pending {
            let prompt = prompts
                .get(&reference.slug)
                .cloned()
                .unwrap_or_else(|| fallback_prompt(article_title, reference));

            let now = Utc::now();
            let record = ImagePromptRecord {
                image_slug: reference.slug.clone(),
                prompt: Some(prompt),
                article_title: article_title.to_string(),
                ready: true,
                created_at: self
                    .lookup(&reference.slug)
                    .await
                    .map(|r| r.created_at)
                    .unwrap_or(now),
                updated_at: now,
            };
            self.store(record).await;
        }

        info!("Prompts ready for '{}'", article_title);
    }

    async fn request_prompt_batch(
        &self,
        article_title: &str,
        refs: &[&ImageReference],
    ) -> Result<HashMap<String, String>> {
        let listing = serde_json::to_string(
            &refs
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "slug": r.slug,
                        "caption": r.caption,
                    })
                })
                .collect::<Vec<_>>(),
        )?;

        let value = self
            .llm
            .complete_json(&Prompts::image_prompts(article_title), &listing)
            .await?;

        let mut prompts = HashMap::new();
        if let Some(list) = value.get("prompts").and_then(Value::as_array) {
            for item in list {
                if let (Some(slug), Some(prompt)) = (
                    item.get("slug").and_then(Value::as_str),
                    item.get("prompt").and_then(Value::as_str),
                ) && !prompt.trim().is_empty()
                {
                    prompts.insert(slug.to_string(), prompt.trim().to_string());
                }
            }
        }
        Ok(prompts)
    }

    // =========================================================================
    // Phase B: image serving
    // =========================================================================

    /// Serve one image request. Errors: `PromptMissing` when the content
    /// pipeline never registered this slug (404), `ImageGeneration` when the
    /// collaborator or download fails (500 for this image only).
    pub async fn serve(&self, slug: &str, ext: &str, aspect: &str) -> Result<ImageServeOutcome> {
        let key = format!("{}{}", BINARY_KEY_PREFIX, slug);

        if self.cache.is_cached(&key, self.image_ttl_hours, true).await
            && let Some(entry) = self.cache.get_binary(&key).await
        {
            debug!("Serving cached image '{}'", slug);
            let format = entry
                .metadata
                .get("format")
                .cloned()
                .unwrap_or_else(|| ext.to_string());
            return Ok(ImageServeOutcome::Ready {
                bytes: entry.bytes,
                format,
            });
        }

        let record = self
            .lookup(slug)
            .await
            .ok_or_else(|| WikiError::PromptMissing(slug.to_string()))?;

        if !record.ready {
            return Ok(ImageServeOutcome::Pending);
        }
        let Some(prompt) = record.prompt.clone() else {
            return Ok(ImageServeOutcome::Pending);
        };

        info!("Generating image '{}' (aspect {})", slug, aspect);
        let image = self
            .generator
            .generate(&prompt, aspect)
            .await
            .map_err(|e| WikiError::image(slug, e.to_string()))?;

        let mut metadata = HashMap::new();
        metadata.insert("filename".to_string(), format!("{}.{}", slug, ext));
        metadata.insert("title".to_string(), record.article_title.clone());
        metadata.insert("format".to_string(), image.format.clone());
        metadata.insert("generated_at".to_string(), Utc::now().to_rfc3339());
        self.cache.set_binary(&key, &image.bytes, metadata).await;

        Ok(ImageServeOutcome::Ready {
            bytes: image.bytes,
            format: image.format,
        })
    }

    // =========================================================================
    // Record store (memory + disk mirror)
    // =========================================================================

    async fn lookup(&self, slug: &str) -> Option<ImagePromptRecord> {
        if let Some(record) = self.records.get(slug) {
            return Some(record.clone());
        }

        // Fall back to the disk mirror (e.g. after a restart)
        let raw = self
            .cache
            .get_text(&format!("{}{}", PROMPT_KEY_PREFIX, slug))
            .await?;
        match serde_json::from_str::<ImagePromptRecord>(&raw) {
            Ok(record) => {
                self.records.insert(slug.to_string(), record.clone());
                Some(record)
            }
            Err(e) => {
                warn!("Corrupt prompt record for '{}': {}", slug, e);
                None
            }
        }
    }

    async fn store(&self, record: ImagePromptRecord) {
        let key = format!("{}{}", PROMPT_KEY_PREFIX, record.image_slug);
        if let Ok(serialized) = serde_json::to_string(&record) {
            self.cache.set_text(&key, &serialized).await;
        }
        self.records.insert(record.image_slug.clone(), record);
    }
}

/// Deterministic prompt used when batched generation fails
fn fallback_prompt(article_title: &str, reference: &ImageReference) -> String {
    format!(
        "A realistic encyclopedia illustration of {} for an article about {}",
        reference.caption, article_title
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    use crate::ai::{GeneratedImage, ImageGenerator, TextGenerator};
    use crate::content::figures::extract_image_references;

    struct BatchLlm {
        fail: bool,
    }

    #[async_trait]
    impl TextGenerator for BatchLlm {
        async fn complete(&self, _instruction: &str, input: &str) -> Result<String> {
            if self.fail {
                return Err(WikiError::LlmApi("batch unavailable".to_string()));
            }
            let refs: Vec<Value> = serde_json::from_str(input).unwrap();
            let prompts: Vec<Value> = refs
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "slug": r["slug"],
                        "prompt": format!("prompt for {}", r["slug"].as_str().unwrap()),
                    })
                })
                .collect();
            Ok(serde_json::json!({ "prompts": prompts }).to_string())
        }

        fn name(&self) -> &str {
            "batch"
        }
    }

    struct CountingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageGenerator for CountingGenerator {
        async fn generate(&self, _prompt: &str, _aspect: &str) -> Result<GeneratedImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GeneratedImage {
                bytes: vec![0xAB; 32],
                format: "png".to_string(),
            })
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn sample_refs() -> Vec<ImageReference> {
        extract_image_references(
            "[[Image:Eiffel_Tower.webp|figure|4:3|The tower at dusk]]\n[[Image:Seine_River.webp|figure|16:9|The river]]",
        )
    }

    fn pipeline_in(dir: &TempDir, fail_batch: bool) -> (ImagePipeline, Arc<CountingGenerator>) {
        let cache = Arc::new(PageCache::new(dir.path()));
        let generator = Arc::new(CountingGenerator {
            calls: AtomicUsize::new(0),
        });
        let pipeline = ImagePipeline::new(
            Arc::new(BatchLlm { fail: fail_batch }),
            Arc::clone(&generator) as SharedImageGenerator,
            cache,
            168,
        );
        (pipeline, generator)
    }

    #[tokio::test]
    async fn test_unregistered_image_is_prompt_missing() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_in(&dir, false);

        let err = pipeline.serve("Eiffel_Tower", "webp", "4:3").await.unwrap_err();
        assert!(matches!(err, WikiError::PromptMissing(_)));
    }

    #[tokio::test]
    async fn test_pending_record_answers_pending() {
        let dir = TempDir::new().unwrap();
        let (pipeline, generator) = pipeline_in(&dir, false);

        pipeline.register_pending("Paris", &sample_refs()).await;
        let outcome = pipeline.serve("Eiffel_Tower", "webp", "4:3").await.unwrap();
        assert!(matches!(outcome, ImageServeOutcome::Pending));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ready_prompt_generates_and_caches() {
        let dir = TempDir::new().unwrap();
        let (pipeline, generator) = pipeline_in(&dir, false);
        let refs = sample_refs();

        pipeline.register_pending("Paris", &refs).await;
        pipeline.prepare_prompts("Paris", &refs).await;

        let outcome = pipeline.serve("Eiffel_Tower", "webp", "4:3").await.unwrap();
        let ImageServeOutcome::Ready { bytes, .. } = outcome else {
            panic!("expected ready image");
        };
        assert_eq!(bytes.len(), 32);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        // Second request hits the binary cache, not the collaborator
        let outcome = pipeline.serve("Eiffel_Tower", "webp", "4:3").await.unwrap();
        assert!(matches!(outcome, ImageServeOutcome::Ready { .. }));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_failure_falls_back_to_caption_prompts() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_in(&dir, true);
        let refs = sample_refs();

        pipeline.register_pending("Paris", &refs).await;
        pipeline.prepare_prompts("Paris", &refs).await;

        let record = pipeline.lookup("Eiffel_Tower").await.unwrap();
        assert!(record.ready);
        let prompt = record.prompt.unwrap();
        assert!(prompt.contains("The tower at dusk"));
        assert!(prompt.contains("Paris"));
    }

    #[tokio::test]
    async fn test_records_survive_restart_via_disk_mirror() {
        let dir = TempDir::new().unwrap();
        let refs = sample_refs();

        {
            let (pipeline, _) = pipeline_in(&dir, false);
            pipeline.register_pending("Paris", &refs).await;
            pipeline.prepare_prompts("Paris", &refs).await;
        }

        // Fresh pipeline over the same cache directory
        let (pipeline, _) = pipeline_in(&dir, false);
        let record = pipeline.lookup("Seine_River").await.unwrap();
        assert!(record.ready);
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension("webp"));
        assert!(is_supported_extension("PNG"));
        assert!(!is_supported_extension("svg"));
        assert!(!is_supported_extension("exe"));
    }
}
