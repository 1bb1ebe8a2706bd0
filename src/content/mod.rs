//! Content Pipeline
//!
//! Orchestrates on-demand article generation: cache check → topic
//! validation → canonical redirect → outline/infobox fan-out → per-section
//! fan-out → assembly → persistence.
//!
//! ## Ordering
//!
//! Outline completion strictly precedes the section fan-out (sections need
//! outline data). The opening paragraph and all section bodies run
//! concurrently with no ordering among themselves, but are reassembled in
//! outline order, not completion order. Any single generation failure is
//! fatal for the whole request; there is no partial-article fallback.
//!
//! Two concurrent requests for the same uncached slug each run the full
//! pipeline and race on the cache write; last write wins. This is an
//! accepted limitation, not mitigated by a per-key lock.

pub mod figures;
pub mod infobox;
pub mod links;
pub mod markup;
pub mod outline;
pub mod prompts;

use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ai::SharedTextGenerator;
use crate::cache::PageCache;
use crate::constants::content::{SEE_ALSO_HEADING, SEE_ALSO_LINKS};
use crate::constants::search::{MAX_SUGGESTIONS, MIN_QUERY_LEN};
use crate::registry::ValidPageRegistry;
use crate::slug::{slug_to_title, title_to_slug};
use crate::types::{Result, WikiError};

use figures::{ImageKind, ImageReference, extract_image_references, rewrite_image_placeholders};
use infobox::InfoboxData;
use links::{extract_cross_references, rewrite_cross_references};
use markup::{collect_headings, markdown_to_html, render_toc, splice_toc};
use outline::{ArticleOutline, OutlineSection};
use prompts::Prompts;

// =============================================================================
// Outcomes
// =============================================================================

/// Terminal outcome of one page request
#[derive(Debug)]
pub enum PageOutcome {
    /// Cached HTML served verbatim
    Cached(String),
    /// The canonical slug differs; the route answers 301
    Redirect { canonical_slug: String },
    /// The validation collaborator rejected the topic; the route answers 404
    NotFound { title: String },
    /// Freshly generated page; prompt preparation still has to be triggered
    /// for `images` by the caller
    Generated(GeneratedPage),
}

/// Pre-generation outcome of the validate/canonicalize phase. Streaming
/// handlers resolve first (redirects and rejections need real status codes,
/// decided before any response bytes go out) and only then
/// fix headers and start generation.
pub enum PageResolution {
    Cached(String),
    Redirect { canonical_slug: String },
    NotFound { title: String },
    /// Topic accepted under this title; generation may begin
    Generate { title: String },
}

/// Assembly output: the page plus everything discovered while building it
#[derive(Debug)]
pub struct GeneratedPage {
    pub title: String,
    pub html: String,
    /// Image references discovered during assembly, deduplicated by slug
    pub images: Vec<ImageReference>,
    /// Cross-referenced titles, registration-trusted
    pub linked_titles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub title: String,
    pub slug: String,
}

// =============================================================================
// Pipeline
// =============================================================================

pub struct ContentPipeline {
    llm: SharedTextGenerator,
    cache: Arc<PageCache>,
    registry: Arc<ValidPageRegistry>,
    page_ttl_hours: u64,
}

impl ContentPipeline {
    pub fn new(
        llm: SharedTextGenerator,
        cache: Arc<PageCache>,
        registry: Arc<ValidPageRegistry>,
        page_ttl_hours: u64,
    ) -> Self {
        Self {
            llm,
            cache,
            registry,
            page_ttl_hours,
        }
    }

    /// Run the full page state machine for one requested slug.
    pub async fn render_page(&self, slug: &str) -> Result<PageOutcome> {
        match self.resolve(slug).await? {
            PageResolution::Cached(html) => Ok(PageOutcome::Cached(html)),
            PageResolution::Redirect { canonical_slug } => {
                Ok(PageOutcome::Redirect { canonical_slug })
            }
            PageResolution::NotFound { title } => Ok(PageOutcome::NotFound { title }),
            PageResolution::Generate { title } => {
                let page = self.generate_article(&title).await?;
                self.persist(slug, &page).await;
                Ok(PageOutcome::Generated(page))
            }
        }
    }

    /// Phases 1-3: cache check, validity check, canonical redirect.
    pub async fn resolve(&self, slug: &str) -> Result<PageResolution> {
        if self.cache.is_cached(slug, self.page_ttl_hours, false).await
            && let Some(html) = self.cache.get_text(slug).await
        {
            debug!("Cache hit for '{}'", slug);
            return Ok(PageResolution::Cached(html));
        }

        let title = slug_to_title(slug);
        if title.is_empty() {
            return Ok(PageResolution::NotFound { title });
        }

        if !self.registry.is_valid(slug).await {
            if !self.validate_topic(&title).await? {
                info!("Topic rejected: '{}'", title);
                return Ok(PageResolution::NotFound { title });
            }

            let canonical = self.canonical_title(&title).await?;
            let canonical_slug = title_to_slug(&canonical);
            if !canonical_slug.is_empty() && canonical_slug != slug {
                self.register(&canonical).await;
                info!("Redirecting '{}' to canonical '{}'", slug, canonical_slug);
                return Ok(PageResolution::Redirect { canonical_slug });
            }
            self.register(&title).await;
        }

        Ok(PageResolution::Generate { title })
    }

    /// Phase 6: register the primary and discovered linked titles, then
    /// write the completed page to cache.
    pub async fn persist(&self, slug: &str, page: &GeneratedPage) {
        // Titles produced by a trusted generation bypass future validation
        self.register(&page.title).await;
        if let Err(e) = self.registry.add_suggestions(&page.linked_titles).await {
            warn!("Failed to register linked pages: {}", e);
        }

        self.cache.set_text(slug, &page.html).await;
    }

    /// LLM-backed search suggestions. Queries shorter than two characters
    /// after trimming return an empty list without a collaborator call.
    pub async fn search(&self, query: &str) -> Result<Vec<Suggestion>> {
        let trimmed = query.trim();
        if trimmed.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let value = self
            .llm
            .complete_json(Prompts::search_suggestions(), trimmed)
            .await?;

        let titles: Vec<String> = value
            .get("suggestions")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .take(MAX_SUGGESTIONS)
                    .collect()
            })
            .unwrap_or_default();

        // Suggestion provenance counts as validation
        if let Err(e) = self.registry.add_suggestions(&titles).await {
            warn!("Failed to register suggestions: {}", e);
        }

        Ok(titles
            .into_iter()
            .map(|title| Suggestion {
                slug: title_to_slug(&title),
                title,
            })
            .collect())
    }

    // =========================================================================
    // Collaborator calls
    // =========================================================================

    async fn validate_topic(&self, title: &str) -> Result<bool> {
        let value = self
            .llm
            .complete_json(Prompts::validate_topic(), title)
            .await
            .map_err(stage_error("validation"))?;
        Ok(value.get("valid").and_then(Value::as_bool).unwrap_or(false))
    }

    async fn canonical_title(&self, title: &str) -> Result<String> {
        let value = self
            .llm
            .complete_json(Prompts::canonical_title(), title)
            .await
            .map_err(stage_error("canonicalization"))?;
        Ok(value
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(title)
            .to_string())
    }

    async fn fetch_outline(&self, title: &str) -> Result<ArticleOutline> {
        let value = self
            .llm
            .complete_json(Prompts::outline(), title)
            .await
            .map_err(stage_error("outline"))?;
        ArticleOutline::from_value(&value)
    }

    async fn fetch_infobox(&self, title: &str) -> Result<InfoboxData> {
        let value = self
            .llm
            .complete_json(Prompts::infobox(), title)
            .await
            .map_err(stage_error("infobox"))?;
        Ok(InfoboxData::from_value(&value))
    }

    async fn fetch_opening(&self, title: &str, outline: &ArticleOutline) -> Result<String> {
        // Free-form call: malformed output passes through as degraded text
        self.llm
            .complete(&Prompts::opening(title, &outline.summary), title)
            .await
    }

    async fn fetch_section(&self, title: &str, section: &OutlineSection) -> Result<String> {
        self.llm
            .complete(&Prompts::section(title, section), title)
            .await
    }

    // =========================================================================
    // Generation & assembly
    // =========================================================================

    /// Phases 4-5: fan-out generation and assembly.
    pub async fn generate_article(&self, title: &str) -> Result<GeneratedPage> {
        info!("Generating article '{}'", title);

        // Fan-out one: outline and infobox are independent
        let (outline, infobox) =
            tokio::try_join!(self.fetch_outline(title), self.fetch_infobox(title))?;

        // Fan-out two: opening plus one call per outline section
        let sections_future =
            try_join_all(outline.sections.iter().map(|s| self.fetch_section(title, s)));
        let (opening, section_bodies) =
            tokio::try_join!(self.fetch_opening(title, &outline), sections_future)?;

        debug!(
            "Generated {} sections for '{}', assembling",
            section_bodies.len(),
            title
        );

        Ok(assemble(title, &outline, &infobox, &opening, &section_bodies))
    }

    async fn register(&self, title: &str) {
        if let Err(e) = self.registry.add(title).await {
            warn!("Failed to persist valid-page registry: {}", e);
        }
    }
}

/// Map a repair failure on a JSON-producing call to a generation failure
/// for the owning stage; other errors pass through untouched.
fn stage_error(stage: &'static str) -> impl Fn(WikiError) -> WikiError {
    move |e| match e {
        WikiError::MalformedOutput(msg) => WikiError::Generation {
            stage,
            reason: msg,
        },
        other => other,
    }
}

/// Assemble the final page from generated parts, in outline order.
///
/// Returns the rendered HTML together with the discovered image references
/// and cross-referenced titles; discovery is part of the output value, not
/// a side effect, so the caller decides when prompt preparation runs.
fn assemble(
    title: &str,
    outline: &ArticleOutline,
    infobox: &InfoboxData,
    opening: &str,
    section_bodies: &[String],
) -> GeneratedPage {
    let mut markdown = String::with_capacity(4096);
    markdown.push_str(opening.trim());
    markdown.push_str("\n\n");

    for (section, body) in outline.sections.iter().zip(section_bodies) {
        markdown.push_str(&format!("## {}\n\n{}\n\n", section.title, body.trim()));
    }

    let own_slug = title_to_slug(title);
    let mut linked_titles = extract_cross_references(&markdown);
    linked_titles.retain(|t| title_to_slug(t) != own_slug);

    markdown.push_str(&format!("## {}\n\n", SEE_ALSO_HEADING));
    for linked in linked_titles.iter().take(SEE_ALSO_LINKS) {
        markdown.push_str(&format!("- [[{}]]\n", linked));
    }

    let mut images = extract_image_references(&markdown);
    if let Some(panel_image) = &infobox.image
        && !images.iter().any(|i| i.slug == panel_image.slug)
    {
        images.push(ImageReference {
            filename: format!("{}.{}", panel_image.slug, panel_image.ext),
            slug: panel_image.slug.clone(),
            ext: panel_image.ext.clone(),
            alt: panel_image.caption.clone(),
            caption: panel_image.caption.clone(),
            kind: ImageKind::Infobox,
            aspect: "3:4".to_string(),
        });
    }

    let rewritten = rewrite_cross_references(&rewrite_image_placeholders(&markdown));
    let headings = collect_headings(&rewritten);
    let body = markdown_to_html(&rewritten, &headings);
    let toc = render_toc(&headings);
    let article = splice_toc(&body, &toc);

    GeneratedPage {
        title: title.to_string(),
        html: format!("{}{}", infobox.render_html(title), article),
        images,
        linked_titles,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::ai::TextGenerator;

    /// Scripted collaborator: dispatches on the instruction each call uses.
    struct ScriptedLlm;

    #[async_trait]
    impl TextGenerator for ScriptedLlm {
        async fn complete(&self, instruction: &str, input: &str) -> Result<String> {
            if instruction == Prompts::validate_topic() {
                let valid = !input.to_lowercase().contains("somerandomgibberish");
                return Ok(format!("{{\"valid\": {}}}", valid));
            }
            if instruction == Prompts::canonical_title() {
                // "Quantum computing" canonicalizes to itself; everything else too
                return Ok(format!("{{\"title\": \"{}\"}}", input));
            }
            if instruction == Prompts::outline() {
                return Ok(r#"{
                    "summary": "A survey of the topic.",
                    "sections": [
                        {"title": "History", "description": "How it began"},
                        {"title": "Principles", "description": "How it works"},
                        {"title": "Applications", "description": "Where it is used"}
                    ]
                }"#
                .to_string());
            }
            if instruction == Prompts::infobox() {
                return Ok(r#"{"Field": "Computing", "Introduced": "1980s"}"#.to_string());
            }
            if instruction == Prompts::search_suggestions() {
                return Ok(r#"{"suggestions": ["Quantum Computing", "Quantum Entanglement"]}"#
                    .to_string());
            }
            if instruction.starts_with("Write the opening") {
                return Ok(format!(
                    "**{}** is a field of study related to [[Computer Science]].\n\n[[Image:Overview_Diagram.webp|figure|4:3|An overview]]",
                    input
                ));
            }
            if instruction.starts_with("Write the \"") {
                return Ok("Body text mentioning [[Linear Algebra]].".to_string());
            }
            Err(WikiError::LlmApi(format!(
                "unscripted instruction: {}",
                instruction
            )))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Collaborator that fails one section call
    struct FailingSectionLlm;

    #[async_trait]
    impl TextGenerator for FailingSectionLlm {
        async fn complete(&self, instruction: &str, input: &str) -> Result<String> {
            if instruction.starts_with("Write the \"Principles\"") {
                return Err(WikiError::LlmApi("provider exploded".to_string()));
            }
            ScriptedLlm.complete(instruction, input).await
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    async fn pipeline_with(
        llm: SharedTextGenerator,
        dir: &TempDir,
    ) -> (ContentPipeline, Arc<PageCache>, Arc<ValidPageRegistry>) {
        let cache = Arc::new(PageCache::new(dir.path().join("cache")));
        let registry = Arc::new(
            ValidPageRegistry::load(dir.path().join("valid_pages.json"))
                .await
                .unwrap(),
        );
        let pipeline = ContentPipeline::new(llm, Arc::clone(&cache), Arc::clone(&registry), 24);
        (pipeline, cache, registry)
    }

    #[tokio::test]
    async fn test_uncached_page_generates_and_persists() {
        let dir = TempDir::new().unwrap();
        let (pipeline, cache, registry) = pipeline_with(Arc::new(ScriptedLlm), &dir).await;

        let outcome = pipeline.render_page("Quantum_Computing").await.unwrap();
        let PageOutcome::Generated(page) = outcome else {
            panic!("expected generated page");
        };

        // Three outline sections plus the fixed See also heading, in order
        assert_eq!(page.html.matches("<h2").count(), 4);
        let history = page.html.find("History").unwrap();
        let principles = page.html.find("Principles").unwrap();
        let applications = page.html.find("Applications").unwrap();
        assert!(history < principles && principles < applications);
        assert!(page.html.contains(SEE_ALSO_HEADING));

        // Discovered image from the opening placeholder
        assert_eq!(page.images.len(), 1);
        assert_eq!(page.images[0].slug, "Overview_Diagram");

        // Cache and registry were updated
        assert!(cache.get_text("Quantum_Computing").await.is_some());
        assert!(registry.is_valid("Quantum_Computing").await);
        assert!(registry.is_valid("Computer_Science").await);
    }

    #[tokio::test]
    async fn test_second_request_is_a_cache_hit() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _cache, _registry) = pipeline_with(Arc::new(ScriptedLlm), &dir).await;

        pipeline.render_page("Quantum_Computing").await.unwrap();
        let outcome = pipeline.render_page("Quantum_Computing").await.unwrap();
        assert!(matches!(outcome, PageOutcome::Cached(_)));
    }

    #[tokio::test]
    async fn test_rejected_topic_leaves_no_trace() {
        let dir = TempDir::new().unwrap();
        let (pipeline, cache, registry) = pipeline_with(Arc::new(ScriptedLlm), &dir).await;

        let outcome = pipeline.render_page("somerandomgibberish123").await.unwrap();
        assert!(matches!(outcome, PageOutcome::NotFound { .. }));

        assert!(cache.get_text("somerandomgibberish123").await.is_none());
        assert!(!registry.is_valid("somerandomgibberish123").await);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_single_section_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let (pipeline, cache, _registry) =
            pipeline_with(Arc::new(FailingSectionLlm), &dir).await;

        let err = pipeline.render_page("Quantum_Computing").await.unwrap_err();
        assert!(matches!(err, WikiError::LlmApi(_)));
        assert!(cache.get_text("Quantum_Computing").await.is_none());
    }

    #[tokio::test]
    async fn test_search_registers_suggestions() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _cache, registry) = pipeline_with(Arc::new(ScriptedLlm), &dir).await;

        let suggestions = pipeline.search("quant").await.unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].slug, "Quantum_Computing");
        assert!(registry.is_valid("Quantum_Entanglement").await);
    }

    #[tokio::test]
    async fn test_short_query_returns_empty_without_collaborator() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _cache, registry) = pipeline_with(Arc::new(ScriptedLlm), &dir).await;

        assert!(pipeline.search("  q ").await.unwrap().is_empty());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_valid_slug_skips_validation() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _cache, registry) = pipeline_with(Arc::new(ScriptedLlm), &dir).await;

        // Pre-register so even a "gibberish" slug goes straight to generation
        registry.add("somerandomgibberish123").await.unwrap();
        let outcome = pipeline.render_page("somerandomgibberish123").await.unwrap();
        assert!(matches!(outcome, PageOutcome::Generated(_)));
    }
}
