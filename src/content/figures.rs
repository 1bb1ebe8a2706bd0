//! Image Placeholder Extraction
//!
//! Generated markup carries image placeholders in a dedicated bracket
//! syntax: `[[Image:<filename>|<kind>|<aspect>|<caption>]]`, e.g.
//! `[[Image:Eiffel_Tower.webp|figure|4:3|The tower at dusk]]`. Extraction
//! turns these into `ImageReference` records (deduplicated by slug, first
//! occurrence wins) whose captions become the stored context for later
//! prompt generation; rewriting replaces each placeholder with a
//! lazy-loading element pointing at the `/images` route.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::image::DEFAULT_ASPECT;
use crate::content::infobox::escape;
use crate::slug::title_to_slug;

static IMAGE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[Image:([^|\]\n]+)(?:\|([^|\]\n]*))?(?:\|([^|\]\n]*))?(?:\|([^\]\n]*))?\]\]")
        .unwrap()
});

/// How an image is placed in the rendered page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Captioned figure within the article flow
    Figure,
    /// Full-width image without a caption block
    Standalone,
    /// Panel image inside the infobox
    Infobox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReference {
    pub filename: String,
    pub slug: String,
    pub ext: String,
    pub alt: String,
    pub caption: String,
    pub kind: ImageKind,
    pub aspect: String,
}

impl ImageReference {
    fn from_capture(caps: &regex::Captures) -> Option<Self> {
        let filename = caps[1].trim().to_string();
        let (stem, ext) = filename.rsplit_once('.').unwrap_or((filename.as_str(), "webp"));

        let slug = title_to_slug(&stem.replace('_', " "));
        if slug.is_empty() {
            return None;
        }

        let kind = match caps.get(2).map(|m| m.as_str().trim()) {
            Some("standalone") => ImageKind::Standalone,
            _ => ImageKind::Figure,
        };

        let aspect = caps
            .get(3)
            .map(|m| m.as_str().trim())
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_ASPECT)
            .to_string();

        let caption = caps
            .get(4)
            .map(|m| m.as_str().trim())
            .filter(|c| !c.is_empty())
            .unwrap_or(stem)
            .to_string();

        Some(Self {
            alt: caption.clone(),
            filename: filename.clone(),
            slug,
            ext: ext.to_lowercase(),
            caption,
            kind,
            aspect,
        })
    }

    pub fn route(&self) -> String {
        format!("/images/{}.{}?aspect={}", self.slug, self.ext, self.aspect)
    }
}

/// Extract image references in document order, deduplicated by slug.
/// The first occurrence's caption and alt text win.
pub fn extract_image_references(markup: &str) -> Vec<ImageReference> {
    let mut seen = std::collections::HashSet::new();
    let mut refs = Vec::new();

    for caps in IMAGE_PLACEHOLDER.captures_iter(markup) {
        if let Some(image) = ImageReference::from_capture(&caps)
            && seen.insert(image.slug.clone())
        {
            refs.push(image);
        }
    }

    refs
}

/// Replace each placeholder with its lazy-loading HTML element. The client
/// script swaps `data-src` in once the readiness probe succeeds.
pub fn rewrite_image_placeholders(markup: &str) -> String {
    IMAGE_PLACEHOLDER
        .replace_all(markup, |caps: &regex::Captures| {
            let Some(image) = ImageReference::from_capture(caps) else {
                return String::new();
            };

            match image.kind {
                ImageKind::Standalone => format!(
                    "\n<img class=\"article-image lazy-image\" data-src=\"{}\" alt=\"{}\">\n",
                    image.route(),
                    escape(&image.alt)
                ),
                _ => format!(
                    "\n<figure class=\"article-figure\">\n<img class=\"lazy-image\" data-src=\"{}\" alt=\"{}\">\n<figcaption>{}</figcaption>\n</figure>\n",
                    image.route(),
                    escape(&image.alt),
                    escape(&image.caption)
                ),
            }
        })
        .into_owned()
}
