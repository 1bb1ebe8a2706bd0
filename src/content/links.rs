//! Cross-Reference Extraction
//!
//! Articles cross-reference other topics two ways: explicit bracket links
//! (`[[Roman Empire]]`, `[[Roman Empire|the empire]]`) and bold terms
//! (`**Julius Caesar**`). Both are collected as linked-page candidates for
//! the valid-page registry (produced by a trusted generation, they bypass
//! future validation), and both are rewritten into internal
//! links before HTML conversion.

use std::sync::LazyLock;

use regex::Regex;

use crate::slug::title_to_slug;

static BRACKET_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]|:\n]+)(?:\|([^\[\]\n]+))?\]\]").unwrap());

static BOLD_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]+)\*\*").unwrap());

/// Longest term still treated as a plausible article title
const MAX_TITLE_LEN: usize = 60;

fn is_linkable(term: &str) -> bool {
    let term = term.trim();
    !term.is_empty() && term.len() <= MAX_TITLE_LEN && !term.contains(['`', '#', '<', '>'])
}

/// Collect candidate titles from bracket links and bold terms, in document
/// order, deduplicated by slug (first occurrence wins).
pub fn extract_cross_references(markup: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut titles = Vec::new();

    let mut push = |term: &str| {
        let term = term.trim();
        if is_linkable(term) && seen.insert(title_to_slug(term)) {
            titles.push(term.to_string());
        }
    };

    for capture in BRACKET_LINK.captures_iter(markup) {
        push(&capture[1]);
    }
    for capture in BOLD_TERM.captures_iter(markup) {
        push(&capture[1]);
    }

    titles
}

/// Rewrite cross-references into markdown links onto `/wiki/{slug}`.
///
/// `[[Term|label]]` keeps its label; bold terms stay bold but become
/// clickable. Runs before markdown conversion, after image placeholders
/// (whose `Image:` prefix the link pattern excludes) have been rewritten.
pub fn rewrite_cross_references(markup: &str) -> String {
    let linked = BRACKET_LINK.replace_all(markup, |caps: &regex::Captures| {
        let target = caps[1].trim();
        if !is_linkable(target) {
            return caps[0].to_string();
        }
        let label = caps.get(2).map(|m| m.as_str().trim()).unwrap_or(target);
        format!("[{}](/wiki/{})", label, title_to_slug(target))
    });

    BOLD_TERM
        .replace_all(&linked, |caps: &regex::Captures| {
            let term = caps[1].trim();
            if !is_linkable(term) {
                return caps[0].to_string();
            }
            format!("**[{}](/wiki/{})**", term, title_to_slug(term))
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bracket_links_and_bold_terms() {
        let markup = "The **Roman Empire** conquered [[Gaul]] under [[Julius Caesar|Caesar]].";
        let titles = extract_cross_references(markup);
        assert_eq!(titles, vec!["Gaul", "Julius Caesar", "Roman Empire"]);
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let markup = "[[Gaul]] and again [[Gaul]] and **Gaul**.";
        assert_eq!(extract_cross_references(markup), vec!["Gaul"]);
    }

    #[test]
    fn test_image_placeholders_are_not_links() {
        let markup = "[[Image:Eiffel_Tower.webp|figure|4:3|The tower]]";
        assert!(extract_cross_references(markup).is_empty());
    }

    #[test]
    fn test_rewrite_labeled_link() {
        let markup = "under [[Julius Caesar|Caesar]] it grew";
        assert_eq!(
            rewrite_cross_references(markup),
            "under [Caesar](/wiki/Julius_Caesar) it grew"
        );
    }

    #[test]
    fn test_rewrite_bold_term_keeps_emphasis() {
        let markup = "The **Roman Empire** endured.";
        assert_eq!(
            rewrite_cross_references(markup),
            "The **[Roman Empire](/wiki/Roman_Empire)** endured."
        );
    }

    #[test]
    fn test_overlong_terms_left_alone() {
        let long = "x".repeat(80);
        let markup = format!("**{}**", long);
        assert_eq!(rewrite_cross_references(&markup), markup);
        assert!(extract_cross_references(&markup).is_empty());
    }
}
