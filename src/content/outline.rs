//! Article Outline
//!
//! The structured plan produced once per article generation: a summary plus
//! an ordered list of section titles and descriptions. The outline drives
//! both the section fan-out and table-of-contents numbering, so order is
//! preserved everywhere.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::content::MAX_SECTIONS;
use crate::types::{Result, WikiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleOutline {
    pub summary: String,
    pub sections: Vec<OutlineSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSection {
    pub title: String,
    pub description: String,
}

impl ArticleOutline {
    /// Decode an outline from model JSON at the collaborator boundary.
    ///
    /// Tolerates missing descriptions and clamps the section count, but an
    /// outline without any usable section is a generation failure; the
    /// pipeline has nothing to fan out over.
    pub fn from_value(value: &Value) -> Result<Self> {
        let summary = value
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        let sections: Vec<OutlineSection> = value
            .get("sections")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|s| {
                        let title = s.get("title")?.as_str()?.trim();
                        if title.is_empty() {
                            return None;
                        }
                        Some(OutlineSection {
                            title: title.to_string(),
                            description: s
                                .get("description")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .trim()
                                .to_string(),
                        })
                    })
                    .take(MAX_SECTIONS)
                    .collect()
            })
            .unwrap_or_default();

        if sections.is_empty() {
            return Err(WikiError::generation(
                "outline",
                "model returned no usable sections",
            ));
        }

        Ok(Self { summary, sections })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_well_formed_outline() {
        let value = json!({
            "summary": "A brief overview.",
            "sections": [
                {"title": "History", "description": "Origins and growth"},
                {"title": "Legacy", "description": "Lasting impact"}
            ]
        });

        let outline = ArticleOutline::from_value(&value).unwrap();
        assert_eq!(outline.summary, "A brief overview.");
        assert_eq!(outline.sections.len(), 2);
        assert_eq!(outline.sections[0].title, "History");
    }

    #[test]
    fn test_sections_without_titles_are_dropped() {
        let value = json!({
            "sections": [
                {"title": "  ", "description": "blank"},
                {"description": "no title"},
                {"title": "Kept"}
            ]
        });

        let outline = ArticleOutline::from_value(&value).unwrap();
        assert_eq!(outline.sections.len(), 1);
        assert_eq!(outline.sections[0].title, "Kept");
        assert_eq!(outline.sections[0].description, "");
    }

    #[test]
    fn test_empty_outline_is_generation_failure() {
        let value = json!({"summary": "words", "sections": []});
        let err = ArticleOutline::from_value(&value).unwrap_err();
        assert!(matches!(err, WikiError::Generation { stage: "outline", .. }));
    }

    #[test]
    fn test_section_count_is_clamped() {
        let sections: Vec<_> = (0..30)
            .map(|i| json!({"title": format!("Section {}", i)}))
            .collect();
        let value = json!({"sections": sections});

        let outline = ArticleOutline::from_value(&value).unwrap();
        assert_eq!(outline.sections.len(), MAX_SECTIONS);
    }
}
