//! Infobox
//!
//! Structured field/value summary panel accompanying an article. Keys are
//! topic-dependent, with no fixed schema, so decoding is best-effort:
//! scalar fields become display rows in model order, and an optional `image`
//! field references a slug/extension pair rendered at the top of the panel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::slug::title_to_slug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfoboxData {
    /// Field name → display value, in model order
    pub fields: Vec<(String, String)>,
    pub image: Option<InfoboxImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoboxImage {
    pub slug: String,
    pub ext: String,
    pub caption: String,
}

impl InfoboxData {
    /// Decode infobox JSON. Never fails: unusable values simply produce an
    /// empty panel, which renders as nothing.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let mut fields = Vec::new();
        let mut image = None;

        for (key, field) in object {
            if key == "image" {
                image = decode_image(field);
                continue;
            }

            let display = match field {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => continue,
            };

            if !display.is_empty() {
                fields.push((key.clone(), display));
            }
        }

        Self { fields, image }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.image.is_none()
    }

    /// Render the panel as an HTML aside. Empty data renders as nothing.
    pub fn render_html(&self, title: &str) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut html = String::from("<aside class=\"infobox\">\n");
        html.push_str(&format!("<div class=\"infobox-title\">{}</div>\n", escape(title)));

        if let Some(image) = &self.image {
            html.push_str(&format!(
                "<img class=\"infobox-image lazy-image\" data-src=\"/images/{}.{}?aspect=3:4\" alt=\"{}\">\n",
                image.slug,
                image.ext,
                escape(&image.caption)
            ));
        }

        html.push_str("<table class=\"infobox-fields\">\n");
        for (name, value) in &self.fields {
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                escape(name),
                escape(value)
            ));
        }
        html.push_str("</table>\n</aside>\n");
        html
    }
}

fn decode_image(field: &Value) -> Option<InfoboxImage> {
    let object = field.as_object()?;
    let name = object.get("name").or_else(|| object.get("filename"))?.as_str()?;

    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, "webp"));
    let slug = title_to_slug(&stem.replace('_', " "));
    if slug.is_empty() {
        return None;
    }

    Some(InfoboxImage {
        slug,
        ext: ext.to_lowercase(),
        caption: object
            .get("caption")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string(),
    })
}

/// Minimal HTML escaping for text interpolated into the panel
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_fields_in_order() {
        let value = json!({
            "Capital": "Rome",
            "Founded": "27 BC",
            "Population": 56800000
        });

        let infobox = InfoboxData::from_value(&value);
        assert_eq!(infobox.fields.len(), 3);
        assert!(infobox.fields.iter().any(|(k, v)| k == "Capital" && v == "Rome"));
        assert!(infobox.fields.iter().any(|(k, v)| k == "Population" && v == "56800000"));
    }

    #[test]
    fn test_decode_image_reference() {
        let value = json!({
            "Capital": "Paris",
            "image": {"name": "Eiffel Tower.webp", "caption": "The tower"}
        });

        let infobox = InfoboxData::from_value(&value);
        let image = infobox.image.unwrap();
        assert_eq!(image.slug, "Eiffel_Tower");
        assert_eq!(image.ext, "webp");
        assert_eq!(image.caption, "The tower");
    }

    #[test]
    fn test_non_object_yields_empty_panel() {
        let infobox = InfoboxData::from_value(&json!("just a string"));
        assert!(infobox.is_empty());
        assert_eq!(infobox.render_html("Anything"), "");
    }

    #[test]
    fn test_render_escapes_values() {
        let value = json!({"Motto": "<b>bold</b> & proud"});
        let html = InfoboxData::from_value(&value).render_html("Topic");
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt; &amp; proud"));
    }
}
