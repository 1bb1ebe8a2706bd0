//! Markup Rendering
//!
//! Converts assembled article markdown to HTML, numbers the section
//! headings, and builds the table of contents.
//!
//! Numbering is positional (`1`, `1.1`, `2`, …) over level-2 and level-3
//! headings in document order. The same traversal produces both the TOC
//! entries and the anchor ids injected into the rendered headings, so a TOC
//! link can never point at the wrong anchor.

use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, html};

/// A numbered section heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 2 or 3
    pub level: u8,
    pub text: String,
    /// Positional number, e.g. "1" or "1.1"
    pub number: String,
    /// Anchor id, e.g. "section-1" or "section-1-1"
    pub anchor: String,
}

/// Scan markdown for `##`/`###` headings in order and assign positional
/// numbers. Fenced code blocks are skipped so the scan stays in step with
/// the markdown parser.
pub fn collect_headings(markdown: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut h2 = 0usize;
    let mut h3 = 0usize;
    let mut in_fence = false;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let (level, text) = if let Some(rest) = trimmed.strip_prefix("### ") {
            (3u8, rest)
        } else if let Some(rest) = trimmed.strip_prefix("## ") {
            (2u8, rest)
        } else {
            continue;
        };

        // Every ##/### heading gets an entry, in lockstep with the HTML
        // pass; a stray subsection before the first section numbers under
        // "0" and is left out of the rendered TOC
        let number = if level == 2 {
            h2 += 1;
            h3 = 0;
            format!("{}", h2)
        } else {
            h3 += 1;
            format!("{}.{}", h2, h3)
        };

        headings.push(Heading {
            level,
            text: clean_heading_text(text),
            anchor: format!("section-{}", number.replace('.', "-")),
            number,
        });
    }

    headings
}

fn clean_heading_text(text: &str) -> String {
    text.trim().replace("**", "")
}

/// Render the table of contents as a nested ordered list; level-3 entries
/// nest under the preceding level-2 entry. Empty input renders nothing.
pub fn render_toc(headings: &[Heading]) -> String {
    if headings.is_empty() {
        return String::new();
    }

    let entry = |h: &Heading| {
        format!(
            "<a href=\"#{}\"><span class=\"toc-number\">{}</span> {}</a>",
            h.anchor, h.number, h.text
        )
    };

    let mut out = String::from("<nav class=\"toc\">\n<div class=\"toc-title\">Contents</div>\n<ol>\n");
    let mut i = 0;
    while i < headings.len() {
        if headings[i].level != 2 {
            i += 1;
            continue;
        }
        out.push_str(&format!("<li>{}", entry(&headings[i])));
        i += 1;

        if i < headings.len() && headings[i].level == 3 {
            out.push_str("\n<ol>\n");
            while i < headings.len() && headings[i].level == 3 {
                out.push_str(&format!("<li>{}</li>\n", entry(&headings[i])));
                i += 1;
            }
            out.push_str("</ol>\n");
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ol>\n</nav>\n");
    out
}

/// Convert article markdown to HTML, injecting the collected anchor ids
/// into the level-2/level-3 headings in the same document order.
pub fn markdown_to_html(markdown: &str, headings: &[Heading]) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);

    let mut anchor_iter = headings.iter();
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Start(Tag::Heading {
            level: level @ (HeadingLevel::H2 | HeadingLevel::H3),
            classes,
            attrs,
            ..
        }) => {
            let id = anchor_iter
                .next()
                .map(|h| CowStr::from(h.anchor.clone()));
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            })
        }
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}

/// Splice the table of contents after the first paragraph of the rendered
/// body. Falls back to prepending when no paragraph exists.
pub fn splice_toc(body: &str, toc: &str) -> String {
    if toc.is_empty() {
        return body.to_string();
    }

    match body.find("</p>") {
        Some(pos) => {
            let split = pos + "</p>".len();
            format!("{}\n{}{}", &body[..split], toc, &body[split..])
        }
        None => format!("{}{}", toc, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Intro paragraph about the topic.

## History

### Origins

Early days.

## Legacy

What remains.";

    #[test]
    fn test_positional_numbering() {
        let headings = collect_headings(SAMPLE);
        let numbers: Vec<&str> = headings.iter().map(|h| h.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "1.1", "2"]);

        let anchors: Vec<&str> = headings.iter().map(|h| h.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["section-1", "section-1-1", "section-2"]);
    }

    #[test]
    fn test_injected_ids_match_toc_anchors() {
        let headings = collect_headings(SAMPLE);
        let body = markdown_to_html(SAMPLE, &headings);

        assert!(body.contains("<h2 id=\"section-1\">History</h2>"));
        assert!(body.contains("<h3 id=\"section-1-1\">Origins</h3>"));
        assert!(body.contains("<h2 id=\"section-2\">Legacy</h2>"));

        let toc = render_toc(&headings);
        for heading in &headings {
            assert!(toc.contains(&format!("href=\"#{}\"", heading.anchor)));
        }
    }

    #[test]
    fn test_toc_nests_subsections() {
        let headings = collect_headings(SAMPLE);
        let toc = render_toc(&headings);

        let origins = toc.find("Origins").unwrap();
        let legacy = toc.find("Legacy").unwrap();
        assert!(origins < legacy);
        // The subsection list closes before Legacy's entry opens
        assert!(toc[..legacy].matches("</ol>").count() >= 1);
    }

    #[test]
    fn test_leading_subsection_keeps_anchors_aligned() {
        let markdown = "Intro.\n\n### Stray\n\n## Real\n\nBody.";
        let headings = collect_headings(markdown);
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[0].number, "0.1");

        // The HTML pass stays in lockstep with the scan
        let body = markdown_to_html(markdown, &headings);
        assert!(body.contains("<h3 id=\"section-0-1\">Stray</h3>"));
        assert!(body.contains("<h2 id=\"section-1\">Real</h2>"));

        // The stray subsection is not rendered into the TOC
        let toc = render_toc(&headings);
        assert!(!toc.contains("Stray"));
    }

    #[test]
    fn test_headings_inside_code_fences_ignored() {
        let markdown = "Intro.\n\n```\n## not a heading\n```\n\n## Real\n\nBody.";
        let headings = collect_headings(markdown);
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].text, "Real");
    }

    #[test]
    fn test_splice_after_first_paragraph() {
        let headings = collect_headings(SAMPLE);
        let body = markdown_to_html(SAMPLE, &headings);
        let toc = render_toc(&headings);
        let spliced = splice_toc(&body, &toc);

        let first_p_end = spliced.find("</p>").unwrap();
        let toc_pos = spliced.find("class=\"toc\"").unwrap();
        let first_heading = spliced.find("<h2").unwrap();
        assert!(first_p_end < toc_pos);
        assert!(toc_pos < first_heading);
    }

    #[test]
    fn test_empty_toc_renders_nothing() {
        assert_eq!(render_toc(&[]), "");
        assert_eq!(splice_toc("<p>x</p>", ""), "<p>x</p>");
    }
}
