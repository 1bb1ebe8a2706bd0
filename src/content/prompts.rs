//! Generation Instructions
//!
//! Instruction strings sent to the language-model collaborator. The exact
//! wording is part of the collaborator contract, not the pipeline design;
//! what matters here is the response shape each instruction demands.

use crate::content::outline::OutlineSection;

pub struct Prompts;

impl Prompts {
    /// Response: `{"valid": bool}`
    pub fn validate_topic() -> &'static str {
        "You are the editorial gatekeeper of an encyclopedia. Given a candidate topic, \
         decide whether it is a real, encyclopedia-worthy subject. Reject gibberish, \
         spam, and topics that cannot support a factual article. \
         Respond ONLY with JSON: {\"valid\": true|false}"
    }

    /// Response: `{"title": "Proper Title"}`
    pub fn canonical_title() -> &'static str {
        "Given an encyclopedia topic, return its proper canonical article title with \
         conventional capitalization and spelling. \
         Respond ONLY with JSON: {\"title\": \"...\"}"
    }

    /// Response: `{"summary": "...", "sections": [{"title", "description"}]}`
    pub fn outline() -> &'static str {
        "Plan an encyclopedia article on the given topic. Produce a one-paragraph \
         summary and 4-8 ordered sections, each with a short title and a one-sentence \
         description of what it covers. \
         Respond ONLY with JSON: {\"summary\": \"...\", \
         \"sections\": [{\"title\": \"...\", \"description\": \"...\"}]}"
    }

    /// Response: a JSON object of infobox fields, optionally with
    /// `"image": {"name": "File_Name.webp", "caption": "..."}`
    pub fn infobox() -> &'static str {
        "Produce the infobox for an encyclopedia article on the given topic: a flat \
         JSON object of 4-10 short factual field/value pairs appropriate to the topic. \
         Optionally include an \"image\" field: {\"name\": \"Descriptive_Name.webp\", \
         \"caption\": \"...\"}. Respond ONLY with JSON."
    }

    /// Response: free-form markdown for the opening paragraphs
    pub fn opening(title: &str, summary: &str) -> String {
        format!(
            "Write the opening paragraphs of an encyclopedia article titled \"{}\". \
             Cover: {}. Use markdown. Bold the first mention of the title and of \
             closely related topics. You may include one image placeholder of the form \
             [[Image:Descriptive_Name.webp|figure|4:3|caption]]. Do not add headings.",
            title, summary
        )
    }

    /// Response: free-form markdown for one section body
    pub fn section(title: &str, section: &OutlineSection) -> String {
        format!(
            "Write the \"{}\" section of an encyclopedia article titled \"{}\". \
             Scope: {}. Use markdown; link related topics as [[Topic]] and bold key \
             terms. You may include one image placeholder of the form \
             [[Image:Descriptive_Name.webp|figure|4:3|caption]]. Do not repeat the \
             section heading; do not add other headings except optional ### subsections.",
            section.title, title, section.description
        )
    }

    /// Response: `{"suggestions": ["Title", ...]}`
    pub fn search_suggestions() -> &'static str {
        "Suggest encyclopedia article titles matching the user's partial search query. \
         Return real, specific topics, best match first. \
         Respond ONLY with JSON: {\"suggestions\": [\"Title\", ...]}"
    }

    /// Response: `{"prompts": [{"slug": "...", "prompt": "..."}]}`
    pub fn image_prompts(article_title: &str) -> String {
        format!(
            "For each listed illustration from the encyclopedia article \"{}\", write \
             one short, concrete image-generation prompt (subject, setting, style: \
             realistic encyclopedia illustration). \
             Respond ONLY with JSON: {{\"prompts\": [{{\"slug\": \"...\", \
             \"prompt\": \"...\"}}]}}",
            article_title
        )
    }
}
