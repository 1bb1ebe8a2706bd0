//! HTML Templates
//!
//! Inline document templates for the streamed article page, the landing
//! page, and error pages. The article document is emitted in three
//! parts (shell, body fragment, footer) because the article route fixes headers
//! and sends the shell before generation begins; every later write must be
//! a valid appended fragment, never a second document.

use crate::constants::image::CLIENT_POLL_INTERVAL_MS;
use crate::content::infobox::escape;

const STYLE: &str = r#"
:root { --ink: #1a1a1a; --accent: #2952a3; --rule: #d8d8d8; }
* { box-sizing: border-box; }
body { margin: 0; color: var(--ink); font: 16px/1.6 Georgia, serif; }
header { display: flex; gap: 1rem; align-items: baseline; padding: 0.8rem 1.2rem;
  border-bottom: 1px solid var(--rule); font-family: Helvetica, Arial, sans-serif; }
header a.brand { font-weight: bold; font-size: 1.2rem; color: var(--ink); text-decoration: none; }
#search { flex: 1; max-width: 24rem; padding: 0.35rem 0.6rem; border: 1px solid var(--rule); }
main { max-width: 52rem; margin: 0 auto; padding: 1rem 1.2rem 4rem; }
h1 { border-bottom: 1px solid var(--rule); padding-bottom: 0.3rem; }
a { color: var(--accent); }
.loading { margin: 3rem auto; text-align: center; color: #777;
  font-family: Helvetica, Arial, sans-serif; }
.infobox { float: right; width: 17rem; margin: 0 0 1rem 1.5rem; padding: 0.6rem;
  border: 1px solid var(--rule); background: #f8f8f6; font-size: 0.85rem;
  font-family: Helvetica, Arial, sans-serif; }
.infobox-title { font-weight: bold; text-align: center; margin-bottom: 0.5rem; }
.infobox-image { width: 100%; }
.infobox-fields th { text-align: left; vertical-align: top; padding-right: 0.5rem; }
.toc { display: inline-block; border: 1px solid var(--rule); background: #f8f8f6;
  padding: 0.6rem 1.2rem; margin: 1rem 0; font-size: 0.9rem; }
.toc-title { font-weight: bold; }
.toc ol { margin: 0.3rem 0 0; padding-left: 1.2rem; list-style: none; }
.toc-number { color: #777; margin-right: 0.3rem; }
.article-figure { margin: 1rem 0; text-align: center; }
.article-figure img, .article-image { max-width: 100%; min-height: 3rem; background: #eee; }
.article-figure figcaption { font-size: 0.85rem; color: #555; }
.error-fragment { border: 1px solid #c0392b; background: #fdf0ef; color: #c0392b;
  padding: 0.8rem 1.2rem; margin: 1.5rem 0; }
.hero { text-align: center; margin-top: 14vh; }
.hero input { width: min(28rem, 80vw); font-size: 1.1rem; padding: 0.5rem 0.8rem; }
#suggestions { list-style: none; padding: 0; max-width: 28rem; margin: 0.5rem auto;
  text-align: left; font-family: Helvetica, Arial, sans-serif; }
"#;

fn script() -> String {
    format!(
        r#"
const POLL_MS = {poll};
async function loadImage(img) {{
  const src = img.dataset.src;
  if (!src) return;
  for (let attempt = 0; attempt < 60; attempt++) {{
    try {{
      const res = await fetch(src);
      if (res.ok) {{
        img.src = URL.createObjectURL(await res.blob());
        return;
      }}
      if (res.status !== 202) break;
    }} catch (e) {{
      break;
    }}
    await new Promise(r => setTimeout(r, POLL_MS));
  }}
  img.style.display = 'none';
}}
function hydrateImages() {{
  document.querySelectorAll('img.lazy-image').forEach(loadImage);
}}
function wireSearch(input, list) {{
  let timer = null;
  input.addEventListener('input', () => {{
    clearTimeout(timer);
    timer = setTimeout(async () => {{
      const q = input.value.trim();
      if (q.length < 2) {{ list.innerHTML = ''; return; }}
      const res = await fetch('/api/search?q=' + encodeURIComponent(q));
      if (!res.ok) return;
      const items = await res.json();
      list.innerHTML = items
        .map(s => `<li><a href="/wiki/${{s.slug}}">${{s.title}}</a></li>`)
        .join('');
    }}, 250);
  }});
  input.addEventListener('keydown', e => {{
    if (e.key === 'Enter' && input.value.trim().length >= 2) {{
      location.href = '/wiki/' + input.value.trim().replace(/\s+/g, '_');
    }}
  }});
}}
"#,
        poll = CLIENT_POLL_INTERVAL_MS
    )
}

fn header() -> &'static str {
    r#"<header><a class="brand" href="/">Everwiki</a>
<input id="search" placeholder="Search or start an article" autocomplete="off">
<ul id="suggestions"></ul>
</header>"#
}

/// Document shell sent before generation starts: head, chrome, loading
/// indicator, and an open `<main>` awaiting the body fragment.
pub fn page_shell(title: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{} - Everwiki</title>
<style>{}</style>
<script>{}</script>
</head>
<body>
{}
<script>wireSearch(document.getElementById('search'), document.getElementById('suggestions'));</script>
<div class="loading" id="loading">Writing this article&hellip;</div>
<main id="content">
"#,
        escape(title),
        STYLE,
        script(),
        header()
    )
}

/// Completed article body, appended to an in-flight shell.
pub fn page_body(title: &str, article_html: &str) -> String {
    format!(
        r#"<script>document.getElementById('loading').style.display = 'none';</script>
<article class="article">
<h1>{}</h1>
{}
</article>
"#,
        escape(title),
        article_html
    )
}

/// Inline error fragment for failures after streaming has begun.
pub fn error_fragment(message: &str) -> String {
    format!(
        r#"<script>document.getElementById('loading').style.display = 'none';</script>
<div class="error-fragment">Article generation failed: {}</div>
"#,
        escape(message)
    )
}

/// Closes the streamed document and kicks off image hydration.
pub fn page_footer() -> &'static str {
    "</main>\n<script>hydrateImages();</script>\n</body>\n</html>\n"
}

/// Full error document for failures before any bytes were sent.
pub fn error_page(title: &str, message: &str) -> String {
    format!(
        "{}{}{}",
        page_shell(title),
        error_fragment(message),
        page_footer()
    )
}

/// Full 404 document for rejected topics.
pub fn not_found_page(title: &str) -> String {
    let body = format!(
        r#"<script>document.getElementById('loading').style.display = 'none';</script>
<h1>Not found</h1>
<p>No encyclopedia article could be written about <strong>{}</strong>.
Try <a href="/">searching</a> for a related topic.</p>
"#,
        escape(title)
    );
    format!("{}{}{}", page_shell(title), body, page_footer())
}

/// Static landing page with the search box front and center.
pub fn landing_page() -> String {
    let hero = r#"<script>document.getElementById('loading').style.display = 'none';</script>
<div class="hero">
<h1>Everwiki</h1>
<p>An encyclopedia written the moment you ask.</p>
<input id="hero-search" placeholder="What do you want to read about?" autocomplete="off">
<ul id="hero-suggestions"></ul>
</div>
<script>wireSearch(document.getElementById('hero-search'), document.getElementById('hero-suggestions'));</script>
"#;
    format!("{}{}{}", page_shell("Home"), hero, page_footer())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_plus_footer_is_one_document() {
        let document = format!("{}{}", page_shell("Roman Empire"), page_footer());
        assert!(document.starts_with("<!doctype html>"));
        assert_eq!(document.matches("<html").count(), 1);
        assert_eq!(document.matches("</html>").count(), 1);
        assert!(document.contains("Roman Empire - Everwiki"));
    }

    #[test]
    fn test_body_fragment_is_not_a_document() {
        let fragment = page_body("Topic", "<p>text</p>");
        assert!(!fragment.contains("<html"));
        assert!(fragment.contains("<p>text</p>"));
    }

    #[test]
    fn test_error_page_escapes_message() {
        let page = error_page("Topic", "<script>alert(1)</script>");
        assert!(!page.contains("<script>alert"));
        assert!(page.contains("&lt;script&gt;"));
    }
}
