//! HTML to plain-text extraction.
//!
//! Strategies hand raw page HTML to this module and get back the semantic
//! fields stored in a document's `content` map. Script, style, and template
//! text never reaches the output.

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crawl_harness_core::Content;

/// Elements whose text is never visible.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Semantic fields pulled from an HTML page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    pub title: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub body: String,
}

impl PageText {
    /// Content map in the shape stored for articles.
    pub fn into_content(self) -> Content {
        let mut content = Content::new();
        content.insert("Title".into(), opt(self.title));
        content.insert("Subtitle".into(), opt(self.description));
        content.insert("Content".into(), Value::String(self.body));
        content.insert("language".into(), opt(self.language));
        content
    }
}

fn opt(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

/// Extract title, description, language, and visible body text.
pub fn extract_page(html: &str) -> PageText {
    let doc = Html::parse_document(html);

    let title = first_text(&doc, "title");
    let description = meta_content(&doc, r#"meta[name="description"]"#)
        .or_else(|| meta_content(&doc, r#"meta[property="og:description"]"#));
    let language = select_first(&doc, "html")
        .and_then(|el| el.value().attr("lang"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let body = select_first(&doc, "body")
        .map(visible_text)
        .unwrap_or_default();

    PageText {
        title,
        description,
        language,
        body,
    }
}

/// First element matching `css`.
pub fn select_first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector).next()
}

/// All elements matching `css`, in document order.
pub fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => doc.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Trimmed text of the first element matching `css`, if non-empty.
pub fn first_text(doc: &Html, css: &str) -> Option<String> {
    select_first(doc, css)
        .map(visible_text)
        .filter(|s| !s.is_empty())
}

fn meta_content(doc: &Html, css: &str) -> Option<String> {
    select_first(doc, css)
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Visible text under `element`, one trimmed text node per line.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut lines = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| HIDDEN_ELEMENTS.contains(&el.value().name()));
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }
    lines.join("\n")
}
