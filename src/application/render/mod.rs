mod config;
mod highlight;
mod rewrite;
mod types;

use std::cell::RefCell;
use std::sync::Arc;

use comrak::{Arena, format_html, parse_document};
use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use once_cell::sync::Lazy;
use syntect::{html::ClassStyle, parsing::SyntaxSet};

pub use types::{HeadingAnchor, RenderError, RenderOutput};

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Comrak-based rendering pipeline with Syntect highlighting and Ammonia
/// sanitisation. The pipeline is pure: one Markdown body in, sanitized HTML
/// plus heading anchors out.
pub struct MarkdownRenderer {
    options: comrak::Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
}

static RENDERER: Lazy<Arc<MarkdownRenderer>> = Lazy::new(|| Arc::new(MarkdownRenderer::new()));

/// Access the shared renderer, initialised on first use.
pub fn renderer() -> Arc<MarkdownRenderer> {
    Arc::clone(&RENDERER)
}

impl MarkdownRenderer {
    fn new() -> Self {
        Self {
            options: config::default_options(),
            syntax_set: two_face::syntax::extra_newlines(),
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: config::build_sanitizer(),
        }
    }

    pub fn render(&self, markdown: &str) -> Result<RenderOutput, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let outcome = rewrite::rewrite_ast(root, &self.syntax_set, &self.class_style)?;

        let mut rendered = String::new();
        format_html(root, &self.options, &mut rendered).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;

        let sanitized = self.sanitizer.clean(&rendered).to_string();
        let html = annotate_html(&sanitized, &outcome.headings)?;

        Ok(RenderOutput {
            html,
            headings: outcome.headings,
            contains_code: outcome.contains_code,
        })
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Post-sanitisation pass: assign collected anchors to the headings they were
/// derived from, and make external links open in a new tab without an opener.
///
/// Anchors are matched to headings by text rather than position. Raw HTML
/// headings that survive sanitisation were never seen by the AST walk, so a
/// positional assignment would shift every anchor after them.
fn annotate_html(html: &str, headings: &[HeadingAnchor]) -> Result<String, RenderError> {
    let ids = align_anchor_ids(&collect_heading_texts(html)?, headings);
    let cursor = RefCell::new(0usize);

    let mut handlers = Vec::new();
    for tag in HEADING_TAGS {
        let ids = &ids;
        let cursor = &cursor;
        handlers.push(element!(tag, move |el| {
            let mut cursor = cursor.borrow_mut();
            let id = ids.get(*cursor).cloned().flatten();
            *cursor += 1;
            if let Some(id) = id {
                if el.get_attribute("id").is_none() {
                    el.set_attribute("id", &id)?;
                }
            }
            Ok(())
        }));
    }
    handlers.push(element!("a[href]", |el| {
        let href = el.get_attribute("href").unwrap_or_default();
        if href.starts_with("http://") || href.starts_with("https://") {
            el.set_attribute("target", "_blank")?;
            el.set_attribute("rel", "noopener noreferrer")?;
        }
        Ok(())
    }));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Postprocess {
        message: err.to_string(),
    })
}

/// The text content of every heading element in the sanitised HTML, in
/// document order.
fn collect_heading_texts(html: &str) -> Result<Vec<String>, RenderError> {
    let texts = RefCell::new(Vec::<String>::new());

    let mut handlers = Vec::new();
    for tag in HEADING_TAGS {
        let texts = &texts;
        handlers.push(element!(tag, move |_| {
            texts.borrow_mut().push(String::new());
            Ok(())
        }));
        handlers.push(text!(tag, move |chunk| {
            if let Some(buffer) = texts.borrow_mut().last_mut() {
                buffer.push_str(chunk.as_str());
            }
            Ok(())
        }));
    }

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Postprocess {
        message: err.to_string(),
    })?;

    Ok(texts.into_inner())
}

/// Walk both sequences in order: a heading receives the next unclaimed anchor
/// only when their texts agree, so headings the AST walk never produced an
/// anchor for are passed over instead of stealing one.
fn align_anchor_ids(texts: &[String], anchors: &[HeadingAnchor]) -> Vec<Option<String>> {
    let mut pending = anchors.iter().peekable();

    texts
        .iter()
        .map(|text| {
            let normalized = decode_entities(text)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            match pending.next_if(|anchor| anchor.text == normalized) {
                Some(anchor) if !anchor.slug.is_empty() => Some(anchor.slug.clone()),
                _ => None,
            }
        })
        .collect()
}

/// Undo the entity escaping the HTML formatter applies to text content, so
/// heading text compares equal to the raw text collected from the AST.
fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
