use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use syntect::html::ClassStyle;
use syntect::parsing::SyntaxSet;

use crate::application::render::types::{HeadingAnchor, RenderError};
use crate::domain::slug::AnchorSlugger;

use super::highlight;

#[derive(Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) contains_code: bool,
    pub(crate) headings: Vec<HeadingAnchor>,
}

/// Walk the Comrak AST before HTML formatting: fenced code blocks become
/// highlighted fragments, headings are assigned unique anchors, and images
/// receive lazy-loading attributes.
pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<RewriteOutcome, RenderError> {
    let mut walker = RewriteWalker {
        syntax_set,
        class_style,
        outcome: RewriteOutcome::default(),
        slugger: AnchorSlugger::new(),
    };
    walker.visit(root)?;
    Ok(walker.outcome)
}

struct RewriteWalker<'a> {
    syntax_set: &'a SyntaxSet,
    class_style: &'a ClassStyle,
    outcome: RewriteOutcome,
    slugger: AnchorSlugger,
}

impl RewriteWalker<'_> {
    fn visit(&mut self, node: &AstNode<'_>) -> Result<(), RenderError> {
        if let Some(level) = heading_level(node) {
            let text = collect_inline_text(node);
            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            match self.slugger.anchor_for(&normalized) {
                Ok(slug) => self.outcome.headings.push(HeadingAnchor {
                    level,
                    slug,
                    text: normalized,
                }),
                // Unsluggable headings (symbols only) keep no anchor.
                Err(_) => self.outcome.headings.push(HeadingAnchor {
                    level,
                    slug: String::new(),
                    text: normalized,
                }),
            }
        }

        if {
            let data = node.data.borrow();
            matches!(data.value, NodeValue::Image(_))
        } {
            rewrite_image_node(node);
        }

        if let Some((info, literal)) = extract_code_block(node) {
            let language = info.split_whitespace().next().map(str::to_string);
            let html = highlight::highlight_code(
                language.as_deref(),
                &literal,
                self.syntax_set,
                self.class_style,
            )?;
            self.outcome.contains_code = true;

            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit(next)?;
            child = next.next_sibling();
        }

        Ok(())
    }
}

fn rewrite_image_node(node: &AstNode<'_>) {
    let (src, title) = {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Image(link) => (link.url.clone(), link.title.clone()),
            _ => return,
        }
    };

    let alt_raw = collect_inline_text(node);
    let alt = alt_raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut html = String::with_capacity(src.len() + alt.len() + 64);
    html.push_str("<img src=\"");
    html.push_str(&escape_attribute(&src));
    html.push_str("\" alt=\"");
    html.push_str(&escape_attribute(&alt));
    html.push('"');
    if !title.is_empty() {
        html.push_str(" title=\"");
        html.push_str(&escape_attribute(&title));
        html.push('"');
    }
    html.push_str(" loading=\"lazy\" decoding=\"async\" />");

    {
        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlInline(html);
    }

    while let Some(child) = node.first_child() {
        child.detach();
    }
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}

fn heading_level(node: &AstNode<'_>) -> Option<u8> {
    let data = node.data.borrow();
    if let NodeValue::Heading(heading) = &data.value {
        Some(heading.level)
    } else {
        None
    }
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use comrak::{Arena, format_html, parse_document};

    fn syntax_and_style() -> (SyntaxSet, ClassStyle) {
        (
            SyntaxSet::load_defaults_newlines(),
            ClassStyle::SpacedPrefixed { prefix: "syntax-" },
        )
    }

    #[test]
    fn code_blocks_become_highlighted_html() {
        let options = crate::application::render::config::default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, "```rust\nfn main() {}\n```", &options);
        let (syntax_set, class_style) = syntax_and_style();

        let outcome = rewrite_ast(root, &syntax_set, &class_style).expect("rewrite");
        assert!(outcome.contains_code);

        let mut html = String::new();
        format_html(root, &options, &mut html).expect("html");
        assert!(html.contains("syntax-highlight"));
        assert!(html.contains("data-language=\"rust\""));
    }

    #[test]
    fn headings_collect_unique_anchors_in_order() {
        let options = crate::application::render::config::default_options();
        let arena = Arena::new();
        let markdown = "# Intro\n\n## Setup\n\n## Setup\n";
        let root = parse_document(&arena, markdown, &options);
        let (syntax_set, class_style) = syntax_and_style();

        let outcome = rewrite_ast(root, &syntax_set, &class_style).expect("rewrite");
        let slugs: Vec<&str> = outcome
            .headings
            .iter()
            .map(|anchor| anchor.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["intro", "setup", "setup-2"]);
    }

    #[test]
    fn images_receive_lazy_loading_attributes() {
        let options = crate::application::render::config::default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, "![diagram](https://example.com/d.png)", &options);
        let (syntax_set, class_style) = syntax_and_style();

        rewrite_ast(root, &syntax_set, &class_style).expect("rewrite");

        let mut html = String::new();
        format_html(root, &options, &mut html).expect("html");
        assert!(html.contains("loading=\"lazy\""));
        assert!(html.contains("alt=\"diagram\""));
    }
}
