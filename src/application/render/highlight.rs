use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;

/// Highlight one fenced code block into a `<pre><code>` fragment with
/// `syntax-` prefixed CSS classes, so themes stay a stylesheet concern.
pub(crate) fn highlight_code(
    language: Option<&str>,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, RenderError> {
    let lang_token = language.unwrap_or("text");
    let syntax =
        find_syntax(syntax_set, lang_token).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut source = code.to_string();
    if !source.ends_with('\n') {
        source.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);
    for line in LinesWithEndings::from(source.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: lang_token.to_string(),
                message: err.to_string(),
            })?;
    }

    let token = lang_token.to_ascii_lowercase();
    Ok(format!(
        "<pre class=\"syntax-highlight syntax-lang-{token}\" data-language=\"{token}\"><code class=\"language-{token} syntax-code\">{}</code></pre>",
        generator.finalize()
    ))
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_rust_with_prefixed_classes() {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let style = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

        let html = highlight_code(Some("rust"), "fn main() {}", &syntax_set, &style)
            .expect("highlighted");

        assert!(html.contains("data-language=\"rust\""));
        assert!(html.contains("language-rust"));
        assert!(html.contains("syntax-"));
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let style = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

        let html = highlight_code(Some("nonexistent-lang"), "plain words", &syntax_set, &style)
            .expect("highlighted");

        assert!(html.contains("data-language=\"nonexistent-lang\""));
        assert!(html.contains("plain words"));
    }
}
