//! Plain-text helpers for excerpts and reading-time estimates.

const WORDS_PER_MINUTE: usize = 200;
const EXCERPT_MAX_CHARS: usize = 280;

/// Count whitespace-separated words, ignoring Markdown punctuation-only tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .count()
}

/// Estimated minutes to read `words` words, never reported as zero.
pub fn reading_minutes(words: usize) -> u32 {
    (words.div_ceil(WORDS_PER_MINUTE).max(1)) as u32
}

/// Derive an excerpt from the first prose paragraph of a Markdown body.
///
/// Headings, code fences, and block quotes are skipped; inline emphasis and
/// link markup are stripped so the result reads as plain text.
pub fn derive_excerpt(markdown: &str) -> String {
    let mut in_fence = false;

    for block in markdown.split("\n\n") {
        let trimmed = block.trim();
        if trimmed.is_empty() {
            continue;
        }
        let fence_marks = trimmed
            .lines()
            .filter(|line| {
                let line = line.trim_start();
                line.starts_with("```") || line.starts_with("~~~")
            })
            .count();
        if fence_marks % 2 == 1 {
            in_fence = !in_fence;
        }
        if fence_marks > 0 {
            continue;
        }
        if in_fence
            || trimmed.starts_with('#')
            || trimmed.starts_with('>')
            || trimmed.starts_with("---")
            || trimmed.starts_with("![")
        {
            continue;
        }

        let flattened = trimmed
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ");
        return truncate_chars(&strip_inline_markup(&flattened), EXCERPT_MAX_CHARS);
    }

    String::new()
}

/// Truncate on a character boundary, appending an ellipsis when shortened.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut shortened: String = text.chars().take(max_chars).collect();
    while let Some(last) = shortened.pop() {
        if last.is_whitespace() {
            break;
        }
        if shortened.is_empty() {
            break;
        }
    }
    format!("{}…", shortened.trim_end())
}

fn strip_inline_markup(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '*' | '_' | '`' => {}
            '[' => {}
            ']' => {
                // Drop a trailing `(url)` target if one follows.
                if chars.peek() == Some(&'(') {
                    for inner in chars.by_ref() {
                        if inner == ')' {
                            break;
                        }
                    }
                }
            }
            _ => output.push(ch),
        }
    }

    output
}
