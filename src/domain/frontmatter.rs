//! Frontmatter extraction for Markdown documents.
//!
//! The metadata block is a `---`-delimited prefix of `key: value` lines. It is
//! deliberately parsed with a line splitter rather than a YAML parser: the
//! accepted grammar is flat keys, scalar values, and single-line lists, and a
//! full YAML document (anchors, nesting, multi-line scalars) is rejected by
//! construction rather than silently misread.

use thiserror::Error;

const DELIMITER: &str = "---";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontmatterError {
    #[error("frontmatter block opened on line 1 is never closed")]
    UnterminatedBlock,
    #[error("line {line} is not a `key: value` pair: `{text}`")]
    MalformedLine { line: usize, text: String },
    #[error("key `{key}` appears more than once")]
    DuplicateKey { key: String },
    #[error("key `{key}` has an invalid value: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Raw key/value pairs lifted from the metadata block, in document order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    entries: Vec<(String, String)>,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Interpret a value as a flat string list. Accepts `[a, b]` brackets or a
    /// bare comma-separated form; empty segments are dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        let Some(raw) = self.get(key) else {
            return Vec::new();
        };

        let inner = raw
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(raw);

        inner
            .split(',')
            .map(|segment| segment.trim().trim_matches('"').trim_matches('\''))
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Interpret a value as a boolean flag. Absent keys read as `false`.
    pub fn get_flag(&self, key: &str) -> Result<bool, FrontmatterError> {
        match self.get(key) {
            None => Ok(false),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(true),
                "false" | "no" => Ok(false),
                other => Err(FrontmatterError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("expected a boolean, got `{other}`"),
                }),
            },
        }
    }
}

/// Split a document into its frontmatter block and the Markdown body.
///
/// A document without a leading `---` line has no frontmatter; the whole input
/// is the body. The body retains its own leading blank lines trimmed.
pub fn parse(raw: &str) -> Result<(Frontmatter, &str), FrontmatterError> {
    // Segments keep their line terminator, so byte offsets stay exact for
    // both `\n` and `\r\n` documents.
    let mut segments = raw.split_inclusive('\n');

    let Some(first) = segments.next() else {
        return Ok((Frontmatter::default(), raw));
    };
    if first.trim_end() != DELIMITER {
        return Ok((Frontmatter::default(), raw));
    }

    let mut entries: Vec<(String, String)> = Vec::new();
    let mut consumed = first.len();

    for (index, segment) in segments.enumerate() {
        consumed += segment.len();
        let trimmed = segment.trim();

        if trimmed == DELIMITER {
            let body = raw.get(consumed..).unwrap_or("");
            return Ok((Frontmatter { entries }, body.trim_start_matches(['\r', '\n'])));
        }

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            return Err(FrontmatterError::MalformedLine {
                // +2: one for 0-based index, one for the opening delimiter.
                line: index + 2,
                text: trimmed.to_string(),
            });
        };

        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().trim_matches('"').to_string();

        if entries.iter().any(|(existing, _)| existing == &key) {
            return Err(FrontmatterError::DuplicateKey { key });
        }

        entries.push((key, value));
    }

    Err(FrontmatterError::UnterminatedBlock)
}
