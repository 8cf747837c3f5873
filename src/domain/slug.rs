//! Deterministic, human-friendly slug derivation.

use std::collections::HashMap;

use slug::slugify;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a slug from human-readable text (a title or a file stem).
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Deterministically generate unique heading anchors within one document.
///
/// Headings processed in order receive monotonic suffixes on duplicates
/// (`section`, `section-2`, `section-3`).
#[derive(Default, Debug)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
}

impl AnchorSlugger {
    pub fn new() -> Self {
        Self {
            occurrences: HashMap::new(),
        }
    }

    pub fn anchor_for(&mut self, heading: &str) -> Result<String, SlugError> {
        let base = derive_slug(heading)?;
        let count = self.occurrences.entry(base.clone()).or_insert(0);
        *count += 1;

        if *count == 1 {
            Ok(base)
        } else {
            Ok(format!("{base}-{}", *count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_normalizes_title_text() {
        assert_eq!(
            derive_slug("Shipping a Rust CLI, Twice").expect("slug"),
            "shipping-a-rust-cli-twice"
        );
    }

    #[test]
    fn derive_slug_rejects_empty_and_symbol_only_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
        assert!(matches!(
            derive_slug("!!!"),
            Err(SlugError::Unrepresentable { .. })
        ));
    }

    #[test]
    fn anchor_slugger_suffixes_duplicates() {
        let mut slugger = AnchorSlugger::new();
        assert_eq!(slugger.anchor_for("Overview").expect("slug"), "overview");
        assert_eq!(slugger.anchor_for("Overview").expect("slug"), "overview-2");
        assert_eq!(slugger.anchor_for("Details").expect("slug"), "details");
    }
}
