//! The post entity and its construction from an on-disk Markdown document.
//!
//! Posts are read-only at runtime: the only writer is an author adding or
//! editing a file under the content directory.

use thiserror::Error;
use time::{Date, macros::format_description};

use crate::domain::frontmatter::{self, FrontmatterError};
use crate::domain::slug::{SlugError, derive_slug};
use crate::util::text;

const DATE_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),
    #[error("missing required `title` key")]
    MissingTitle,
    #[error("missing required `date` key")]
    MissingDate,
    #[error("`date` is not a calendar date (expected YYYY-MM-DD): {0}")]
    InvalidDate(#[from] time::error::Parse),
    #[error("could not derive a slug: {0}")]
    Slug(#[from] SlugError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub published_on: Date,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub body_markdown: String,
    pub reading_minutes: u32,
    pub feature_image: Option<String>,
    pub draft: bool,
    pub archived: bool,
}

impl Post {
    /// Build a post from a raw document. `file_stem` is the slug fallback when
    /// the frontmatter carries no explicit `slug` key.
    pub fn from_document(file_stem: &str, raw: &str) -> Result<Self, PostError> {
        let (meta, body) = frontmatter::parse(raw)?;

        let title = meta
            .get("title")
            .filter(|value| !value.is_empty())
            .ok_or(PostError::MissingTitle)?
            .to_string();

        let published_on = Date::parse(
            meta.get("date").ok_or(PostError::MissingDate)?,
            DATE_FORMAT,
        )?;

        let slug = match meta.get("slug") {
            Some(explicit) => derive_slug(explicit)?,
            None => derive_slug(file_stem)?,
        };

        let mut tags = meta.get_list("tags");
        for tag in &mut tags {
            *tag = tag.to_ascii_lowercase();
        }
        tags.sort();
        tags.dedup();

        let excerpt = match meta.get("excerpt").filter(|value| !value.is_empty()) {
            Some(explicit) => explicit.to_string(),
            None => text::derive_excerpt(body),
        };

        let feature_image = meta
            .get("image")
            .or_else(|| meta.get("feature_image"))
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(Self {
            slug,
            title,
            published_on,
            excerpt,
            tags,
            reading_minutes: text::reading_minutes(text::word_count(body)),
            body_markdown: body.to_string(),
            feature_image,
            draft: meta.get_flag("draft")?,
            archived: meta.get_flag("archived")?,
        })
    }

    /// Whether the post belongs in public listings, feeds, and the sitemap.
    pub fn is_public(&self) -> bool {
        !self.draft && !self.archived
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.to_ascii_lowercase();
        self.tags.iter().any(|t| t == &needle)
    }
}
