//! Domain layer types and invariants.

pub mod error;
pub mod frontmatter;
pub mod portfolio;
pub mod posts;
pub mod slug;
