//! Related-post ranking by tag overlap.

use std::collections::HashSet;
use std::sync::Arc;

use crate::application::catalog::{PostCatalog, RenderedPost};

/// Flat bonus added per shared high-value tag, on top of the overlap ratio.
const HIGH_VALUE_BONUS: f64 = 0.15;

pub const DEFAULT_RELATED_LIMIT: usize = 3;

/// Rank published posts by relevance to `subject`.
///
/// Score is |shared tags| / |tag union| plus a flat bonus for every shared
/// high-value tag. Ties break by publish date descending, then slug, so the
/// ranking is deterministic for a fixed catalog.
pub fn related_posts(
    catalog: &PostCatalog,
    subject: &RenderedPost,
    high_value_tags: &[String],
    limit: usize,
) -> Vec<Arc<RenderedPost>> {
    let subject_tags: HashSet<&str> = subject.post.tags.iter().map(String::as_str).collect();
    if subject_tags.is_empty() {
        return Vec::new();
    }

    let high_value: HashSet<String> = high_value_tags
        .iter()
        .map(|tag| tag.to_ascii_lowercase())
        .collect();

    let mut scored: Vec<(f64, Arc<RenderedPost>)> = catalog
        .published()
        .filter(|candidate| candidate.post.slug != subject.post.slug)
        .filter_map(|candidate| {
            let candidate_tags: HashSet<&str> =
                candidate.post.tags.iter().map(String::as_str).collect();
            let shared = subject_tags.intersection(&candidate_tags).count();
            if shared == 0 {
                return None;
            }

            let union = subject_tags.union(&candidate_tags).count();
            let bonus = subject_tags
                .intersection(&candidate_tags)
                .filter(|tag| high_value.contains(&tag.to_ascii_lowercase()))
                .count() as f64
                * HIGH_VALUE_BONUS;

            Some((shared as f64 / union as f64 + bonus, candidate.clone()))
        })
        .collect();

    scored.sort_by(|(score_a, post_a), (score_b, post_b)| {
        score_b
            .total_cmp(score_a)
            .then_with(|| post_b.post.published_on.cmp(&post_a.post.published_on))
            .then_with(|| post_a.post.slug.cmp(&post_b.post.slug))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, post)| post)
        .collect()
}
