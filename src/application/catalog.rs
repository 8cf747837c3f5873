//! The post catalog: every Markdown document under the content directory,
//! parsed, rendered, and indexed at startup.
//!
//! The catalog is immutable once built. Republishing means restarting the
//! process with new files, which keeps every read path lock-free.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use metrics::histogram;
use thiserror::Error;
use time::Date;
use tracing::{debug, info};

use crate::application::render::{HeadingAnchor, MarkdownRenderer, RenderError};
use crate::domain::posts::{Post, PostError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read content directory `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{path}`: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: PostError,
    },
    #[error("`{path}`: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
    #[error("slug `{slug}` is claimed by both `{first}` and `{second}`")]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Outcome of a full content-directory audit: how many documents were
/// examined and every problem found, not just the first.
#[derive(Debug, Default)]
pub struct AuditReport {
    pub documents: usize,
    pub errors: Vec<CatalogError>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A post together with its rendered body.
#[derive(Debug, Clone)]
pub struct RenderedPost {
    pub post: Post,
    pub html: String,
    pub headings: Vec<HeadingAnchor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug)]
pub struct PostCatalog {
    /// All posts, public or not, ordered by publish date descending then slug.
    posts: Vec<Arc<RenderedPost>>,
    by_slug: HashMap<String, usize>,
}

impl PostCatalog {
    /// Scan `dir` for `*.md` documents and build the catalog.
    ///
    /// Fails on the first unreadable or malformed document and on any slug
    /// collision: a broken catalog should stop the deploy, not ship half a
    /// site.
    pub async fn load(dir: &Path, renderer: &MarkdownRenderer) -> Result<Self, CatalogError> {
        let paths = collect_markdown_paths(dir).await?;
        let mut posts: Vec<(PathBuf, Arc<RenderedPost>)> = Vec::with_capacity(paths.len());
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();

        for path in paths {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| CatalogError::Io {
                    path: path.clone(),
                    source,
                })?;

            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default();

            let post =
                Post::from_document(&stem, &raw).map_err(|source| CatalogError::Document {
                    path: path.clone(),
                    source,
                })?;

            if let Some(first) = claimed.insert(post.slug.clone(), path.clone()) {
                return Err(CatalogError::DuplicateSlug {
                    slug: post.slug,
                    first,
                    second: path,
                });
            }

            let started = std::time::Instant::now();
            let output = renderer
                .render(&post.body_markdown)
                .map_err(|source| CatalogError::Render {
                    path: path.clone(),
                    source,
                })?;
            histogram!("vetrina_render_ms").record(started.elapsed().as_secs_f64() * 1000.0);

            debug!(
                target = "application::catalog",
                slug = %post.slug,
                public = post.is_public(),
                "indexed post"
            );

            posts.push((
                path,
                Arc::new(RenderedPost {
                    post,
                    html: output.html,
                    headings: output.headings,
                }),
            ));
        }

        let mut posts: Vec<Arc<RenderedPost>> =
            posts.into_iter().map(|(_, rendered)| rendered).collect();
        posts.sort_by(|a, b| {
            b.post
                .published_on
                .cmp(&a.post.published_on)
                .then_with(|| a.post.slug.cmp(&b.post.slug))
        });

        let by_slug = posts
            .iter()
            .enumerate()
            .map(|(index, rendered)| (rendered.post.slug.clone(), index))
            .collect();

        info!(
            target = "application::catalog",
            total = posts.len(),
            public = posts.iter().filter(|p| p.post.is_public()).count(),
            "content catalog loaded"
        );

        Ok(Self { posts, by_slug })
    }

    /// Parse and render every document under `dir`, collecting all errors
    /// instead of stopping at the first one. An operator fixing a broken
    /// content directory should see the whole damage in one run.
    pub async fn audit(dir: &Path, renderer: &MarkdownRenderer) -> AuditReport {
        let mut report = AuditReport::default();

        let paths = match collect_markdown_paths(dir).await {
            Ok(paths) => paths,
            Err(error) => {
                report.errors.push(error);
                return report;
            }
        };

        let mut claimed: HashMap<String, PathBuf> = HashMap::new();
        for path in paths {
            report.documents += 1;

            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(source) => {
                    report.errors.push(CatalogError::Io { path, source });
                    continue;
                }
            };

            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default();

            let post = match Post::from_document(&stem, &raw) {
                Ok(post) => post,
                Err(source) => {
                    report.errors.push(CatalogError::Document { path, source });
                    continue;
                }
            };

            if let Some(first) = claimed.insert(post.slug.clone(), path.clone()) {
                report.errors.push(CatalogError::DuplicateSlug {
                    slug: post.slug.clone(),
                    first,
                    second: path.clone(),
                });
            }

            if let Err(source) = renderer.render(&post.body_markdown) {
                report.errors.push(CatalogError::Render { path, source });
            }
        }

        report
    }

    /// Look up a post by slug. Drafts and archived posts resolve too; the
    /// caller decides whether the request context may see them.
    pub fn find(&self, slug: &str) -> Option<&Arc<RenderedPost>> {
        self.by_slug.get(slug).map(|&index| &self.posts[index])
    }

    pub fn published(&self) -> impl Iterator<Item = &Arc<RenderedPost>> {
        self.posts.iter().filter(|p| p.post.is_public())
    }

    pub fn recent(&self, limit: usize) -> Vec<Arc<RenderedPost>> {
        self.published().take(limit).cloned().collect()
    }

    pub fn with_tag(&self, tag: &str) -> Vec<Arc<RenderedPost>> {
        self.published()
            .filter(|p| p.post.has_tag(tag))
            .cloned()
            .collect()
    }

    /// Published tags with usage counts, alphabetical.
    pub fn tags(&self) -> Vec<TagCount> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for rendered in self.published() {
            for tag in &rendered.post.tags {
                *counts.entry(tag.as_str()).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .map(|(tag, count)| TagCount {
                tag: tag.to_string(),
                count,
            })
            .collect()
    }

    /// Most recent publish date across public posts, for feed/sitemap stamps.
    pub fn latest_publish_date(&self) -> Option<Date> {
        self.published().map(|p| p.post.published_on).max()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

async fn collect_markdown_paths(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut paths = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "md") {
            paths.push(path);
        }
    }

    // Deterministic ingest order, so collision errors are stable.
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render;
    use std::fs;

    fn write_post(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).expect("fixture write");
    }

    #[tokio::test]
    async fn loads_and_orders_posts_by_date_descending() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_post(
            dir.path(),
            "older.md",
            "---\ntitle: Older\ndate: 2024-03-01\n---\nOld body.\n",
        );
        write_post(
            dir.path(),
            "newer.md",
            "---\ntitle: Newer\ndate: 2025-03-01\n---\nNew body.\n",
        );

        let catalog = PostCatalog::load(dir.path(), &render::renderer())
            .await
            .expect("catalog");

        let slugs: Vec<&str> = catalog
            .published()
            .map(|p| p.post.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["newer", "older"]);
        assert!(catalog.find("older").is_some());
        assert!(catalog.find("missing").is_none());
    }

    #[tokio::test]
    async fn drafts_are_indexed_but_not_published() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_post(
            dir.path(),
            "wip.md",
            "---\ntitle: WIP\ndate: 2025-01-01\ndraft: true\n---\nbody\n",
        );

        let catalog = PostCatalog::load(dir.path(), &render::renderer())
            .await
            .expect("catalog");

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.published().count(), 0);
        assert!(catalog.find("wip").is_some());
    }

    #[tokio::test]
    async fn duplicate_slug_fails_the_whole_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_post(
            dir.path(),
            "a.md",
            "---\ntitle: A\ndate: 2025-01-01\nslug: same\n---\nbody\n",
        );
        write_post(
            dir.path(),
            "b.md",
            "---\ntitle: B\ndate: 2025-01-02\nslug: same\n---\nbody\n",
        );

        let err = PostCatalog::load(dir.path(), &render::renderer())
            .await
            .expect_err("duplicate slug");
        assert!(matches!(err, CatalogError::DuplicateSlug { .. }));
    }

    #[tokio::test]
    async fn audit_reports_every_malformed_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_post(
            dir.path(),
            "no-title.md",
            "---\ndate: 2025-01-01\n---\nbody\n",
        );
        write_post(
            dir.path(),
            "bad-date.md",
            "---\ntitle: Bad\ndate: tomorrow\n---\nbody\n",
        );
        write_post(
            dir.path(),
            "fine.md",
            "---\ntitle: Fine\ndate: 2025-01-01\n---\nbody\n",
        );

        let report = PostCatalog::audit(dir.path(), &render::renderer()).await;

        assert_eq!(report.documents, 3);
        assert_eq!(report.errors.len(), 2);
        assert!(!report.is_clean());
        assert!(report
            .errors
            .iter()
            .all(|e| matches!(e, CatalogError::Document { .. })));
    }

    #[tokio::test]
    async fn audit_flags_duplicate_slugs_alongside_other_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_post(
            dir.path(),
            "a.md",
            "---\ntitle: A\ndate: 2025-01-01\nslug: same\n---\nbody\n",
        );
        write_post(
            dir.path(),
            "b.md",
            "---\ntitle: B\ndate: 2025-01-02\nslug: same\n---\nbody\n",
        );
        write_post(dir.path(), "broken.md", "---\ntitle: C\n---\nbody\n");

        let report = PostCatalog::audit(dir.path(), &render::renderer()).await;

        assert_eq!(report.errors.len(), 2);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, CatalogError::DuplicateSlug { .. })));
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, CatalogError::Document { .. })));
    }

    #[tokio::test]
    async fn tag_index_counts_only_public_posts() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_post(
            dir.path(),
            "one.md",
            "---\ntitle: One\ndate: 2025-01-01\ntags: [rust]\n---\nbody\n",
        );
        write_post(
            dir.path(),
            "two.md",
            "---\ntitle: Two\ndate: 2025-01-02\ntags: [rust, web]\ndraft: true\n---\nbody\n",
        );

        let catalog = PostCatalog::load(dir.path(), &render::renderer())
            .await
            .expect("catalog");

        assert_eq!(
            catalog.tags(),
            vec![TagCount {
                tag: "rust".to_string(),
                count: 1
            }]
        );
        assert_eq!(catalog.with_tag("rust").len(), 1);
    }
}
