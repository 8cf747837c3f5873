use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::catalog::{RenderedPost, TagCount};
use crate::application::error::{ErrorReport, HttpError};
use crate::application::render::HeadingAnchor;
use crate::domain::portfolio::{ConnectCard, Profile, Project, ResumeEntry, SiteContent};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(meta: PageMetaView) -> Response {
    let template = ErrorTemplate {
        meta,
        title: "Page not found".to_string(),
        message: "The page you requested does not exist. Head back home to keep browsing."
            .to_string(),
    };
    let mut response = render_template_response(template, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Head metadata shared by every page.
#[derive(Clone)]
pub struct PageMetaView {
    pub site_name: String,
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: Option<String>,
}

impl PageMetaView {
    pub fn for_page(site: &SiteContent, title: &str, description: &str, path: &str) -> Self {
        let base = site.base_url();
        let canonical = if path == "/" {
            base.trim_end_matches('/').to_string()
        } else {
            format!("{}{path}", base.trim_end_matches('/'))
        };
        Self {
            site_name: site.profile.name.clone(),
            title: if title.is_empty() {
                site.profile.name.clone()
            } else {
                format!("{title} | {}", site.profile.name)
            },
            description: description.to_string(),
            canonical,
            og_title: if title.is_empty() {
                site.profile.name.clone()
            } else {
                title.to_string()
            },
            og_description: description.to_string(),
            og_image: None,
        }
    }

    pub fn with_image(self, image: Option<String>) -> Self {
        Self {
            og_image: image,
            ..self
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub iso_date: String,
    pub published: String,
    pub reading_minutes: String,
    pub tags: Vec<String>,
}

impl PostCard {
    pub fn from_rendered(rendered: &RenderedPost) -> Self {
        let post = &rendered.post;
        Self {
            slug: post.slug.clone(),
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            iso_date: iso_date(post.published_on),
            published: human_date(post.published_on),
            reading_minutes: format!("{} min read", post.reading_minutes),
            tags: post.tags.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TagFilterView {
    pub tag: String,
    pub count: usize,
    pub is_active: bool,
}

pub fn build_tag_filters(tags: &[TagCount], active: Option<&str>) -> Vec<TagFilterView> {
    tags.iter()
        .map(|entry| TagFilterView {
            tag: entry.tag.clone(),
            count: entry.count,
            is_active: active.is_some_and(|current| current.eq_ignore_ascii_case(&entry.tag)),
        })
        .collect()
}

/// Precomputed share targets for a post detail page.
#[derive(Clone)]
pub struct ShareLinksView {
    pub twitter: String,
    pub linkedin: String,
    pub hacker_news: String,
    pub mailto: String,
    pub permalink: String,
}

impl ShareLinksView {
    pub fn for_post(permalink: &str, title: &str) -> Self {
        let encoded_url = url_encode(permalink);
        let encoded_title = url_encode(title);
        Self {
            twitter: format!(
                "https://twitter.com/intent/tweet?url={encoded_url}&text={encoded_title}"
            ),
            linkedin: format!(
                "https://www.linkedin.com/sharing/share-offsite/?url={encoded_url}"
            ),
            hacker_news: format!(
                "https://news.ycombinator.com/submitlink?u={encoded_url}&t={encoded_title}"
            ),
            mailto: format!("mailto:?subject={encoded_title}&body={encoded_url}"),
            permalink: permalink.to_string(),
        }
    }
}

fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[derive(Clone)]
pub struct TocEntryView {
    pub slug: String,
    pub text: String,
    pub level: u8,
}

pub fn build_toc(headings: &[HeadingAnchor]) -> Vec<TocEntryView> {
    headings
        .iter()
        .filter(|anchor| !anchor.slug.is_empty() && anchor.level <= 3)
        .map(|anchor| TocEntryView {
            slug: anchor.slug.clone(),
            text: anchor.text.clone(),
            level: anchor.level,
        })
        .collect()
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub meta: PageMetaView,
    pub profile: Profile,
    pub recent_posts: Vec<PostCard>,
    pub featured_projects: Vec<Project>,
    pub connect: Vec<ConnectCard>,
}

#[derive(Template)]
#[template(path = "posts.html")]
pub struct PostsTemplate {
    pub meta: PageMetaView,
    pub posts: Vec<PostCard>,
    pub tag_filters: Vec<TagFilterView>,
    pub active_tag: Option<String>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub meta: PageMetaView,
    pub title: String,
    pub published: String,
    pub iso_date: String,
    pub reading_minutes: String,
    pub tags: Vec<String>,
    pub feature_image: Option<String>,
    pub body_html: String,
    pub toc: Vec<TocEntryView>,
    pub share: ShareLinksView,
    pub related: Vec<PostCard>,
    pub view_count: Option<String>,
    pub is_archived: bool,
}

#[derive(Template)]
#[template(path = "projects.html")]
pub struct ProjectsTemplate {
    pub meta: PageMetaView,
    pub projects: Vec<Project>,
}

#[derive(Template)]
#[template(path = "resume.html")]
pub struct ResumeTemplate {
    pub meta: PageMetaView,
    pub experience: Vec<ResumeEntry>,
    pub education: Vec<ResumeEntry>,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub meta: PageMetaView,
    pub profile: Profile,
    pub connect: Vec<ConnectCard>,
    pub github_user: Option<String>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub meta: PageMetaView,
    pub title: String,
    pub message: String,
}

pub fn iso_date(date: time::Date) -> String {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    date.format(&format).unwrap_or_else(|_| date.to_string())
}

pub fn human_date(date: time::Date) -> String {
    let format = time::macros::format_description!("[month repr:long] [day padding:none], [year]");
    date.format(&format).unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn share_links_are_url_encoded() {
        let share = ShareLinksView::for_post(
            "https://ada.example.com/posts/hello-world",
            "Hello & Welcome",
        );

        assert!(share.twitter.contains("Hello+%26+Welcome"));
        assert!(
            share
                .linkedin
                .contains("https%3A%2F%2Fada.example.com%2Fposts%2Fhello-world")
        );
        assert!(share.mailto.starts_with("mailto:?subject="));
        assert_eq!(share.permalink, "https://ada.example.com/posts/hello-world");
    }

    #[test]
    fn toc_skips_deep_and_unsluggable_headings() {
        let headings = vec![
            HeadingAnchor {
                level: 2,
                slug: "intro".to_string(),
                text: "Intro".to_string(),
            },
            HeadingAnchor {
                level: 2,
                slug: String::new(),
                text: "!!!".to_string(),
            },
            HeadingAnchor {
                level: 4,
                slug: "deep".to_string(),
                text: "Deep".to_string(),
            },
        ];

        let toc = build_toc(&headings);
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].slug, "intro");
    }

    #[test]
    fn dates_format_for_humans_and_machines() {
        let day = date!(2025 - 02 - 03);
        assert_eq!(iso_date(day), "2025-02-03");
        assert_eq!(human_date(day), "February 3, 2025");
    }
}
