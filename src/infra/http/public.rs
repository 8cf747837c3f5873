use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use metrics::counter;
use serde::Deserialize;

use crate::{
    application::{related, sitemap, syndication},
    presentation::views::{
        AboutTemplate, IndexTemplate, PageMetaView, PostCard, PostTemplate, PostsTemplate,
        ProjectsTemplate, ResumeTemplate, ShareLinksView, build_tag_filters, build_toc, iso_date,
        render_not_found_response, render_template_response,
    },
};

use super::AppState;

const FEATURED_PROJECT_COUNT: usize = 3;
const RECENT_POST_COUNT: usize = 5;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/projects", get(projects))
        .route("/resume", get(resume))
        .route("/posts", get(posts_index))
        .route("/posts/{slug}", get(post_detail))
        .route("/rss.xml", get(rss_feed))
        .route("/atom.xml", get(atom_feed))
        .route("/sitemap.xml", get(sitemap_xml))
        .route("/robots.txt", get(robots_txt))
        .route("/.well-known/security.txt", get(security_txt))
        .route("/static/{*path}", get(crate::infra::assets::serve))
        .fallback(fallback)
}

async fn index(State(state): State<AppState>) -> Response {
    let site = &state.site;
    let template = IndexTemplate {
        meta: PageMetaView::for_page(site, "", &site.profile.headline, "/"),
        profile: site.profile.clone(),
        recent_posts: state
            .catalog
            .recent(RECENT_POST_COUNT)
            .iter()
            .map(|rendered| PostCard::from_rendered(rendered))
            .collect(),
        featured_projects: site
            .projects
            .iter()
            .take(FEATURED_PROJECT_COUNT)
            .cloned()
            .collect(),
        connect: site.connect.clone(),
    };
    render_template_response(template, StatusCode::OK)
}

async fn about(State(state): State<AppState>) -> Response {
    let site = &state.site;
    let template = AboutTemplate {
        meta: PageMetaView::for_page(site, "About", &site.profile.headline, "/about"),
        profile: site.profile.clone(),
        connect: site.connect.clone(),
        github_user: site.profile.github_user.clone(),
    };
    render_template_response(template, StatusCode::OK)
}

async fn projects(State(state): State<AppState>) -> Response {
    let site = &state.site;
    let template = ProjectsTemplate {
        meta: PageMetaView::for_page(site, "Projects", "Selected projects", "/projects"),
        projects: site.projects.clone(),
    };
    render_template_response(template, StatusCode::OK)
}

async fn resume(State(state): State<AppState>) -> Response {
    let site = &state.site;
    let template = ResumeTemplate {
        meta: PageMetaView::for_page(site, "Resume", "Experience and education", "/resume"),
        experience: site.resume.experience.clone(),
        education: site.resume.education.clone(),
    };
    render_template_response(template, StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostsQuery {
    tag: Option<String>,
}

async fn posts_index(State(state): State<AppState>, Query(query): Query<PostsQuery>) -> Response {
    let site = &state.site;
    let active_tag = query
        .tag
        .as_deref()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string);

    let selected = match active_tag.as_deref() {
        Some(tag) => state.catalog.with_tag(tag),
        None => state.catalog.published().cloned().collect(),
    };

    // An unknown tag is a 404, not an empty listing.
    if active_tag.is_some() && selected.is_empty() {
        return render_not_found_response(not_found_meta(&state));
    }

    let template = PostsTemplate {
        meta: PageMetaView::for_page(site, "Posts", "All published posts", "/posts"),
        posts: selected
            .iter()
            .map(|rendered| PostCard::from_rendered(rendered))
            .collect(),
        tag_filters: build_tag_filters(&state.catalog.tags(), active_tag.as_deref()),
        active_tag,
    };
    render_template_response(template, StatusCode::OK)
}

async fn post_detail(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let site = &state.site;
    let Some(rendered) = state.catalog.find(&slug) else {
        return render_not_found_response(not_found_meta(&state));
    };
    // Drafts never leave the catalog; archived posts stay reachable by
    // direct link but carry a notice.
    if rendered.post.draft {
        return render_not_found_response(not_found_meta(&state));
    }

    let post = &rendered.post;
    let permalink = format!("{}posts/{}", site.base_url(), post.slug);

    let view_count = state.view_counts.record(&post.slug).await;
    if view_count.is_some() {
        counter!("vetrina_page_views_total").increment(1);
    }

    let related = related::related_posts(
        &state.catalog,
        rendered,
        &site.blog.high_value_tags,
        site.blog
            .related_limit
            .unwrap_or(related::DEFAULT_RELATED_LIMIT),
    );

    let template = PostTemplate {
        meta: PageMetaView::for_page(
            site,
            &post.title,
            &post.excerpt,
            &format!("/posts/{}", post.slug),
        )
        .with_image(post.feature_image.clone()),
        title: post.title.clone(),
        published: crate::presentation::views::human_date(post.published_on),
        iso_date: iso_date(post.published_on),
        reading_minutes: format!("{} min read", post.reading_minutes),
        tags: post.tags.clone(),
        feature_image: post.feature_image.clone(),
        body_html: rendered.html.clone(),
        toc: build_toc(&rendered.headings),
        share: ShareLinksView::for_post(&permalink, &post.title),
        related: related
            .iter()
            .map(|entry| PostCard::from_rendered(entry))
            .collect(),
        view_count: view_count.map(|count| count.to_string()),
        is_archived: post.archived,
    };
    render_template_response(template, StatusCode::OK)
}

async fn rss_feed(State(state): State<AppState>) -> Response {
    xml_response(
        syndication::rss_feed(&state.site, &state.catalog),
        "application/rss+xml; charset=utf-8",
    )
}

async fn atom_feed(State(state): State<AppState>) -> Response {
    xml_response(
        syndication::atom_feed(&state.site, &state.catalog),
        "application/atom+xml; charset=utf-8",
    )
}

async fn sitemap_xml(State(state): State<AppState>) -> Response {
    xml_response(
        sitemap::sitemap_xml(&state.site, &state.catalog),
        "application/xml; charset=utf-8",
    )
}

async fn robots_txt(State(state): State<AppState>) -> Response {
    text_response(sitemap::robots_txt(&state.site))
}

async fn security_txt(State(state): State<AppState>) -> Response {
    text_response(sitemap::security_txt(&state.site, &state.catalog))
}

async fn fallback(State(state): State<AppState>) -> Response {
    render_not_found_response(not_found_meta(&state))
}

fn not_found_meta(state: &AppState) -> PageMetaView {
    PageMetaView::for_page(&state.site, "Not found", "Page not found", "/")
}

fn xml_response(body: String, content_type: &'static str) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn text_response(body: String) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
