mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};

use common::{TestSiteBuilder, body_text, send};

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn index_shows_recent_posts_without_drafts() {
    let (router, _) = TestSiteBuilder::default().build().await;

    let response = send(&router, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Ada Writer"));
    assert!(html.contains("Second Post"));
    assert!(html.contains("Hello World"));
    assert!(!html.contains("Hidden Draft"));
}

#[tokio::test]
async fn posts_index_filters_by_tag() {
    let (router, _) = TestSiteBuilder::default().build().await;

    let all = body_text(send(&router, get("/posts")).await).await;
    assert!(all.contains("Hello World"));
    assert!(all.contains("Second Post"));
    assert!(!all.contains("Hidden Draft"));

    let filtered = body_text(send(&router, get("/posts?tag=web")).await).await;
    assert!(filtered.contains("Hello World"));
    assert!(!filtered.contains("Second Post"));
}

#[tokio::test]
async fn unknown_tag_is_not_found() {
    let (router, _) = TestSiteBuilder::default().build().await;

    let response = send(&router, get("/posts?tag=no-such-tag")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_detail_renders_published_posts_only() {
    let (router, _) = TestSiteBuilder::default().build().await;

    let response = send(&router, get("/posts/hello-world")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Hello World"));
    assert!(html.contains("https://example.com"));

    let draft = send(&router, get("/posts/hidden-draft")).await;
    assert_eq!(draft.status(), StatusCode::NOT_FOUND);

    let missing = send(&router, get("/posts/never-written")).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn archived_post_stays_reachable_with_notice() {
    let mut builder = TestSiteBuilder::default();
    builder.posts.push((
        "old-take.md".to_string(),
        "---\ntitle: An Old Take\ndate: 2024-02-01\narchived: true\n---\nDated advice.\n"
            .to_string(),
    ));
    let (router, _) = builder.build().await;

    let listing = body_text(send(&router, get("/posts")).await).await;
    assert!(!listing.contains("An Old Take"));

    let response = send(&router, get("/posts/old-take")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("An Old Take"));
    assert!(html.contains("This post is archived"));
}

#[tokio::test]
async fn feeds_carry_the_right_content_types() {
    let (router, _) = TestSiteBuilder::default().build().await;

    let rss = send(&router, get("/rss.xml")).await;
    assert_eq!(rss.status(), StatusCode::OK);
    assert_eq!(
        rss.headers().get(header::CONTENT_TYPE).expect("content type"),
        "application/rss+xml; charset=utf-8"
    );
    let rss_body = body_text(rss).await;
    assert!(rss_body.contains("<title>Ada Writer</title>"));
    assert!(rss_body.contains("https://ada.example.com/posts/second-post"));
    assert!(!rss_body.contains("Hidden Draft"));

    let atom = send(&router, get("/atom.xml")).await;
    assert_eq!(atom.status(), StatusCode::OK);
    assert_eq!(
        atom.headers().get(header::CONTENT_TYPE).expect("content type"),
        "application/atom+xml; charset=utf-8"
    );
    let atom_body = body_text(atom).await;
    assert!(atom_body.contains("<entry>"));
}

#[tokio::test]
async fn sitemap_robots_and_security_txt_are_served() {
    let (router, _) = TestSiteBuilder::default().build().await;

    let sitemap = send(&router, get("/sitemap.xml")).await;
    assert_eq!(
        sitemap
            .headers()
            .get(header::CONTENT_TYPE)
            .expect("content type"),
        "application/xml; charset=utf-8"
    );
    let sitemap_body = body_text(sitemap).await;
    assert!(sitemap_body.contains("https://ada.example.com/posts/hello-world"));
    assert!(sitemap_body.contains("<lastmod>2025-03-02"));
    assert!(!sitemap_body.contains("hidden-draft"));

    let robots = body_text(send(&router, get("/robots.txt")).await).await;
    assert!(robots.contains("Sitemap: https://ada.example.com/sitemap.xml"));

    let security = body_text(send(&router, get("/.well-known/security.txt")).await).await;
    assert!(security.contains("Contact: mailto:hello@ada.example.com"));
    assert!(security.contains("Canonical: https://ada.example.com/.well-known/security.txt"));
}

#[tokio::test]
async fn unknown_route_falls_back_to_not_found_page() {
    let (router, _) = TestSiteBuilder::default().build().await;

    let response = send(&router, get("/no-such-page")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_text(response).await;
    assert!(html.contains("Not found"));
}

#[tokio::test]
async fn static_assets_refuse_path_traversal() {
    let (router, _) = TestSiteBuilder::default().build().await;

    let css = send(&router, get("/static/css/site.css")).await;
    assert_eq!(css.status(), StatusCode::OK);
    assert_eq!(
        css.headers()
            .get(header::CACHE_CONTROL)
            .expect("cache control"),
        "public, max-age=31536000, immutable"
    );

    let escape = send(&router, get("/static/..%2F..%2FCargo.toml")).await;
    assert_eq!(escape.status(), StatusCode::NOT_FOUND);
}
