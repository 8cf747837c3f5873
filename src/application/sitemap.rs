//! sitemap.xml, robots.txt, and security.txt generation.

use time::Date;
use time::format_description::well_known::Rfc3339;

use crate::application::catalog::PostCatalog;
use crate::domain::portfolio::SiteContent;

/// Fixed pages that always appear in the sitemap alongside the post archive.
const FIXED_PATHS: [&str; 4] = ["/about", "/projects", "/resume", "/posts"];

/// Generate sitemap.xml content.
pub fn sitemap_xml(site: &SiteContent, catalog: &PostCatalog) -> String {
    let base = site.base_url();
    let mut entries = Vec::new();

    entries.push(sitemap_entry(&base, "/", catalog.latest_publish_date()));
    for path in FIXED_PATHS {
        entries.push(sitemap_entry(&base, path, None));
    }
    for rendered in catalog.published() {
        entries.push(sitemap_entry(
            &base,
            &format!("/posts/{}", rendered.post.slug),
            Some(rendered.post.published_on),
        ));
    }

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str(&entry);
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Generate robots.txt content.
pub fn robots_txt(site: &SiteContent) -> String {
    let base = site.base_url();
    format!("User-agent: *\nAllow: /\nSitemap: {base}sitemap.xml\n")
}

/// Generate `.well-known/security.txt` content. The expiry stamp is a year
/// past the most recent publish date, so a stale deploy shows as expired.
pub fn security_txt(site: &SiteContent, catalog: &PostCatalog) -> String {
    let base = site.base_url();
    let anchor = catalog
        .latest_publish_date()
        .unwrap_or(Date::MIN)
        .midnight()
        .assume_utc();
    let expires = anchor
        .checked_add(time::Duration::days(365))
        .unwrap_or(anchor);
    let expires_str = expires
        .format(&Rfc3339)
        .unwrap_or_else(|_| expires.to_string());
    format!(
        "Contact: mailto:{}\nExpires: {}\nCanonical: {base}.well-known/security.txt\nPreferred-Languages: en\n",
        site.profile.email, expires_str,
    )
}

fn sitemap_entry(base: &str, path: &str, lastmod: Option<Date>) -> String {
    let loc = canonical_url(base, path);
    match lastmod
        .map(|date| date.midnight().assume_utc())
        .and_then(|stamp| stamp.format(&Rfc3339).ok())
    {
        Some(lastmod) => format!("  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod></url>\n"),
        None => format!("  <url><loc>{loc}</loc></url>\n"),
    }
}

fn canonical_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path == "/" {
        base.to_string()
    } else {
        format!("{base}{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render;
    use std::fs;

    const SITE: &str = r#"
[profile]
name = "Ada Writer"
headline = "Systems engineer"
email = "ada@example.com"
base_url = "https://ada.example.com/"
"#;

    async fn fixture_catalog() -> PostCatalog {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("hello.md"),
            "---\ntitle: Hello\ndate: 2025-02-10\n---\nbody\n",
        )
        .expect("fixture");
        fs::write(
            dir.path().join("hidden.md"),
            "---\ntitle: Hidden\ndate: 2025-03-01\narchived: true\n---\nbody\n",
        )
        .expect("fixture");
        PostCatalog::load(dir.path(), &render::renderer())
            .await
            .expect("catalog")
    }

    #[tokio::test]
    async fn sitemap_lists_fixed_pages_and_public_posts() {
        let site = SiteContent::from_toml(SITE).expect("site");
        let xml = sitemap_xml(&site, &fixture_catalog().await);

        assert!(xml.contains("<loc>https://ada.example.com</loc>"));
        assert!(xml.contains("<loc>https://ada.example.com/projects</loc>"));
        assert!(xml.contains(
            "<loc>https://ada.example.com/posts/hello</loc><lastmod>2025-02-10T00:00:00Z</lastmod>"
        ));
        assert!(!xml.contains("/posts/hidden"));
    }

    #[tokio::test]
    async fn robots_points_at_the_sitemap() {
        let site = SiteContent::from_toml(SITE).expect("site");
        assert_eq!(
            robots_txt(&site),
            "User-agent: *\nAllow: /\nSitemap: https://ada.example.com/sitemap.xml\n"
        );
    }

    #[tokio::test]
    async fn security_txt_carries_contact_and_expiry() {
        let site = SiteContent::from_toml(SITE).expect("site");
        let body = security_txt(&site, &fixture_catalog().await);

        assert!(body.contains("Contact: mailto:ada@example.com"));
        assert!(body.contains("Expires: 2026-02-10T00:00:00Z"));
        assert!(body.contains("Canonical: https://ada.example.com/.well-known/security.txt"));
    }
}
