//! RSS and Atom feed generation from the in-memory catalog.

use time::format_description::well_known::{Rfc2822, Rfc3339};

use crate::application::catalog::PostCatalog;
use crate::domain::portfolio::SiteContent;

const FEED_LIMIT: usize = 100;

/// Generate the RSS 2.0 feed.
pub fn rss_feed(site: &SiteContent, catalog: &PostCatalog) -> String {
    let base = site.base_url();

    let mut items = String::new();
    for rendered in catalog.published().take(FEED_LIMIT) {
        let post = &rendered.post;
        let published = post.published_on.midnight().assume_utc();
        let pub_date = published
            .format(&Rfc2822)
            .unwrap_or_else(|_| published.to_string());
        let link = format!("{base}posts/{}", post.slug);
        items.push_str(&format!(
            "    <item>\n      <title>{}</title>\n      <link>{}</link>\n      <guid>{}</guid>\n      <pubDate>{}</pubDate>\n      <description><![CDATA[{}]]></description>\n    </item>\n",
            xml_escape(&post.title),
            link,
            link,
            pub_date,
            xml_escape(&post.excerpt),
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n  <channel>\n    <title>{}</title>\n    <link>{}</link>\n    <description>{}</description>\n{}  </channel>\n</rss>\n",
        xml_escape(&site.profile.name),
        base,
        xml_escape(&site.profile.headline),
        items
    )
}

/// Generate the Atom 1.0 feed.
pub fn atom_feed(site: &SiteContent, catalog: &PostCatalog) -> String {
    let base = site.base_url();

    let updated = catalog
        .latest_publish_date()
        .map(|date| date.midnight().assume_utc())
        .and_then(|stamp| stamp.format(&Rfc3339).ok())
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string());

    let mut entries = String::new();
    for rendered in catalog.published().take(FEED_LIMIT) {
        let post = &rendered.post;
        let published = post.published_on.midnight().assume_utc();
        let published_str = published
            .format(&Rfc3339)
            .unwrap_or_else(|_| published.to_string());
        let link = format!("{base}posts/{}", post.slug);
        entries.push_str(&format!(
            "  <entry>\n    <title>{}</title>\n    <link href=\"{}\"/>\n    <id>{}</id>\n    <updated>{}</updated>\n    <summary><![CDATA[{}]]></summary>\n  </entry>\n",
            xml_escape(&post.title),
            link,
            link,
            published_str,
            xml_escape(&post.excerpt),
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<feed xmlns=\"http://www.w3.org/2005/Atom\">\n  <title>{}</title>\n  <id>{}</id>\n  <updated>{}</updated>\n  <link href=\"{}atom.xml\" rel=\"self\"/>\n{}\n</feed>\n",
        xml_escape(&site.profile.name),
        base,
        updated,
        base,
        entries
    )
}

pub(crate) fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
