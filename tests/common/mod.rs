use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use vetrina::application::catalog::PostCatalog;
use vetrina::application::contact::{ContactMessage, ContactService, Mailer};
use vetrina::application::contributions::{
    ContributionCalendar, ContributionFetcher, ContributionService, ContributionSource,
};
use vetrina::application::render;
use vetrina::application::view_counts::{InMemoryViewCounts, ViewCounts};
use vetrina::domain::portfolio::SiteContent;
use vetrina::infra::error::InfraError;
use vetrina::infra::http::{AppState, build_router, rate_limit::RateLimiter};

pub const SITE_TOML: &str = r#"
[profile]
name = "Ada Writer"
headline = "Systems engineer"
bio = "Notes on Rust and infrastructure."
email = "hello@ada.example.com"
base_url = "https://ada.example.com"
github_user = "ada-writer"

[blog]
high_value_tags = ["rust"]

[[projects]]
name = "packet-peek"
summary = "A terminal viewer for pcap captures."
tech = ["Rust"]

[[resume.experience]]
organization = "Northwind Systems"
role = "Senior Systems Engineer"
period = "2022 - present"

[[connect]]
label = "GitHub"
url = "https://github.com/ada-writer"
"#;

pub struct RecordingMailer {
    pub sent: Mutex<Vec<ContactMessage>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn deliver(&self, message: &ContactMessage) -> Result<(), InfraError> {
        if self.fail {
            return Err(InfraError::upstream("resend", "provider down"));
        }
        self.sent
            .lock()
            .expect("mailer lock")
            .push(message.clone());
        Ok(())
    }
}

pub struct StubFetcher {
    pub total: u64,
}

#[async_trait]
impl ContributionFetcher for StubFetcher {
    fn source(&self) -> ContributionSource {
        ContributionSource::Api
    }

    async fn fetch(&self, user: &str) -> Result<ContributionCalendar, InfraError> {
        Ok(ContributionCalendar {
            user: user.to_string(),
            total: self.total,
            weeks: Vec::new(),
            source: ContributionSource::Api,
        })
    }
}

pub struct FailingFetcher;

#[async_trait]
impl ContributionFetcher for FailingFetcher {
    fn source(&self) -> ContributionSource {
        ContributionSource::Api
    }

    async fn fetch(&self, _user: &str) -> Result<ContributionCalendar, InfraError> {
        Err(InfraError::upstream("github-api", "unavailable"))
    }
}

pub struct TestSiteBuilder {
    pub posts: Vec<(String, String)>,
    pub mailer: Arc<RecordingMailer>,
    pub fetchers: Vec<Arc<dyn ContributionFetcher>>,
    pub rate_limit: (u32, Duration),
}

impl Default for TestSiteBuilder {
    fn default() -> Self {
        Self {
            posts: vec![
                (
                    "hello-world.md".to_string(),
                    "---\ntitle: Hello World\ndate: 2025-01-12\ntags: [rust, web]\n---\n\
                     First post body with a [link](https://example.com).\n"
                        .to_string(),
                ),
                (
                    "second-post.md".to_string(),
                    "---\ntitle: Second Post\ndate: 2025-03-02\ntags: [rust]\n---\n\
                     ## Heading\n\nMore prose here.\n"
                        .to_string(),
                ),
                (
                    "hidden-draft.md".to_string(),
                    "---\ntitle: Hidden Draft\ndate: 2025-05-01\ndraft: true\n---\nUnfinished.\n"
                        .to_string(),
                ),
            ],
            mailer: Arc::new(RecordingMailer {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }),
            fetchers: vec![Arc::new(StubFetcher { total: 42 })],
            rate_limit: (5, Duration::from_secs(60)),
        }
    }
}

impl TestSiteBuilder {
    pub async fn build(self) -> (Router, Arc<RecordingMailer>) {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, body) in &self.posts {
            std::fs::write(dir.path().join(name), body).expect("fixture write");
        }

        let site = Arc::new(SiteContent::from_toml(SITE_TOML).expect("site fixture"));
        let catalog = Arc::new(
            PostCatalog::load(dir.path(), &render::renderer())
                .await
                .expect("catalog fixture"),
        );

        let mailer = self.mailer.clone();
        let state = AppState {
            site,
            catalog,
            contact: Arc::new(ContactService::new(mailer.clone())),
            contributions: Arc::new(ContributionService::new(
                self.fetchers,
                NonZeroUsize::new(8).expect("capacity"),
                Duration::from_secs(600),
            )),
            view_counts: Arc::new(ViewCounts::new(Box::new(InMemoryViewCounts::default()))),
            contact_limiter: Arc::new(RateLimiter::new(self.rate_limit.0, self.rate_limit.1)),
        };

        (build_router(state), mailer)
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router response")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}
