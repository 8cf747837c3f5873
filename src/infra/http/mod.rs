pub mod api;
pub mod middleware;
pub mod public;
pub mod rate_limit;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderMap;
use axum::middleware as axum_middleware;

use crate::application::catalog::PostCatalog;
use crate::application::contact::ContactService;
use crate::application::contributions::ContributionService;
use crate::application::view_counts::ViewCounts;
use crate::domain::portfolio::SiteContent;

use middleware::{log_responses, set_request_context};
use rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub site: Arc<SiteContent>,
    pub catalog: Arc<PostCatalog>,
    pub contact: Arc<ContactService>,
    pub contributions: Arc<ContributionService>,
    pub view_counts: Arc<ViewCounts>,
    pub contact_limiter: Arc<RateLimiter>,
}

pub fn build_router(state: AppState) -> Router {
    public::routes()
        .merge(api::routes())
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

/// Best-effort client identifier for rate limiting: the first address in
/// `X-Forwarded-For`, then `X-Real-IP`. Deployments without a proxy in
/// front collapse to one shared bucket.
pub(crate) fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        && let Some(first) = forwarded.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
