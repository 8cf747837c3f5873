//! JSON API surface: contact form dispatch and the contributions proxy.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use metrics::counter;
use serde::Deserialize;
use serde_json::json;

use crate::application::contact::{ContactError, ContactSubmission};
use crate::application::contributions::ContributionSource;
use crate::application::error::{ErrorReport, HttpError};

use super::{AppState, client_identifier, rate_limit::RateDecision};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/contact", post(submit_contact))
        .route("/api/contributions", get(contributions))
}

async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(submission): Json<ContactSubmission>,
) -> Response {
    const SOURCE: &str = "infra::http::api::submit_contact";

    let identifier = client_identifier(&headers);
    if let RateDecision::Limited { retry_after } = state.contact_limiter.check(&identifier) {
        let retry_secs = retry_after.as_secs().max(1);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests, slow down" })),
        )
            .into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_secs.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            SOURCE,
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate limited `{identifier}`, retry in {retry_secs}s"),
        )
        .attach(&mut response);
        return response;
    }

    match state.contact.submit(submission).await {
        Ok(()) => {
            counter!("vetrina_contact_submissions_total").increment(1);
            (StatusCode::OK, Json(json!({ "status": "sent" }))).into_response()
        }
        Err(ContactError::Validation(reason)) => {
            counter!("vetrina_contact_rejected_total").increment(1);
            let mut response = (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": reason.clone() })),
            )
                .into_response();
            ErrorReport::from_message(SOURCE, StatusCode::BAD_REQUEST, reason)
                .attach(&mut response);
            response
        }
        Err(err @ ContactError::Delivery(_)) => {
            let mut response = (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Message could not be delivered" })),
            )
                .into_response();
            ErrorReport::from_error(SOURCE, StatusCode::BAD_GATEWAY, &err).attach(&mut response);
            response
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContributionsQuery {
    user: Option<String>,
}

async fn contributions(
    State(state): State<AppState>,
    Query(query): Query<ContributionsQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::api::contributions";

    let user = query
        .user
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| state.site.profile.github_user.clone());

    let Some(user) = user else {
        return HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Missing user",
            "no `user` query parameter and no configured GitHub profile",
        )
        .into_response();
    };

    match state.contributions.calendar(&user).await {
        Ok(calendar) => {
            if calendar.source == ContributionSource::Mock {
                counter!("vetrina_contributions_fallback_total").increment(1);
            }
            (StatusCode::OK, Json(calendar)).into_response()
        }
        Err(err) => HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid user",
            err.to_string(),
        )
        .into_response(),
    }
}
