mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};

use common::{RecordingMailer, TestSiteBuilder, body_text, send};

fn contact_request(payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

#[tokio::test]
async fn valid_submission_is_delivered() {
    let (router, mailer) = TestSiteBuilder::default().build().await;

    let response = send(
        &router,
        contact_request(json!({
            "name": "  Grace  ",
            "email": "grace@example.com",
            "message": "  Enjoyed the rate limiting post.  ",
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json body");
    assert_eq!(body["status"], "sent");

    let sent = mailer.sent.lock().expect("mailer lock");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sender_name, "Grace");
    assert_eq!(sent[0].reply_to, "grace@example.com");
    assert_eq!(sent[0].body, "Enjoyed the rate limiting post.");
}

#[tokio::test]
async fn invalid_email_is_rejected_without_delivery() {
    let (router, mailer) = TestSiteBuilder::default().build().await;

    let response = send(
        &router,
        contact_request(json!({
            "name": "Grace",
            "email": "not-an-address",
            "message": "hello",
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json body");
    assert_eq!(body["error"], "email address is not valid");
    assert!(mailer.sent.lock().expect("mailer lock").is_empty());
}

#[tokio::test]
async fn provider_outage_maps_to_bad_gateway() {
    let mut builder = TestSiteBuilder::default();
    builder.mailer = Arc::new(RecordingMailer {
        sent: Mutex::new(Vec::new()),
        fail: true,
    });
    let (router, _) = builder.build().await;

    let response = send(
        &router,
        contact_request(json!({
            "name": "Grace",
            "email": "grace@example.com",
            "message": "hello",
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json body");
    assert_eq!(body["error"], "Message could not be delivered");
}

#[tokio::test]
async fn repeated_submissions_hit_the_rate_limit() {
    let mut builder = TestSiteBuilder::default();
    builder.rate_limit = (1, Duration::from_secs(60));
    let (router, mailer) = builder.build().await;

    let payload = json!({
        "name": "Grace",
        "email": "grace@example.com",
        "message": "hello",
    });

    let first = send(&router, contact_request(payload.clone())).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = send(&router, contact_request(payload)).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = second
        .headers()
        .get(header::RETRY_AFTER)
        .expect("retry-after header")
        .to_str()
        .expect("header text")
        .parse()
        .expect("retry-after seconds");
    assert!(retry_after >= 1 && retry_after <= 60);

    let body: Value = serde_json::from_str(&body_text(second).await).expect("json body");
    assert_eq!(body["error"], "Too many requests, slow down");
    assert_eq!(mailer.sent.lock().expect("mailer lock").len(), 1);
}

#[tokio::test]
async fn forwarded_clients_are_limited_independently() {
    let mut builder = TestSiteBuilder::default();
    builder.rate_limit = (1, Duration::from_secs(60));
    let (router, _) = builder.build().await;

    let payload = json!({
        "name": "Grace",
        "email": "grace@example.com",
        "message": "hello",
    });

    for ip in ["203.0.113.7", "203.0.113.8"] {
        let request = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(payload.to_string()))
            .expect("request");
        let response = send(&router, request).await;
        assert_eq!(response.status(), StatusCode::OK, "first request for {ip}");
    }
}
