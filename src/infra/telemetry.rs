use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "vetrina_page_views_total",
            Unit::Count,
            "Total number of post page views recorded."
        );
        describe_counter!(
            "vetrina_contact_submissions_total",
            Unit::Count,
            "Total number of contact messages accepted for delivery."
        );
        describe_counter!(
            "vetrina_contact_rejected_total",
            Unit::Count,
            "Total number of contact submissions rejected before delivery."
        );
        describe_counter!(
            "vetrina_rate_limited_total",
            Unit::Count,
            "Total number of requests refused by the rate limiter."
        );
        describe_counter!(
            "vetrina_contributions_fallback_total",
            Unit::Count,
            "Total number of contribution calendars served from the mock source."
        );
        describe_histogram!(
            "vetrina_render_ms",
            Unit::Milliseconds,
            "Markdown render latency in milliseconds."
        );
    });
}
