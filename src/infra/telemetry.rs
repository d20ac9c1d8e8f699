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

pub const METRIC_CMS_REQUEST_TOTAL: &str = "newsdesk_cms_request_total";
pub const METRIC_CMS_REQUEST_MS: &str = "newsdesk_cms_request_ms";

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
            METRIC_CMS_REQUEST_TOTAL,
            Unit::Count,
            "Total number of upstream CMS requests by api and outcome."
        );
        describe_histogram!(
            METRIC_CMS_REQUEST_MS,
            Unit::Milliseconds,
            "Upstream CMS request latency in milliseconds."
        );
        describe_counter!(
            "newsdesk_cache_hit_total",
            Unit::Count,
            "Total number of content cache hits."
        );
        describe_counter!(
            "newsdesk_cache_miss_total",
            Unit::Count,
            "Total number of content cache misses."
        );
        describe_counter!(
            "newsdesk_cache_evicted_total",
            Unit::Count,
            "Total number of cached content responses evicted at capacity."
        );
    });
}
