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
            "safecircle_cache_data_hit_total",
            Unit::Count,
            "Total number of content query cache hits."
        );
        describe_counter!(
            "safecircle_cache_data_miss_total",
            Unit::Count,
            "Total number of content query cache misses."
        );
        describe_counter!(
            "safecircle_cache_data_evict_total",
            Unit::Count,
            "Total number of content query cache evictions due to capacity."
        );
        describe_counter!(
            "safecircle_cache_response_hit_total",
            Unit::Count,
            "Total number of rendered response cache hits."
        );
        describe_counter!(
            "safecircle_cache_response_miss_total",
            Unit::Count,
            "Total number of rendered response cache misses."
        );
        describe_counter!(
            "safecircle_cache_response_evict_total",
            Unit::Count,
            "Total number of rendered response cache evictions due to capacity."
        );
        describe_counter!(
            "safecircle_cache_invalidations_total",
            Unit::Count,
            "Total number of tag and path invalidations applied."
        );
        describe_counter!(
            "safecircle_integration_failures_total",
            Unit::Count,
            "Outbound integration calls that failed, by service."
        );
        describe_histogram!(
            "safecircle_http_request_ms",
            Unit::Milliseconds,
            "Request handling time in milliseconds, by status class."
        );
        describe_histogram!(
            "safecircle_integration_request_ms",
            Unit::Milliseconds,
            "Outbound integration call latency in milliseconds, by service."
        );
    });
}
