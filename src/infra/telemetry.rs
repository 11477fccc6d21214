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
            "autopurge_events_total",
            Unit::Count,
            "Total number of change and package notifications dispatched."
        );
        describe_counter!(
            "autopurge_record_total",
            Unit::Count,
            "Total number of URL sets recorded into the coalescing buffer."
        );
        describe_counter!(
            "autopurge_flush_total",
            Unit::Count,
            "Total number of non-empty coalesced buffer flushes."
        );
        describe_counter!(
            "autopurge_purge_requests_total",
            Unit::Count,
            "Total number of purge API calls attempted."
        );
        describe_counter!(
            "autopurge_purge_failures_total",
            Unit::Count,
            "Total number of purge API calls that failed."
        );
        describe_histogram!(
            "autopurge_purge_batch_ms",
            Unit::Milliseconds,
            "Latency of a single purge API call in milliseconds."
        );
    });
}
