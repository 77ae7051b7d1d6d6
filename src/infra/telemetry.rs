use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::service::{METRIC_CACHE_ERROR, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
use crate::config::{LogFormat, LoggingSettings};
use crate::events::{METRIC_EVENT_DROPPED, METRIC_EVENT_FAILED, METRIC_EVENT_PUBLISHED};

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
            METRIC_CACHE_HIT,
            Unit::Count,
            "Reads served from a cached snapshot."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Reads that found no usable snapshot and went to the store."
        );
        describe_counter!(
            METRIC_CACHE_ERROR,
            Unit::Count,
            "Cache calls that failed or timed out, labelled by operation."
        );
        describe_counter!(
            METRIC_EVENT_PUBLISHED,
            Unit::Count,
            "Mutation events delivered to the log."
        );
        describe_counter!(
            METRIC_EVENT_FAILED,
            Unit::Count,
            "Mutation events the log rejected; these are not retried."
        );
        describe_counter!(
            METRIC_EVENT_DROPPED,
            Unit::Count,
            "Mutation events dropped because the outbox was full or closed."
        );
    });
}
