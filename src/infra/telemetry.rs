use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const PAGE_CACHE_HIT_TOTAL: &str = "postboard_page_cache_hit_total";
pub const PAGE_CACHE_MISS_TOTAL: &str = "postboard_page_cache_miss_total";
pub const PAGE_CACHE_ENTRIES: &str = "postboard_page_cache_entries";
pub const PAGE_CACHE_CLEAR_TOTAL: &str = "postboard_page_cache_clear_total";

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
            PAGE_CACHE_HIT_TOTAL,
            Unit::Count,
            "Total number of page-cache hits on the home listing."
        );
        describe_counter!(
            PAGE_CACHE_MISS_TOTAL,
            Unit::Count,
            "Total number of page-cache misses on the home listing."
        );
        describe_counter!(
            PAGE_CACHE_CLEAR_TOTAL,
            Unit::Count,
            "Total number of manual page-cache clears."
        );
        describe_gauge!(
            PAGE_CACHE_ENTRIES,
            Unit::Count,
            "Current number of entries held by the page cache."
        );
    });
}
