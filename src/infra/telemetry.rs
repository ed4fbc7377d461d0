use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::Subscriber;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    fmt::MakeWriter,
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber writing to stdout.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    install(logging, std::io::stdout)
}

/// Install a global tracing subscriber writing to stderr, leaving stdout for command output.
pub fn init_stderr(logging: &LoggingSettings) -> Result<(), InfraError> {
    install(logging, std::io::stderr)
}

fn install<W>(logging: &LoggingSettings, writer: W) -> Result<(), InfraError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer(logging.format, writer))
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn fmt_layer<S, W>(format: LogFormat, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
    }
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "folio_index_cache_hit_total",
            Unit::Count,
            "Total number of index requests answered by a fresh cached index."
        );
        describe_counter!(
            "folio_index_cache_miss_total",
            Unit::Count,
            "Total number of index requests that triggered a rebuild."
        );
        describe_counter!(
            "folio_index_cache_stale_served_total",
            Unit::Count,
            "Total number of stale indexes served while a rebuild was in flight."
        );
        describe_counter!(
            "folio_index_refresh_failed_total",
            Unit::Count,
            "Total number of failed index rebuilds."
        );
        describe_histogram!(
            "folio_index_materialize_ms",
            Unit::Milliseconds,
            "Index materialization latency in milliseconds."
        );
    });
}
