//! Tracing subscriber and OpenTelemetry exporter setup.

use std::io;

use anyhow::Context;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Selects the JSON formatter when set to `json`.
pub const LOG_FORMAT_VAR: &str = "POSTHOG_ACTION_LOG_FORMAT";

/// Enables the OTLP exporter when set.
pub const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

const SERVICE_NAME: &str = "posthog-action";

/// Handle on the installed exporters, shut down before exit.
pub struct Telemetry {
    provider: Option<TracerProvider>,
}

impl Telemetry {
    /// Flushes pending spans and stops the exporter.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                eprintln!("failed to shut down tracer provider: {e}");
            }
        }
    }
}

/// Installs the global subscriber.
///
/// Filtering follows `RUST_LOG` (default `info`). Output goes to stderr.
/// Neither a bad exporter setting nor an already-installed subscriber stops
/// the action: the problem is printed to stderr and the phase runs anyway.
pub fn init() -> Telemetry {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var(LOG_FORMAT_VAR).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let fmt_layer = if json {
        fmt::layer().json().with_writer(io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(false)
            .with_target(false)
            .boxed()
    };

    let provider = std::env::var(OTLP_ENDPOINT_VAR)
        .ok()
        .and_then(|endpoint| otlp_provider(&endpoint));
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE_NAME)));

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
    {
        eprintln!("failed to install tracing subscriber: {e}");
    }

    Telemetry { provider }
}

/// Builds the OTLP tracer provider for `endpoint`.
///
/// Returns `None` for a blank endpoint, or after printing the error when the
/// exporter cannot be built.
fn otlp_provider(endpoint: &str) -> Option<TracerProvider> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return None;
    }
    match tracer_provider(endpoint) {
        Ok(provider) => Some(provider),
        Err(e) => {
            eprintln!("OpenTelemetry export disabled: {e:#}");
            None
        }
    }
}

fn tracer_provider(endpoint: &str) -> anyhow::Result<TracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("failed to build OTLP span exporter")?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build())
}
