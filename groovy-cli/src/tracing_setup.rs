//! Logging setup for the `groovy` binary
//!
//! `RUST_LOG` always wins over `--debug`. Built with the `telemetry` feature,
//! `--otel` additionally ships spans to `OTEL_EXPORTER_OTLP_ENDPOINT`
//! (default `http://localhost:4317`) as service `OTEL_SERVICE_NAME`
//! (default `groovy`).

use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// sqlx logs every statement at info
const DEFAULT_FILTER: &str = "info,sqlx=warn";
const DEBUG_FILTER: &str = "debug,sqlx=info,hyper=info,h2=info";

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConfig {
    pub debug: bool,
    pub otel: bool,
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        let default = if self.debug { DEBUG_FILTER } else { DEFAULT_FILTER };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init(config: &TracingConfig) -> Result<()> {
    let console = tracing_subscriber::fmt::layer()
        .with_target(config.debug)
        .compact();
    let subscriber = tracing_subscriber::registry()
        .with(config.filter())
        .with(console);

    #[cfg(feature = "telemetry")]
    if config.otel {
        let (otlp, endpoint) = otlp::layer()?;
        subscriber.with(otlp).try_init().map_err(|e| anyhow!(e))?;
        tracing::info!(%endpoint, "exporting spans over OTLP");
        return Ok(());
    }

    subscriber.try_init().map_err(|e| anyhow!(e))?;
    #[cfg(not(feature = "telemetry"))]
    if config.otel {
        tracing::warn!("built without the telemetry feature, not exporting spans");
    }
    Ok(())
}

/// Flush spans still buffered in the batch exporter.
#[cfg(feature = "telemetry")]
pub fn shutdown_otel() {
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(not(feature = "telemetry"))]
pub fn shutdown_otel() {}

#[cfg(feature = "telemetry")]
mod otlp {
    use anyhow::{Context, Result};
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::{Tracer, TracerProvider};
    use opentelemetry_sdk::{runtime, Resource};
    use tracing_opentelemetry::OpenTelemetryLayer;
    use tracing_subscriber::registry::LookupSpan;

    fn env_or(key: &str, default: &str) -> String {
        std::env::var(key).unwrap_or_else(|_| default.to_owned())
    }

    /// Layer bridging tracing spans to an OTLP/gRPC exporter, plus the
    /// endpoint it talks to.
    pub fn layer<S>() -> Result<(OpenTelemetryLayer<S, Tracer>, String)>
    where
        S: tracing::Subscriber + for<'span> LookupSpan<'span>,
    {
        let endpoint = env_or("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317");
        let service = env_or("OTEL_SERVICE_NAME", "groovy");

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()
            .with_context(|| format!("building OTLP exporter for {endpoint}"))?;

        let provider = TracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_resource(Resource::new([KeyValue::new("service.name", service)]))
            .build();
        let tracer = provider.tracer("groovy");
        // the global slot keeps the provider (and its exporter) alive
        let _ = opentelemetry::global::set_tracer_provider(provider);

        Ok((tracing_opentelemetry::layer().with_tracer(tracer), endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_raises_default_level() {
        // only meaningful without an explicit RUST_LOG
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let quiet = TracingConfig::default().filter().to_string();
        let loud = TracingConfig {
            debug: true,
            otel: false,
        }
        .filter()
        .to_string();
        assert!(quiet.contains("sqlx=warn"));
        assert!(loud.contains("sqlx=info"));
    }
}
