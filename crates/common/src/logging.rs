use crate::config::Environment;
use opentelemetry::global::BoxedTracer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber: JSON lines in production (what the
/// function's log stream ingests), pretty output in development.
///
/// Uses RUST_LOG for filtering (defaults to "info" if not set). When a tracer
/// is given, spans are also bridged to OpenTelemetry.
pub fn setup_logging(environment: Environment, tracer: Option<BoxedTracer>) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    match environment {
        Environment::Production => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_level(true)
                        .with_current_span(true)
                        .with_ansi(false),
                )
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}
