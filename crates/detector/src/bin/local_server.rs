use common::TelemetryGuard;
use detector::{Detector, DetectorConfig, local, logging::setup_logging};
use std::sync::Arc;

#[cfg(feature = "ort-backend")]
use detector::backend::ort::OrtBackend as Backend;

#[cfg(not(feature = "ort-backend"))]
compile_error!("A backend feature must be enabled: 'ort-backend'");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DetectorConfig::from_env()?;

    let telemetry = config
        .otel_endpoint
        .as_ref()
        .map(|endpoint| TelemetryGuard::init("detector-local", endpoint))
        .transpose()?;

    setup_logging(&config, telemetry.as_ref());

    tracing::info!(config = ?config, "Loaded configuration");

    let detector = Arc::new(Detector::<Backend>::load(&config)?);
    tracing::info!("Model loaded successfully");

    let app = local::router(detector);

    let listener = tokio::net::TcpListener::bind(&config.local_addr).await?;
    tracing::info!(
        addr = %config.local_addr,
        path = local::INVOCATION_PATH,
        "Local invocation server listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
