use common::TelemetryGuard;
use detector::{
    Detector, DetectorConfig, InvocationRequest, InvocationResponse, handler::handle,
    logging::setup_logging,
};
use lambda_runtime::{LambdaEvent, service_fn};
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
        .map(|endpoint| TelemetryGuard::init("detector", endpoint))
        .transpose()?
        .map(Arc::new);

    setup_logging(&config, telemetry.as_deref());

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    tracing::info!("Loading detection model");
    let detector = Arc::new(Detector::<Backend>::load(&config)?);
    tracing::info!("Model loaded successfully");

    lambda_runtime::run(service_fn(move |event: LambdaEvent<InvocationRequest>| {
        let detector = Arc::clone(&detector);
        let telemetry = telemetry.clone();
        async move {
            let request_id = event.context.request_id.clone();
            let response = handle(&detector, event.payload, Some(&request_id)).await;

            if let Some(telemetry) = &telemetry {
                telemetry.flush();
            }

            Ok::<InvocationResponse, lambda_runtime::Error>(response?)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
