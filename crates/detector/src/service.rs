use crate::{
    backend::DetectionBackend,
    config::DetectorConfig,
    error::DetectorError,
    fetch::ImageFetcher,
    labels::LabelMap,
    processing::{DetectionResult, PostProcessor, PreProcessor, decode_jpeg},
};
use anyhow::Context;
use common::span;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

struct DetectorMetrics {
    invocation_duration: Histogram<f64>,
    inference_duration: Histogram<f64>,
    invocations: Counter<u64>,
    detections: Counter<u64>,
    failures: Counter<u64>,
}

fn init_metrics(meter_name: &'static str) -> DetectorMetrics {
    let meter = global::meter(meter_name);
    let latency_buckets = [
        0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 5.0, 10.0, 30.0, 60.0,
    ];

    DetectorMetrics {
        invocation_duration: meter
            .f64_histogram("detector_invocation_duration_seconds")
            .with_description("Time to serve one invocation (fetch + decode + infer + format)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build(),
        inference_duration: meter
            .f64_histogram("detector_inference_duration_seconds")
            .with_description("Time spent inside the detection model")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build(),
        invocations: meter
            .u64_counter("detector_invocations_total")
            .with_description("Total invocations handled")
            .build(),
        detections: meter
            .u64_counter("detector_detections_total")
            .with_description("Total detections returned")
            .build(),
        failures: meter
            .u64_counter("detector_failures_total")
            .with_description("Invocations that ended in an error, by pipeline stage")
            .build(),
    }
}

/// Process-lifetime state: the loaded model, its label map and the HTTP
/// client. Built once at cold start and shared by every invocation.
pub struct Detector<B: DetectionBackend> {
    // ONNX Runtime sessions run through `&mut`; one invocation at a time holds it.
    backend: Mutex<B>,
    fetcher: ImageFetcher,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
    metrics: DetectorMetrics,
}

impl<B> Detector<B>
where
    B: DetectionBackend + Send + 'static,
{
    pub fn new(backend: B, labels: Option<LabelMap>, preprocessor: PreProcessor) -> Self {
        Self::with_fetcher(backend, labels, preprocessor, ImageFetcher::new())
    }

    pub fn with_fetcher(
        backend: B,
        labels: Option<LabelMap>,
        preprocessor: PreProcessor,
        fetcher: ImageFetcher,
    ) -> Self {
        Self {
            backend: Mutex::new(backend),
            fetcher,
            preprocessor,
            postprocessor: PostProcessor::new(labels),
            metrics: init_metrics("detector"),
        }
    }

    /// Cold-start path: read the label map, when one is configured, and load
    /// the model from the configured paths.
    pub fn load(config: &DetectorConfig) -> anyhow::Result<Self> {
        let labels = match &config.labels_path {
            Some(path) => {
                let labels = LabelMap::from_file(path)
                    .with_context(|| format!("failed to read labels from {}", path))?;
                tracing::info!(path = %path, entities = labels.len(), "Label map loaded");
                Some(labels)
            }
            None => {
                tracing::info!("No label map configured, expecting entity names from the model");
                None
            }
        };

        let backend = B::load_model(&config.model_path, &config.backend_options())?;

        Ok(Self::new(
            backend,
            labels,
            PreProcessor::new(config.max_input_dimension),
        ))
    }

    pub fn labels(&self) -> Option<&LabelMap> {
        self.postprocessor.labels()
    }

    /// Fetch the image at `url` and run detection on it, recording metrics.
    pub async fn detect_url(self: &Arc<Self>, url: &str) -> Result<DetectionResult, DetectorError> {
        let start = Instant::now();
        let outcome = self.fetch_and_detect(url).await;
        let elapsed = start.elapsed().as_secs_f64();

        self.metrics.invocations.add(1, &[]);
        self.metrics.invocation_duration.record(elapsed, &[]);
        match &outcome {
            Ok(result) => {
                self.metrics.detections.add(result.len() as u64, &[]);
                tracing::info!(
                    detections = result.len(),
                    elapsed_ms = elapsed * 1000.0,
                    "Detection complete"
                );
            }
            Err(e) => {
                self.metrics
                    .failures
                    .add(1, &[KeyValue::new("stage", e.stage())]);
            }
        }

        outcome
    }

    async fn fetch_and_detect(self: &Arc<Self>, url: &str) -> Result<DetectionResult, DetectorError> {
        let bytes = self.fetcher.fetch(url).await?;

        let detector = Arc::clone(self);
        tokio::task::spawn_blocking(move || detector.detect_bytes(&bytes))
            .await
            .map_err(|e| DetectorError::inference(format!("detection task failed: {}", e)))?
    }

    /// Decode, run the model and format its outputs. Blocking; call from a
    /// blocking context.
    pub fn detect_bytes(&self, bytes: &[u8]) -> Result<DetectionResult, DetectorError> {
        let image = decode_jpeg(bytes)?;
        let input = self.preprocessor.prepare(image)?;

        let raw = {
            let _s = span!("model_inference");
            let start = Instant::now();

            // A panic in an earlier run leaves no partial state in the session.
            let mut backend = self.backend.lock().unwrap_or_else(PoisonError::into_inner);
            let raw = backend.detect(&input).map_err(DetectorError::Inference)?;

            let elapsed = start.elapsed().as_secs_f64();
            self.metrics.inference_duration.record(elapsed, &[]);
            tracing::debug!(
                input_shape = ?input.shape(),
                elapsed_ms = elapsed * 1000.0,
                "Model inference finished"
            );
            raw
        };

        self.postprocessor.parse_detections(&raw)
    }
}
