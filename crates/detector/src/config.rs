use std::env;
use std::path::Path;

pub use common::Environment;

use crate::backend::{BackendOptions, ExecutionProvider};

/// Layout of the file system mounted into the function before the first
/// invocation.
pub const DEFAULT_MODEL_PATH: &str = "/mnt/python/model/model.onnx";
pub const DEFAULT_LABELS_PATH: &str = "/mnt/python/model/labels.txt";
pub const DEFAULT_INPUT_NAME: &str = "images";

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub environment: Environment,
    pub model_path: String,
    pub labels_path: Option<String>,
    pub input_name: String,
    pub intra_threads: usize,
    pub execution_provider: ExecutionProvider,
    pub max_input_dimension: Option<u32>,
    pub otel_endpoint: Option<String>,
    pub local_addr: String,
}

impl DetectorConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let model_path =
            env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string());

        // An explicit path must load; the default only applies when mounted.
        let labels_path = match env::var("LABELS_PATH") {
            Ok(path) if !path.is_empty() => Some(path),
            _ => Path::new(DEFAULT_LABELS_PATH)
                .exists()
                .then(|| DEFAULT_LABELS_PATH.to_string()),
        };

        let input_name =
            env::var("MODEL_INPUT_NAME").unwrap_or_else(|_| DEFAULT_INPUT_NAME.to_string());

        let intra_threads = env::var("INTRA_THREADS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4);

        let execution_provider = match env::var("EXECUTION_PROVIDER") {
            Ok(value) => value.parse()?,
            Err(_) => ExecutionProvider::Cpu,
        };

        // Zero would mean "no pixels", treat it like unset.
        let max_input_dimension = env::var("MAX_INPUT_DIMENSION")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&d: &u32| d > 0);

        let otel_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|s| !s.is_empty());

        let local_addr = env::var("LOCAL_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Self {
            environment,
            model_path,
            labels_path,
            input_name,
            intra_threads,
            execution_provider,
            max_input_dimension,
            otel_endpoint,
            local_addr,
        })
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            input_name: self.input_name.clone(),
            intra_threads: self.intra_threads,
            execution_provider: self.execution_provider,
        }
    }

    /// Create default configuration for testing
    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Development,
            model_path: "/models/model.onnx".to_string(),
            labels_path: None,
            input_name: DEFAULT_INPUT_NAME.to_string(),
            intra_threads: 1,
            execution_provider: ExecutionProvider::Cpu,
            max_input_dimension: None,
            otel_endpoint: None,
            local_addr: "127.0.0.1:0".to_string(),
        }
    }
}
