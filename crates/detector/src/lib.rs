pub mod backend;
pub mod config;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod labels;
pub mod local;
pub mod logging;
pub mod processing;
pub mod service;

// Re-export commonly used types for convenience
pub use backend::{BackendOptions, ClassOutput, DetectionBackend, RawDetections};
pub use config::DetectorConfig;
pub use error::DetectorError;
pub use handler::{InvocationRequest, InvocationResponse};
pub use labels::LabelMap;
pub use processing::DetectionResult;
pub use service::Detector;
