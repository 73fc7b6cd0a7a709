use ndarray::{Array4, ArrayD};
use std::str::FromStr;

#[cfg(feature = "ort-backend")]
pub mod ort;

/// Output tensor names of the exported detection signature.
pub const BOXES_OUTPUT: &str = "detection_boxes";
pub const SCORES_OUTPUT: &str = "detection_scores";
pub const ENTITIES_OUTPUT: &str = "detection_class_entities";
pub const LABELS_OUTPUT: &str = "detection_class_labels";

pub trait DetectionBackend {
    fn load_model(path: &str, options: &BackendOptions) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run the model on a `[1, H, W, 3]` batch of normalized RGB pixels.
    fn detect(&mut self, images: &Array4<f32>) -> anyhow::Result<RawDetections>;
}

/// Model outputs as the runtime returns them; shapes are checked during
/// postprocessing.
#[derive(Debug, Clone)]
pub struct RawDetections {
    pub boxes: ArrayD<f32>,  // [N, 4] or [1, N, 4], ymin/xmin/ymax/xmax normalized 0-1
    pub scores: ArrayD<f32>, // [N] or [1, N]
    pub classes: ClassOutput,
}

/// How the model reports the class of each detection, `[N]` or `[1, N]`.
#[derive(Debug, Clone)]
pub enum ClassOutput {
    /// Entity names straight from `detection_class_entities`.
    Entities(ArrayD<String>),
    /// Indices from `detection_class_labels`, resolved through a label map.
    Indices(ArrayD<i64>),
}

impl ClassOutput {
    pub fn output_name(&self) -> &'static str {
        match self {
            ClassOutput::Entities(_) => ENTITIES_OUTPUT,
            ClassOutput::Indices(_) => LABELS_OUTPUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub input_name: String,
    pub intra_threads: usize,
    pub execution_provider: ExecutionProvider,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            input_name: crate::config::DEFAULT_INPUT_NAME.to_string(),
            intra_threads: 4,
            execution_provider: ExecutionProvider::Cpu,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl FromStr for ExecutionProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(ExecutionProvider::Cpu),
            "cuda" | "gpu" => Ok(ExecutionProvider::Cuda),
            other => anyhow::bail!(
                "{} is not a supported execution provider. Use either `cpu` or `cuda`.",
                other
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_provider_parsing() {
        assert_eq!("cpu".parse::<ExecutionProvider>().unwrap(), ExecutionProvider::Cpu);
        assert_eq!("CUDA".parse::<ExecutionProvider>().unwrap(), ExecutionProvider::Cuda);
        assert_eq!("gpu".parse::<ExecutionProvider>().unwrap(), ExecutionProvider::Cuda);

        let err = "tpu".parse::<ExecutionProvider>().unwrap_err();
        assert!(err.to_string().contains("tpu"));
    }
}
