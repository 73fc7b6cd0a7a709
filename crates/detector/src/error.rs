use std::io;
use thiserror::Error;

/// Failures of a single invocation, plus label loading at cold start.
///
/// None of these are turned into a response: they are returned to the
/// function runtime, which reports them as invocation errors.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("failed to fetch image: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("failed to decode JPEG: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to prepare input tensor: {0:#}")]
    Preprocess(anyhow::Error),

    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to load labels: {0}")]
    Labels(#[from] io::Error),

    #[error("label file contains no entities")]
    EmptyLabels,
}

impl DetectorError {
    pub fn inference(message: impl std::fmt::Display) -> Self {
        DetectorError::Inference(anyhow::anyhow!("{}", message))
    }

    /// Name reported as the `errorType` of a failed invocation.
    pub fn error_type(&self) -> &'static str {
        match self {
            DetectorError::Fetch(_) => "FetchError",
            DetectorError::Decode(_) => "DecodeError",
            DetectorError::Preprocess(_) => "PreprocessError",
            DetectorError::Inference(_) => "InferenceError",
            DetectorError::Serialize(_) => "SerializeError",
            DetectorError::Labels(_) | DetectorError::EmptyLabels => "LabelsError",
        }
    }

    /// Pipeline stage the error came from, used as a metric attribute.
    pub fn stage(&self) -> &'static str {
        match self {
            DetectorError::Fetch(_) => "fetch",
            DetectorError::Decode(_) => "decode",
            DetectorError::Preprocess(_) => "preprocess",
            DetectorError::Inference(_) => "inference",
            DetectorError::Serialize(_) => "serialize",
            DetectorError::Labels(_) | DetectorError::EmptyLabels => "labels",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = DetectorError::inference("missing output `detection_scores`");
        assert_eq!(
            err.to_string(),
            "inference failed: missing output `detection_scores`"
        );

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = DetectorError::Labels(io_err);
        assert_eq!(err.to_string(), "failed to load labels: file not found");

        assert_eq!(
            DetectorError::EmptyLabels.to_string(),
            "label file contains no entities"
        );
    }

    #[test]
    fn test_inference_error_keeps_context_chain() {
        let source = anyhow::anyhow!("shape [1, 3]").context("unexpected boxes tensor");
        let err = DetectorError::Inference(source);
        assert_eq!(
            err.to_string(),
            "inference failed: unexpected boxes tensor: shape [1, 3]"
        );
    }

    #[test]
    fn test_decode_error_conversion() {
        let decode = image::load_from_memory_with_format(b"not a jpeg", image::ImageFormat::Jpeg)
            .unwrap_err();
        let err: DetectorError = decode.into();

        assert!(matches!(err, DetectorError::Decode(_)));
        assert_eq!(err.stage(), "decode");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(DetectorError::inference("x").stage(), "inference");
        assert_eq!(DetectorError::EmptyLabels.stage(), "labels");
        assert_eq!(DetectorError::EmptyLabels.error_type(), "LabelsError");
    }
}
