use crate::{
    backend::DetectionBackend, error::DetectorError, processing::DetectionResult,
    service::Detector,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

/// Invocation payload. Extra fields are ignored; `url` is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    /// JSON-encoded [`DetectionResult`].
    pub body: String,
}

impl InvocationResponse {
    pub fn ok(result: &DetectionResult) -> Result<Self, DetectorError> {
        Ok(Self {
            status_code: 200,
            body: serde_json::to_string(result)?,
        })
    }
}

/// Error payload in the shape the function platform uses for failed
/// invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationError {
    pub error_type: String,
    pub error_message: String,
}

impl From<&DetectorError> for InvocationError {
    fn from(e: &DetectorError) -> Self {
        Self {
            error_type: e.error_type().to_string(),
            error_message: e.to_string(),
        }
    }
}

/// Serve one invocation. Every failure is returned as-is; there is no
/// error response with a non-200 status.
pub async fn handle<B>(
    detector: &Arc<Detector<B>>,
    request: InvocationRequest,
    request_id: Option<&str>,
) -> Result<InvocationResponse, DetectorError>
where
    B: DetectionBackend + Send + 'static,
{
    let span = tracing::info_span!(
        "invocation",
        url = %request.url,
        request_id = request_id.unwrap_or("-")
    );

    async {
        let result = detector.detect_url(&request.url).await;
        let response = result.and_then(|detections| InvocationResponse::ok(&detections));

        if let Err(e) = &response {
            tracing::error!(error = %e, stage = e.stage(), "Invocation failed");
        }
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_requires_url() {
        let request: InvocationRequest =
            serde_json::from_str(r#"{"url": "http://example.com/a.jpg", "extra": 1}"#).unwrap();
        assert_eq!(request.url, "http://example.com/a.jpg");

        let missing = serde_json::from_str::<InvocationRequest>(r#"{"uri": "x"}"#);
        assert!(missing.is_err(), "Missing url should be rejected");

        let wrong_type = serde_json::from_str::<InvocationRequest>(r#"{"url": 5}"#);
        assert!(wrong_type.is_err(), "Non-string url should be rejected");
    }

    #[test]
    fn test_response_shape() {
        let result = DetectionResult {
            detection_boxes: vec![[0.0, 0.0, 0.5, 0.5]],
            detection_scores: vec![0.75],
            detection_class_entities: vec!["Tree".to_string()],
        };

        let response = InvocationResponse::ok(&result).unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["statusCode"], 200);
        assert!(value["body"].is_string(), "body must be a JSON string");

        let body: DetectionResult =
            serde_json::from_str(value["body"].as_str().unwrap()).unwrap();
        assert_eq!(body, result);
    }

    #[test]
    fn test_invocation_error_payload() {
        let err = DetectorError::inference("missing output");
        let payload = serde_json::to_value(InvocationError::from(&err)).unwrap();

        assert_eq!(payload["errorType"], "InferenceError");
        assert_eq!(payload["errorMessage"], "inference failed: missing output");
    }
}
