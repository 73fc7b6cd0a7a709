use crate::error::DetectorError;

/// Downloads source images. One plain GET per invocation: no retries, no
/// timeout, reqwest's default redirect handling.
#[derive(Debug, Clone, Default)]
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Non-2xx responses are errors rather than bytes handed to the decoder.
    #[tracing::instrument(name = "fetch_image", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, DetectorError> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        let bytes = response.bytes().await?;

        tracing::debug!(bytes = bytes.len(), content_type, "Fetched image");
        Ok(bytes.to_vec())
    }
}
