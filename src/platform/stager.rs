use serde_json::json;
use tracing::info;

use crate::error::UploadError;
use crate::platform::client::{describe_rejection, PlatformClient};
use crate::platform::handle::{parse_staged_handle, StagedHandle};

/// Allocates the temporary lob that will receive the artifact.
#[derive(Debug, Clone)]
pub struct ArtifactStager {
    client: PlatformClient,
}

impl ArtifactStager {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    /// On error no handle exists, so nothing has to be cleaned up.
    pub async fn create_handle(&self, token: &str) -> Result<StagedHandle, UploadError> {
        let response = self
            .client
            .http
            .post(self.client.temp_lobs_url())
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| UploadError::staging(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::staging(describe_rejection(response).await).with_status(status));
        }

        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::staging(format!("reading response failed: {}", e)))?;

        let handle = parse_staged_handle(&headers, &body)?;
        info!("created temp lob: {}", handle);
        Ok(handle)
    }
}
