use bytes::Bytes;
use http::header::CONTENT_TYPE;
use tracing::info;

use crate::error::UploadError;
use crate::observability::metrics::get_metrics;
use crate::platform::client::{describe_rejection, PlatformClient};
use crate::platform::handle::StagedHandle;

/// Streams raw artifact bytes into a staged lob. No client-side size limit.
#[derive(Debug, Clone)]
pub struct ArtifactUploader {
    client: PlatformClient,
}

impl ArtifactUploader {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    /// A failure here may leave the lob partially written.
    pub async fn write_bytes(
        &self,
        token: &str,
        handle: &StagedHandle,
        artifact: Bytes,
    ) -> Result<(), UploadError> {
        let size = artifact.len();
        let response = self
            .client
            .http
            .put(self.client.blob_data_url(&handle.handle_id))
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(artifact)
            .send()
            .await
            .map_err(|e| UploadError::transfer(&handle.handle_id, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::transfer(&handle.handle_id, describe_rejection(response).await).with_status(status));
        }

        get_metrics().await.uploaded_bytes.inc_by(size as u64);
        info!("uploaded {} bytes to lob {}", size, handle);
        Ok(())
    }
}
