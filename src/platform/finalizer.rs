use serde::Serialize;
use tracing::info;

use crate::error::UploadError;
use crate::platform::client::{describe_rejection, PlatformClient};
use crate::platform::handle::StagedHandle;

/// Body of the `Upload` action.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct UploadActionBody<'a> {
    pub print_job_id: &'a str,
    pub correlation_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_key: Option<&'a str>,
    pub pdf_temp_lob_id: &'a str,
}

/// Links a written lob to its print job. Only after this call is the artifact delivered.
#[derive(Debug, Clone)]
pub struct UploadFinalizer {
    client: PlatformClient,
}

impl UploadFinalizer {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    pub async fn finalize(
        &self,
        token: &str,
        job_id: &str,
        correlation_id: &str,
        result_key: Option<&str>,
        handle: &StagedHandle,
    ) -> Result<(), UploadError> {
        let body = UploadActionBody {
            print_job_id: job_id,
            correlation_id,
            result_key,
            pdf_temp_lob_id: &handle.handle_id,
        };

        let response = self
            .client
            .http
            .post(self.client.upload_action_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| UploadError::finalization(&handle.handle_id, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::finalization(&handle.handle_id, describe_rejection(response).await)
                .with_status(status));
        }

        info!("upload action completed for lob {}", handle);
        Ok(())
    }
}
