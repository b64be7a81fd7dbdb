use reqwest::{Client, Response};

use crate::config::upstreams::PlatformConfig;
use crate::utils::constants::{TEMP_LOBS_RESOURCE, UPLOAD_ACTION};

/// Shared HTTP access to the IFS External Reports Gateway projection.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    pub(crate) http: Client,
    projection_url: String,
}

impl PlatformClient {
    pub fn new(http: Client, config: &PlatformConfig) -> Self {
        Self {
            http,
            projection_url: config.projection_url(),
        }
    }

    pub fn temp_lobs_url(&self) -> String {
        format!("{}/{}", self.projection_url, TEMP_LOBS_RESOURCE)
    }

    pub fn blob_data_url(&self, handle_id: &str) -> String {
        format!("{}/{}(LobId='{}')/BlobData", self.projection_url, TEMP_LOBS_RESOURCE, handle_id)
    }

    pub fn upload_action_url(&self) -> String {
        format!("{}/{}", self.projection_url, UPLOAD_ACTION)
    }
}

/// `"<status>: <body>"` of a rejected call, used as diagnostic text.
pub(crate) async fn describe_rejection(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    }
}
