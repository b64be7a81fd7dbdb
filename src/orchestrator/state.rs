use std::path::Path;

use anyhow::{anyhow, Result};
use bytes::Bytes;
use serde::Serialize;

use crate::error::UploadError;
use crate::platform::handle::StagedHandle;

/// One artifact to deliver. Identifiers are forwarded to IFS unmodified.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub artifact: Bytes,
    pub correlation_id: String,
    pub job_id: String,
    /// left out of the Upload action when absent
    pub result_key: Option<String>,
}

impl UploadRequest {
    pub fn new(
        artifact: impl Into<Bytes>,
        correlation_id: impl Into<String>,
        job_id: impl Into<String>,
    ) -> Self {
        Self {
            artifact: artifact.into(),
            correlation_id: correlation_id.into(),
            job_id: job_id.into(),
            result_key: None,
        }
    }

    pub fn with_result_key(mut self, result_key: impl Into<String>) -> Self {
        self.result_key = Some(result_key.into());
        self
    }

    /// Reads the artifact from disk, e.g. a PDF left by an earlier render.
    pub async fn from_path(
        path: &Path,
        correlation_id: impl Into<String>,
        job_id: impl Into<String>,
    ) -> Result<Self> {
        let artifact = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow!("cannot read artifact '{}': {}", path.display(), e))?;
        Ok(Self::new(artifact, correlation_id, job_id))
    }
}

/// Proof of delivery: the finalize call succeeded for this lob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub handle_id: String,
}

/// Progress of one upload flow.
///
/// `Idle -> TokenReady -> Staged -> Transferred -> Finalized`, or `Failed` from any step after `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    TokenReady { token: String },
    Staged { token: String, handle: StagedHandle },
    Transferred { token: String, handle: StagedHandle },
    Finalized { handle: StagedHandle },
    Failed(UploadError),
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Idle => "Idle",
            UploadState::TokenReady { .. } => "TokenReady",
            UploadState::Staged { .. } => "Staged",
            UploadState::Transferred { .. } => "Transferred",
            UploadState::Finalized { .. } => "Finalized",
            UploadState::Failed(_) => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Finalized { .. } | UploadState::Failed(_))
    }

    /// Handle allocated so far, if any.
    pub fn handle_id(&self) -> Option<&str> {
        match self {
            UploadState::Staged { handle, .. }
            | UploadState::Transferred { handle, .. }
            | UploadState::Finalized { handle } => Some(&handle.handle_id),
            UploadState::Failed(err) => err.handle_id(),
            UploadState::Idle | UploadState::TokenReady { .. } => None,
        }
    }

    /// Terminal state as the `Result` callers usually want.
    pub fn into_result(self) -> Result<UploadReceipt, UploadError> {
        match self {
            UploadState::Finalized { handle } => Ok(UploadReceipt {
                handle_id: handle.handle_id,
            }),
            UploadState::Failed(err) => Err(err),
            other => Err(UploadError::staging(format!(
                "upload flow stopped in non-terminal state {}",
                other.name()
            ))),
        }
    }
}

/// Serializable outcome handed to the request-handling layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&Result<UploadReceipt, UploadError>> for UploadResult {
    fn from(result: &Result<UploadReceipt, UploadError>) -> Self {
        match result {
            Ok(receipt) => Self {
                success: true,
                handle_id: Some(receipt.handle_id.clone()),
                failure: None,
                message: None,
            },
            Err(err) => Self {
                success: false,
                handle_id: err.handle_id().map(str::to_owned),
                failure: Some(err.kind()),
                message: Some(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn failed_state_exposes_orphaned_handle() {
        let state = UploadState::Failed(UploadError::finalization("LOB-1", "409 Conflict"));
        assert!(state.is_terminal());
        assert_eq!(state.handle_id(), Some("LOB-1"));

        let result = UploadResult::from(&state.into_result());
        assert!(!result.success);
        assert_eq!(result.failure, Some("FinalizationFailure"));
        assert_eq!(result.handle_id.as_deref(), Some("LOB-1"));
    }

    #[test]
    fn finalized_state_is_success() {
        let state = UploadState::Finalized {
            handle: StagedHandle::new("LOB-2"),
        };
        let result = UploadResult::from(&state.into_result());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"success": true, "handleId": "LOB-2"})
        );
    }

    #[tokio::test]
    async fn request_from_path_reads_artifact() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"%PDF-1.7").unwrap();

        let request = UploadRequest::from_path(file.path(), "C1", "J1")
            .await
            .unwrap()
            .with_result_key("R1");
        assert_eq!(&request.artifact[..], b"%PDF-1.7");
        assert_eq!(request.job_id, "J1");
        assert_eq!(request.result_key.as_deref(), Some("R1"));
    }
}
