//! Failure taxonomy of the upload flow.
//!
//! Every remote step reports its own variant so the caller can tell a
//! configuration problem (`AuthFailure`) from a transient delivery failure.

use std::fmt;

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Step of the upload flow that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStep {
    Authenticate,
    Stage,
    Transfer,
    Finalize,
}

impl UploadStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStep::Authenticate => "authenticate",
            UploadStep::Stage => "stage",
            UploadStep::Transfer => "transfer",
            UploadStep::Finalize => "finalize",
        }
    }
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Identity endpoint rejected the credential exchange. Never retried automatically.
    #[error("authentication with identity endpoint failed: {message}")]
    Auth { message: String },

    /// No handle was allocated, nothing was sent.
    #[error("creating temporary lob failed: {message}")]
    Staging { message: String, status: Option<u16> },

    /// The handle may hold part of the artifact.
    #[error("writing artifact to lob {handle_id} failed: {message}")]
    Transfer {
        handle_id: String,
        message: String,
        status: Option<u16>,
    },

    /// Bytes were sent but are not linked to the job.
    #[error("finalizing upload of lob {handle_id} failed: {message}")]
    Finalization {
        handle_id: String,
        message: String,
        status: Option<u16>,
    },

    #[error("upload cancelled before {step} step")]
    Cancelled {
        step: UploadStep,
        handle_id: Option<String>,
    },
}

impl UploadError {
    /// Classification name surfaced to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::Auth { .. } => "AuthFailure",
            UploadError::Staging { .. } => "StagingFailure",
            UploadError::Transfer { .. } => "TransferFailure",
            UploadError::Finalization { .. } => "FinalizationFailure",
            UploadError::Cancelled { .. } => "Cancelled",
        }
    }

    pub fn step(&self) -> UploadStep {
        match self {
            UploadError::Auth { .. } => UploadStep::Authenticate,
            UploadError::Staging { .. } => UploadStep::Stage,
            UploadError::Transfer { .. } => UploadStep::Transfer,
            UploadError::Finalization { .. } => UploadStep::Finalize,
            UploadError::Cancelled { step, .. } => *step,
        }
    }

    /// Handle allocated before the failure, if any.
    pub fn handle_id(&self) -> Option<&str> {
        match self {
            UploadError::Transfer { handle_id, .. } | UploadError::Finalization { handle_id, .. } => {
                Some(handle_id)
            }
            UploadError::Cancelled { handle_id, .. } => handle_id.as_deref(),
            UploadError::Auth { .. } | UploadError::Staging { .. } => None,
        }
    }

    /// Whether re-running the whole flow may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UploadError::Staging { .. } | UploadError::Transfer { .. } | UploadError::Finalization { .. }
        )
    }

    /// HTTP status of the platform response that rejected the step, if one was received.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            UploadError::Staging { status, .. }
            | UploadError::Transfer { status, .. }
            | UploadError::Finalization { status, .. } => *status,
            UploadError::Auth { .. } | UploadError::Cancelled { .. } => None,
        }
    }

    /// The platform refused the bearer token; the cached token must not be used again.
    pub fn is_token_rejected(&self) -> bool {
        self.upstream_status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }

    pub(crate) fn with_status(mut self, code: StatusCode) -> Self {
        match &mut self {
            UploadError::Staging { status, .. }
            | UploadError::Transfer { status, .. }
            | UploadError::Finalization { status, .. } => *status = Some(code.as_u16()),
            UploadError::Auth { .. } | UploadError::Cancelled { .. } => {}
        }
        self
    }

    pub(crate) fn auth(message: impl Into<String>) -> Self {
        UploadError::Auth { message: message.into() }
    }

    pub(crate) fn staging(message: impl Into<String>) -> Self {
        UploadError::Staging {
            message: message.into(),
            status: None,
        }
    }

    pub(crate) fn transfer(handle_id: &str, message: impl Into<String>) -> Self {
        UploadError::Transfer {
            handle_id: handle_id.to_owned(),
            message: message.into(),
            status: None,
        }
    }

    pub(crate) fn finalization(handle_id: &str, message: impl Into<String>) -> Self {
        UploadError::Finalization {
            handle_id: handle_id.to_owned(),
            message: message.into(),
            status: None,
        }
    }
}
