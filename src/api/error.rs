use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::error::UploadError;

/// Everything a report request can fail with, mapped onto HTTP.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required fields: traceId, layoutName, printJobKey")]
    MissingFields,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Authentication required")]
    MissingCredentials,

    #[error("Invalid authentication credentials")]
    InvalidCredentials,

    #[error("Server configuration error")]
    ApiKeyNotConfigured,

    #[error("{0}")]
    Render(anyhow::Error),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingCredentials | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::ApiKeyNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Render(_) => StatusCode::BAD_GATEWAY,
            // credentials are an operator problem, not something a retry fixes
            ApiError::Upload(UploadError::Auth { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upload(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn body(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });
        match self {
            ApiError::Upload(err) => {
                body["failure"] = json!(err.kind());
                body["step"] = json!(err.step());
                body["retryable"] = json!(err.is_retryable());
                if let Some(lob_id) = err.handle_id() {
                    body["lobId"] = json!(lob_id);
                }
            }
            ApiError::Render(_) => {
                body["failure"] = json!("RenderFailure");
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn upload_failures_are_classified() {
        let auth = ApiError::from(UploadError::auth("401 Unauthorized"));
        assert_eq!(auth.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(auth.body()["failure"], "AuthFailure");
        assert_eq!(auth.body()["retryable"], false);

        let transfer = ApiError::from(UploadError::transfer("LOB-9", "timeout"));
        assert_eq!(transfer.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(transfer.body()["lobId"], "LOB-9");
        assert_eq!(transfer.body()["step"], "transfer");
    }

    #[test]
    fn validation_error_keeps_original_message() {
        let body = ApiError::MissingFields.body();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing required fields: traceId, layoutName, printJobKey");
    }
}
