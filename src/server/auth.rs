use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::header::AUTHORIZATION;
use tracing::{debug, error, warn};

use crate::api::error::ApiError;
use crate::server::server::AppState;

/// Checks the API key IFS Connect sends as `Authorization: Bearer <key>` (a bare key is accepted too).
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_owned();

    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => value.to_str().map_err(|_| ApiError::InvalidCredentials)?,
        None => {
            warn!(path = %path, "authentication failed: no authorization header");
            return Err(ApiError::MissingCredentials);
        }
    };
    let presented = header.strip_prefix("Bearer ").unwrap_or(header);

    let expected = match state.api_key.as_deref() {
        Some(key) => key,
        None => {
            error!("api_key is not configured");
            return Err(ApiError::ApiKeyNotConfigured);
        }
    };

    if presented != expected {
        warn!(path = %path, "authentication failed: invalid API key");
        return Err(ApiError::InvalidCredentials);
    }

    debug!("authentication successful");
    Ok(next.run(request).await)
}
