use std::future::Future;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::config::upstreams::ServiceCredential;
use crate::error::UploadError;
use crate::observability::metrics::get_metrics;

/// Token as declared by the identity endpoint, before the cache applies its safety margin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredToken {
    pub access_token: String,
    pub expires_in_seconds: u64,
}

/// Performs a credential exchange. Implementations must not retry on their own.
pub trait AcquireToken: Send + Sync {
    fn acquire(&self) -> impl Future<Output = Result<AcquiredToken, UploadError>> + Send;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<Value>,
}

/// OAuth2 resource-owner password grant against IFS IAM.
#[derive(Debug, Clone)]
pub struct PasswordGrantAcquirer {
    client: Client,
    credential: ServiceCredential,
}

impl PasswordGrantAcquirer {
    pub fn new(client: Client, credential: ServiceCredential) -> Self {
        Self { client, credential }
    }
}

impl AcquireToken for PasswordGrantAcquirer {
    async fn acquire(&self) -> Result<AcquiredToken, UploadError> {
        let metrics = get_metrics().await;
        info!("fetching new access token from IFS IAM as '{}'", self.credential.username);

        exchange_password_grant(&self.client, &self.credential)
            .await
            .inspect(|_| {
                metrics.token_acquisitions.inc();
                info!("access token obtained");
            })
            .inspect_err(|e| {
                metrics.token_acquisition_failures.inc();
                error!("failed to get access token: {}", e);
            })
    }
}

/// Single form-encoded password grant exchange.
pub async fn exchange_password_grant(
    client: &Client,
    credential: &ServiceCredential,
) -> Result<AcquiredToken, UploadError> {
    let form = [
        ("grant_type", "password"),
        ("client_id", credential.client_id.as_str()),
        ("client_secret", credential.client_secret.as_str()),
        ("username", credential.username.as_str()),
        ("password", credential.password.as_str()),
    ];

    let response = client
        .post(&credential.endpoint)
        .form(&form)
        .send()
        .await
        .map_err(|e| UploadError::auth(format!("token request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| UploadError::auth(format!("reading token response failed: {}", e)))?;

    if !status.is_success() {
        return Err(UploadError::auth(format!("identity endpoint returned {}: {}", status, body)));
    }

    parse_token_response(&body)
}

fn parse_token_response(body: &str) -> Result<AcquiredToken, UploadError> {
    let parsed: TokenResponse = serde_json::from_str(body)
        .map_err(|e| UploadError::auth(format!("malformed token response: {}: {}", e, body)))?;

    let access_token = parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| UploadError::auth(format!("token response has no access_token: {}", body)))?;

    // IAM implementations disagree on number vs string
    let expires_in_seconds = match parsed.expires_in {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .filter(|ttl| *ttl > 0)
    .ok_or_else(|| UploadError::auth(format!("token response has no positive expires_in: {}", body)))?;

    Ok(AcquiredToken {
        access_token,
        expires_in_seconds,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_numeric_and_string_expiry() {
        let token = parse_token_response(r#"{"access_token":"abc","expires_in":300,"token_type":"Bearer"}"#).unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in_seconds, 300);

        let token = parse_token_response(r#"{"access_token":"abc","expires_in":"60"}"#).unwrap();
        assert_eq!(token.expires_in_seconds, 60);
    }

    #[test]
    fn rejects_incomplete_responses() {
        for body in [
            r#"{"expires_in":300}"#,
            r#"{"access_token":"","expires_in":300}"#,
            r#"{"access_token":"abc"}"#,
            r#"{"access_token":"abc","expires_in":0}"#,
            r#"{"access_token":"abc","expires_in":-5}"#,
            "<html>bad gateway</html>",
        ] {
            let err = parse_token_response(body).unwrap_err();
            assert_eq!(err.kind(), "AuthFailure", "body: {}", body);
        }
    }
}
