use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::token::Token;
use crate::error::UploadError;
use crate::helpers::time::{safe_expiry, Clock, SystemClock};
use crate::identity::acquirer::{AcquireToken, PasswordGrantAcquirer};
use crate::observability::metrics::get_metrics;

/// Holds the single bearer token of the service identity and renews it on demand.
///
/// Concurrent callers that all observe an expired token each acquire a fresh one;
/// the last write wins. Token and expiry are always stored together.
pub struct TokenCache<A = PasswordGrantAcquirer, C = SystemClock> {
    inner: Arc<RwLock<Option<Token>>>,
    acquirer: A,
    clock: C,
}

impl<A: AcquireToken> TokenCache<A, SystemClock> {
    pub fn new(acquirer: A) -> Self {
        Self::with_clock(acquirer, SystemClock)
    }
}

impl<A: AcquireToken, C: Clock> TokenCache<A, C> {
    pub fn with_clock(acquirer: A, clock: C) -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            acquirer,
            clock,
        }
    }

    /// Returns a token valid at the time of the call, acquiring a new one when needed.
    /// On failure the previously cached token (if any) stays untouched.
    pub async fn get_valid_token(&self) -> Result<String, UploadError> {
        let metrics = get_metrics().await;

        if let Some(token) = self.inner.read().await.as_ref() {
            if token.is_valid_at(self.clock.now()) {
                debug!("using cached access token");
                metrics.token_cache_hits.inc();
                return Ok(token.value.clone());
            }
        }

        let acquired = self.acquirer.acquire().await?;
        let token = Token::new(
            acquired.access_token,
            safe_expiry(self.clock.now(), acquired.expires_in_seconds),
        );
        debug!("caching access token until {}", token.expires_at);
        metrics.token_expiry_unix.set(token.expires_at.timestamp());

        let value = token.value.clone();
        *self.inner.write().await = Some(token);
        Ok(value)
    }

    /// Current cache contents without triggering a renewal.
    pub async fn snapshot(&self) -> Option<Token> {
        self.inner.read().await.clone()
    }

    /// Forces the next `get_valid_token` to acquire.
    pub async fn invalidate(&self) {
        self.inner.write().await.take();
    }

    #[cfg(test)]
    pub(crate) async fn store(&self, token: Token) {
        *self.inner.write().await = Some(token);
    }
}
