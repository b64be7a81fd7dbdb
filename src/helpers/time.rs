use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;

use crate::utils::constants::TOKEN_LIFETIME_PERCENT;

/// Source of the current time for token expiry decisions.
///
/// Production code uses [`SystemClock`]; tests swap in a clock they can move by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Expiry instant for a token issued at `issued_at` with a declared lifetime of `ttl_seconds`.
///
/// Only `TOKEN_LIFETIME_PERCENT` of the lifetime is used so a token is never sent in its last moments.
pub fn safe_expiry(issued_at: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    let usable_ms = ttl_seconds.saturating_mul(1000).saturating_mul(TOKEN_LIFETIME_PERCENT) / 100;
    let usable_ms = i64::try_from(usable_ms).unwrap_or(i64::MAX);
    issued_at
        .checked_add_signed(Duration::milliseconds(usable_ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn get_instant() -> Instant {
    Instant::now()
}
