#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use crate::cache::token::Token;
    use crate::cache::token_cache::TokenCache;
    use crate::error::UploadError;
    use crate::helpers::time::Clock;
    use crate::tests::common::{FakeAcquirer, ManualClock};

    fn cache(ttl_seconds: u64) -> (TokenCache<FakeAcquirer, ManualClock>, FakeAcquirer, ManualClock) {
        let acquirer = FakeAcquirer::new(ttl_seconds);
        let clock = ManualClock::new();
        (TokenCache::with_clock(acquirer.clone(), clock.clone()), acquirer, clock)
    }

    #[tokio::test]
    async fn cached_token_is_reused_without_remote_call() {
        let (cache, acquirer, clock) = cache(3600);

        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");
        clock.advance(Duration::minutes(30));
        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");
        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");

        assert_eq!(acquirer.calls(), 1);
    }

    #[tokio::test]
    async fn expiry_keeps_ten_percent_margin() {
        let (cache, _, clock) = cache(100);
        let issued_at = clock.now();

        cache.get_valid_token().await.unwrap();
        let token = cache.snapshot().await.unwrap();
        assert_eq!(token.expires_at, issued_at + Duration::seconds(90));
    }

    #[tokio::test]
    async fn token_is_renewed_after_safe_expiry() {
        let (cache, acquirer, clock) = cache(100);

        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");
        clock.advance(Duration::seconds(89));
        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");
        // the 90 s mark is already outside the validity window
        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get_valid_token().await.unwrap(), "token-2");
        assert_eq!(acquirer.calls(), 2);
    }

    #[tokio::test]
    async fn token_expired_one_second_ago_is_not_returned() {
        let (cache, acquirer, clock) = cache(3600);
        cache
            .store(Token::new("stale".to_owned(), clock.now() - Duration::seconds(1)))
            .await;

        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");
        assert_eq!(acquirer.calls(), 1);
    }

    #[tokio::test]
    async fn empty_cached_value_is_never_valid() {
        let (cache, acquirer, clock) = cache(3600);
        cache
            .store(Token::new(String::new(), clock.now() + Duration::hours(1)))
            .await;

        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");
        assert_eq!(acquirer.calls(), 1);
    }

    #[tokio::test]
    async fn failed_renewal_leaves_previous_token_untouched() {
        let (cache, acquirer, clock) = cache(60);
        cache.get_valid_token().await.unwrap();
        let before = cache.snapshot().await;

        clock.advance(Duration::minutes(5));
        acquirer.fail(true);
        let err = cache.get_valid_token().await.unwrap_err();

        assert!(matches!(err, UploadError::Auth { .. }));
        assert_eq!(err.kind(), "AuthFailure");
        assert_eq!(cache.snapshot().await, before);
    }

    #[tokio::test]
    async fn valid_token_is_served_even_while_identity_is_down() {
        let (cache, acquirer, _) = cache(3600);
        cache.get_valid_token().await.unwrap();

        acquirer.fail(true);
        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");
        assert_eq!(acquirer.calls(), 1);
    }

    #[tokio::test]
    async fn returned_token_is_always_valid_at_its_return_time() {
        let (cache, _, clock) = cache(60);

        // uneven steps so renewals land both just before and just after expiry
        for step in [1i64, 7, 13, 29, 31, 53, 2, 0, 54, 60, 89, 5] {
            clock.advance(Duration::seconds(step));
            let value = cache.get_valid_token().await.unwrap();
            let token = cache.snapshot().await.unwrap();

            assert_eq!(token.value, value);
            assert!(token.is_valid_at(clock.now()), "token {} expired at {}", value, token.expires_at);
        }
    }

    #[tokio::test]
    async fn invalidate_forces_next_acquisition() {
        let (cache, acquirer, _) = cache(3600);
        cache.get_valid_token().await.unwrap();

        cache.invalidate().await;
        assert!(cache.snapshot().await.is_none());
        assert_eq!(cache.get_valid_token().await.unwrap(), "token-2");
        assert_eq!(acquirer.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_each_get_a_valid_token() {
        let (cache, acquirer, clock) = cache(300);
        let cache = Arc::new(cache);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.get_valid_token().await }));
        }
        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert!(token.starts_with("token-"));
        }

        let calls = acquirer.calls();
        assert!((1..=16).contains(&calls));

        // whichever write won, value and expiry belong together
        let stored = cache.snapshot().await.unwrap();
        assert!(stored.value.starts_with("token-"));
        assert_eq!(stored.expires_at, clock.now() + Duration::seconds(270));
    }
}
