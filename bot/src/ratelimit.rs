//! Two layers of throttling: a sliding window per Discord user for chat
//! interactions, and governor quotas for each outbound third-party API.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

/// Chat interactions allowed per user within [`USER_RATE_WINDOW`].
pub const USER_RATE_LIMIT: usize = 4;
pub const USER_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Per-user sliding window over a pruned timestamp list.
pub struct SlidingWindow {
    max: usize,
    window: Duration,
    hits: scc::HashMap<u64, Vec<Instant>>,
}

impl SlidingWindow {
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            hits: scc::HashMap::new(),
        }
    }

    /// Record an attempt for `key`. `Ok(())` admits the attempt; `Err(d)`
    /// rejects it with the time remaining until a slot frees up.
    pub async fn check(&self, key: u64) -> Result<(), Duration> {
        let now = Instant::now();
        let mut entry = self.hits.entry_async(key).await.or_insert(Vec::new());
        allow_at(entry.get_mut(), self.max, self.window, now)
    }
}

fn allow_at(
    hits: &mut Vec<Instant>,
    max: usize,
    window: Duration,
    now: Instant,
) -> Result<(), Duration> {
    hits.retain(|t| now.duration_since(*t) < window);

    if hits.len() >= max {
        // retain keeps insertion order, so the first entry is the oldest
        let oldest = hits[0];
        return Err(window.saturating_sub(now.duration_since(oldest)));
    }

    hits.push(now);
    Ok(())
}

/// Quotas for outbound third-party APIs. Exceeding one turns into a
/// structured tool error instead of an HTTP call.
pub struct ApiLimiters {
    pub llm: DefaultDirectRateLimiter,
    pub tenor: DefaultDirectRateLimiter,
    pub twitter: DefaultDirectRateLimiter,
    pub duckduckgo: DefaultDirectRateLimiter,
}

impl ApiLimiters {
    pub fn new() -> Self {
        Self {
            llm: RateLimiter::direct(per_minute(30)),
            tenor: RateLimiter::direct(per_minute(20)),
            twitter: RateLimiter::direct(per_minute(10)),
            duckduckgo: RateLimiter::direct(per_minute(15)),
        }
    }
}

fn per_minute(n: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(n).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn nth_request_within_window_is_rejected() {
        let now = Instant::now();
        let mut hits = Vec::new();

        for _ in 0..4 {
            assert!(allow_at(&mut hits, 4, WINDOW, now).is_ok());
        }

        let rejected = allow_at(&mut hits, 4, WINDOW, now + Duration::from_secs(1));
        let retry_after = rejected.expect_err("fifth request inside the window must be rejected");
        assert!(retry_after <= WINDOW);
        assert!(retry_after >= Duration::from_secs(58));
    }

    #[test]
    fn request_is_accepted_again_after_window_elapses() {
        let now = Instant::now();
        let mut hits = Vec::new();

        for _ in 0..4 {
            assert!(allow_at(&mut hits, 4, WINDOW, now).is_ok());
        }
        assert!(allow_at(&mut hits, 4, WINDOW, now + Duration::from_secs(30)).is_err());

        // One full window later every old timestamp has been pruned
        assert!(allow_at(&mut hits, 4, WINDOW, now + WINDOW + Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn window_slides_rather_than_resets() {
        let now = Instant::now();
        let mut hits = Vec::new();

        assert!(allow_at(&mut hits, 2, WINDOW, now).is_ok());
        assert!(allow_at(&mut hits, 2, WINDOW, now + Duration::from_secs(40)).is_ok());

        // The first hit has aged out; the second has not
        assert!(allow_at(&mut hits, 2, WINDOW, now + Duration::from_secs(70)).is_ok());
        assert!(allow_at(&mut hits, 2, WINDOW, now + Duration::from_secs(71)).is_err());
    }

    #[tokio::test]
    async fn keys_are_limited_independently() {
        let limiter = SlidingWindow::new(1, WINDOW);
        assert!(limiter.check(1).await.is_ok());
        assert!(limiter.check(1).await.is_err());
        assert!(limiter.check(2).await.is_ok());
    }
}
