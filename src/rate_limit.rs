use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::interval;

use crate::metrics::RATE_LIMIT_KEYS;

// Per-key quota bucket. One bucket per caller key, replaced (not merged)
// once its window has passed.
pub struct QuotaBucket {
    pub count: u32,
    pub reset_at: u64, // unix millis when the window ends
}

// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: u64,
}

impl RateLimitDecision {
    // Seconds a throttled caller should wait, rounded up.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at.saturating_sub(now_ms).div_ceil(1000)
    }
}

// Fixed-window admission limiter. All requests in a window share one reset
// instant, so traffic can burst to 2x the limit across a window boundary.
// That matches the portal's existing throttling behavior and is kept as is.
pub struct RateLimiter {
    buckets: DashMap<String, QuotaBucket>,
    limit: u32,
    window_ms: u64,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            limit,
            window_ms: window.as_millis() as u64,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    // Decide whether one more request for `key` may proceed. Never fails;
    // a key never seen before is the normal first-call path.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, now_ms())
    }

    // The entry guard holds the key's shard for the whole read-check-write
    // sequence, so count never exceeds limit under concurrent callers.
    fn check_at(&self, key: &str, now: u64) -> RateLimitDecision {
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| QuotaBucket {
                count: 0,
                reset_at: now + self.window_ms,
            });

        // Window over? Start a fresh one.
        if bucket.reset_at <= now {
            bucket.count = 1;
            bucket.reset_at = now + self.window_ms;
            return RateLimitDecision {
                allowed: true,
                remaining: self.limit - 1,
                reset_at: bucket.reset_at,
            };
        }

        // Saturated: deny without touching the bucket.
        if bucket.count >= self.limit {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: bucket.reset_at,
            };
        }

        bucket.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.limit - bucket.count,
            reset_at: bucket.reset_at,
        }
    }

    // Drop buckets whose window ended more than one full window ago.
    // A merely expired bucket would be replaced on its next check anyway,
    // so sweeping never changes an admission decision.
    pub fn sweep(&self) -> usize {
        self.sweep_at(now_ms())
    }

    fn sweep_at(&self, now: u64) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| bucket.reset_at + self.window_ms > now);
        before - self.buckets.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

// Background sweeper - the bucket table otherwise grows with every distinct
// caller seen over the process lifetime.
pub async fn sweep_task(limiter: Arc<RateLimiter>, period: Duration) {
    let mut ticker = interval(period);

    println!("Sweeper started (interval: {:?})", period);

    loop {
        ticker.tick().await;

        let removed = limiter.sweep();
        RATE_LIMIT_KEYS.set(limiter.tracked_keys() as f64);

        if removed > 0 {
            println!(
                "[Sweeper] dropped {} stale buckets, {} still tracked",
                removed,
                limiter.tracked_keys()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    fn limiter(limit: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(limit, Duration::from_millis(window_ms))
    }

    #[test]
    fn admits_up_to_limit_with_decreasing_remaining() {
        let l = limiter(5, 60_000);

        for expected_remaining in (0..5).rev() {
            let d = l.check_at("user", 1_000);
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
            assert_eq!(d.reset_at, 61_000);
        }
    }

    #[test]
    fn denies_once_saturated_without_mutating_reset() {
        let l = limiter(3, 60_000);

        for _ in 0..3 {
            assert!(l.check_at("user", 1_000).allowed);
        }

        let denied = l.check_at("user", 2_000);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        // reset_at is the one set when the window opened, not the call time
        assert_eq!(denied.reset_at, 61_000);

        // still denied on repeat, same reset
        let again = l.check_at("user", 3_000);
        assert!(!again.allowed);
        assert_eq!(again.reset_at, 61_000);
    }

    #[test]
    fn fresh_window_after_reset_passes() {
        let l = limiter(3, 60_000);

        for _ in 0..3 {
            l.check_at("user", 1_000);
        }
        assert!(!l.check_at("user", 2_000).allowed);

        // window ended at 61_000; next call opens a new one
        let d = l.check_at("user", 61_500);
        assert!(d.allowed);
        assert_eq!(d.remaining, 2);
        assert_eq!(d.reset_at, 121_500);
    }

    #[test]
    fn small_quota_exhausts_then_rolls_over() {
        let l = limiter(2, 1_000);

        let d = l.check_at("k", 0);
        assert!(d.allowed);
        assert_eq!(d.remaining, 1);
        assert_eq!(d.reset_at, 1_000);

        let d = l.check_at("k", 10);
        assert!(d.allowed);
        assert_eq!(d.remaining, 0);

        let d = l.check_at("k", 20);
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        assert_eq!(d.reset_at, 1_000);

        let d = l.check_at("k", 1_001);
        assert!(d.allowed);
        assert_eq!(d.remaining, 1);
        assert_eq!(d.reset_at, 2_001);
    }

    #[test]
    fn keys_do_not_affect_each_other() {
        let l = limiter(1, 60_000);

        assert!(l.check_at("a", 1_000).allowed);
        assert!(!l.check_at("a", 1_001).allowed);

        // exhausting "a" leaves "b" untouched
        assert!(l.check_at("b", 1_002).allowed);
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        let d = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at: 10_500,
        };

        assert_eq!(d.retry_after_secs(10_000), 1); // 500ms left
        assert_eq!(d.retry_after_secs(8_500), 2); // exactly 2s left
        assert_eq!(d.retry_after_secs(8_400), 3); // 2.1s left
        assert_eq!(d.retry_after_secs(11_000), 0); // already past
    }

    #[test]
    fn sweep_drops_only_long_expired_buckets() {
        let l = limiter(5, 1_000);

        l.check_at("old", 0); // reset_at 1_000
        l.check_at("recent", 1_500); // reset_at 2_500
        l.check_at("active", 2_900); // reset_at 3_900
        assert_eq!(l.tracked_keys(), 3);

        // at t=3_000: "old" is a full window past reset, "recent" expired but
        // within grace, "active" still open
        let removed = l.sweep_at(3_000);
        assert_eq!(removed, 1);
        assert_eq!(l.tracked_keys(), 2);

        // a swept key starts over like any first call
        let d = l.check_at("old", 3_000);
        assert!(d.allowed);
        assert_eq!(d.remaining, 4);
    }

    #[test]
    fn concurrent_checks_never_over_admit() {
        let l = Arc::new(limiter(50, 60_000));
        let admitted = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let l = Arc::clone(&l);
                let admitted = Arc::clone(&admitted);
                thread::spawn(move || {
                    for _ in 0..20 {
                        if l.check("shared").allowed {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        // 160 attempts against a quota of 50
        assert_eq!(admitted.load(Ordering::Relaxed), 50);
    }
}
