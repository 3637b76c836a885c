//! # Per-Tenant Rate Limiting
//!
//! A token bucket per tenant, capacity set by plan. Process-local and
//! reconstructed from nothing on restart — this mirrors every other piece
//! of shared gateway state that spec §5 calls out as in-memory rather than
//! persisted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct Bucket {
    capacity: f64,
    tokens: f64,
    refill_per_second: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity_per_minute: u32) -> Self {
        let capacity = capacity_per_minute as f64;
        Self {
            capacity,
            tokens: capacity,
            refill_per_second: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn try_take(&mut self, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
        self.last_refill = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Consume one token for `tenant_id`, creating its bucket at
    /// `capacity_per_minute` on first use. Returns `false` when the tenant
    /// has exhausted its per-minute allowance.
    pub async fn allow(&self, tenant_id: &str, capacity_per_minute: u32) -> bool {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .entry(tenant_id.to_string())
            .or_insert_with(|| Bucket::new(capacity_per_minute));
        bucket.try_take(Instant::now())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_capacity_then_denies() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.allow("t1", 5).await);
        }
        assert!(!limiter.allow("t1", 5).await);
    }

    #[tokio::test]
    async fn separate_tenants_have_separate_buckets() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.allow("t1", 3).await);
        }
        assert!(limiter.allow("t2", 3).await);
    }

    #[test]
    fn bucket_refills_over_time() {
        let mut bucket = Bucket::new(60);
        let start = Instant::now();
        assert!(bucket.try_take(start));
        bucket.tokens = 0.0;
        let later = start + Duration::from_secs(1);
        assert!(bucket.try_take(later));
    }
}
