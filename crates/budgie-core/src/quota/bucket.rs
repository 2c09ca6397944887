//! Token bucket with continuous refill.
//!
//! Permits refill on access rather than via a background timer: every
//! operation first credits the elapsed time since the last refill, then
//! consumes. This keeps the bucket inspectable at any instant and needs
//! no dedicated task. Permits are fractional internally so long windows
//! with small capacities still refill smoothly; callers only ever see
//! floored integers.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Quota parameters (optional section in config.toml).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Total permits available over one full window.
    pub capacity: u32,
    /// Rolling window length in seconds.
    pub window_secs: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        // Published quota of the remote budgeting API: 200 requests/hour.
        Self {
            capacity: 200,
            window_secs: 3600,
        }
    }
}

/// Errors raised by the bucket itself. Both are programmer/contention
/// conditions, not remote API failures, and are never retried.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuotaError {
    /// A single request asked for more permits than the bucket can ever
    /// hold. Waiting would never succeed, so this fails immediately.
    #[error("requested {requested} permits but bucket capacity is {capacity}")]
    ExceedsCapacity { requested: u32, capacity: u32 },

    /// After waiting out the computed refill time the balance was still
    /// short (another task consumed the refill first).
    #[error("bucket still exhausted after waiting: requested {requested}, available {available}")]
    StillExhausted { requested: u32, available: u32 },
}

/// Snapshot of bucket state for monitoring / health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub available: u32,
    pub capacity: u32,
    pub window_ms: u64,
    /// 0 when at least one whole permit is available right now.
    pub time_until_next_permit_ms: u64,
}

#[derive(Debug)]
struct BucketState {
    available: f64,
    last_refill: Instant,
}

/// Shared token bucket. One instance per client, passed by reference to
/// every request path; lifecycle is the client's lifecycle.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_ms: f64,
    window: Duration,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(cfg: QuotaConfig) -> Self {
        let capacity = f64::from(cfg.capacity.max(1));
        let window = Duration::from_secs(cfg.window_secs.max(1));
        Self {
            capacity,
            refill_per_ms: capacity / window.as_millis() as f64,
            window,
            state: Mutex::new(BucketState {
                available: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Credit elapsed time and clamp to capacity. Runs under the lock.
    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(state.last_refill).as_millis() as f64;
        state.available = (state.available + elapsed_ms * self.refill_per_ms).min(self.capacity);
        state.last_refill = now;
    }

    /// Acquire `n` permits, sleeping (cooperatively) until the refill
    /// covers the shortfall. Multiple waiters are served in whatever
    /// order their individual wait timers fire; no FIFO guarantee.
    pub async fn acquire(&self, n: u32) -> Result<(), QuotaError> {
        let needed = f64::from(n);
        if needed > self.capacity {
            return Err(QuotaError::ExceedsCapacity {
                requested: n,
                capacity: self.capacity as u32,
            });
        }

        let wait = {
            let mut state = self.state.lock().await;
            self.refill(&mut state);
            if state.available >= needed {
                state.available -= needed;
                return Ok(());
            }
            let shortfall = needed - state.available;
            Duration::from_millis((shortfall / self.refill_per_ms).ceil() as u64)
        };

        tracing::debug!(permits = n, wait_ms = wait.as_millis() as u64, "quota exhausted, waiting for refill");
        tokio::time::sleep(wait).await;

        let mut state = self.state.lock().await;
        self.refill(&mut state);
        if state.available >= needed {
            state.available -= needed;
            Ok(())
        } else {
            // Another task raced us to the refilled permits. Surface it
            // rather than over-spending or waiting indefinitely.
            Err(QuotaError::StillExhausted {
                requested: n,
                available: state.available as u32,
            })
        }
    }

    /// Non-blocking acquire: consume `n` permits if available right now.
    pub async fn try_acquire(&self, n: u32) -> bool {
        let needed = f64::from(n);
        if needed > self.capacity {
            return false;
        }
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        if state.available >= needed {
            state.available -= needed;
            true
        } else {
            false
        }
    }

    /// Whole permits currently available (after an implicit refill pass).
    pub async fn remaining(&self) -> u32 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.available as u32
    }

    /// Restore to full capacity (test isolation / manual recovery).
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.available = self.capacity;
        state.last_refill = Instant::now();
    }

    pub async fn status(&self) -> QuotaStatus {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        let time_until_next_permit_ms = if state.available >= 1.0 {
            0
        } else {
            ((1.0 - state.available) / self.refill_per_ms).ceil() as u64
        };
        QuotaStatus {
            available: state.available as u32,
            capacity: self.capacity as u32,
            window_ms: self.window.as_millis() as u64,
            time_until_next_permit_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(capacity: u32, window_secs: u64) -> TokenBucket {
        TokenBucket::new(QuotaConfig {
            capacity,
            window_secs,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn starts_full_and_consumes() {
        let b = bucket(10, 60);
        assert_eq!(b.remaining().await, 10);
        assert!(b.try_acquire(3).await);
        assert_eq!(b.remaining().await, 7);
        b.acquire(7).await.unwrap();
        assert_eq!(b.remaining().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn balance_never_exceeds_capacity_or_goes_negative() {
        let b = bucket(5, 60);
        for _ in 0..5 {
            assert!(b.try_acquire(1).await);
        }
        assert!(!b.try_acquire(1).await);
        assert_eq!(b.remaining().await, 0);

        // Idle far longer than the window: refill must clamp at capacity.
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(b.remaining().await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn refills_one_permit_after_window_over_capacity() {
        // capacity 4, window 60s => one permit every 15s.
        let b = bucket(4, 60);
        b.acquire(4).await.unwrap();
        assert_eq!(b.remaining().await, 0);

        // Tiny margin over W/C so float rounding can't leave us at 0.999.
        tokio::time::sleep(Duration::from_millis(15_050)).await;
        assert_eq!(b.remaining().await, 1);
        assert!(b.try_acquire(1).await);
        assert!(!b.try_acquire(1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_refill() {
        // capacity 2, window 60s => 30s per permit.
        let b = bucket(2, 60);
        b.acquire(2).await.unwrap();

        let started = Instant::now();
        b.acquire(1).await.unwrap();
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(30), "resolved after {:?}", waited);
        assert!(waited < Duration::from_secs(31), "waited too long: {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn over_capacity_fails_without_waiting() {
        let b = bucket(3, 60);
        let started = Instant::now();
        let err = b.acquire(4).await.unwrap_err();
        assert_eq!(
            err,
            QuotaError::ExceedsCapacity {
                requested: 4,
                capacity: 3,
            }
        );
        assert_eq!(started.elapsed(), Duration::ZERO);
        // Failed acquire must not have consumed anything.
        assert_eq!(b.remaining().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn try_acquire_never_waits() {
        let b = bucket(1, 3600);
        assert!(b.try_acquire(1).await);
        let started = Instant::now();
        assert!(!b.try_acquire(1).await);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_full_capacity() {
        let b = bucket(8, 60);
        b.acquire(8).await.unwrap();
        assert_eq!(b.remaining().await, 0);
        b.reset().await;
        assert_eq!(b.remaining().await, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn status_reports_time_until_next_permit() {
        // capacity 2, window 10s => 5s per permit.
        let b = bucket(2, 10);
        let s = b.status().await;
        assert_eq!(s.available, 2);
        assert_eq!(s.capacity, 2);
        assert_eq!(s.window_ms, 10_000);
        assert_eq!(s.time_until_next_permit_ms, 0);

        b.acquire(2).await.unwrap();
        let s = b.status().await;
        assert_eq!(s.available, 0);
        assert!(s.time_until_next_permit_ms > 0);
        // 5s per permit, allow a millisecond of ceil rounding.
        assert!(s.time_until_next_permit_ms <= 5_001);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waiters_all_eventually_served() {
        use std::sync::Arc;

        // capacity 1, window 1s: second waiter needs a full refill.
        let b = Arc::new(bucket(1, 1));
        b.acquire(1).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let b = Arc::clone(&b);
            handles.push(tokio::spawn(async move { b.acquire(1).await }));
        }
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        // At least one waiter wins each refill; losers fail loudly
        // instead of over-spending.
        assert!(ok >= 1);
        assert_eq!(b.remaining().await, 0);
    }
}
