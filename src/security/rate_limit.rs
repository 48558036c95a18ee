//! Fixed window rate limiter keyed by `(action, client)`.
//!
//! # Algorithm
//! ```text
//! key    = hex(sha256(action + "|" + client))
//! bucket = store.get(key) or {reset_at: now + window, count: 0}
//! if now > bucket.reset_at: bucket = {reset_at: now + window, count: 0}
//! bucket.count += 1
//! store.compare_and_swap(key, old, bucket)   (retry read on conflict)
//! Limited if bucket.count > max
//! ```
//!
//! The increment is persisted before the decision is returned, so a rejected
//! request still counts against the window.
//!
//! Every `PRUNE_INTERVAL` evaluations the store is asked to drop buckets whose
//! window has ended, so storage tracks active clients rather than every client
//! ever seen.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::security::bucket_store::{BucketStore, RateBucket, StoreError};
use crate::security::clock::{Clock, SystemClock};

/// Upper bound on optimistic retries for one evaluation.
///
/// Every lost swap means some other request's swap won, so a caller can only
/// lose as many times as there are concurrent writers on the same key.
pub const MAX_SWAP_ATTEMPTS: usize = 256;

/// Evaluations between two sweeps of expired buckets.
pub const PRUNE_INTERVAL: u64 = 1024;

/// Outcome of a rate limit evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { count: u32, reset_at: u64 },
    Limited { count: u32, reset_at: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }

    /// Count persisted for the window after this request.
    pub fn count(&self) -> u32 {
        match *self {
            RateDecision::Allowed { count, .. } | RateDecision::Limited { count, .. } => count,
        }
    }

    pub fn reset_at(&self) -> u64 {
        match *self {
            RateDecision::Allowed { reset_at, .. } | RateDecision::Limited { reset_at, .. } => reset_at,
        }
    }
}

/// Stable one-way key for an `(action, client)` pair.
pub fn bucket_key(action_key: &str, client_identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(action_key.as_bytes());
    hasher.update(b"|");
    hasher.update(client_identifier.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fixed window limiter over a pluggable bucket store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn BucketStore>,
    clock: Arc<dyn Clock>,
    evaluations: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn BucketStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn BucketStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            evaluations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Count one request for `(action_key, client_identifier)` and decide it.
    ///
    /// Store failures are returned as errors; callers must treat them as a
    /// rejection.
    pub fn check_and_increment(
        &self,
        action_key: &str,
        client_identifier: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> Result<RateDecision, StoreError> {
        let key = bucket_key(action_key, client_identifier);
        if (self.evaluations.fetch_add(1, Ordering::Relaxed) + 1) % PRUNE_INTERVAL == 0 {
            self.prune_expired();
        }

        for _ in 0..MAX_SWAP_ATTEMPTS {
            let current = self.store.get(&key)?;
            let now = self.clock.now_unix();

            let mut next = match current {
                Some(bucket) if !bucket.is_expired(now) => bucket,
                _ => RateBucket::fresh(now, window_secs),
            };
            next.count = next.count.saturating_add(1);

            if !self.store.compare_and_swap(&key, current.as_ref(), &next)? {
                continue;
            }

            let decision = if next.count > max_requests {
                RateDecision::Limited { count: next.count, reset_at: next.reset_at }
            } else {
                RateDecision::Allowed { count: next.count, reset_at: next.reset_at }
            };
            tracing::trace!(action = %action_key, count = next.count, max = max_requests, "Rate bucket updated");
            return Ok(decision);
        }

        Err(StoreError::Contention { attempts: MAX_SWAP_ATTEMPTS })
    }

    /// Drop buckets whose window has ended. Failures are logged, not returned:
    /// a stale bucket is reset on its next evaluation anyway.
    pub fn prune_expired(&self) -> usize {
        match self.store.prune_expired(self.clock.now_unix()) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(error = %e, "Pruning expired rate buckets failed");
                0
            }
        }
    }

    /// Seconds until a window ending at `reset_at` gives way to a fresh one.
    pub fn retry_after_secs(&self, reset_at: u64) -> u64 {
        reset_at.saturating_add(1).saturating_sub(self.clock.now_unix())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}
