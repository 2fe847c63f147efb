//! Per-session fetch counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing the work a session performed.
#[derive(Debug, Default)]
pub struct SessionStats {
    batches: AtomicU64,
    key_pairs: AtomicU64,
    loader_calls: AtomicU64,
    materialized: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    callbacks: AtomicU64,
    timeouts: AtomicU64,
}

impl SessionStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one correlation query.
    #[inline]
    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record key pairs returned by a correlation query.
    #[inline]
    pub fn record_key_pairs(&self, count: usize) {
        self.key_pairs.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record one entity loader call.
    #[inline]
    pub fn record_loader_call(&self) {
        self.loader_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record views materialized from store rows.
    #[inline]
    pub fn record_materialized(&self, count: usize) {
        self.materialized.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a session cache hit.
    #[inline]
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session cache miss.
    #[inline]
    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completion callback invocation.
    #[inline]
    pub fn record_callback(&self) {
        self.callbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a timed out fetch.
    #[inline]
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the current counters.
    pub fn snapshot(&self) -> FetchStats {
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);

        FetchStats {
            batches: self.batches.load(Ordering::Relaxed),
            key_pairs: self.key_pairs.load(Ordering::Relaxed),
            loader_calls: self.loader_calls.load(Ordering::Relaxed),
            materialized: self.materialized.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            callbacks: self.callbacks.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            hit_rate: if cache_hits + cache_misses > 0 {
                cache_hits as f64 / (cache_hits + cache_misses) as f64
            } else {
                0.0
            },
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.batches,
            &self.key_pairs,
            &self.loader_calls,
            &self.materialized,
            &self.cache_hits,
            &self.cache_misses,
            &self.callbacks,
            &self.timeouts,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A snapshot of [`SessionStats`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchStats {
    /// Correlation queries issued.
    pub batches: u64,
    /// Key pairs returned by correlation queries.
    pub key_pairs: u64,
    /// Entity loader calls.
    pub loader_calls: u64,
    /// Views materialized from store rows.
    pub materialized: u64,
    /// Identifiers served from the session cache.
    pub cache_hits: u64,
    /// Identifiers that had to be materialized.
    pub cache_misses: u64,
    /// Completion callbacks invoked.
    pub callbacks: u64,
    /// Fetches abandoned after the query timeout.
    pub timeouts: u64,
    /// Cache hit rate (0.0 - 1.0).
    pub hit_rate: f64,
}

impl FetchStats {
    /// Format as a human-readable string.
    pub fn summary(&self) -> String {
        format!(
            "Fetch Stats: {} batches, {} key pairs, {} materialized, {} hits / {} misses ({:.1}% hit rate), {} callbacks",
            self.batches,
            self.key_pairs,
            self.materialized,
            self.cache_hits,
            self.cache_misses,
            self.hit_rate * 100.0,
            self.callbacks
        )
    }
}

impl std::fmt::Display for FetchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}
