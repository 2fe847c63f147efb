//! Mapping sessions.
//!
//! A session is the shared context of one mapping operation: the store
//! engine, the identity cache that lets separate relationship fetches share
//! materialized views, and fetch counters. Sessions are cheap to create and
//! meant to be dropped when the mapping operation ends.

mod cache;
mod stats;

pub use cache::{CacheKey, SessionCache};
pub use stats::{FetchStats, SessionStats};

use std::sync::Arc;

use crate::config::FetchConfig;
use crate::engine::QueryEngine;

/// Shared context of one mapping operation.
pub struct MappingSession {
    engine: Arc<dyn QueryEngine>,
    cache: SessionCache,
    stats: SessionStats,
    config: FetchConfig,
}

impl MappingSession {
    /// Create a session over `engine` with the default configuration.
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self::with_config(engine, FetchConfig::default())
    }

    /// Create a session with an explicit configuration.
    pub fn with_config(engine: Arc<dyn QueryEngine>, config: FetchConfig) -> Self {
        Self {
            engine,
            cache: SessionCache::new(),
            stats: SessionStats::new(),
            config,
        }
    }

    /// Get the store engine.
    pub fn engine(&self) -> &dyn QueryEngine {
        self.engine.as_ref()
    }

    /// Get the identity cache.
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Get the fetch counters.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Get the fetch configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

impl std::fmt::Debug for MappingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingSession")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
