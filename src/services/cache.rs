use crate::models::{AppId, PredictionResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry {
    result: PredictionResult,
    inserted_at: Instant,
}

struct CacheState {
    generation: u64,
    entries: HashMap<AppId, CacheEntry>,
}

/// Per-game prediction cache with lazy TTL expiry.
///
/// Every [`clear`](Self::clear) starts a new generation. Writers capture the
/// generation before computing and pass it to [`put`](Self::put); a result
/// computed across a clear is discarded instead of resurrecting stale data.
pub struct ResultCache {
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl ResultCache {
    /// A zero `ttl` disables caching
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(CacheState {
                generation: 0,
                entries: HashMap::new(),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Unexpired result for `appid`
    pub async fn get(&self, appid: AppId) -> Option<PredictionResult> {
        let state = self.state.read().await;
        let entry = state.entries.get(&appid)?;
        if entry.inserted_at.elapsed() <= self.ttl {
            Some(entry.result.clone())
        } else {
            None
        }
    }

    /// Store `result` if no clear happened since `generation` was read.
    ///
    /// Returns whether the entry was stored.
    pub async fn put(&self, appid: AppId, result: PredictionResult, generation: u64) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(
                appid,
                stale = generation,
                current = state.generation,
                "Discarding result computed before cache clear"
            );
            return false;
        }
        state.entries.insert(
            appid,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
        true
    }

    /// Drop every entry and start a new generation
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        let dropped = state.entries.len();
        state.entries.clear();
        state.generation += 1;
        debug!(dropped, generation = state.generation, "Result cache cleared");
    }

    /// Remove expired entries; lookups already ignore them
    pub async fn purge_expired(&self) -> usize {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        let ttl = self.ttl;
        state.entries.retain(|_, e| e.inserted_at.elapsed() <= ttl);
        before - state.entries.len()
    }

    /// Stored entries, expired or not
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
