//! Balance cache
//!
//! Advisory read-through/write-through accelerator over the balance
//! reader. Never authoritative: every failure downgrades to a recompute
//! from the ledger, and errors from here are logged at the service
//! boundary, never propagated.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Default TTL for cached balances
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Error types for cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend round trip failed
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Cache contract: fallible, advisory, keyed per user.
///
/// The shipped [`MemoryCache`] is per-process: when several instances
/// run against the same ledger, a write through one instance does not
/// invalidate the others, so a cached balance may lag the ledger by up
/// to the entry TTL ([`DEFAULT_CACHE_TTL`] unless overridden). Spends
/// always recompute from the ledger under the per-user lock, so
/// staleness here can only make reads conservative, never overdraw. A
/// shared backend (e.g. Redis) plugs in at this trait to tighten the
/// bound.
#[async_trait]
pub trait CreditCache: Send + Sync {
    /// Get a cached balance, absent on miss or expiry
    async fn get(&self, user_id: Uuid) -> Result<Option<i64>, CacheError>;

    /// Store a balance with a TTL
    async fn set_with_ttl(&self, user_id: Uuid, value: i64, ttl: Duration)
        -> Result<(), CacheError>;

    /// Drop a cached entry
    async fn remove(&self, user_id: Uuid) -> Result<(), CacheError>;
}

/// Cached balance with absolute expiry
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: i64,
    expires_at: Instant,
}

/// In-process balance cache backed by DashMap
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<Uuid, CacheEntry>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CreditCache for MemoryCache {
    async fn get(&self, user_id: Uuid) -> Result<Option<i64>, CacheError> {
        if let Some(entry) = self.entries.get(&user_id) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value));
            }
        }

        // Expired entries are evicted lazily on read
        self.entries
            .remove_if(&user_id, |_, e| e.expires_at <= Instant::now());
        Ok(None)
    }

    async fn set_with_ttl(
        &self,
        user_id: Uuid,
        value: i64,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.entries.insert(
            user_id,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        debug!("Cached balance {} for user {}", value, user_id);
        Ok(())
    }

    async fn remove(&self, user_id: Uuid) -> Result<(), CacheError> {
        self.entries.remove(&user_id);
        Ok(())
    }
}
