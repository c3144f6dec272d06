//! TTL-bounded, size-capped validation cache.
//!
//! One instance is shared by every in-flight request. It holds resolved
//! tenants, resolved users and ownership booleans under disjoint key
//! namespaces:
//!
//! - `identity:tenant:<keyHashHex>`
//! - `identity:session:<token>:<tenantKeyHex>`
//! - `<kind>:<value>:<tenantKeyHex>`
//!
//! Every key carries a tenant-scoped component, so two tenants never share a
//! hit for the same business value.
//!
//! Time is read from [`tokio::time::Instant`] so tests can drive expiry with a
//! paused clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tenant_guard_sdk::ResourceKind;
use tokio_util::sync::CancellationToken;
use zt_security::{KeyHash, SessionToken, TenantIdentity, TenantKey, UserIdentity};

/// Divisor for the share of entries evicted when the cache is full.
const EVICTION_DIVISOR: usize = 10;

/// Values stored in the shared guard cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValidation {
    Tenant(TenantIdentity),
    User(UserIdentity),
    Ownership(bool),
}

/// Key for a resolved tenant. Built from the API-key hash, never the raw key.
#[must_use]
pub fn tenant_cache_key(hash: &KeyHash) -> String {
    format!("identity:tenant:{hash}")
}

/// Key for the user behind `token` under `tenant`.
#[must_use]
pub fn session_cache_key(token: &SessionToken, tenant: TenantKey) -> String {
    format!("identity:session:{}:{tenant}", token.as_str())
}

/// Key for an ownership result: `<kind>:<value>:<tenantKeyHex>`.
#[must_use]
pub fn ownership_cache_key(kind: ResourceKind, value: &str, tenant: TenantKey) -> String {
    format!("{kind}:{value}:{tenant}")
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    written_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.written_at) >= self.ttl
    }
}

/// Generic key to value cache with per-entry TTL.
///
/// A single mutex guards the map. The only operation that holds it for more
/// than O(1) is eviction, which is linear in `max_entries`.
#[derive(Debug)]
pub struct ValidationCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    max_entries: usize,
}

impl<V: Clone> ValidationCache<V> {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Return the live value under `key`.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Store `value` under `key` for `ttl`.
    ///
    /// When the cache is at capacity, expired entries are dropped first and
    /// then the oldest tenth by write time.
    pub fn put(&self, key: String, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.retain(|_, e| !e.is_expired(now));
            if entries.len() >= self.max_entries {
                evict_oldest(&mut entries, self.max_entries.div_ceil(EVICTION_DIVISOR));
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                written_at: now,
                ttl,
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

fn evict_oldest<V>(entries: &mut HashMap<String, CacheEntry<V>>, count: usize) {
    let mut by_age: Vec<(Instant, String)> = entries
        .iter()
        .map(|(k, e)| (e.written_at, k.clone()))
        .collect();
    let count = count.min(by_age.len());
    if count == 0 {
        return;
    }
    if count < by_age.len() {
        by_age.select_nth_unstable_by_key(count - 1, |(at, _)| *at);
    }
    for (_, key) in by_age.into_iter().take(count) {
        entries.remove(&key);
    }
    tracing::debug!(evicted = count, "validation cache at capacity, evicted oldest entries");
}

/// Periodically purge expired entries until `cancel` fires.
pub fn spawn_cache_sweeper<V>(
    cache: Arc<ValidationCache<V>>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("validation cache sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = cache.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = cache.len(), "swept expired validation cache entries");
                    }
                }
            }
        }
    })
}
