//! Connection Cache
//!
//! Concurrent map from tenant key to cached connection entry. The cache
//! holds at most one entry per tenant key; each entry owns an `Arc` clone
//! of the connection handle and records when the handle was last used.
//!
//! The cache itself never opens or probes connections. Policy (liveness,
//! single-flight creation, error translation) lives in the manager; the
//! cache only stores, stamps, and removes entries.
//!
//! Eviction drops the cache's `Arc` clone. The physical close happens when
//! the last clone drops, so a unit of work still holding the handle is
//! never cut off mid-query.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use switchboard_core::{EntryState, TenantKey};

// ============================================================================
// CACHE ENTRY
// ============================================================================

/// One cached connection with its lifecycle bookkeeping.
#[derive(Debug)]
pub struct ConnectionEntry<C> {
    /// Shared handle to the open connection.
    pub handle: Arc<C>,
    /// When the entry was created.
    pub created_at: Instant,
    /// When the entry last served a request.
    pub last_used_at: Instant,
    /// Lifecycle state of the entry.
    pub state: EntryState,
}

// Manual impl: the handle is an `Arc`, so cloning an entry never
// requires `C: Clone`.
impl<C> Clone for ConnectionEntry<C> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
            created_at: self.created_at,
            last_used_at: self.last_used_at,
            state: self.state,
        }
    }
}

impl<C> ConnectionEntry<C> {
    /// Create a fresh `Live` entry.
    pub fn new(handle: Arc<C>, now: Instant) -> Self {
        Self {
            handle,
            created_at: now,
            last_used_at: now,
            state: EntryState::Live,
        }
    }

    /// Whether the entry has sat unused for at least `ttl`.
    ///
    /// The boundary is inclusive: an entry idle for exactly `ttl` is
    /// expired.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_used_at) >= ttl
    }

    /// How long the entry has sat unused.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used_at)
    }
}

// ============================================================================
// CONNECTION CACHE
// ============================================================================

/// Concurrent per-tenant connection store.
///
/// All operations take `now` as a parameter instead of reading the clock
/// internally, so tests can drive expiry with synthetic instants.
#[derive(Debug)]
pub struct ConnectionCache<C> {
    entries: DashMap<TenantKey, ConnectionEntry<C>>,
}

impl<C> Default for ConnectionCache<C>
where
    C: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ConnectionCache<C>
where
    C: Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Snapshot the entry for a tenant key, if present.
    ///
    /// Returns a clone so no map guard is held across caller awaits.
    pub fn get(&self, tenant_key: &TenantKey) -> Option<ConnectionEntry<C>> {
        self.entries.get(tenant_key).map(|e| e.value().clone())
    }

    /// Stamp the entry's last-used time, extending its TTL window.
    ///
    /// Returns `false` if no entry exists for the key.
    pub fn touch(&self, tenant_key: &TenantKey, now: Instant) -> bool {
        match self.entries.get_mut(tenant_key) {
            Some(mut entry) => {
                entry.last_used_at = now;
                true
            }
            None => false,
        }
    }

    /// Insert a connection for a tenant key, replacing any prior entry.
    ///
    /// The prior entry's handle clone is dropped on replacement. Returns
    /// the shared handle of the inserted entry.
    pub fn put(&self, tenant_key: TenantKey, handle: Arc<C>, now: Instant) -> Arc<C> {
        let entry = ConnectionEntry::new(handle, now);
        let shared = Arc::clone(&entry.handle);
        if let Some(prior) = self.entries.insert(tenant_key.clone(), entry) {
            tracing::debug!(
                tenant_key = %tenant_key,
                prior_state = %prior.state,
                "Replaced existing cache entry"
            );
        }
        shared
    }

    /// Mark an entry `Stale` so the sweeper and readers skip it.
    ///
    /// Returns `false` if no entry exists for the key.
    pub fn mark_stale(&self, tenant_key: &TenantKey) -> bool {
        match self.entries.get_mut(tenant_key) {
            Some(mut entry) => {
                entry.state = EntryState::Stale;
                true
            }
            None => false,
        }
    }

    /// Remove an entry, dropping the cache's handle clone.
    ///
    /// Returns `true` if an entry was removed. Removal is atomic, so a
    /// given entry is removed at most once even under concurrent eviction.
    pub fn evict(&self, tenant_key: &TenantKey) -> bool {
        self.entries.remove(tenant_key).is_some()
    }

    /// Remove every entry that is stale or has been idle for at least
    /// `ttl`, returning the evicted keys.
    ///
    /// Each key's expiry is re-checked atomically at removal time, so an
    /// entry touched between the scan and the removal survives the sweep.
    pub fn sweep(&self, now: Instant, ttl: Duration) -> Vec<TenantKey> {
        let candidates: Vec<TenantKey> = self
            .entries
            .iter()
            .filter(|e| e.state == EntryState::Stale || e.is_expired(now, ttl))
            .map(|e| e.key().clone())
            .collect();

        let mut evicted = Vec::with_capacity(candidates.len());
        for key in candidates {
            let removed = self
                .entries
                .remove_if(&key, |_, entry| {
                    entry.state == EntryState::Stale || entry.is_expired(now, ttl)
                })
                .is_some();
            if removed {
                evicted.push(key);
            }
        }
        evicted
    }

    /// Current lifecycle state of a tenant's entry.
    ///
    /// A key with no entry reports `Closed`: either it was never cached
    /// or its entry has been removed.
    pub fn entry_state(&self, tenant_key: &TenantKey) -> EntryState {
        self.entries
            .get(tenant_key)
            .map(|e| e.state)
            .unwrap_or(EntryState::Closed)
    }

    /// Whether an entry exists for the key.
    pub fn contains(&self, tenant_key: &TenantKey) -> bool {
        self.entries.contains_key(tenant_key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of all cached entries, in no particular order.
    pub fn tenant_keys(&self) -> Vec<TenantKey> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
