//! Connection Manager
//!
//! The public façade over the directory, connector, and cache. Callers ask
//! for a tenant's connection by key; the manager returns a shared handle,
//! lazily opening and caching the physical connection on first use.
//!
//! Request path:
//!
//! 1. Cache hit: probe the cached handle with a bounded liveness check.
//!    A live handle is re-stamped and returned. A dead or timed-out handle
//!    is evicted and the request falls through to creation.
//! 2. Cache miss: acquire the tenant's creation lock, re-check the cache
//!    (another request may have won the race), resolve the route, open a
//!    bounded connection attempt, and cache the result. Concurrent requests
//!    for the same key converge on a single physical open.
//!
//! Every internal failure (directory lookup, connection attempt, probe)
//! surfaces as `Unavailable` with a human-readable reason. Nothing in this
//! module is fatal to the process; a bad tenant degrades one request.

use crate::cache::ConnectionCache;
use crate::config::ManagerConfig;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use switchboard_core::{
    ConnectError, DirectoryError, SwitchboardResult, TenantConnection, TenantConnector,
    TenantDirectory, TenantKey, Unavailable,
};
use tokio::sync::Mutex;
use tokio::time::timeout;

// ============================================================================
// CONNECTION MANAGER
// ============================================================================

/// Tenant connection lifecycle manager.
///
/// Generic over the directory and connector so tests can substitute mock
/// implementations; production wiring uses `PgTenantDirectory` and
/// `PgConnector`.
pub struct ConnectionManager<D, C>
where
    D: TenantDirectory,
    C: TenantConnector,
{
    directory: Arc<D>,
    connector: Arc<C>,
    cache: Arc<ConnectionCache<C::Conn>>,
    creation_locks: DashMap<TenantKey, Arc<Mutex<()>>>,
    config: ManagerConfig,
}

impl<D, C> ConnectionManager<D, C>
where
    D: TenantDirectory,
    C: TenantConnector,
{
    /// Create a manager with an empty cache.
    pub fn new(directory: Arc<D>, connector: Arc<C>, config: ManagerConfig) -> Self {
        Self {
            directory,
            connector,
            cache: Arc::new(ConnectionCache::new()),
            creation_locks: DashMap::new(),
            config,
        }
    }

    /// Get a live connection for the tenant, opening one if needed.
    ///
    /// The returned handle is shared with the cache; callers must not
    /// assume exclusive ownership and must never close it themselves.
    pub async fn get_connection(&self, tenant_key: &TenantKey) -> SwitchboardResult<Arc<C::Conn>> {
        if tenant_key.is_empty() {
            return Err(DirectoryError::NotFound {
                tenant_key: tenant_key.clone(),
            }
            .into());
        }

        if let Some(handle) = self.try_cached(tenant_key).await {
            return Ok(handle);
        }

        self.connect_tenant(tenant_key).await
    }

    /// Serve the request from the cache if the entry is fresh and live.
    ///
    /// Returns `None` on miss, expiry, or a failed probe; expired and dead
    /// entries are evicted on the way out so the creation path starts clean.
    async fn try_cached(&self, tenant_key: &TenantKey) -> Option<Arc<C::Conn>> {
        let entry = self.cache.get(tenant_key)?;
        let now = Instant::now();

        if entry.is_expired(now, self.config.cache_ttl) {
            tracing::debug!(
                tenant_key = %tenant_key,
                idle_secs = entry.idle_for(now).as_secs(),
                "Evicting expired cache entry"
            );
            self.cache.evict(tenant_key);
            return None;
        }

        let live = matches!(
            timeout(self.config.health_timeout, entry.handle.ping()).await,
            Ok(true)
        );

        if live {
            self.cache.touch(tenant_key, Instant::now());
            tracing::trace!(tenant_key = %tenant_key, "Cache hit, connection live");
            return Some(entry.handle);
        }

        tracing::warn!(
            tenant_key = %tenant_key,
            "Cached connection failed liveness probe, evicting"
        );
        self.cache.mark_stale(tenant_key);
        self.cache.evict(tenant_key);
        None
    }

    /// Open and cache a connection for the tenant, single-flight per key.
    ///
    /// Losers of the creation race wait on the key's lock and then find the
    /// winner's fresh entry on the double-check, so one cache miss storm
    /// produces exactly one directory lookup and one physical open.
    async fn connect_tenant(&self, tenant_key: &TenantKey) -> SwitchboardResult<Arc<C::Conn>> {
        let lock = {
            let entry = self
                .creation_locks
                .entry(tenant_key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        let _guard = lock.lock().await;

        // Another request may have populated the cache while we waited.
        if let Some(entry) = self.cache.get(tenant_key) {
            let now = Instant::now();
            if entry.state.is_live() && !entry.is_expired(now, self.config.cache_ttl) {
                self.cache.touch(tenant_key, now);
                tracing::trace!(tenant_key = %tenant_key, "Reusing connection created by concurrent request");
                return Ok(entry.handle);
            }
            self.cache.evict(tenant_key);
        }

        let route = self
            .directory
            .resolve(tenant_key)
            .await
            .map_err(Unavailable::from)?;

        let conn = match timeout(self.config.connect_timeout, self.connector.open(&route)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                tracing::warn!(
                    tenant_key = %tenant_key,
                    address = %route.address(),
                    error = %e,
                    "Tenant connection attempt failed"
                );
                return Err(e.into());
            }
            Err(_) => {
                let e = ConnectError::Timeout {
                    timeout_ms: self.config.connect_timeout.as_millis() as u64,
                };
                tracing::warn!(
                    tenant_key = %tenant_key,
                    address = %route.address(),
                    "Tenant connection attempt timed out"
                );
                return Err(e.into());
            }
        };

        let handle = self.cache.put(tenant_key.clone(), Arc::new(conn), Instant::now());
        tracing::info!(
            tenant_key = %tenant_key,
            address = %route.address(),
            database_name = %route.database_name,
            "Opened tenant connection"
        );
        Ok(handle)
    }

    /// Evict a tenant's cached connection, if any.
    ///
    /// The next request for the key re-resolves the route and reconnects.
    pub fn evict(&self, tenant_key: &TenantKey) -> bool {
        self.cache.evict(tenant_key)
    }

    /// The manager's connection cache, shared with the eviction sweeper.
    pub fn cache(&self) -> Arc<ConnectionCache<C::Conn>> {
        Arc::clone(&self.cache)
    }

    /// The manager's configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }
}
