//! Test utilities for the Switchboard workspace.
//!
//! In-memory mock implementations of the tenant directory, connector, and
//! connection traits, plus fixtures and proptest generators. Everything
//! here is deterministic and instrumented with counters so tests can
//! assert exactly how many lookups, opens, and closes happened.

use async_trait::async_trait;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchboard_core::{
    ConnectError, DirectoryError, TenantConnection, TenantConnector, TenantDirectory, TenantKey,
    TenantRoute,
};

// ============================================================================
// CONNECTION STATS
// ============================================================================

/// Shared counters tracking physical connection lifecycle.
///
/// `closed` is incremented from `MockConnection::drop`, so tests can assert
/// that an evicted connection's handle was released exactly once.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    opened: AtomicU64,
    closed: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connections opened so far.
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Connections fully closed (last handle clone dropped) so far.
    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// MOCK CONNECTION
// ============================================================================

/// In-memory stand-in for a tenant database connection.
///
/// Each connection carries a unique id so tests can tell whether two
/// requests got the same physical connection or triggered a reconnect.
#[derive(Debug)]
pub struct MockConnection {
    id: u64,
    tenant_key: TenantKey,
    live: AtomicBool,
    stats: Arc<ConnectionStats>,
}

impl MockConnection {
    /// Unique id of this physical connection.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The tenant this connection was opened for.
    pub fn tenant_key(&self) -> &TenantKey {
        &self.tenant_key
    }

    /// Flip the connection's liveness, simulating a dead backend.
    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }
}

#[async_trait]
impl TenantConnection for MockConnection {
    async fn ping(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// MOCK DIRECTORY
// ============================================================================

/// In-memory tenant directory with scripted routes.
#[derive(Debug, Default)]
pub struct MockDirectory {
    routes: Mutex<HashMap<TenantKey, TenantRoute>>,
    resolve_calls: AtomicU64,
    fail_lookups: AtomicBool,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory pre-populated with routes.
    pub fn with_routes(routes: impl IntoIterator<Item = TenantRoute>) -> Self {
        let dir = Self::new();
        for route in routes {
            dir.register(route);
        }
        dir
    }

    /// Register (or replace) a tenant's route.
    pub fn register(&self, route: TenantRoute) {
        let mut routes = self.routes.lock().unwrap();
        routes.insert(route.tenant_key.clone(), route);
    }

    /// Remove a tenant's route, simulating deregistration.
    pub fn unregister(&self, tenant_key: &TenantKey) {
        let mut routes = self.routes.lock().unwrap();
        routes.remove(tenant_key);
    }

    /// How many resolve calls have been made.
    pub fn resolve_count(&self) -> u64 {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent lookup fail with `LookupFailed`.
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TenantDirectory for MockDirectory {
    async fn resolve(&self, tenant_key: &TenantKey) -> Result<TenantRoute, DirectoryError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(DirectoryError::LookupFailed {
                reason: "directory offline".to_string(),
            });
        }

        let routes = self.routes.lock().unwrap();
        routes
            .get(tenant_key)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound {
                tenant_key: tenant_key.clone(),
            })
    }
}

// ============================================================================
// MOCK CONNECTOR
// ============================================================================

/// In-memory connector that mints `MockConnection`s.
#[derive(Debug)]
pub struct MockConnector {
    stats: Arc<ConnectionStats>,
    next_id: AtomicU64,
    fail_opens: AtomicBool,
    open_delay: Mutex<Option<Duration>>,
    per_key_delays: Mutex<HashMap<TenantKey, Duration>>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self {
            stats: ConnectionStats::new(),
            next_id: AtomicU64::new(1),
            fail_opens: AtomicBool::new(false),
            open_delay: Mutex::new(None),
            per_key_delays: Mutex::new(HashMap::new()),
        }
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared lifecycle counters for this connector's connections.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Connections opened so far.
    pub fn open_count(&self) -> u64 {
        self.stats.opened()
    }

    /// Make every subsequent open fail with `ConnectError::Failed`.
    pub fn set_fail_opens(&self, fail: bool) {
        self.fail_opens.store(fail, Ordering::SeqCst);
    }

    /// Delay every subsequent open, widening race windows in tests.
    pub fn set_open_delay(&self, delay: Duration) {
        let mut slot = self.open_delay.lock().unwrap();
        *slot = Some(delay);
    }

    /// Delay opens for one tenant only, leaving other tenants fast.
    pub fn set_open_delay_for(&self, tenant_key: &TenantKey, delay: Duration) {
        let mut delays = self.per_key_delays.lock().unwrap();
        delays.insert(tenant_key.clone(), delay);
    }
}

#[async_trait]
impl TenantConnector for MockConnector {
    type Conn = MockConnection;

    async fn open(&self, route: &TenantRoute) -> Result<Self::Conn, ConnectError> {
        let delay = {
            let per_key = self.per_key_delays.lock().unwrap();
            per_key
                .get(&route.tenant_key)
                .copied()
                .or(*self.open_delay.lock().unwrap())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_opens.load(Ordering::SeqCst) {
            return Err(ConnectError::Failed {
                reason: format!("refused by {}", route.address()),
            });
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            tenant_key: route.tenant_key.clone(),
            live: AtomicBool::new(true),
            stats: Arc::clone(&self.stats),
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A plausible route for the given tenant key.
pub fn route_for(tenant_key: &str) -> TenantRoute {
    TenantRoute {
        tenant_key: TenantKey::new(tenant_key),
        host: format!("db-{tenant_key}.internal"),
        port: 5432,
        database_name: format!("tenant_{tenant_key}"),
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Strategy producing realistic tenant keys.
pub fn tenant_key_strategy() -> impl Strategy<Value = TenantKey> {
    "[a-z][a-z0-9-]{0,31}".prop_map(TenantKey::new)
}

/// Strategy producing routes with arbitrary hosts and ports.
pub fn tenant_route_strategy() -> impl Strategy<Value = TenantRoute> {
    (tenant_key_strategy(), 1024u16..=65535).prop_map(|(key, port)| TenantRoute {
        host: format!("db-{key}.internal"),
        port,
        database_name: format!("tenant_{key}"),
        tenant_key: key,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_directory_resolves_registered_route() {
        let dir = MockDirectory::new();
        dir.register(route_for("acme"));

        let route = dir.resolve(&TenantKey::new("acme")).await.unwrap();
        assert_eq!(route.database_name, "tenant_acme");
        assert_eq!(dir.resolve_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_directory_unknown_tenant() {
        let dir = MockDirectory::new();
        let err = dir.resolve(&TenantKey::new("ghost")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_mock_directory_fail_lookups() {
        let dir = MockDirectory::with_routes([route_for("acme")]);
        dir.set_fail_lookups(true);
        let err = dir.resolve(&TenantKey::new("acme")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::LookupFailed { .. }));
    }

    #[tokio::test]
    async fn test_mock_connector_mints_unique_ids() {
        let connector = MockConnector::new();
        let a = connector.open(&route_for("acme")).await.unwrap();
        let b = connector.open(&route_for("acme")).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(connector.open_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_connector_fail_opens() {
        let connector = MockConnector::new();
        connector.set_fail_opens(true);
        let err = connector.open(&route_for("acme")).await.unwrap_err();
        assert!(matches!(err, ConnectError::Failed { .. }));
        assert_eq!(connector.open_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_connection_liveness_toggle() {
        let connector = MockConnector::new();
        let conn = connector.open(&route_for("acme")).await.unwrap();
        assert!(conn.ping().await);
        conn.set_live(false);
        assert!(!conn.ping().await);
    }

    #[tokio::test]
    async fn test_drop_increments_closed() {
        let connector = MockConnector::new();
        let stats = connector.stats();
        let conn = connector.open(&route_for("acme")).await.unwrap();
        assert_eq!(stats.closed(), 0);
        drop(conn);
        assert_eq!(stats.closed(), 1);
    }
}
