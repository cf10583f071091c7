//! Switchboard Core - Tenant Routing Types
//!
//! Data types and trait seams shared across the Switchboard workspace.
//! This crate contains the tenant identity and routing model, the
//! connection lifecycle traits, and the error taxonomy - no connection
//! management logic lives here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Opaque tenant identifier.
///
/// One tenant key maps to one physical database. Keys are supplied by the
/// calling layer on every request and are never generated by Switchboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantKey(String);

impl TenantKey {
    /// Create a tenant key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty. Empty keys are never registered in the
    /// directory, so callers can reject them before any lookup.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for TenantKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

// ============================================================================
// ROUTING TYPES
// ============================================================================

/// Physical connection coordinates for one tenant's database.
///
/// Routes are fetched from the tenant directory on cache miss and discarded
/// after the connection is opened; only the resulting connection is cached.
/// Re-resolving on every reconnect keeps the manager correct when a tenant's
/// database migrates between hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRoute {
    /// The tenant this route belongs to.
    pub tenant_key: TenantKey,
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name on the host.
    pub database_name: String,
}

impl TenantRoute {
    /// Host:port address string, used in log events.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// CONNECTION ENTRY STATE
// ============================================================================

/// Lifecycle state of a cached connection entry.
///
/// Entries are created `Live`, become `Stale` when a liveness probe fails or
/// the sweeper finds them expired, and are `Closed` once removed from the
/// cache. A tenant key can always transition back to `Live` on the next
/// request; no state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Entry holds a usable connection.
    Live,
    /// Entry failed a liveness probe or expired; pending removal.
    Stale,
    /// Entry has been removed and its handle released.
    Closed,
}

impl EntryState {
    /// Whether the entry may serve requests.
    pub fn is_live(&self) -> bool {
        matches!(self, EntryState::Live)
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryState::Live => f.write_str("live"),
            EntryState::Stale => f.write_str("stale"),
            EntryState::Closed => f.write_str("closed"),
        }
    }
}

// ============================================================================
// CONNECTION LIFECYCLE TRAITS
// ============================================================================

/// Read-only lookup store mapping tenant keys to physical coordinates.
///
/// Queried only on cache miss. Implementations must not cache routes:
/// routing data correctness after a tenant migration matters more than the
/// cost of repeated lookups.
#[async_trait]
pub trait TenantDirectory: Send + Sync + 'static {
    /// Resolve a tenant key to its physical database coordinates.
    async fn resolve(&self, tenant_key: &TenantKey) -> Result<TenantRoute, DirectoryError>;
}

/// Opens physical connections to tenant databases.
///
/// Implementations authenticate with process-wide shared credentials; no
/// per-tenant credentials exist. A failed open must leave no dangling
/// socket behind.
#[async_trait]
pub trait TenantConnector: Send + Sync + 'static {
    /// The connection handle type produced by this connector.
    type Conn: TenantConnection;

    /// Open a connection to the database the route points at.
    async fn open(&self, route: &TenantRoute) -> Result<Self::Conn, ConnectError>;
}

/// An open, usable connection to one tenant's database.
///
/// Handles are owned by the connection cache; callers receive shared clones
/// and must never close a handle themselves. The physical close happens when
/// the last clone is dropped.
#[async_trait]
pub trait TenantConnection: Send + Sync + 'static {
    /// Minimal round-trip liveness probe.
    ///
    /// The manager bounds every probe with a timeout and treats a timeout as
    /// `false`; implementations do not need their own deadline.
    async fn ping(&self) -> bool;
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Tenant directory lookup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Tenant not registered: {tenant_key}")]
    NotFound { tenant_key: TenantKey },

    #[error("Directory lookup failed: {reason}")]
    LookupFailed { reason: String },
}

/// Physical connection attempt errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Connection attempt timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Connection failed: {reason}")]
    Failed { reason: String },
}

/// The single error type surfaced across the public contract.
///
/// Internal error kinds (`DirectoryError`, `ConnectError`, failed liveness
/// probes) are translated to `Unavailable` at the manager boundary; callers
/// never see internal kinds. Nothing wrapped here is fatal to the process -
/// a bad tenant or a dead database degrades a single request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Tenant unavailable: {reason}")]
pub struct Unavailable {
    pub reason: String,
}

impl Unavailable {
    /// Create an `Unavailable` error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<DirectoryError> for Unavailable {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound { tenant_key } => Self {
                reason: format!("tenant not registered: {tenant_key}"),
            },
            DirectoryError::LookupFailed { reason } => Self {
                reason: format!("directory lookup failed: {reason}"),
            },
        }
    }
}

impl From<ConnectError> for Unavailable {
    fn from(err: ConnectError) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}

/// Result alias for the public connection-manager contract.
pub type SwitchboardResult<T> = Result<T, Unavailable>;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_key_display_roundtrip() {
        let key = TenantKey::new("acme");
        assert_eq!(key.to_string(), "acme");
        assert_eq!(key.as_str(), "acme");
        assert_eq!(TenantKey::from("acme"), key);
    }

    #[test]
    fn test_tenant_key_serde_transparent() {
        let key = TenantKey::new("acme-west");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"acme-west\"");
        let back: TenantKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_tenant_key_empty() {
        assert!(TenantKey::new("").is_empty());
        assert!(!TenantKey::new("acme").is_empty());
    }

    #[test]
    fn test_route_address() {
        let route = TenantRoute {
            tenant_key: TenantKey::new("acme"),
            host: "db-7.internal".to_string(),
            port: 5433,
            database_name: "tenant_acme".to_string(),
        };
        assert_eq!(route.address(), "db-7.internal:5433");
    }

    #[test]
    fn test_entry_state_liveness() {
        assert!(EntryState::Live.is_live());
        assert!(!EntryState::Stale.is_live());
        assert!(!EntryState::Closed.is_live());
    }

    #[test]
    fn test_entry_state_display() {
        assert_eq!(EntryState::Live.to_string(), "live");
        assert_eq!(EntryState::Stale.to_string(), "stale");
        assert_eq!(EntryState::Closed.to_string(), "closed");
    }

    #[test]
    fn test_unavailable_from_directory_not_found() {
        let err = DirectoryError::NotFound {
            tenant_key: TenantKey::new("ghost"),
        };
        let unavailable = Unavailable::from(err);
        assert_eq!(unavailable.reason, "tenant not registered: ghost");
    }

    #[test]
    fn test_unavailable_from_directory_lookup_failed() {
        let err = DirectoryError::LookupFailed {
            reason: "connection refused".to_string(),
        };
        let unavailable = Unavailable::from(err);
        assert!(unavailable.reason.contains("directory lookup failed"));
        assert!(unavailable.reason.contains("connection refused"));
    }

    #[test]
    fn test_unavailable_from_connect_timeout() {
        let err = ConnectError::Timeout { timeout_ms: 5000 };
        let unavailable = Unavailable::from(err);
        assert!(unavailable.reason.contains("5000ms"));
    }

    #[test]
    fn test_unavailable_display() {
        let err = Unavailable::new("boom");
        assert_eq!(err.to_string(), "Tenant unavailable: boom");
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any tenant key survives a serde round-trip unchanged.
        #[test]
        fn prop_tenant_key_serde_roundtrip(raw in "[a-zA-Z0-9_-]{1,64}") {
            let key = TenantKey::new(raw.clone());
            let json = serde_json::to_string(&key).unwrap();
            let back: TenantKey = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back.as_str(), raw.as_str());
        }

        /// Directory errors always translate to a non-empty public reason.
        #[test]
        fn prop_directory_errors_have_reasons(raw in "[a-z0-9-]{1,32}") {
            let not_found = Unavailable::from(DirectoryError::NotFound {
                tenant_key: TenantKey::new(raw.clone()),
            });
            prop_assert!(not_found.reason.contains(&raw));

            let lookup = Unavailable::from(DirectoryError::LookupFailed {
                reason: raw.clone(),
            });
            prop_assert!(!lookup.reason.is_empty());
        }
    }
}
