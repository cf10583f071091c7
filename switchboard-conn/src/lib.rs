//! Switchboard Connection Manager
//!
//! Per-tenant database connection lifecycle: resolve a tenant key to its
//! physical database through the tenant directory, lazily open and cache
//! one connection per tenant, health-check cached connections before
//! reuse, and evict idle connections in the background.
//!
//! # Architecture
//!
//! - `directory`: control-plane lookup of tenant routing data
//! - `connector`: opens physical connections with shared credentials
//! - `cache`: concurrent per-tenant connection store with TTL bookkeeping
//! - `manager`: the façade; cache-first lookup with single-flight creation
//! - `sweeper`: background eviction of idle connections
//! - `accessor`: run units of work without touching lifecycle
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use switchboard_conn::{
//!     ConnectionManager, DirectoryConfig, ManagerConfig, PgConnector,
//!     PgTenantDirectory, SharedCredentials, SweeperConfig, spawn_sweeper,
//! };
//! use switchboard_core::TenantKey;
//!
//! let config = ManagerConfig::from_env();
//! let directory = Arc::new(PgTenantDirectory::from_config(&DirectoryConfig::from_env())?);
//! let connector = Arc::new(PgConnector::new(
//!     SharedCredentials::from_env(),
//!     config.connect_timeout,
//! ));
//! let manager = Arc::new(ConnectionManager::new(directory, connector, config.clone()));
//! let sweeper = spawn_sweeper(manager.cache(), SweeperConfig::from_manager(&config));
//!
//! let conn = manager.get_connection(&TenantKey::new("acme")).await?;
//! ```

pub mod accessor;
pub mod cache;
pub mod config;
pub mod connector;
pub mod constants;
pub mod directory;
pub mod manager;
pub mod sweeper;

pub use accessor::TenantAccessor;
pub use cache::{ConnectionCache, ConnectionEntry};
pub use config::{DirectoryConfig, ManagerConfig, SharedCredentials};
pub use connector::{PgConnector, PgTenantConnection};
pub use directory::PgTenantDirectory;
pub use manager::ConnectionManager;
pub use sweeper::{
    eviction_sweeper_task, spawn_sweeper, SweeperConfig, SweeperHandle, SweeperMetrics,
    SweeperSnapshot,
};

// Re-export the core contract so callers need only one import path.
pub use switchboard_core::{
    ConnectError, DirectoryError, EntryState, SwitchboardResult, TenantConnection,
    TenantConnector, TenantDirectory, TenantKey, TenantRoute, Unavailable,
};
