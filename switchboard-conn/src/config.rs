//! Connection Manager Configuration
//!
//! Three configuration surfaces live here:
//!
//! - `ManagerConfig`: timeouts and TTLs for the connection lifecycle
//! - `DirectoryConfig`: coordinates of the control-plane directory database
//! - `SharedCredentials`: the process-wide credentials used for every
//!   tenant database (there are no per-tenant credentials)
//!
//! Every field has a sane default and can be overridden via `SWITCHBOARD_*`
//! environment variables.

use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DIRECTORY_POOL_SIZE,
    DEFAULT_DIRECTORY_PORT, DEFAULT_HEALTH_TIMEOUT_SECS, DEFAULT_SWEEP_INTERVAL_SECS,
};
use deadpool_postgres::{Config, ManagerConfig as PoolManagerConfig, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use switchboard_core::Unavailable;
use tokio_postgres::NoTls;

// ============================================================================
// MANAGER CONFIGURATION
// ============================================================================

/// Timeouts and TTLs governing the connection lifecycle.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// How long a cached connection may sit unused before eviction
    /// (default: 5 minutes)
    pub cache_ttl: Duration,

    /// How often the eviction sweeper scans the cache (default: 2 minutes)
    pub sweep_interval: Duration,

    /// Upper bound on a single physical connection attempt
    /// (default: 5 seconds)
    pub connect_timeout: Duration,

    /// Upper bound on a single liveness probe (default: 2 seconds)
    /// A probe that exceeds this counts as a failed probe.
    pub health_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            health_timeout: Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
        }
    }
}

impl ManagerConfig {
    /// Create a ManagerConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `SWITCHBOARD_CACHE_TTL_SECS`: Idle TTL for cached connections (default: 300)
    /// - `SWITCHBOARD_SWEEP_INTERVAL_SECS`: Sweeper scan interval (default: 120)
    /// - `SWITCHBOARD_CONNECT_TIMEOUT_SECS`: Connection attempt bound (default: 5)
    /// - `SWITCHBOARD_HEALTH_TIMEOUT_SECS`: Liveness probe bound (default: 2)
    pub fn from_env() -> Self {
        let cache_ttl = Duration::from_secs(
            std::env::var("SWITCHBOARD_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
        );

        let sweep_interval = Duration::from_secs(
            std::env::var("SWITCHBOARD_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        );

        let connect_timeout = Duration::from_secs(
            std::env::var("SWITCHBOARD_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        );

        let health_timeout = Duration::from_secs(
            std::env::var("SWITCHBOARD_HEALTH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HEALTH_TIMEOUT_SECS),
        );

        Self {
            cache_ttl,
            sweep_interval,
            connect_timeout,
            health_timeout,
        }
    }

    /// Create a configuration for development/testing with short cycles.
    pub fn development() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(2),
            health_timeout: Duration::from_secs(1),
        }
    }
}

// ============================================================================
// DIRECTORY CONFIGURATION
// ============================================================================

/// Coordinates of the control-plane directory database.
///
/// The directory holds the `tenant_routes` table mapping tenant keys to
/// physical database coordinates. It is a separate database from any
/// tenant database and gets its own small pool.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Directory database host
    pub host: String,
    /// Directory database port
    pub port: u16,
    /// Directory database name
    pub dbname: String,
    /// Directory database user
    pub user: String,
    /// Directory database password
    pub password: String,
    /// Maximum pool size for directory lookups
    pub max_size: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_DIRECTORY_PORT,
            dbname: "switchboard".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: DEFAULT_DIRECTORY_POOL_SIZE,
        }
    }
}

impl DirectoryConfig {
    /// Create a DirectoryConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `SWITCHBOARD_DIRECTORY_HOST`: Directory host (default: localhost)
    /// - `SWITCHBOARD_DIRECTORY_PORT`: Directory port (default: 5432)
    /// - `SWITCHBOARD_DIRECTORY_NAME`: Directory database name (default: switchboard)
    /// - `SWITCHBOARD_DIRECTORY_USER`: Directory user (default: postgres)
    /// - `SWITCHBOARD_DIRECTORY_PASSWORD`: Directory password (default: empty)
    /// - `SWITCHBOARD_DIRECTORY_POOL_SIZE`: Directory pool size (default: 4)
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("SWITCHBOARD_DIRECTORY_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("SWITCHBOARD_DIRECTORY_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DIRECTORY_PORT),
            dbname: std::env::var("SWITCHBOARD_DIRECTORY_NAME")
                .unwrap_or_else(|_| "switchboard".to_string()),
            user: std::env::var("SWITCHBOARD_DIRECTORY_USER")
                .unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("SWITCHBOARD_DIRECTORY_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("SWITCHBOARD_DIRECTORY_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DIRECTORY_POOL_SIZE),
        }
    }

    /// Create a connection pool for the directory database.
    pub fn create_pool(&self) -> Result<Pool, Unavailable> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.pool = Some(deadpool_postgres::PoolConfig::new(self.max_size));

        cfg.manager = Some(PoolManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| Unavailable::new(format!("failed to create directory pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SHARED CREDENTIALS
// ============================================================================

/// Process-wide credentials for tenant databases.
///
/// Every tenant database is opened with the same user and password. Tenant
/// isolation comes from routing, not from per-tenant credentials.
#[derive(Debug, Clone)]
pub struct SharedCredentials {
    /// Database user for all tenant connections
    pub user: String,
    /// Database password for all tenant connections
    pub password: String,
}

impl Default for SharedCredentials {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: "".to_string(),
        }
    }
}

impl SharedCredentials {
    /// Create SharedCredentials from environment variables.
    ///
    /// # Environment Variables
    /// - `SWITCHBOARD_TENANT_USER`: User for tenant connections (default: postgres)
    /// - `SWITCHBOARD_TENANT_PASSWORD`: Password for tenant connections (default: empty)
    pub fn from_env() -> Self {
        Self {
            user: std::env::var("SWITCHBOARD_TENANT_USER")
                .unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("SWITCHBOARD_TENANT_PASSWORD").unwrap_or_default(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_config_default() {
        let config = ManagerConfig::default();
        assert_eq!(
            config.cache_ttl,
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS)
        );
        assert_eq!(
            config.sweep_interval,
            Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)
        );
        assert_eq!(
            config.connect_timeout,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
        );
        assert_eq!(
            config.health_timeout,
            Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_manager_config_development() {
        let config = ManagerConfig::development();
        assert!(config.cache_ttl < Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
        assert!(config.sweep_interval < config.cache_ttl);
    }

    #[test]
    fn test_directory_config_default() {
        let config = DirectoryConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, DEFAULT_DIRECTORY_PORT);
        assert_eq!(config.dbname, "switchboard");
        assert_eq!(config.max_size, DEFAULT_DIRECTORY_POOL_SIZE);
    }

    #[test]
    fn test_shared_credentials_default() {
        let creds = SharedCredentials::default();
        assert_eq!(creds.user, "postgres");
        assert!(creds.password.is_empty());
    }
}
