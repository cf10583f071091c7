//! PostgreSQL Tenant Directory
//!
//! Control-plane lookup of tenant routing data. The directory database
//! holds a `tenant_routes` table:
//!
//! ```sql
//! CREATE TABLE tenant_routes (
//!     tenant_key    TEXT PRIMARY KEY,
//!     host          TEXT NOT NULL,
//!     port          INTEGER NOT NULL,
//!     database_name TEXT NOT NULL
//! );
//! ```
//!
//! Lookups run only on cache miss and results are never cached here;
//! re-resolving on every reconnect keeps routing correct when a tenant's
//! database migrates between hosts.

use crate::config::DirectoryConfig;
use async_trait::async_trait;
use deadpool_postgres::Pool;
use switchboard_core::{DirectoryError, TenantDirectory, TenantKey, TenantRoute};

// ============================================================================
// POSTGRES DIRECTORY
// ============================================================================

/// Tenant directory backed by a PostgreSQL control-plane database.
#[derive(Clone)]
pub struct PgTenantDirectory {
    pool: Pool,
}

impl PgTenantDirectory {
    /// Create a directory over an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a directory from configuration, building its own pool.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let pool = config.create_pool().map_err(|e| DirectoryError::LookupFailed {
            reason: e.to_string(),
        })?;
        Ok(Self::new(pool))
    }

    /// Get a connection from the directory pool.
    async fn get_conn(&self) -> Result<deadpool_postgres::Object, DirectoryError> {
        self.pool
            .get()
            .await
            .map_err(|e| DirectoryError::LookupFailed {
                reason: format!("directory pool: {}", e),
            })
    }
}

#[async_trait]
impl TenantDirectory for PgTenantDirectory {
    async fn resolve(&self, tenant_key: &TenantKey) -> Result<TenantRoute, DirectoryError> {
        let conn = self.get_conn().await?;

        let row = conn
            .query_opt(
                "SELECT host, port, database_name FROM tenant_routes WHERE tenant_key = $1",
                &[&tenant_key.as_str()],
            )
            .await
            .map_err(|e| DirectoryError::LookupFailed {
                reason: e.to_string(),
            })?;

        let row = row.ok_or_else(|| DirectoryError::NotFound {
            tenant_key: tenant_key.clone(),
        })?;

        let host: String = row.get(0);
        let port: i32 = row.get(1);
        let database_name: String = row.get(2);

        let port = u16::try_from(port).map_err(|_| DirectoryError::LookupFailed {
            reason: format!("route for {} has invalid port {}", tenant_key, port),
        })?;

        tracing::debug!(
            tenant_key = %tenant_key,
            host = %host,
            port,
            database_name = %database_name,
            "Resolved tenant route"
        );

        Ok(TenantRoute {
            tenant_key: tenant_key.clone(),
            host,
            port,
            database_name,
        })
    }
}
