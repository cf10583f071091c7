//! PostgreSQL Tenant Connector
//!
//! Opens one physical connection per tenant database using the process-wide
//! shared credentials. Each successful open spawns a driver task that owns
//! the socket; the client half is handed to the cache wrapped in an `Arc`.
//!
//! Dropping the last clone of `PgTenantConnection` drops the client, which
//! terminates the driver task and closes the socket. A failed open leaves
//! nothing behind: the socket never outlives the error.

use crate::config::SharedCredentials;
use async_trait::async_trait;
use std::time::Duration;
use switchboard_core::{ConnectError, TenantConnection, TenantConnector, TenantRoute};
use tokio_postgres::NoTls;

// ============================================================================
// CONNECTION HANDLE
// ============================================================================

/// An open connection to one tenant's database.
pub struct PgTenantConnection {
    client: tokio_postgres::Client,
}

impl PgTenantConnection {
    /// The underlying PostgreSQL client, for running queries.
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }
}

#[async_trait]
impl TenantConnection for PgTenantConnection {
    async fn ping(&self) -> bool {
        self.client.simple_query("SELECT 1").await.is_ok()
    }
}

// ============================================================================
// CONNECTOR
// ============================================================================

/// Opens tenant database connections with shared credentials.
#[derive(Debug, Clone)]
pub struct PgConnector {
    credentials: SharedCredentials,
    connect_timeout: Duration,
}

impl PgConnector {
    /// Create a connector with the given credentials and per-attempt bound.
    pub fn new(credentials: SharedCredentials, connect_timeout: Duration) -> Self {
        Self {
            credentials,
            connect_timeout,
        }
    }
}

#[async_trait]
impl TenantConnector for PgConnector {
    type Conn = PgTenantConnection;

    async fn open(&self, route: &TenantRoute) -> Result<Self::Conn, ConnectError> {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&route.host)
            .port(route.port)
            .dbname(&route.database_name)
            .user(&self.credentials.user)
            .password(&self.credentials.password)
            .connect_timeout(self.connect_timeout);

        let (client, connection) =
            config
                .connect(NoTls)
                .await
                .map_err(|e| ConnectError::Failed {
                    reason: format!("{} at {}: {}", route.database_name, route.address(), e),
                })?;

        let tenant_key = route.tenant_key.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(
                    tenant_key = %tenant_key,
                    error = %e,
                    "Tenant connection driver terminated"
                );
            }
        });

        Ok(PgTenantConnection { client })
    }
}
