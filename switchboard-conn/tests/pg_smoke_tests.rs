//! Smoke tests against a live PostgreSQL instance.
//!
//! Run with `cargo test --features db-tests`. Expects a directory
//! database reachable via the `SWITCHBOARD_DIRECTORY_*` environment
//! variables, seeded with a `tenant_routes` row for `smoke-tenant`
//! pointing at a database the `SWITCHBOARD_TENANT_*` credentials can
//! open.
#![cfg(feature = "db-tests")]

use std::sync::Arc;
use switchboard_conn::{
    ConnectionManager, DirectoryConfig, ManagerConfig, PgConnector, PgTenantDirectory,
    SharedCredentials, TenantConnection, TenantDirectory,
};
use switchboard_core::TenantKey;

#[tokio::test]
async fn test_resolve_seeded_tenant() {
    let directory = PgTenantDirectory::from_config(&DirectoryConfig::from_env()).unwrap();

    let route = directory
        .resolve(&TenantKey::new("smoke-tenant"))
        .await
        .unwrap();
    assert!(!route.host.is_empty());
    assert!(!route.database_name.is_empty());
}

#[tokio::test]
async fn test_end_to_end_connection_and_ping() {
    let config = ManagerConfig::from_env();
    let directory = Arc::new(PgTenantDirectory::from_config(&DirectoryConfig::from_env()).unwrap());
    let connector = Arc::new(PgConnector::new(
        SharedCredentials::from_env(),
        config.connect_timeout,
    ));
    let manager = ConnectionManager::new(directory, connector, config);

    let key = TenantKey::new("smoke-tenant");
    let conn = manager.get_connection(&key).await.unwrap();
    assert!(conn.ping().await);

    // Second request must reuse the cached connection.
    let again = manager.get_connection(&key).await.unwrap();
    assert!(Arc::ptr_eq(&conn, &again));
}
