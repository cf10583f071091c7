//! Tenant Accessor
//!
//! Thin convenience wrapper over the connection manager for callers that
//! want to run a unit of work against a tenant's database without touching
//! connection lifecycle at all. The closure receives a shared handle; the
//! cached connection stays open after the work completes.

use crate::manager::ConnectionManager;
use std::future::Future;
use std::sync::Arc;
use switchboard_core::{SwitchboardResult, TenantConnector, TenantDirectory, TenantKey};

/// Runs caller work against cached tenant connections.
pub struct TenantAccessor<D, C>
where
    D: TenantDirectory,
    C: TenantConnector,
{
    manager: Arc<ConnectionManager<D, C>>,
}

impl<D, C> Clone for TenantAccessor<D, C>
where
    D: TenantDirectory,
    C: TenantConnector,
{
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<D, C> TenantAccessor<D, C>
where
    D: TenantDirectory,
    C: TenantConnector,
{
    /// Create an accessor over an existing manager.
    pub fn new(manager: Arc<ConnectionManager<D, C>>) -> Self {
        Self { manager }
    }

    /// Run `work` against the tenant's connection.
    ///
    /// Acquires a live handle through the manager (opening one on first
    /// use), passes it to the closure, and returns the closure's output.
    /// The handle remains cached for subsequent calls.
    pub async fn with_connection<F, Fut, R>(
        &self,
        tenant_key: &TenantKey,
        work: F,
    ) -> SwitchboardResult<R>
    where
        F: FnOnce(Arc<C::Conn>) -> Fut,
        Fut: Future<Output = R>,
    {
        let conn = self.manager.get_connection(tenant_key).await?;
        Ok(work(conn).await)
    }

    /// The underlying connection manager.
    pub fn manager(&self) -> &ConnectionManager<D, C> {
        &self.manager
    }
}
