//! Eviction Sweeper Background Task
//!
//! Periodically scans the connection cache and removes entries that have
//! sat unused past the TTL, plus any entries already marked stale. The
//! sweeper exists so idle tenants release their database connections even
//! when no new request ever arrives for the key.
//!
//! The sweep is O(n) over cached entries. Tenant cardinality is small
//! relative to request volume, so a linear scan every couple of minutes
//! costs nothing measurable.
//!
//! # Configuration
//!
//! The sweeper is configured via `SweeperConfig`:
//!
//! ```rust
//! use switchboard_conn::SweeperConfig;
//! use std::time::Duration;
//!
//! let config = SweeperConfig {
//!     sweep_interval: Duration::from_secs(120), // Scan every 2 minutes
//!     cache_ttl: Duration::from_secs(300),      // Evict after 5 idle minutes
//!     log_evictions: true,                      // Log each evicted key
//! };
//! ```

use crate::cache::ConnectionCache;
use crate::config::ManagerConfig;
use crate::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_SWEEP_INTERVAL_SECS};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the eviction sweeper background task.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to scan the cache (default: 2 minutes)
    pub sweep_interval: Duration,

    /// Idle TTL after which an entry is evictable (default: 5 minutes)
    pub cache_ttl: Duration,

    /// Whether to log each evicted tenant key (default: true)
    pub log_evictions: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            log_evictions: true,
        }
    }
}

impl SweeperConfig {
    /// Create a SweeperConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `SWITCHBOARD_SWEEP_INTERVAL_SECS`: Scan interval (default: 120)
    /// - `SWITCHBOARD_CACHE_TTL_SECS`: Idle TTL (default: 300)
    /// - `SWITCHBOARD_SWEEP_LOG_EVICTIONS`: Whether to log evictions (default: true)
    pub fn from_env() -> Self {
        let sweep_interval = Duration::from_secs(
            std::env::var("SWITCHBOARD_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        );

        let cache_ttl = Duration::from_secs(
            std::env::var("SWITCHBOARD_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
        );

        let log_evictions = std::env::var("SWITCHBOARD_SWEEP_LOG_EVICTIONS")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            sweep_interval,
            cache_ttl,
            log_evictions,
        }
    }

    /// Derive sweeper settings from an existing manager configuration.
    pub fn from_manager(config: &ManagerConfig) -> Self {
        Self {
            sweep_interval: config.sweep_interval,
            cache_ttl: config.cache_ttl,
            log_evictions: true,
        }
    }

    /// Create a configuration for development/testing with short cycles.
    pub fn development() -> Self {
        Self {
            sweep_interval: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(30),
            log_evictions: true,
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Metrics for the eviction sweeper.
#[derive(Debug, Default)]
pub struct SweeperMetrics {
    /// Total sweep cycles completed since startup
    pub sweep_cycles: AtomicU64,

    /// Total entries evicted since startup
    pub entries_evicted: AtomicU64,
}

impl SweeperMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> SweeperSnapshot {
        SweeperSnapshot {
            sweep_cycles: self.sweep_cycles.load(Ordering::Relaxed),
            entries_evicted: self.entries_evicted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of sweeper metrics at a point in time.
#[derive(Debug, Clone)]
pub struct SweeperSnapshot {
    pub sweep_cycles: u64,
    pub entries_evicted: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Background task that periodically evicts idle connections.
///
/// Runs until the shutdown signal is received, then returns the metrics
/// collected over its lifetime.
///
/// # Arguments
///
/// * `cache` - The connection cache to sweep
/// * `config` - Sweeper configuration (interval, TTL)
/// * `shutdown_rx` - Watch receiver for shutdown signal
pub async fn eviction_sweeper_task<C>(
    cache: Arc<ConnectionCache<C>>,
    config: SweeperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<SweeperMetrics>
where
    C: Send + Sync + 'static,
{
    let metrics = Arc::new(SweeperMetrics::new());

    let mut sweep_interval = interval(config.sweep_interval);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "Eviction sweeper started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Eviction sweeper shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                sweep_cache(&cache, &config, &metrics);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        sweep_cycles = snapshot.sweep_cycles,
        entries_evicted = snapshot.entries_evicted,
        "Eviction sweeper completed"
    );

    metrics
}

/// Perform one sweep cycle.
fn sweep_cache<C>(cache: &ConnectionCache<C>, config: &SweeperConfig, metrics: &SweeperMetrics)
where
    C: Send + Sync + 'static,
{
    metrics.sweep_cycles.fetch_add(1, Ordering::Relaxed);

    let evicted = cache.sweep(Instant::now(), config.cache_ttl);

    if evicted.is_empty() {
        tracing::trace!("Sweep cycle completed with no evictions");
        return;
    }

    metrics
        .entries_evicted
        .fetch_add(evicted.len() as u64, Ordering::Relaxed);

    if config.log_evictions {
        for key in &evicted {
            tracing::debug!(tenant_key = %key, "Evicted idle connection");
        }
    }

    tracing::info!(
        evicted = evicted.len(),
        remaining = cache.len(),
        "Sweep cycle completed"
    );
}

// ============================================================================
// SWEEPER HANDLE
// ============================================================================

/// Handle to a running sweeper task.
///
/// Dropping the handle without calling `shutdown` leaves the task running
/// until the runtime shuts down.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<Arc<SweeperMetrics>>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to finish.
    ///
    /// Returns the metrics collected over the task's lifetime, or `None`
    /// if the task panicked or was cancelled.
    pub async fn shutdown(self) -> Option<Arc<SweeperMetrics>> {
        let _ = self.shutdown_tx.send(true);
        match self.task.await {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::error!(error = %e, "Eviction sweeper task failed to join");
                None
            }
        }
    }
}

/// Spawn the eviction sweeper on the current runtime.
pub fn spawn_sweeper<C>(cache: Arc<ConnectionCache<C>>, config: SweeperConfig) -> SweeperHandle
where
    C: Send + Sync + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(eviction_sweeper_task(cache, config, shutdown_rx));
    SweeperHandle { shutdown_tx, task }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::TenantKey;

    #[test]
    fn test_config_default() {
        let config = SweeperConfig::default();
        assert_eq!(
            config.sweep_interval,
            Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)
        );
        assert_eq!(config.cache_ttl, Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
        assert!(config.log_evictions);
    }

    #[test]
    fn test_config_development() {
        let config = SweeperConfig::development();
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
        assert!(config.sweep_interval < config.cache_ttl);
    }

    #[test]
    fn test_config_from_manager() {
        let manager = ManagerConfig::development();
        let config = SweeperConfig::from_manager(&manager);
        assert_eq!(config.sweep_interval, manager.sweep_interval);
        assert_eq!(config.cache_ttl, manager.cache_ttl);
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = SweeperMetrics::new();
        metrics.sweep_cycles.store(4, Ordering::Relaxed);
        metrics.entries_evicted.store(9, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sweep_cycles, 4);
        assert_eq!(snapshot.entries_evicted, 9);
    }

    #[test]
    fn test_sweep_cache_counts_evictions() {
        let cache = ConnectionCache::new();
        cache.put(TenantKey::new("acme"), Arc::new(1u32), Instant::now());

        let config = SweeperConfig {
            sweep_interval: Duration::from_millis(10),
            cache_ttl: Duration::ZERO,
            log_evictions: false,
        };
        let metrics = SweeperMetrics::new();

        sweep_cache(&cache, &config, &metrics);
        assert_eq!(metrics.snapshot().sweep_cycles, 1);
        assert_eq!(metrics.snapshot().entries_evicted, 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_task_shutdown_returns_metrics() {
        let cache = ConnectionCache::new();
        cache.put(TenantKey::new("acme"), Arc::new(1u32), Instant::now());

        let config = SweeperConfig {
            sweep_interval: Duration::from_millis(10),
            cache_ttl: Duration::ZERO,
            log_evictions: false,
        };

        let handle = spawn_sweeper(Arc::new(cache), config);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let metrics = handle.shutdown().await.unwrap();
        let snapshot = metrics.snapshot();
        assert!(snapshot.sweep_cycles >= 1);
        assert_eq!(snapshot.entries_evicted, 1);
    }
}
