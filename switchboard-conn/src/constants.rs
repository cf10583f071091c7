//! Default Values for Connection Manager Configuration
//!
//! All durations are in seconds. Every constant here can be overridden
//! through the corresponding `SWITCHBOARD_*` environment variable; see
//! `config.rs` for the mapping.

/// How long a cached connection may sit unused before it is evictable
/// (default: 5 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// How often the eviction sweeper scans the cache (default: 2 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 120;

/// Upper bound on a single physical connection attempt (default: 5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Upper bound on a single liveness probe (default: 2 seconds).
/// A probe that exceeds this is treated as failed, not retried.
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 2;

/// Default port for the tenant directory database.
pub const DEFAULT_DIRECTORY_PORT: u16 = 5432;

/// Default pool size for the tenant directory database.
pub const DEFAULT_DIRECTORY_POOL_SIZE: usize = 4;
