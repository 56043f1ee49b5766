use std::time::Duration;

use crate::signal::StopSignal;

/// Default time-to-live applied by `set` and `remember` (15 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Default interval between background cleanup runs (5 minutes)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Environment variable overriding the default TTL, in whole seconds
pub const ENV_DEFAULT_TTL: &str = "MEMPOT_DEFAULT_TTL_SECS";

/// Environment variable overriding the cleanup interval, in whole seconds
pub const ENV_CLEANUP_INTERVAL: &str = "MEMPOT_CLEANUP_INTERVAL_SECS";

/// Configuration for a cache instance
///
/// # Example
///
/// ```rust
/// use mempot_core::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::default()
///     .with_default_ttl(Duration::from_secs(30))
///     .with_cleanup_interval(Duration::from_secs(4));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL used when a write does not specify one (zero = never expire)
    pub default_ttl: Duration,
    /// Interval between cleanup runs (zero = no background task)
    pub cleanup_interval: Duration,
    /// External signal that stops the background task when cancelled
    pub stop_signal: Option<StopSignal>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            stop_signal: None,
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL applied by `set` and `remember`.
    ///
    /// A zero duration makes those entries never expire.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the cleanup interval
    ///
    /// This determines how often the background task runs to remove expired entries.
    /// A zero duration disables the background task; expired entries are then
    /// only hidden on read and reclaimed by `Cache::cleanup`.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Attaches an externally owned stop signal.
    ///
    /// Cancelling it stops the background task; the cache itself stays usable.
    pub fn with_stop_signal(mut self, signal: StopSignal) -> Self {
        self.stop_signal = Some(signal);
        self
    }

    /// Builds a configuration from environment variables.
    ///
    /// Reads:
    /// - `MEMPOT_DEFAULT_TTL_SECS` - default TTL in seconds (defaults to 900)
    /// - `MEMPOT_CLEANUP_INTERVAL_SECS` - cleanup interval in seconds (defaults to 300)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: secs_var(&lookup, ENV_DEFAULT_TTL).unwrap_or(defaults.default_ttl),
            cleanup_interval: secs_var(&lookup, ENV_CLEANUP_INTERVAL)
                .unwrap_or(defaults.cleanup_interval),
            stop_signal: None,
        }
    }
}

fn secs_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<Duration> {
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(err) => {
            tracing::warn!(variable = name, value = %raw, error = %err, "ignoring invalid duration");
            None
        }
    }
}
