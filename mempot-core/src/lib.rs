//! # Mempot Core
//!
//! A generic, in-process key-value cache with TTL (time-to-live) support,
//! meant for memoizing expensive or remote computations.
//!
//! ## Features
//!
//! - Generic over key and value types
//! - Thread-safe storage behind a single reader/writer lock
//! - Automatic expiration on read (lazy expiry)
//! - Background cleanup task for each cache instance, stoppable through a [`StopSignal`]
//! - Get-or-compute memoization with [`Cache::remember`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use mempot_core::{Cache, CacheConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mempot_core::Error> {
//!     // Create cache with default config (15 minute TTL, 5 minute cleanup interval)
//!     let cache: Cache<String, String> = Cache::new();
//!
//!     // Or with custom settings
//!     let config = CacheConfig::default()
//!         .with_default_ttl(Duration::from_secs(30))
//!         .with_cleanup_interval(Duration::from_secs(4));
//!     let cache: Cache<String, String> = Cache::with_config(config);
//!
//!     // Store a value with a 60 second TTL
//!     cache.set_with_ttl("user:123".to_string(), "John Doe".to_string(), Duration::from_secs(60));
//!
//!     // Retrieve the value
//!     if let Some(value) = cache.get("user:123") {
//!         println!("User: {}", value);
//!     }
//!
//!     // Compute once, reuse until stale
//!     let profile = cache.remember("user:456".to_string(), |key| {
//!         Ok::<_, std::io::Error>(format!("loaded {}", key))
//!     })?;
//!     println!("{}", profile);
//!
//!     // Stop the background task; the cache stays usable
//!     cache.stop();
//!     Ok(())
//! }
//! ```

mod config;
mod entry;
mod error;
mod signal;
mod store;

pub use config::{
    CacheConfig, DEFAULT_CLEANUP_INTERVAL, DEFAULT_TTL, ENV_CLEANUP_INTERVAL, ENV_DEFAULT_TTL,
};
pub use entry::Entry;
pub use error::{BoxError, Error, Result};
pub use signal::StopSignal;
pub use store::Cache;
