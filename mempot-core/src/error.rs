//! Error types for the cache.

use thiserror::Error;

/// Boxed error produced by a user-supplied compute function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by cache operations.
///
/// Plain reads and writes are infallible; only memoization and construction
/// can fail.
#[derive(Error, Debug)]
pub enum Error {
    /// The compute function passed to `remember` failed. Nothing was stored.
    #[error("failed to compute value")]
    Compute(#[source] BoxError),

    /// A background cleanup task was requested outside of a Tokio runtime
    #[error("a Tokio runtime is required to run the background cleanup task")]
    NoRuntime,
}

impl Error {
    /// Returns `true` if this error came from a failed compute function
    pub fn is_compute(&self) -> bool {
        matches!(self, Error::Compute(_))
    }
}

/// Result alias for cache operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_compute_error_keeps_source() {
        let err = Error::Compute("data not available".into());

        assert!(err.is_compute());
        assert_eq!(err.to_string(), "failed to compute value");
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("data not available".to_string())
        );
    }

    #[test]
    fn test_no_runtime_is_not_compute() {
        assert!(!Error::NoRuntime.is_compute());
    }
}
