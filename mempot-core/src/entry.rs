use std::time::{Duration, Instant};

/// A cached value together with the instant after which it is stale.
///
/// Entries are never mutated after creation; replacing a key's value stores
/// a fresh `Entry`.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    /// Creates an entry that expires `ttl` from now.
    ///
    /// A zero TTL means the entry never expires. A TTL too large to be
    /// represented as an `Instant` is treated the same way.
    pub fn new(value: V, ttl: Duration) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };
        Self { value, expires_at }
    }

    /// Creates an entry with an explicit expiration instant (`None` = never).
    pub fn with_expiry(value: V, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    /// Returns the stored value
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry, returning the stored value
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the expiration instant, or `None` if the entry never expires
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Checks whether the entry is stale as of `now`.
    ///
    /// An entry is still valid at exactly its expiration instant and expired
    /// strictly after it.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }

    /// Checks whether the entry is stale right now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}
