//! Backing store abstraction for murmur
//!
//! Both the record store and the spatial index talk to the backing store
//! only through [`StorageBackend`], which exposes exactly the primitives
//! they need: an atomic counter, a geo set, and hashes with per-key expiry.
//! One backend instance is created at startup and shared as
//! `Arc<dyn StorageBackend>`.

use crate::error::Result;
use async_trait::async_trait;
use murmur_types::geo::Point;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;

/// When a hash should expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Expire after the given duration. A zero duration expires immediately.
    After(Duration),
    /// Never expire.
    Never,
}

impl Expiry {
    /// Map a client-supplied TTL in seconds to an expiry.
    ///
    /// Absent or zero expires immediately, negative means no expiry.
    ///
    /// ```
    /// use murmur::storage::Expiry;
    /// use std::time::Duration;
    ///
    /// assert_eq!(Expiry::from_ttl_seconds(None), Expiry::After(Duration::ZERO));
    /// assert_eq!(Expiry::from_ttl_seconds(Some(60)), Expiry::After(Duration::from_secs(60)));
    /// assert_eq!(Expiry::from_ttl_seconds(Some(-1)), Expiry::Never);
    /// ```
    pub fn from_ttl_seconds(ttl: Option<i64>) -> Self {
        match ttl {
            Some(secs) if secs < 0 => Self::Never,
            Some(secs) => Self::After(Duration::from_secs(secs as u64)),
            None => Self::After(Duration::ZERO),
        }
    }

    /// The TTL in seconds as persisted next to a record, `-1` for no expiry.
    pub fn as_ttl_seconds(&self) -> i64 {
        match self {
            Self::After(d) => d.as_secs() as i64,
            Self::Never => -1,
        }
    }
}

/// Remaining-lifetime view of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The key exists and expires after `remaining`.
    Alive { remaining: Duration },
    /// The key exists and has no expiry.
    AliveNoExpiry,
    /// The key expired or never existed.
    Absent,
}

impl Liveness {
    /// Decode a Redis-style `TTL` reply: `-2` absent, `-1` no expiry,
    /// otherwise remaining seconds.
    pub fn from_ttl_reply(reply: i64) -> Self {
        match reply {
            -1 => Self::AliveNoExpiry,
            r if r < 0 => Self::Absent,
            r => Self::Alive {
                remaining: Duration::from_secs(r as u64),
            },
        }
    }

    pub fn is_alive(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Remaining lifetime, `None` when the key never expires or is gone.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Alive { remaining } => Some(*remaining),
            Self::AliveNoExpiry | Self::Absent => None,
        }
    }
}

/// A geo set member with its distance from a query center.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoHit {
    pub member: String,
    pub distance_km: f64,
}

/// Trait for backing store implementations
///
/// Every method is a single round trip. Implementations must make `incr`
/// atomic across all callers sharing the store and must apply a hash's
/// fields and its expiry together.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Atomically increment a counter and return the new value.
    async fn incr(&self, key: &str) -> Result<u64>;

    /// Current counter value, `0` when the counter was never incremented.
    async fn counter(&self, key: &str) -> Result<u64>;

    /// Add or move a geo set member. Returns `true` when the member is new.
    async fn geo_add(&self, key: &str, member: &str, point: Point) -> Result<bool>;

    /// Members within `radius_km` of `center`, ascending by distance.
    async fn geo_search(&self, key: &str, center: Point, radius_km: f64) -> Result<Vec<GeoHit>>;

    /// Remove a geo set member. Returns `true` when something was removed.
    async fn geo_remove(&self, key: &str, member: &str) -> Result<bool>;

    /// Number of members in a geo set.
    async fn geo_len(&self, key: &str) -> Result<usize>;

    /// Replace a hash's fields and set its expiry in one step.
    async fn hash_set(&self, key: &str, fields: &[(String, String)], expiry: Expiry)
    -> Result<()>;

    /// All fields of a hash, empty when the hash is absent or expired.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Remaining lifetime of a key.
    async fn liveness(&self, key: &str) -> Result<Liveness>;
}

/// Bound a backing store round trip, surfacing expiry as `StoreUnavailable`.
pub async fn with_timeout<T>(timeout: Duration, op: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, op).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MurmurError;

    #[test]
    fn test_liveness_from_ttl_reply() {
        assert_eq!(Liveness::from_ttl_reply(-2), Liveness::Absent);
        assert_eq!(Liveness::from_ttl_reply(-1), Liveness::AliveNoExpiry);
        assert_eq!(
            Liveness::from_ttl_reply(30),
            Liveness::Alive {
                remaining: Duration::from_secs(30)
            }
        );
        // A key in its last second still exists.
        assert!(Liveness::from_ttl_reply(0).is_alive());
    }

    #[test]
    fn test_liveness_remaining() {
        assert_eq!(Liveness::AliveNoExpiry.remaining(), None);
        assert_eq!(Liveness::Absent.remaining(), None);
        assert!(Liveness::AliveNoExpiry.is_alive());
        assert!(!Liveness::Absent.is_alive());
    }

    #[test]
    fn test_expiry_ttl_seconds() {
        assert_eq!(Expiry::from_ttl_seconds(Some(0)), Expiry::After(Duration::ZERO));
        assert_eq!(Expiry::from_ttl_seconds(Some(-5)), Expiry::Never);
        assert_eq!(Expiry::Never.as_ttl_seconds(), -1);
        assert_eq!(Expiry::After(Duration::from_secs(90)).as_ttl_seconds(), 90);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_elapses() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1u64)
        };
        let result = with_timeout(Duration::from_millis(10), slow).await;
        assert!(matches!(result, Err(MurmurError::StoreUnavailable(_))));

        let fast = async { Ok(2u64) };
        assert_eq!(with_timeout(Duration::from_millis(10), fast).await, Ok(2));
    }
}
