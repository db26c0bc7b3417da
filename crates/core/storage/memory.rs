//! In-memory storage backend implementation.
//!
//! Mirrors the Redis semantics murmur relies on: counters start at zero,
//! expired hashes behave exactly like missing ones and are dropped the
//! first time they are touched, and geo set members never expire.

use super::{Expiry, GeoHit, Liveness, StorageBackend};
use crate::compute::spatial::SpatialIndexManager;
use crate::error::{MurmurError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use murmur_types::geo::{MAX_INDEXABLE_LATITUDE, Point};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct HashItem {
    fields: HashMap<String, String>,
    expires_at: Option<Instant>,
}

impl HashItem {
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory backend using concurrent maps and an R*-tree per geo set.
///
/// Expiry follows the tokio clock, so tests can drive it with
/// `tokio::time::pause` and `tokio::time::advance`.
pub struct MemoryBackend {
    counters: DashMap<String, u64>,
    hashes: DashMap<String, HashItem>,
    geo: RwLock<SpatialIndexManager>,
}

impl MemoryBackend {
    /// Create a new in-memory storage backend
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
            hashes: DashMap::new(),
            geo: RwLock::new(SpatialIndexManager::new()),
        }
    }

    /// Number of hashes still held, expired ones not yet touched included.
    pub fn hash_count(&self) -> usize {
        self.hashes.len()
    }

    /// Drop every expired hash now. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.hashes.len();
        self.hashes.retain(|_, item| !item.is_expired_at(now));
        before - self.hashes.len()
    }

    fn live_item(&self, key: &str) -> Option<HashItem> {
        let now = Instant::now();
        // Lazy expiry: the first access after the deadline removes the hash.
        self.hashes.remove_if(key, |_, item| item.is_expired_at(now));
        self.hashes.get(key).map(|item| item.clone())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn incr(&self, key: &str) -> Result<u64> {
        // The entry guard holds the shard lock across read-modify-write.
        let mut counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn counter(&self, key: &str) -> Result<u64> {
        Ok(self.counters.get(key).map_or(0, |c| *c))
    }

    async fn geo_add(&self, key: &str, member: &str, point: Point) -> Result<bool> {
        // Same bounds as a Redis geo set, so both backends refuse the same points.
        if !(-180.0..=180.0).contains(&point.x())
            || !(-MAX_INDEXABLE_LATITUDE..=MAX_INDEXABLE_LATITUDE).contains(&point.y())
        {
            return Err(MurmurError::StoreRejected(format!(
                "invalid longitude,latitude pair {},{}",
                point.x(),
                point.y()
            )));
        }

        let mut geo = self.geo.write();
        Ok(geo.insert_point(key, point.x(), point.y(), member.to_string()))
    }

    async fn geo_search(&self, key: &str, center: Point, radius_km: f64) -> Result<Vec<GeoHit>> {
        let geo = self.geo.read();
        Ok(geo
            .query_within_radius(key, &center, radius_km)
            .into_iter()
            .map(|(member, distance_km)| GeoHit {
                member,
                distance_km,
            })
            .collect())
    }

    async fn geo_remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut geo = self.geo.write();
        Ok(geo.remove_entry(key, member))
    }

    async fn geo_len(&self, key: &str) -> Result<usize> {
        Ok(self.geo.read().len(key))
    }

    async fn hash_set(
        &self,
        key: &str,
        fields: &[(String, String)],
        expiry: Expiry,
    ) -> Result<()> {
        let expires_at = match expiry {
            Expiry::After(ttl) => Some(Instant::now().checked_add(ttl).ok_or_else(|| {
                MurmurError::StoreRejected(format!("expiry of {ttl:?} is out of range"))
            })?),
            Expiry::Never => None,
        };

        let item = HashItem {
            fields: fields.iter().cloned().collect(),
            expires_at,
        };

        if item.is_expired_at(Instant::now()) {
            // A zero TTL deletes the key outright, as `EXPIRE key 0` does.
            self.hashes.remove(key);
        } else {
            self.hashes.insert(key.to_string(), item);
        }

        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.live_item(key).map(|item| item.fields).unwrap_or_default())
    }

    async fn liveness(&self, key: &str) -> Result<Liveness> {
        let Some(item) = self.live_item(key) else {
            return Ok(Liveness::Absent);
        };

        Ok(match item.expires_at {
            Some(at) => Liveness::Alive {
                remaining: at.saturating_duration_since(Instant::now()),
            },
            None => Liveness::AliveNoExpiry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn fields(body: &str) -> Vec<(String, String)> {
        vec![("body".to_string(), body.to_string())]
    }

    #[tokio::test]
    async fn test_incr_starts_at_one() {
        let backend = MemoryBackend::new();

        assert_eq!(backend.counter("ids").await.unwrap(), 0);
        assert_eq!(backend.incr("ids").await.unwrap(), 1);
        assert_eq!(backend.incr("ids").await.unwrap(), 2);
        assert_eq!(backend.incr("other").await.unwrap(), 1);
        assert_eq!(backend.counter("ids").await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_incr_concurrent_unique() {
        let backend = Arc::new(MemoryBackend::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..250 {
                    ids.push(backend.incr("ids").await.unwrap());
                }
                ids
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 2000);
        assert_eq!(backend.counter("ids").await.unwrap(), 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hash_expiry() {
        let backend = MemoryBackend::new();
        backend
            .hash_set("h", &fields("hello"), Expiry::After(Duration::from_secs(10)))
            .await
            .unwrap();

        assert_eq!(
            backend.liveness("h").await.unwrap(),
            Liveness::Alive {
                remaining: Duration::from_secs(10)
            }
        );
        assert_eq!(backend.hash_get_all("h").await.unwrap()["body"], "hello");

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(
            backend.liveness("h").await.unwrap().remaining(),
            Some(Duration::from_secs(6))
        );

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(backend.liveness("h").await.unwrap(), Liveness::Absent);
        assert!(backend.hash_get_all("h").await.unwrap().is_empty());
        assert_eq!(backend.hash_count(), 0);
    }

    #[tokio::test]
    async fn test_hash_liveness_states() {
        let backend = MemoryBackend::new();

        assert_eq!(backend.liveness("never").await.unwrap(), Liveness::Absent);

        backend
            .hash_set("forever", &fields("x"), Expiry::Never)
            .await
            .unwrap();
        assert_eq!(
            backend.liveness("forever").await.unwrap(),
            Liveness::AliveNoExpiry
        );

        backend
            .hash_set("instant", &fields("x"), Expiry::After(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(backend.liveness("instant").await.unwrap(), Liveness::Absent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired() {
        let backend = MemoryBackend::new();
        backend
            .hash_set("short", &fields("a"), Expiry::After(Duration::from_secs(1)))
            .await
            .unwrap();
        backend
            .hash_set("long", &fields("b"), Expiry::After(Duration::from_secs(60)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(backend.cleanup_expired(), 1);
        assert_eq!(backend.hash_count(), 1);
    }

    #[tokio::test]
    async fn test_geo_roundtrip() {
        let backend = MemoryBackend::new();
        let here = Point::new(10.0, 20.0);

        assert!(backend.geo_add("g", "a", here).await.unwrap());
        assert!(!backend.geo_add("g", "a", here).await.unwrap());
        assert!(backend
            .geo_add("g", "b", Point::new(10.005, 20.0))
            .await
            .unwrap());
        assert_eq!(backend.geo_len("g").await.unwrap(), 2);

        let hits = backend.geo_search("g", here, 1.0).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].member, "a");
        assert!(hits[0].distance_km <= hits[1].distance_km);

        assert!(backend.geo_remove("g", "a").await.unwrap());
        assert!(!backend.geo_remove("g", "a").await.unwrap());
        assert_eq!(backend.geo_len("g").await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_geo_members_outlive_hashes() {
        let backend = MemoryBackend::new();
        backend
            .hash_set("opinion_1", &fields("x"), Expiry::After(Duration::from_secs(1)))
            .await
            .unwrap();
        backend
            .geo_add("opinions", "opinion_1", Point::new(1.0, 1.0))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(backend.liveness("opinion_1").await.unwrap(), Liveness::Absent);
        assert_eq!(backend.geo_len("opinions").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry_is_an_error() {
        let backend = MemoryBackend::new();

        let err = backend
            .hash_set("k", &fields("x"), Expiry::After(Duration::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::StoreRejected(_)));
        assert!(!err.is_retryable());
        assert_eq!(backend.liveness("k").await.unwrap(), Liveness::Absent);
    }

    #[tokio::test]
    async fn test_geo_add_rejects_unindexable_points() {
        let backend = MemoryBackend::new();

        let err = backend
            .geo_add("g", "a", Point::new(10.0, 87.0))
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::StoreRejected(_)));
        assert!(backend.geo_add("g", "b", Point::new(181.0, 10.0)).await.is_err());
        assert!(backend.geo_add("g", "c", Point::new(10.0, f64::NAN)).await.is_err());
        assert!(backend.geo_add("g", "d", Point::new(10.0, 85.0)).await.unwrap());
        assert_eq!(backend.geo_len("g").await.unwrap(), 1);
    }
}
