//! Redis storage backend.
//!
//! Stores ids, the index and records with plain commands: `INCR` for ids,
//! a geo set (`GEOADD`, `GEOSEARCH`, `ZREM`, `ZCARD`) for the spatial
//! index and one hash per record (`HSET`, `EXPIRE`, `HGETALL`, `TTL`).
//!
//! A [`ConnectionManager`] multiplexes every request over one
//! auto-reconnecting connection, and each call clones its handle, so
//! concurrent handlers never queue behind each other's round trips.

use super::{Expiry, GeoHit, Liveness, StorageBackend};
use crate::config::RedisConfig;
use crate::error::Result;
use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::{Client, cmd, pipe};
use async_trait::async_trait;
use murmur_types::geo::Point;
use std::collections::HashMap;

#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
}

impl RedisBackend {
    /// Connect to the server named by `config.url`.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let manager_config =
            ConnectionManagerConfig::new().set_number_of_retries(config.retries);

        let client = Client::open(config.url.as_str())?;
        let connection = client
            .get_connection_manager_with_config(manager_config)
            .await?;

        log::info!("Connected to Redis at {}", config.url);
        Ok(Self { connection })
    }

    fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

#[async_trait]
impl StorageBackend for RedisBackend {
    async fn incr(&self, key: &str) -> Result<u64> {
        let mut conn = self.connection();
        let value: u64 = cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn counter(&self, key: &str) -> Result<u64> {
        let mut conn = self.connection();
        let value: Option<u64> = cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value.unwrap_or(0))
    }

    async fn geo_add(&self, key: &str, member: &str, point: Point) -> Result<bool> {
        let mut conn = self.connection();
        let added: i64 = cmd("GEOADD")
            .arg(key)
            .arg(point.lon())
            .arg(point.lat())
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(added > 0)
    }

    async fn geo_search(&self, key: &str, center: Point, radius_km: f64) -> Result<Vec<GeoHit>> {
        let mut conn = self.connection();
        let hits: Vec<(String, f64)> = cmd("GEOSEARCH")
            .arg(key)
            .arg("FROMLONLAT")
            .arg(center.lon())
            .arg(center.lat())
            .arg("BYRADIUS")
            .arg(radius_km)
            .arg("km")
            .arg("ASC")
            .arg("WITHDIST")
            .query_async(&mut conn)
            .await?;

        Ok(hits
            .into_iter()
            .map(|(member, distance_km)| GeoHit {
                member,
                distance_km,
            })
            .collect())
    }

    async fn geo_remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut conn = self.connection();
        let removed: i64 = cmd("ZREM").arg(key).arg(member).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn geo_len(&self, key: &str) -> Result<usize> {
        let mut conn = self.connection();
        let len: usize = cmd("ZCARD").arg(key).query_async(&mut conn).await?;
        Ok(len)
    }

    async fn hash_set(
        &self,
        key: &str,
        fields: &[(String, String)],
        expiry: Expiry,
    ) -> Result<()> {
        let mut conn = self.connection();

        // MULTI/EXEC so no reader ever sees the fields without their expiry.
        let mut pipeline = pipe();
        pipeline
            .atomic()
            .cmd("DEL")
            .arg(key)
            .ignore()
            .cmd("HSET")
            .arg(key)
            .arg(fields)
            .ignore();

        if let Expiry::After(ttl) = expiry {
            pipeline.cmd("EXPIRE").arg(key).arg(ttl.as_secs()).ignore();
        }

        let () = pipeline.query_async(&mut conn).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.connection();
        let fields: HashMap<String, String> =
            cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(fields)
    }

    async fn liveness(&self, key: &str) -> Result<Liveness> {
        let mut conn = self.connection();
        let reply: i64 = cmd("TTL").arg(key).query_async(&mut conn).await?;
        Ok(Liveness::from_ttl_reply(reply))
    }
}
