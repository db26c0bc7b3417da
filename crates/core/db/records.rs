//! Record store: identity allocation, TTL-governed persistence and point
//! lookup.
//!
//! Each record lives in one hash at `Config::record_key(id)` whose fields are
//! plain strings, so the layout stays readable with `HGETALL` from any
//! Redis client.

use crate::config::Config;
use crate::error::{MurmurError, Result};
use crate::storage::{Expiry, Liveness, StorageBackend, with_timeout};
use murmur_types::geo::Point;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const FIELD_ID: &str = "id";
const FIELD_CREATED: &str = "created";
const FIELD_LONGITUDE: &str = "longitude";
const FIELD_LATITUDE: &str = "latitude";
const FIELD_BODY: &str = "body";
const FIELD_TTL: &str = "ttl";

/// Fields of a record that does not have an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub location: Point,
    pub body: String,
    pub expiry: Expiry,
}

impl NewRecord {
    pub fn new(location: Point, body: impl Into<String>, expiry: Expiry) -> Self {
        Self {
            location,
            body: body.into(),
            expiry,
        }
    }
}

/// A persisted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: u64,
    /// Unix seconds
    pub created_at: i64,
    pub location: Point,
    pub body: String,
    /// TTL as submitted, `-1` for no expiry
    pub ttl_seconds: i64,
}

impl Record {
    fn encode(&self) -> Result<Vec<(String, String)>> {
        if !self.location.is_finite() {
            return Err(MurmurError::Encoding(format!(
                "Record {} has a non-finite coordinate ({}, {})",
                self.id,
                self.location.lon(),
                self.location.lat()
            )));
        }

        Ok(vec![
            (FIELD_ID.into(), self.id.to_string()),
            (FIELD_CREATED.into(), self.created_at.to_string()),
            (FIELD_LONGITUDE.into(), self.location.lon().to_string()),
            (FIELD_LATITUDE.into(), self.location.lat().to_string()),
            (FIELD_BODY.into(), self.body.clone()),
            (FIELD_TTL.into(), self.ttl_seconds.to_string()),
        ])
    }

    fn decode(id: u64, mut fields: HashMap<String, String>) -> Result<Self> {
        fn parse<T: std::str::FromStr>(
            id: u64,
            fields: &HashMap<String, String>,
            name: &str,
        ) -> Result<T> {
            let raw = fields.get(name).ok_or_else(|| {
                MurmurError::Encoding(format!("Record {id} is missing field '{name}'"))
            })?;
            raw.parse().map_err(|_| {
                MurmurError::Encoding(format!("Record {id} has a malformed '{name}': {raw:?}"))
            })
        }

        let stored_id: u64 = parse(id, &fields, FIELD_ID)?;
        if stored_id != id {
            return Err(MurmurError::Encoding(format!(
                "Record {id} holds the fields of record {stored_id}"
            )));
        }

        let longitude: f64 = parse(id, &fields, FIELD_LONGITUDE)?;
        let latitude: f64 = parse(id, &fields, FIELD_LATITUDE)?;
        let location = Point::new(longitude, latitude);
        if !location.is_finite() {
            return Err(MurmurError::Encoding(format!(
                "Record {id} has a non-finite coordinate"
            )));
        }

        Ok(Self {
            id,
            created_at: parse(id, &fields, FIELD_CREATED)?,
            location,
            ttl_seconds: parse(id, &fields, FIELD_TTL)?,
            body: fields.remove(FIELD_BODY).ok_or_else(|| {
                MurmurError::Encoding(format!("Record {id} is missing field '{FIELD_BODY}'"))
            })?,
        })
    }
}

/// A record together with its remaining lifetime at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub record: Record,
    /// `None` when the record never expires
    pub remaining: Option<Duration>,
}

/// Identity allocation and TTL-governed persistence of records.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn StorageBackend>,
    config: Arc<Config>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn StorageBackend>, config: Arc<Config>) -> Self {
        Self { backend, config }
    }

    /// Allocate an id and persist the record with its expiry.
    ///
    /// A failure after the id was allocated leaves that id unused; ids are
    /// never handed out twice either way.
    pub async fn create_record(&self, new: &NewRecord) -> Result<u64> {
        if !new.location.is_finite() {
            return Err(MurmurError::Encoding(
                "Cannot encode a non-finite coordinate".into(),
            ));
        }

        let timeout = self.config.op_timeout();
        let id = with_timeout(timeout, self.backend.incr(&self.config.counter_key)).await?;

        let record = Record {
            id,
            created_at: unix_now(),
            location: new.location,
            body: new.body.clone(),
            ttl_seconds: new.expiry.as_ttl_seconds(),
        };
        let fields = record.encode()?;

        let key = self.config.record_key(id);
        with_timeout(timeout, self.backend.hash_set(&key, &fields, new.expiry)).await?;

        log::debug!("Created record {} expiring {:?}", id, new.expiry);
        Ok(id)
    }

    pub async fn liveness(&self, id: u64) -> Result<Liveness> {
        let key = self.config.record_key(id);
        with_timeout(self.config.op_timeout(), self.backend.liveness(&key)).await
    }

    /// Whether the record's payload still exists.
    pub async fn is_alive(&self, id: u64) -> Result<bool> {
        Ok(self.liveness(id).await?.is_alive())
    }

    /// Load a record and its remaining lifetime.
    ///
    /// Returns `NotFound` when the payload expired or never existed.
    pub async fn fetch(&self, id: u64) -> Result<StoredRecord> {
        let key = self.config.record_key(id);
        let timeout = self.config.op_timeout();

        let fields = with_timeout(timeout, self.backend.hash_get_all(&key)).await?;
        if fields.is_empty() {
            return Err(MurmurError::NotFound(id));
        }

        let remaining = match with_timeout(timeout, self.backend.liveness(&key)).await? {
            // Expired between the two round trips.
            Liveness::Absent => return Err(MurmurError::NotFound(id)),
            liveness => liveness.remaining(),
        };

        Ok(StoredRecord {
            record: Record::decode(id, fields)?,
            remaining,
        })
    }

    /// Highest id handed out so far.
    pub async fn last_id(&self) -> Result<u64> {
        with_timeout(
            self.config.op_timeout(),
            self.backend.counter(&self.config.counter_key),
        )
        .await
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
