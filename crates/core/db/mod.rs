//! Service facade for murmur.
//!
//! [`Murmur`] validates requests at the boundary, then runs the write path
//! (create record, insert index entry) or the read path (reconcile the index
//! against the record store). Handles are cheap to clone and share one
//! backing store.

use crate::config::Config;
use crate::error::Result;
use crate::storage::{Expiry, MemoryBackend, StorageBackend};
use murmur_types::opinion::{NearQuery, NewOpinion, Opinion};
use murmur_types::stats::ServiceStats;
use parking_lot::Mutex;
use std::sync::Arc;

mod index;
mod records;

pub use index::{Candidate, NearbyRecord, ReconcileReport, SpatialIndex};
pub use records::{NewRecord, Record, RecordStore, StoredRecord};

use crate::compute::validation::{validate_near_query, validate_new_opinion};

/// Location-tagged opinions with expiring payloads.
///
/// Thread-safe; clones share the same store, index and counters.
#[derive(Clone)]
pub struct Murmur {
    records: RecordStore,
    index: Arc<SpatialIndex>,
    config: Arc<Config>,
    stats: Arc<Mutex<ServiceStats>>,
}

impl Murmur {
    pub fn builder() -> crate::builder::MurmurBuilder {
        crate::builder::MurmurBuilder::new()
    }

    /// In-memory instance with default configuration.
    pub fn memory() -> Result<Self> {
        Self::with_backend(Arc::new(MemoryBackend::new()), Config::default())
    }

    /// Use an already constructed backing store.
    pub fn with_backend(backend: Arc<dyn StorageBackend>, config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| crate::error::MurmurError::InvalidInput(format!("Invalid config: {e}")))?;

        let config = Arc::new(config);
        Ok(Self {
            records: RecordStore::new(backend.clone(), config.clone()),
            index: Arc::new(SpatialIndex::new(backend, config.clone())),
            config,
            stats: Arc::new(Mutex::new(ServiceStats::new())),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Store a new opinion and return its id.
    ///
    /// Nothing touches the backing store when validation fails. The payload
    /// is persisted before its index entry, so the index never names an id
    /// that was not created.
    pub async fn submit(&self, opinion: NewOpinion) -> Result<u64> {
        validate_new_opinion(&opinion, &self.config)?;

        let new = NewRecord::new(
            opinion.location(),
            opinion.body,
            Expiry::from_ttl_seconds(opinion.ttl),
        );
        let id = self.records.create_record(&new).await?;
        self.index
            .index_insert(id, new.location.lon(), new.location.lat())
            .await?;

        self.stats.lock().record_submit();
        Ok(id)
    }

    /// Live opinions within the query radius, nearest first.
    pub async fn near(&self, query: NearQuery) -> Result<Vec<Opinion>> {
        let radius_km = validate_near_query(&query)?;

        let (found, report) = self
            .index
            .reconcile_with_report(query.longitude, query.latitude, radius_km)
            .await?;

        self.stats.lock().record_query(report.evicted as u64);

        Ok(found.into_iter().map(to_opinion).collect())
    }

    pub async fn stats(&self) -> Result<ServiceStats> {
        let indexed_entries = self.index.len().await?;
        let mut stats = self.stats.lock().clone();
        stats.indexed_entries = indexed_entries;
        Ok(stats)
    }
}

fn to_opinion(nearby: NearbyRecord) -> Opinion {
    let NearbyRecord {
        record,
        distance_km,
        remaining,
    } = nearby;

    Opinion {
        created: record.created_at,
        longitude: record.location.lon(),
        latitude: record.location.lat(),
        body: record.body,
        dist: distance_km,
        ttl: remaining.map(|d| d.as_secs()),
    }
}
