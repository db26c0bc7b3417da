//! Spatial index over record ids, reconciled against the record store.
//!
//! Index entries never expire on their own. A radius query checks every
//! candidate's liveness in the record store and evicts the entries whose
//! payload is gone, so the index converges one query at a time.

use crate::config::Config;
use crate::db::records::{Record, RecordStore};
use crate::error::{MurmurError, Result};
use crate::storage::{Liveness, StorageBackend, with_timeout};
use murmur_types::geo::Point;
use std::sync::Arc;
use std::time::Duration;

/// An index entry within a query radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: u64,
    pub distance_km: f64,
}

/// A live record found by a radius query.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyRecord {
    pub record: Record,
    pub distance_km: f64,
    /// `None` when the record never expires
    pub remaining: Option<Duration>,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub candidates: usize,
    pub alive: usize,
    pub evicted: usize,
    /// Candidates dropped from the result because a lookup failed
    pub skipped: usize,
}

pub struct SpatialIndex {
    backend: Arc<dyn StorageBackend>,
    config: Arc<Config>,
    records: RecordStore,
}

impl SpatialIndex {
    pub fn new(backend: Arc<dyn StorageBackend>, config: Arc<Config>) -> Self {
        let records = RecordStore::new(backend.clone(), config.clone());
        Self {
            backend,
            config,
            records,
        }
    }

    /// Add a record's position. Inserting the same id twice keeps one entry.
    pub async fn index_insert(&self, id: u64, longitude: f64, latitude: f64) -> Result<()> {
        let member = self.config.record_key(id);
        let added = with_timeout(
            self.config.op_timeout(),
            self.backend.geo_add(
                &self.config.index_key,
                &member,
                Point::new(longitude, latitude),
            ),
        )
        .await?;

        if !added {
            log::debug!("Index entry {} already present", member);
        }
        Ok(())
    }

    /// Snapshot of the entries within `radius_km`, ascending by distance.
    pub async fn query_near(
        &self,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
    ) -> Result<Vec<Candidate>> {
        let hits = with_timeout(
            self.config.op_timeout(),
            self.backend.geo_search(
                &self.config.index_key,
                Point::new(longitude, latitude),
                radius_km,
            ),
        )
        .await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| match self.config.parse_record_key(&hit.member) {
                Some(id) => Some(Candidate {
                    id,
                    distance_km: hit.distance_km,
                }),
                None => {
                    log::warn!(
                        "Ignoring index member '{}' that is not a record key",
                        hit.member
                    );
                    None
                }
            })
            .collect())
    }

    /// Remove an entry. Failures are logged and swallowed.
    ///
    /// Returns `true` when an entry was actually removed.
    pub async fn index_evict(&self, id: u64) -> bool {
        let member = self.config.record_key(id);
        let removed = with_timeout(
            self.config.op_timeout(),
            self.backend.geo_remove(&self.config.index_key, &member),
        )
        .await;

        match removed {
            Ok(removed) => removed,
            Err(e) => {
                log::warn!("Failed to evict index entry {}: {}", member, e);
                false
            }
        }
    }

    /// Live records within `radius_km`, evicting dead entries on the way.
    pub async fn reconcile_and_fetch(
        &self,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
    ) -> Result<Vec<NearbyRecord>> {
        let (records, _) = self
            .reconcile_with_report(longitude, latitude, radius_km)
            .await?;
        Ok(records)
    }

    /// [`SpatialIndex::reconcile_and_fetch`] plus a summary of the pass.
    ///
    /// Candidates are checked one after the other in distance order, so the
    /// result keeps the order of the radius query.
    pub async fn reconcile_with_report(
        &self,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
    ) -> Result<(Vec<NearbyRecord>, ReconcileReport)> {
        let candidates = self.query_near(longitude, latitude, radius_km).await?;

        let mut report = ReconcileReport {
            candidates: candidates.len(),
            ..ReconcileReport::default()
        };
        let mut records = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let liveness = match self.records.liveness(candidate.id).await {
                Ok(liveness) => liveness,
                Err(e) => {
                    log::warn!("Skipping record {}: liveness check failed: {}", candidate.id, e);
                    report.skipped += 1;
                    continue;
                }
            };

            if liveness == Liveness::Absent {
                if self.index_evict(candidate.id).await {
                    report.evicted += 1;
                }
                continue;
            }

            match self.records.fetch(candidate.id).await {
                Ok(stored) => {
                    report.alive += 1;
                    records.push(NearbyRecord {
                        record: stored.record,
                        distance_km: candidate.distance_km,
                        remaining: stored.remaining,
                    });
                }
                Err(MurmurError::NotFound(id)) => {
                    if self.index_evict(id).await {
                        report.evicted += 1;
                    }
                }
                Err(e) => {
                    log::warn!("Skipping record {}: fetch failed: {}", candidate.id, e);
                    report.skipped += 1;
                }
            }
        }

        log::debug!(
            "Reconciled ({}, {}) r={}km: {:?}",
            longitude,
            latitude,
            radius_km,
            report
        );
        Ok((records, report))
    }

    /// Number of entries, stale ones included.
    pub async fn len(&self) -> Result<usize> {
        with_timeout(
            self.config.op_timeout(),
            self.backend.geo_len(&self.config.index_key),
        )
        .await
    }
}
