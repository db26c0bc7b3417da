use serde::{Deserialize, Serialize};

/// Service statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Entries currently held by the spatial index, stale ones included
    pub indexed_entries: usize,
    /// Records accepted since the service started
    pub submitted_count: u64,
    /// Radius queries answered since the service started
    pub query_count: u64,
    /// Stale index entries removed by queries since the service started
    pub evicted_count: u64,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submit(&mut self) {
        self.submitted_count += 1;
    }

    pub fn record_query(&mut self, evicted: u64) {
        self.query_count += 1;
        self.evicted_count += evicted;
    }
}
