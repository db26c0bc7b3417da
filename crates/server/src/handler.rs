//! Handler implementation for the murmur RPC service

use crate::protocol::{MurmurService, RemoteError};
use murmur::Murmur;
use murmur_types::opinion::{NearQuery, NewOpinion, Opinion};
use murmur_types::stats::ServiceStats;
use tarpc::context;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Handler {
    db: Murmur,
}

impl Handler {
    pub fn new(db: Murmur) -> Self {
        Self { db }
    }
}

fn report(operation: &str, err: murmur::MurmurError) -> RemoteError {
    if err.is_client_error() {
        debug!("Rejected {}: {}", operation, err);
    } else {
        warn!("{} failed: {}", operation, err);
    }
    err.into()
}

impl MurmurService for Handler {
    async fn submit(self, _: context::Context, opinion: NewOpinion) -> Result<u64, RemoteError> {
        let id = self
            .db
            .submit(opinion)
            .await
            .map_err(|e| report("submit", e))?;
        debug!("Stored opinion {}", id);
        Ok(id)
    }

    async fn near(
        self,
        _: context::Context,
        query: NearQuery,
    ) -> Result<Vec<Opinion>, RemoteError> {
        self.db.near(query).await.map_err(|e| report("near", e))
    }

    async fn stats(self, _: context::Context) -> Result<ServiceStats, RemoteError> {
        self.db.stats().await.map_err(|e| report("stats", e))
    }
}
