//! Protocol definitions for murmur RPC
//!
//! This module contains the service trait and types used for RPC communication.

use murmur::MurmurError;
use murmur_types::opinion::{NearQuery, NewOpinion, Opinion};
use murmur_types::stats::ServiceStats;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned to RPC callers.
///
/// Keeps the distinction clients act on: fix the request, retry later, or
/// give up.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<MurmurError> for RemoteError {
    fn from(err: MurmurError) -> Self {
        match err {
            MurmurError::InvalidInput(msg) => Self::InvalidInput(msg),
            MurmurError::StoreUnavailable(msg) => Self::Unavailable(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[tarpc::service]
pub trait MurmurService {
    /// Store an opinion, returning its id.
    async fn submit(opinion: NewOpinion) -> Result<u64, RemoteError>;

    /// Live opinions near a point, nearest first.
    async fn near(query: NearQuery) -> Result<Vec<Opinion>, RemoteError>;

    async fn stats() -> Result<ServiceStats, RemoteError>;
}
