//! Error types for murmur.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MurmurError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MurmurError {
    /// Malformed or missing request fields. Never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backing store could not be reached or did not answer in time.
    /// Safe to retry the whole request.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The backing store refused a well-formed command. Retrying the same
    /// request fails the same way.
    #[error("Store rejected the command: {0}")]
    StoreRejected(String),

    /// A record could not be serialized or deserialized.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The record's payload is gone. Only `RecordStore::fetch` raises this.
    #[error("Record {0} not found")]
    NotFound(u64),
}

impl MurmurError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Whether the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for MurmurError {
    fn from(err: redis::RedisError) -> Self {
        use redis::ErrorKind;

        match err.kind() {
            ErrorKind::TypeError => Self::Encoding(err.to_string()),
            // Error replies such as `ERR invalid longitude,latitude pair`,
            // `WRONGTYPE`, or a `MULTI` aborted at queue time.
            ErrorKind::ResponseError | ErrorKind::ExtensionError | ErrorKind::ExecAbortError => {
                Self::StoreRejected(err.to_string())
            }
            _ => Self::StoreUnavailable(err.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for MurmurError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::StoreUnavailable("backing store round trip timed out".into())
    }
}
