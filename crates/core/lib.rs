//! Location-tagged opinions with expiring payloads and a lazily reconciled
//! spatial index.
//!
//! ## Features
//! - **Atomic ids**: every record gets a fresh id from the backing store's counter
//! - **TTL payloads**: a record's fields expire in the backing store on their own
//! - **Lazy eviction**: index entries outlive their records until a radius
//!   query finds them dead and removes them
//! - **Pluggable store**: in-memory by default, Redis with the `redis` feature
//!
//! ## TTL Behavior
//! - `ttl > 0` keeps the record for that many seconds
//! - `ttl` absent or `0` expires it immediately
//! - `ttl < 0` keeps it with no expiry
//!
//! ```rust
//! use murmur::{Murmur, NearQuery, NewOpinion};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build()?.block_on(async {
//! let db = Murmur::memory()?;
//! db.submit(NewOpinion::new(-74.0060, 40.7128, "Great bagels").with_ttl(3600)).await?;
//!
//! let nearby = db.near(NearQuery::new(-74.0, 40.7, 5)).await?;
//! assert_eq!(nearby[0].body, "Great bagels");
//! # Ok::<(), murmur::MurmurError>(())
//! # })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod db;
pub mod error;
pub mod storage;

pub use builder::MurmurBuilder;
pub use db::{Murmur, NearbyRecord, Record, RecordStore, ReconcileReport, SpatialIndex};
pub use error::{MurmurError, Result};

pub use config::{Config, RedisConfig};
pub use murmur_types::geo::Point;
pub use murmur_types::opinion::{NearQuery, NewOpinion, Opinion};
pub use murmur_types::stats::ServiceStats;

pub use compute::validation;

#[cfg(feature = "redis")]
pub use storage::RedisBackend;
pub use storage::{Expiry, Liveness, MemoryBackend, StorageBackend};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use crate::{
        Config, Murmur, MurmurBuilder, MurmurError, NearQuery, NewOpinion, Opinion, Point, Result,
        ServiceStats,
    };
}
