//! Builder for wiring a [`Murmur`] to its backing store.

use crate::config::Config;
use crate::db::Murmur;
use crate::error::Result;
use crate::storage::{MemoryBackend, StorageBackend};
use std::sync::Arc;

/// Builder for choosing a backing store and configuration.
pub struct MurmurBuilder {
    backend: Option<Arc<dyn StorageBackend>>,
    config: Config,
}

impl MurmurBuilder {
    /// Create a new builder with default in-memory configuration.
    pub fn new() -> Self {
        Self {
            backend: None,
            config: Config::default(),
        }
    }

    /// Keep everything in process memory.
    pub fn in_memory(mut self) -> Self {
        self.backend = Some(Arc::new(MemoryBackend::new()));
        self
    }

    /// Use an existing backing store, shared with whoever else holds it.
    pub fn backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Build with the chosen backend, in-memory when none was set.
    pub fn build(self) -> Result<Murmur> {
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(MemoryBackend::new()));
        Murmur::with_backend(backend, self.config)
    }

    /// Connect to Redis at `config.redis.url` and build on top of it.
    #[cfg(feature = "redis")]
    pub async fn build_redis(self) -> Result<Murmur> {
        let backend = crate::storage::RedisBackend::connect(&self.config.redis).await?;
        Murmur::with_backend(Arc::new(backend), self.config)
    }
}

impl Default for MurmurBuilder {
    fn default() -> Self {
        Self::new()
    }
}
