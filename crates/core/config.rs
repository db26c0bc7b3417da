//! Configuration for murmur
//!
//! Key names default to a Redis-friendly layout:
//! a counter at `opinion_id`, a geo set at `opinions`, and one hash per
//! record at `opinion_<id>`.
use serde::de::Error;
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Key of the atomic id counter
    #[serde(default = "Config::default_counter_key")]
    pub counter_key: String,

    /// Key of the geo set holding one entry per record
    #[serde(default = "Config::default_index_key")]
    pub index_key: String,

    /// Prefix of each record's hash key, followed by its id
    #[serde(default = "Config::default_record_prefix")]
    pub record_prefix: String,

    /// Upper bound for a single backing store round trip, in milliseconds
    #[serde(default = "Config::default_op_timeout_ms")]
    pub op_timeout_ms: u64,

    /// Longest accepted body, in bytes
    #[serde(default = "Config::default_max_body_len")]
    pub max_body_len: usize,

    /// Longest accepted TTL, in seconds
    #[serde(default = "Config::default_max_ttl_secs")]
    pub max_ttl_secs: u64,

    /// Redis connection settings, used with the `redis` feature
    #[serde(default)]
    pub redis: RedisConfig,
}

/// Connection settings for the Redis backend
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisConfig {
    #[serde(default = "RedisConfig::default_url")]
    pub url: String,

    /// Reconnect attempts before a command gives up
    #[serde(default = "RedisConfig::default_retries")]
    pub retries: usize,
}

impl RedisConfig {
    fn default_url() -> String {
        "redis://127.0.0.1:6379".to_string()
    }

    const fn default_retries() -> usize {
        1
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            retries: Self::default_retries(),
        }
    }
}

impl Config {
    fn default_counter_key() -> String {
        "opinion_id".to_string()
    }

    fn default_index_key() -> String {
        "opinions".to_string()
    }

    fn default_record_prefix() -> String {
        "opinion_".to_string()
    }

    const fn default_op_timeout_ms() -> u64 {
        500
    }

    const fn default_max_body_len() -> usize {
        4096
    }

    const fn default_max_ttl_secs() -> u64 {
        365 * 24 * 60 * 60
    }

    pub fn with_counter_key(mut self, key: impl Into<String>) -> Self {
        self.counter_key = key.into();
        self
    }

    pub fn with_index_key(mut self, key: impl Into<String>) -> Self {
        self.index_key = key.into();
        self
    }

    pub fn with_record_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.record_prefix = prefix.into();
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        assert!(!timeout.is_zero(), "Operation timeout must be greater than zero");
        self.op_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_body_len(mut self, len: usize) -> Self {
        assert!(len > 0, "Max body length must be greater than zero");
        self.max_body_len = len;
        self
    }

    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        assert!(!ttl.is_zero(), "Max TTL must be greater than zero");
        self.max_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_redis(mut self, redis: RedisConfig) -> Self {
        self.redis = redis;
        self
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// Hash key of the record with the given id.
    pub fn record_key(&self, id: u64) -> String {
        format!("{}{}", self.record_prefix, id)
    }

    /// Inverse of [`Config::record_key`].
    pub fn parse_record_key(&self, key: &str) -> Option<u64> {
        key.strip_prefix(&self.record_prefix)?.parse().ok()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.counter_key.is_empty() || self.index_key.is_empty() {
            return Err("Counter and index keys must not be empty".to_string());
        }

        if self.record_prefix.is_empty() {
            return Err("Record prefix must not be empty".to_string());
        }

        // Records, the counter and the index share one keyspace.
        if self.parse_record_key(&self.index_key).is_some()
            || self.parse_record_key(&self.counter_key).is_some()
        {
            return Err(format!(
                "Record prefix '{}' collides with the counter or index key",
                self.record_prefix
            ));
        }

        if self.op_timeout_ms == 0 {
            return Err("Operation timeout must be greater than zero".to_string());
        }

        if self.max_body_len == 0 {
            return Err("Max body length must be greater than zero".to_string());
        }

        if self.max_ttl_secs == 0 || self.max_ttl_secs > i64::MAX as u64 {
            return Err(format!(
                "Max TTL must be between 1 and {} seconds",
                i64::MAX
            ));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            counter_key: Self::default_counter_key(),
            index_key: Self::default_index_key(),
            record_prefix: Self::default_record_prefix(),
            op_timeout_ms: Self::default_op_timeout_ms(),
            max_body_len: Self::default_max_body_len(),
            max_ttl_secs: Self::default_max_ttl_secs(),
            redis: RedisConfig::default(),
        }
    }
}
