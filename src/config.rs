//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from
//! environment variables. Every field has a documented default; partial
//! overrides go through [`CacheConfigBuilder`].

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

// == Eviction Policy ==
/// Which entry the local cache drops when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Earliest-inserted key goes first; reads do not reorder.
    #[default]
    Fifo,
    /// Least recently read or written key goes first.
    Lru,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(EvictionPolicy::Fifo),
            "lru" => Ok(EvictionPolicy::Lru),
            other => Err(format!("unknown eviction policy '{}'", other)),
        }
    }
}

/// Distributed (Redis) tier settings.
#[derive(Debug, Clone)]
pub struct DistributedConfig {
    /// Whether the distributed tier is used at all
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// Logical database index
    pub db: i64,
    /// Prepended to every key written to the store
    pub key_prefix: String,
    /// Reconnect attempts before a command is reported as failed
    pub max_retries: usize,
    /// When false, commands fail fast while the store is known to be down
    pub offline_queue: bool,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl DistributedConfig {
    /// Connection parameters for the redis client. The password is passed
    /// as-is, so it may contain characters that are reserved in a URL.
    pub fn connection_info(&self) -> redis::ConnectionInfo {
        redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: redis::RedisConnectionInfo {
                db: self.db,
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db: 0,
            key_prefix: "cache:".to_string(),
            max_retries: 3,
            offline_queue: true,
            connect_timeout: Duration::from_millis(5000),
            command_timeout: Duration::from_millis(2000),
        }
    }
}

/// In-process tier settings.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub enabled: bool,
    /// Maximum number of entries held at once
    pub max_size: usize,
    /// TTL in seconds used when a local write carries none
    pub default_ttl: u64,
    pub eviction: EvictionPolicy,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 1000,
            default_ttl: 300,
            eviction: EvictionPolicy::Fifo,
        }
    }
}

/// Payload compression settings.
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    pub enabled: bool,
    /// Serialized payloads at or above this many bytes are compressed
    pub threshold: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 1024,
        }
    }
}

// == Cache Config ==
/// Complete configuration of the cache manager.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub distributed: DistributedConfig,
    pub local: LocalConfig,
    pub compression: CompressionConfig,
    /// TTL in seconds for manager writes that carry none
    pub default_ttl: u64,
    /// Serialize concurrent `get_or_set` loads of the same key
    pub coalesce_loads: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            distributed: DistributedConfig::default(),
            local: LocalConfig::default(),
            compression: CompressionConfig::default(),
            default_ttl: 3600,
            coalesce_loads: false,
        }
    }
}

impl CacheConfig {
    /// Starts a builder seeded with the defaults.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Creates a CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_ENABLED`, `REDIS_HOST`, `REDIS_PORT`, `REDIS_PASSWORD`, `REDIS_DB`
    /// - `REDIS_KEY_PREFIX`, `REDIS_MAX_RETRIES`, `REDIS_OFFLINE_QUEUE`
    /// - `REDIS_CONNECT_TIMEOUT_MS`, `REDIS_COMMAND_TIMEOUT_MS`
    /// - `MEMORY_CACHE_ENABLED`, `MEMORY_CACHE_MAX_SIZE`, `MEMORY_CACHE_TTL`,
    ///   `MEMORY_CACHE_EVICTION` (`fifo` or `lru`)
    /// - `CACHE_DEFAULT_TTL`, `CACHE_COMPRESSION`, `CACHE_COMPRESSION_THRESHOLD`,
    ///   `CACHE_COALESCE_LOADS`
    ///
    /// Missing or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let dist = defaults.distributed;
        let local = defaults.local;
        let compression = defaults.compression;

        Self {
            distributed: DistributedConfig {
                enabled: env_flag("REDIS_ENABLED", dist.enabled),
                host: env_or("REDIS_HOST", dist.host),
                port: env_or("REDIS_PORT", dist.port),
                password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
                db: env_or("REDIS_DB", dist.db),
                key_prefix: env_or("REDIS_KEY_PREFIX", dist.key_prefix),
                max_retries: env_or("REDIS_MAX_RETRIES", dist.max_retries),
                offline_queue: env_flag("REDIS_OFFLINE_QUEUE", dist.offline_queue),
                connect_timeout: env_millis("REDIS_CONNECT_TIMEOUT_MS", dist.connect_timeout),
                command_timeout: env_millis("REDIS_COMMAND_TIMEOUT_MS", dist.command_timeout),
            },
            local: LocalConfig {
                enabled: env_flag("MEMORY_CACHE_ENABLED", local.enabled),
                max_size: env_or("MEMORY_CACHE_MAX_SIZE", local.max_size),
                default_ttl: env_or("MEMORY_CACHE_TTL", local.default_ttl),
                eviction: env_or("MEMORY_CACHE_EVICTION", local.eviction),
            },
            compression: CompressionConfig {
                enabled: env_flag("CACHE_COMPRESSION", compression.enabled),
                threshold: env_or("CACHE_COMPRESSION_THRESHOLD", compression.threshold),
            },
            default_ttl: env_or("CACHE_DEFAULT_TTL", defaults.default_ttl),
            coalesce_loads: env_flag("CACHE_COALESCE_LOADS", defaults.coalesce_loads),
        }
    }
}

// == Builder ==
/// Assembles a [`CacheConfig`] from the defaults plus explicit overrides.
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn distributed(mut self, distributed: DistributedConfig) -> Self {
        self.config.distributed = distributed;
        self
    }

    pub fn distributed_enabled(mut self, enabled: bool) -> Self {
        self.config.distributed.enabled = enabled;
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.distributed.key_prefix = prefix.into();
        self
    }

    pub fn offline_queue(mut self, enabled: bool) -> Self {
        self.config.distributed.offline_queue = enabled;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.distributed.command_timeout = timeout;
        self
    }

    pub fn local_enabled(mut self, enabled: bool) -> Self {
        self.config.local.enabled = enabled;
        self
    }

    pub fn local_max_size(mut self, max_size: usize) -> Self {
        self.config.local.max_size = max_size;
        self
    }

    pub fn local_default_ttl(mut self, ttl: u64) -> Self {
        self.config.local.default_ttl = ttl;
        self
    }

    pub fn eviction(mut self, policy: EvictionPolicy) -> Self {
        self.config.local.eviction = policy;
        self
    }

    pub fn default_ttl(mut self, ttl: u64) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    pub fn compression(mut self, enabled: bool, threshold: usize) -> Self {
        self.config.compression = CompressionConfig { enabled, threshold };
        self
    }

    pub fn coalesce_loads(mut self, enabled: bool) -> Self {
        self.config.coalesce_loads = enabled;
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Seconds between background health checks
    pub health_check_interval: u64,
    /// Cache manager settings
    pub cache: CacheConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `HEALTH_CHECK_INTERVAL` - Check frequency in seconds (default: 30)
    /// - plus everything read by [`CacheConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            server_port: env_or("SERVER_PORT", 3000),
            health_check_interval: env_or("HEALTH_CHECK_INTERVAL", 30),
            cache: CacheConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            health_check_interval: 30,
            cache: CacheConfig::default(),
        }
    }
}

// == Env Helpers ==
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn env_millis(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
