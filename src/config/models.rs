//! Configuration data structures for bookshelf.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and
//! include defaults so that a minimal config only needs the shared credential.
use serde::{Deserialize, Serialize};

use crate::metrics::DEFAULT_DURATION_BUCKETS;

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_realm() -> String {
    "Authorization Required".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// The single shared credential every request must present.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    /// Realm advertised in the `WWW-Authenticate` challenge
    #[serde(default = "default_realm")]
    pub realm: String,
}

/// Storage engine behind the catalog
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Concurrent in-process map; contents are lost on restart
    #[default]
    Memory,
    /// SQLite database file, created on first use
    Sqlite {
        path: String,
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Upper bounds (seconds) of the request duration histogram buckets
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            duration_buckets: DEFAULT_DURATION_BUCKETS.to_vec(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Minimal configuration with the given credential and defaults elsewhere.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            listen_addr: default_listen_addr(),
            auth: AuthConfig {
                username: username.into(),
                password: password.into(),
                realm: default_realm(),
            },
            storage: StorageConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Default configuration written by `bookshelf init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# bookshelf configuration

# The address to listen on
listen_addr = "127.0.0.1:8080"

# Shared credential required on every request (HTTP Basic)
# Override with BOOKSHELF__AUTH__USERNAME / BOOKSHELF__AUTH__PASSWORD
[auth]
username = "admin"
password = "change-me"

# Storage engine: "memory" or "sqlite"
[storage]
type = "sqlite"
path = "books.db"
busy_timeout_ms = 5000

[metrics]
duration_buckets = [1.0, 2.0, 5.0, 10.0, 20.0, 60.0]

[logging]
level = "info"
json = false
"#;
