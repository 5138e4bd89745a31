//! Service configuration loading and management.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, environment
//! variables, command-line flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which of the two HTTP services a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Issuance,
    Verification,
}

impl ServiceKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Issuance => "issuance",
            Self::Verification => "verification",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Issuance => 4001,
            Self::Verification => 4002,
        }
    }
}

/// Full configuration for a Kubecred service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Credential store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Worker identity settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Cross-origin settings.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// Listen port. Unset means the service's default port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Rocksdb,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rocksdb" => Ok(Self::Rocksdb),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown store backend '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage engine.
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// Parent directory of the database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Database name; the database lives in `<data_dir>/<db_name>`.
    #[serde(default = "default_db_name")]
    pub db_name: String,
    /// How long an insert waits on a concurrent writer of the same id.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkerConfig {
    /// Fixed worker identity. Unset means a random label per operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    /// Allowed origins. Empty or `"*"` allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_api_addr() -> String {
    "0.0.0.0".into()
}
fn default_backend() -> StoreBackend {
    StoreBackend::Rocksdb
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_db_name() -> String {
    "kube_credential".into()
}
fn default_lock_timeout_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            db_name: default_db_name(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl StoreConfig {
    /// Directory of the primary database.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_name)
    }

    /// Directory for a read-only secondary instance owned by `kind`.
    pub fn secondary_path(&self, kind: ServiceKind) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}-secondary", self.db_name, kind.name()))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl ServiceConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ServiceConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    ///
    /// Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            self.api.port = Some(
                port.trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("invalid PORT '{}': {}", port, e))?,
            );
        }
        if let Some(id) = get("WORKER_ID") {
            self.worker.id = Some(id);
        }
        if let Some(dir) = get("DATA_DIR") {
            self.store.data_dir = PathBuf::from(dir);
        }
        if let Some(name) = get("DB_NAME") {
            self.store.db_name = name;
        }
        if let Some(backend) = get("STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }
        if let Some(origins) = get("CORS_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(format) = get("LOG_FORMAT") {
            self.logging.format = format;
        }
        Ok(())
    }

    /// Port to listen on for `kind`.
    pub fn port(&self, kind: ServiceKind) -> u16 {
        self.api.port.unwrap_or_else(|| kind.default_port())
    }

    /// Full listen address for `kind`.
    pub fn listen_addr(&self, kind: ServiceKind) -> String {
        format!("{}:{}", self.api.listen_addr, self.port(kind))
    }
}
