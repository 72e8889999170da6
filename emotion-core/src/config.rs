use std::env;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, Map};
use serde::Deserialize;

/// Origins observed in the deployed frontends; overridable via config or env.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = [
    "https://happybirthdayananya.site",
    "https://dainty-eclair-08ae9c.netlify.app",
];

/// Cap on a single backoff sleep between storage attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmotionConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            request_timeout_seconds: 15,
            max_body_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
    /// Exit the process when the initial connection fails. When false the
    /// server starts anyway and storage calls fail until the database is up.
    pub exit_on_connect_failure: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            connect_timeout_seconds: 2,
            exit_on_connect_failure: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub operation_timeout_ms: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Postgres,
            operation_timeout_ms: 2000,
            max_retries: 2,
            retry_delay_ms: 100,
        }
    }
}

impl StorageConfig {
    /// Longest a storage call can take: every attempt running into its
    /// timeout plus the largest possible sleep before each retry.
    pub fn worst_case_duration(&self) -> Duration {
        let attempts = self.max_retries as u32 + 1;
        Duration::from_millis(self.operation_timeout_ms) * attempts
            + MAX_RETRY_DELAY * self.max_retries as u32
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            max_age_seconds: 60 * 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ValidationConfig {
    /// Accept `{"emotions": []}`. Off by default.
    pub allow_empty: bool,
    pub min_confidence: Option<f64>,
    pub max_confidence: Option<f64>,
    pub max_entries: Option<usize>,
}

impl EmotionConfig {
    /// Load from an optional TOML file, then `EMOTION__SECTION__KEY` variables,
    /// then the dedicated variables (`PORT`, `DATABASE_URL`, `CORS_ALLOWED_ORIGINS`).
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::load_with_env(path, env::vars().collect())
    }

    /// Same as [`EmotionConfig::load`] but reads variables from `vars`
    /// instead of the process environment.
    pub fn load_with_env(path: &str, vars: Map<String, String>) -> Result<Self, ConfigError> {
        let var = |key: &str| vars.get(key).cloned();

        let database_url = var("DATABASE_URL").or_else(|| var("MONGO_URI"));
        let allowed_origins = var("CORS_ALLOWED_ORIGINS").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });
        let port = var("PORT");

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("EMOTION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .source(Some(vars.clone())),
            )
            .set_override_option("server.port", port)?
            .set_override_option("database.url", database_url)?
            .set_override_option("cors.allowed_origins", allowed_origins)?;

        Self::finish(builder)
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::finish(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.trim().is_empty() {
            return Err(ConfigError::Message(
                "DATABASE_URL is not set (required for the postgres storage backend)".to_string(),
            ));
        }

        if let (Some(min), Some(max)) = (
            self.validation.min_confidence,
            self.validation.max_confidence,
        ) {
            if min > max {
                return Err(ConfigError::Message(format!(
                    "validation.min_confidence ({min}) exceeds validation.max_confidence ({max})"
                )));
            }
        }

        // Storage must give up before the request timeout does, otherwise the
        // client sees a bare 408 instead of the storage error.
        let storage_budget = self.storage.worst_case_duration();
        let request_timeout = Duration::from_secs(self.server.request_timeout_seconds);
        if storage_budget >= request_timeout {
            return Err(ConfigError::Message(format!(
                "storage retries can take {storage_budget:?}, which is not below \
                 server.request_timeout_seconds ({request_timeout:?}); lower \
                 storage.operation_timeout_ms or storage.max_retries"
            )));
        }

        Ok(())
    }
}
