//! Typed application configuration

use crate::{ConfigError, ConfigManager, ConfigValidator, Result, Validate};
use parley_core::logging::{LogConfig, LogFormat, LogLevel};
use parley_core::{DEFAULT_MAX_BODY_BYTES, ServerConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Prefix for environment variables (`PARLEY_PORT`, ...)
pub const ENV_PREFIX: &str = "PARLEY";

/// Default bound for the in-memory queue and history store
pub const DEFAULT_MEMORY_CAP: usize = 10_000;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(ConfigError::ValidationError(format!(
                "environment must be development, production or test (got {})",
                other
            ))),
        }
    }
}

/// Everything the service reads at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(deserialize_with = "de::parsed")]
    pub environment: Environment,

    /// Shared key for the internal emit endpoint
    #[serde(deserialize_with = "de::opt_string")]
    pub api_secret_key: Option<String>,

    /// Only origin accepted by the internal emit endpoint in production
    #[serde(deserialize_with = "de::opt_string")]
    pub app_url: Option<String>,

    /// HMAC secret for inbound webhook signatures
    #[serde(deserialize_with = "de::opt_string")]
    pub webhook_secret: Option<String>,

    /// Priorities at or above this are processed immediately
    #[serde(deserialize_with = "de::parsed")]
    pub priority_threshold: u8,

    pub host: String,

    #[serde(deserialize_with = "de::parsed")]
    pub port: u16,

    #[serde(deserialize_with = "de::parsed")]
    pub max_body_bytes: usize,

    /// Redis URL; the in-memory queue is used when unset
    #[serde(deserialize_with = "de::opt_string")]
    pub queue_url: Option<String>,

    pub queue_name: String,

    /// Pending-job cap for the in-memory queue (0 = unlimited)
    #[serde(deserialize_with = "de::parsed")]
    pub queue_max_size: usize,

    /// JSON-lines history file; history stays in memory when unset
    #[serde(deserialize_with = "de::opt_string")]
    pub history_path: Option<String>,

    /// Records kept by the in-memory history store (0 = unlimited)
    #[serde(deserialize_with = "de::parsed")]
    pub history_max_records: usize,

    pub log_level: String,

    pub log_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            api_secret_key: None,
            app_url: None,
            webhook_secret: None,
            priority_threshold: 7,
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            queue_url: None,
            queue_name: "conversation_events".to_string(),
            queue_max_size: DEFAULT_MEMORY_CAP,
            history_path: None,
            history_max_records: DEFAULT_MEMORY_CAP,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::new()
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.host.clone(), self.port).with_max_body_bytes(self.max_body_bytes)
    }

    pub fn log_config(&self) -> Result<LogConfig> {
        let level: LogLevel = self
            .log_level
            .parse()
            .map_err(|e: parley_core::Error| ConfigError::ValidationError(e.to_string()))?;
        let format: LogFormat = self
            .log_format
            .parse()
            .map_err(|e: parley_core::Error| ConfigError::ValidationError(e.to_string()))?;

        Ok(LogConfig::new()
            .level(level)
            .format(format)
            .with_colors(format != LogFormat::Json))
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::in_range(self.priority_threshold, 1, 9, "priority_threshold")?;
        ConfigValidator::not_empty(&self.host, "host")?;
        ConfigValidator::is_port(self.port, "port")?;
        ConfigValidator::in_range(self.max_body_bytes, 1, usize::MAX, "max_body_bytes")?;
        ConfigValidator::not_empty(&self.queue_name, "queue_name")?;
        if let Some(url) = &self.app_url {
            ConfigValidator::is_url(url, "app_url")?;
        }
        self.log_config()?;
        Ok(())
    }
}

/// Layered loader for [`AppConfig`].
///
/// Precedence, lowest first: built-in defaults, the config file, `.env` and
/// the process environment (or an explicit variable list), then overrides.
pub struct AppConfigBuilder {
    file: Option<PathBuf>,
    dotenv: bool,
    vars: Option<Vec<(String, String)>>,
    overrides: ConfigManager,
}

impl AppConfigBuilder {
    pub fn new() -> Self {
        Self {
            file: None,
            dotenv: true,
            vars: None,
            overrides: ConfigManager::new(),
        }
    }

    /// Read a TOML, JSON or env file; the format follows the extension
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Whether to load `.env` from the working directory (default: true)
    pub fn dotenv(mut self, enabled: bool) -> Self {
        self.dotenv = enabled;
        self
    }

    /// Use these variables instead of the process environment
    pub fn vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Highest-precedence value, such as a command-line flag
    pub fn set<T: Serialize>(self, key: &str, value: T) -> Result<Self> {
        self.overrides.set(key, value)?;
        Ok(self)
    }

    pub fn load(self) -> Result<AppConfig> {
        let manager = ConfigManager::with_prefix(ENV_PREFIX);

        if let Some(path) = &self.file {
            manager.load_file_auto(path)?;
        }

        match self.vars {
            Some(vars) => manager.load_vars(vars),
            None if self.dotenv => manager.load_dotenv(None)?,
            None => manager.load_env()?,
        }

        manager.merge(&self.overrides);
        manager.load_validated()
    }
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Field deserializers that accept the string forms environment variables
/// arrive in.
mod de {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Typed(T),
        Text(String),
    }

    pub fn parsed<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        match Raw::<T>::deserialize(deserializer)? {
            Raw::Typed(value) => Ok(value),
            Raw::Text(text) => text.trim().parse().map_err(D::Error::custom),
        }
    }

    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(D::Error::custom(format!(
                "expected a string, found {}",
                other
            ))),
        }
    }
}
