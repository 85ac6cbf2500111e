// Configuration management for Parley
//
// Values are layered into one map; later loads overwrite earlier ones. The
// application loads, in order: a config file, `.env` plus `PARLEY_*`
// environment variables, then command-line overrides.

pub mod app;
pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use app::{AppConfig, AppConfigBuilder, DEFAULT_MEMORY_CAP, ENV_PREFIX, Environment};
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Main configuration manager
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, serde_json::Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: None,
        }
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from the process environment
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;
        self.insert_strings(env_vars);
        Ok(())
    }

    /// Load configuration from an explicit variable list, filtered by prefix
    pub fn load_vars<I, K, V>(&self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let loader = EnvLoader::new(self.env_prefix.clone());
        self.insert_strings(loader.load_from(vars));
    }

    fn insert_strings(&self, vars: HashMap<String, String>) {
        let mut config = self.config.write();
        for (key, value) in vars {
            config.insert(key, serde_json::Value::String(value));
        }
    }

    /// Load a `.env` file into the process environment, then load the
    /// environment. A missing default `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok();
        }
        self.load_env()
    }

    /// Load configuration from file
    pub fn load_file(&self, path: &Path, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data)
    }

    /// Load a file, picking the format from its extension
    pub fn load_file_auto(&self, path: &Path) -> Result<()> {
        let data = ConfigLoader::auto(path)?.load_file(path)?;
        self.merge_value(data)
    }

    fn merge_value(&self, data: serde_json::Value) -> Result<()> {
        let serde_json::Value::Object(map) = data else {
            return Err(ConfigError::ParseError(
                "configuration root must be a table/object".to_string(),
            ));
        };

        let mut config = self.config.write();
        for (key, value) in map {
            config.insert(key, value);
        }

        Ok(())
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        self.config.write().insert(key.to_string(), json_value);

        Ok(())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let config = self.config.read();

        let value = config
            .get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.config.read().contains_key(key)
    }

    /// Get all configuration keys
    pub fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }

    /// Overlay another manager's values on top of this one
    pub fn merge(&self, other: &ConfigManager) {
        let other_config = other.config.read().clone();
        let mut config = self.config.write();

        for (key, value) in other_config {
            config.insert(key, value);
        }
    }

    /// Load and validate configuration
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let json_value = serde_json::Value::Object(
            self.config
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        let validated: T = serde_json::from_value(json_value)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

        validated.validate()?;

        Ok(validated)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
