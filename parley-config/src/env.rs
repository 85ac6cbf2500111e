// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Environment variable loader
///
/// With a prefix, only `<PREFIX>_*` variables are picked up and the prefix is
/// stripped: `PARLEY_API_SECRET_KEY` becomes `api_secret_key`. Values are
/// kept as strings; typed configuration parses them.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load matching variables from the process environment
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.load_from(env::vars()))
    }

    /// Load matching variables from an explicit list
    pub fn load_from<I, K, V>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            if let Some(trimmed) = self.strip(key.as_ref()) {
                config.insert(trimmed.to_lowercase(), value.into());
            }
        }

        config
    }

    fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty()),
            None => Some(key),
        }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_stripped_and_lowercased() {
        let loader = EnvLoader::new(Some("PARLEY".to_string()));
        let vars = loader.load_from([
            ("PARLEY_API_SECRET_KEY", "s3cret"),
            ("PARLEY_PORT", "8080"),
            ("PARLEYX_OTHER", "ignored"),
            ("PARLEY_", "ignored"),
            ("HOME", "/root"),
        ]);

        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("api_secret_key").map(String::as_str), Some("s3cret"));
        assert_eq!(vars.get("port").map(String::as_str), Some("8080"));
    }

    #[test]
    fn test_without_prefix_keeps_everything() {
        let loader = EnvLoader::default();
        let vars = loader.load_from([("HOME", "/root")]);
        assert_eq!(vars.get("home").map(String::as_str), Some("/root"));
    }

    #[test]
    fn test_env_loader_with_default() {
        let loader = EnvLoader::new(None);
        let value = loader.load_var_or("NONEXISTENT_VAR_12345", "default");

        assert_eq!(value, "default");
    }

    #[test]
    fn test_env_loader_missing_var() {
        let loader = EnvLoader::new(Some("PARLEY_TEST".to_string()));
        assert!(loader.load_var("MISSING_VAR_67890").is_err());
    }
}
