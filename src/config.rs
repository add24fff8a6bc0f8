use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("STORE_BACKEND must be 'mongo' or 'memory', got '{0}'")]
    UnknownBackend(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub store_backend: StoreBackend,
    pub bind_addr: String,
    /// `None` allows any origin.
    pub frontend_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_backend = match lookup("STORE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StoreBackend::Mongo,
        };

        Ok(Self {
            mongo_uri: lookup("MONGO_URI")
                .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            database_name: lookup("DATABASE_NAME").unwrap_or_else(|| "day_planner".to_string()),
            store_backend,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            frontend_origin: lookup("FRONTEND_ORIGIN").filter(|o| !o.trim().is_empty() && o != "*"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Mongo);
        assert_eq!(config.database_name, "day_planner");
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.frontend_origin, None);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("STORE_BACKEND", "Memory"),
            ("FRONTEND_ORIGIN", "http://localhost:3000"),
            ("DATABASE_NAME", "plans"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.frontend_origin.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.database_name, "plans");
    }

    #[test]
    fn wildcard_origin_means_any() {
        assert_eq!(load(&[("FRONTEND_ORIGIN", "*")]).unwrap().frontend_origin, None);
    }

    #[test]
    fn rejects_unknown_backend() {
        assert_eq!(
            load(&[("STORE_BACKEND", "redis")]).unwrap_err(),
            ConfigError::UnknownBackend("redis".to_string())
        );
    }
}
