//! # Configuration
//!
//! Settings are layered, lowest to highest:
//!
//! 1. built-in defaults
//! 2. a JSON file (`ecoshelf.json` in the working directory, or an explicit path)
//! 3. `ECOSHELF_*` environment variables
//!
//! The binary applies CLI flags on top and then calls [`AppConfig::validate`].

use crate::error::ConfigError;
use crate::session::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_SESSIONS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Config file picked up when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "ecoshelf.json";

pub const ENV_BATCH_SIZE: &str = "ECOSHELF_BATCH_SIZE";
pub const ENV_ROTATION_INTERVAL: &str = "ECOSHELF_ROTATION_INTERVAL_SECS";
pub const ENV_CATALOG_PATH: &str = "ECOSHELF_CATALOG_PATH";
pub const ENV_SESSION_TTL: &str = "ECOSHELF_SESSION_TTL_SECS";
pub const ENV_MAX_SESSIONS: &str = "ECOSHELF_MAX_SESSIONS";
pub const ENV_HOST: &str = "ECOSHELF_HOST";
pub const ENV_PORT: &str = "ECOSHELF_PORT";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Products per "show" / "load more" batch
    pub batch_size: usize,
    /// Seconds between quote rotations
    pub rotation_interval_secs: f64,
    /// CSV product table
    pub catalog_path: PathBuf,
    /// Idle time before a viewer's pagination state is dropped
    pub session_ttl_secs: u64,
    /// Live viewer cap; the least recently seen viewer is dropped beyond it
    pub max_sessions: usize,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            rotation_interval_secs: 5.0,
            catalog_path: PathBuf::from("amazon_eco-friendly_products.csv"),
            session_ttl_secs: 3600,
            max_sessions: DEFAULT_MAX_SESSIONS,
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Defaults, then the config file, then the environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `lookup(ENV_*)`
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup(ENV_BATCH_SIZE) {
            self.batch_size = parse_env(ENV_BATCH_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_ROTATION_INTERVAL) {
            self.rotation_interval_secs = parse_env(ENV_ROTATION_INTERVAL, &v)?;
        }
        if let Some(v) = lookup(ENV_CATALOG_PATH) {
            self.catalog_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_SESSION_TTL) {
            self.session_ttl_secs = parse_env(ENV_SESSION_TTL, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_SESSIONS) {
            self.max_sessions = parse_env(ENV_MAX_SESSIONS, &v)?;
        }
        if let Some(v) = lookup(ENV_HOST) {
            self.host = v;
        }
        if let Some(v) = lookup(ENV_PORT) {
            self.port = parse_env(ENV_PORT, &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.rotation_interval_secs.is_finite() || self.rotation_interval_secs <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "rotation_interval_secs",
                reason: format!("must be a positive number, got {}", self.rotation_interval_secs),
            });
        }
        if self.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "session_ttl_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::Invalid {
                key: "max_sessions",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs_f64(self.rotation_interval_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        reason: format!("cannot parse {:?}", raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.batch_size, 9);
        assert_eq!(config.rotation_interval(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env_from(env(&[
                (ENV_BATCH_SIZE, "12"),
                (ENV_ROTATION_INTERVAL, "2.5"),
                (ENV_CATALOG_PATH, "/data/products.csv"),
                (ENV_PORT, "9000"),
                (ENV_MAX_SESSIONS, "500"),
            ]))
            .unwrap();

        assert_eq!(config.batch_size, 12);
        assert_eq!(config.rotation_interval(), Duration::from_millis(2500));
        assert_eq!(config.catalog_path, PathBuf::from("/data/products.csv"));
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.max_sessions, 500);
    }

    #[test]
    fn test_env_parse_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_from(env(&[(ENV_BATCH_SIZE, "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_BATCH_SIZE, .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AppConfig {
            batch_size: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        for interval in [0.0, -1.0, f64::NAN] {
            let config = AppConfig {
                rotation_interval_secs: interval,
                ..AppConfig::default()
            };
            assert!(config.validate().is_err(), "interval {} accepted", interval);
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"batch_size": 6}"#).unwrap();
        assert_eq!(config.batch_size, 6);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = AppConfig::load(Some(Path::new("/no/such/ecoshelf.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
