//! Loading configuration from TOML files and the environment

use crate::components::{ClientConfig, DispatcherConfig, IdStrategy, TransportConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level configuration, one table per component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConduitConfig {
    pub dispatcher: DispatcherConfig,
    pub client: ClientConfig,
    pub transport: TransportConfig,
}

impl ConduitConfig {
    /// Load configuration.
    ///
    /// Priority:
    /// 1. `path` argument (if given)
    /// 2. `CONDUIT_CONFIG` environment variable (if set)
    /// 3. `<config dir>/conduit/config.toml`
    ///
    /// A missing file means defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with environment variables read through `env`.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env("CONDUIT_CONFIG").map(PathBuf::from))
            .or_else(Self::default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides(env);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loading config file");
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("conduit").join("config.toml"))
    }

    /// Apply `CONDUIT_*` overrides read through `lookup`. Values that do not
    /// parse are logged and skipped.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CONDUIT_BATCH_CONCURRENCY") {
            match raw.trim().parse() {
                Ok(n) => self.dispatcher.batch_concurrency = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid CONDUIT_BATCH_CONCURRENCY"),
            }
        }
        if let Some(raw) = lookup("CONDUIT_RESERVED_METHODS") {
            match raw.trim().parse() {
                Ok(flag) => self.dispatcher.reject_reserved_methods = flag,
                Err(_) => warn!(value = %raw, "Ignoring invalid CONDUIT_RESERVED_METHODS"),
            }
        }
        if let Some(raw) = lookup("CONDUIT_ID_STRATEGY") {
            match raw.parse::<IdStrategy>() {
                Ok(strategy) => self.client.id_strategy = strategy,
                Err(e) => warn!(error = %e, "Ignoring invalid CONDUIT_ID_STRATEGY"),
            }
        }
        if let Some(raw) = lookup("CONDUIT_MAX_FRAME_BYTES") {
            match raw.trim().parse() {
                Ok(n) => self.transport.max_frame_bytes = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid CONDUIT_MAX_FRAME_BYTES"),
            }
        }
    }
}
