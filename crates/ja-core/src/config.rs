use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides `[log] level`.
pub const LOG_ENV_VAR: &str = "JOBAGENT_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub machine: MachineConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MachineConfig {
    /// Fixed boot id. When unset it is read from `boot_id_path`.
    pub boot_id: Option<String>,
    /// File holding the kernel's boot id.
    pub boot_id_path: PathBuf,
    /// Address advertised to the cluster. Informational only.
    pub public_ip: Option<String>,
    /// Operator-assigned labels matched by metadata conditions.
    pub metadata: BTreeMap<String, String>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            boot_id: None,
            boot_id_path: PathBuf::from("/proc/sys/kernel/random/boot_id"),
            public_ip: None,
            metadata: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, e.g. "info" or "ja_core=debug".
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// The filter to use: `JOBAGENT_LOG` if set, otherwise `level`.
    pub fn resolve_filter(&self) -> String {
        self.filter_with_override(std::env::var(LOG_ENV_VAR).ok().as_deref())
    }

    /// `env_value` wins unless it is missing or blank.
    fn filter_with_override(&self, env_value: Option<&str>) -> String {
        env_value
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.level.clone())
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the user's config file, falling back to defaults when it is
    /// missing or broken.
    pub fn load_or_default() -> Self {
        let path = config_path();
        if !path.exists() {
            return Config::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            eprintln!("warning: {e}");
            Config::default()
        })
    }
}

/// Parse comma-separated `key=value` metadata, e.g. `region=us-west-1,az=b`.
///
/// Pairs without `=` or with an empty key are skipped. Later pairs win.
pub fn parse_metadata(s: &str) -> BTreeMap<String, String> {
    s.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("jobagent").join("config.toml")
}
