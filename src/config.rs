//! Runtime configuration (opencode.toml)
//!
//! The only setting today is where command units live. It is resolved from,
//! in order: the `--functions` flag, the `OPENCODE_FUNCTIONS` environment
//! variable, `functions_dir` in the config file, and finally `./functions`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const CONFIG_FILE: &str = "opencode.toml";

/// Environment variable overriding the functions directory
pub const FUNCTIONS_ENV: &str = "OPENCODE_FUNCTIONS";

/// Error loading a config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory scanned for command units
    #[serde(default = "default_functions_dir")]
    pub functions_dir: PathBuf,
}

fn default_functions_dir() -> PathBuf {
    PathBuf::from("functions")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            functions_dir: default_functions_dir(),
        }
    }
}

impl Config {
    /// Parse config from TOML text
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a config file.
    ///
    /// A relative `functions_dir` is taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content, path)?;

        if config.functions_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.functions_dir = parent.join(&config.functions_dir);
            }
        }
        Ok(config)
    }

    /// Resolve the effective configuration.
    ///
    /// `config_path` is an explicit config file (must exist); without one,
    /// `./opencode.toml` is used when present. `flag` and `env` are the
    /// command-line and environment overrides for the functions directory.
    pub fn resolve(
        config_path: Option<&Path>,
        flag: Option<PathBuf>,
        env: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::load(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(dir) = flag.or(env) {
            config.functions_dir = dir;
        }
        Ok(config)
    }

    /// The functions directory override from `OPENCODE_FUNCTIONS`, if set and non-empty
    pub fn env_override() -> Option<PathBuf> {
        std::env::var_os(FUNCTIONS_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}
