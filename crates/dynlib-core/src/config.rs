//! Loader configuration.
//!
//! Options come from an optional TOML file and can be overridden by
//! environment variables:
//!
//! ```toml
//! [loader]
//! binding = "now"        # or "lazy" (default)
//! visibility = "global"  # or "local" (default)
//! ```
//!
//! Both options only affect Unix (`RTLD_*` flags). Windows ignores them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable names.
pub mod env_vars {
    pub const BINDING: &str = "DYNLIB_BINDING";
    pub const VISIBILITY: &str = "DYNLIB_VISIBILITY";
    /// Read by the command-line tool to switch log output to JSON
    pub const LOG_JSON: &str = "DYNLIB_LOG_JSON";
}

/// When undefined function references are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    /// Resolve on first call (`RTLD_LAZY`)
    #[default]
    Lazy,
    /// Resolve everything at load time (`RTLD_NOW`)
    Now,
}

/// Whether the image's symbols are made available to later loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Local,
    Global,
}

impl FromStr for Binding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lazy" => Ok(Binding::Lazy),
            "now" => Ok(Binding::Now),
            _ => Err(ConfigError::InvalidValue {
                key: env_vars::BINDING,
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Visibility {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Visibility::Local),
            "global" => Ok(Visibility::Global),
            _ => Err(ConfigError::InvalidValue {
                key: env_vars::VISIBILITY,
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Binding::Lazy => "lazy",
            Binding::Now => "now",
        })
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Local => "local",
            Visibility::Global => "global",
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Options for the system loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub binding: Binding,
    pub visibility: Visibility,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    loader: LoaderConfig,
}

impl LoaderConfig {
    /// Parse the `[loader]` table of a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(file.loader)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(env_vars::BINDING) {
            self.binding = value.parse()?;
        }
        if let Some(value) = lookup(env_vars::VISIBILITY) {
            self.visibility = value.parse()?;
        }
        Ok(self)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Load from `path` (defaults when `None`), then apply the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides()
    }
}
