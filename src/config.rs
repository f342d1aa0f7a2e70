//! Matcher configuration.
//!
//! Loaded from a TOML file, then overridden by `MATCHER_`-prefixed
//! environment variables, then validated:
//!
//! ```toml
//! page_size = 500
//! one_to_many_enabled = true
//! log_level = "info"
//! ```
//!
//! | Variable | Field |
//! |----------|-------|
//! | `MATCHER_PAGE_SIZE` | `page_size` |
//! | `MATCHER_ONE_TO_MANY_ENABLED` | `one_to_many_enabled` |
//! | `MATCHER_LOG_LEVEL` | `log_level` |

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Tunables of an [`OrdersGraph`](crate::engine::OrdersGraph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Candidate items fetched per store round trip
    pub page_size: usize,

    /// Run the one-to-many search for eligible roots
    pub one_to_many_enabled: bool,

    /// Default tracing filter for the binary
    pub log_level: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            page_size: 500,
            one_to_many_enabled: true,
            log_level: "info".to_string(),
        }
    }
}

impl MatcherConfig {
    /// Parse a TOML document; missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "page_size must be greater than zero".to_string(),
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "log_level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loader with environment variable overrides
#[derive(Debug)]
pub struct ConfigLoader {
    file_path: Option<String>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file_path: None,
            env_prefix: "MATCHER_".to_string(),
        }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load, override and validate.
    ///
    /// Without a file the defaults are used as the base.
    pub async fn load(&self) -> Result<MatcherConfig, ConfigError> {
        let mut config = match &self.file_path {
            Some(file_path) => self.load_from_file(file_path).await?,
            None => MatcherConfig::default(),
        };

        self.apply_overrides(&mut config, |name| env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    async fn load_from_file(&self, file_path: &str) -> Result<MatcherConfig, ConfigError> {
        if !Path::new(file_path).exists() {
            return Err(ConfigError::FileNotFound(file_path.to_string()));
        }
        let content = tokio::fs::read_to_string(file_path).await?;
        MatcherConfig::from_toml_str(&content)
    }

    /// Apply overrides looked up by variable name.
    pub fn apply_overrides(
        &self,
        config: &mut MatcherConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(page_size) = lookup(&format!("{}PAGE_SIZE", self.env_prefix)) {
            config.page_size = page_size
                .parse()
                .map_err(|e| ConfigError::ValidationError(format!("Invalid page size: {}", e)))?;
        }

        if let Some(enabled) = lookup(&format!("{}ONE_TO_MANY_ENABLED", self.env_prefix)) {
            config.one_to_many_enabled = enabled.parse().map_err(|e| {
                ConfigError::ValidationError(format!("Invalid one-to-many flag: {}", e))
            })?;
        }

        if let Some(log_level) = lookup(&format!("{}LOG_LEVEL", self.env_prefix)) {
            config.log_level = log_level;
        }

        Ok(())
    }
}
