//! Configuration file parsing for `quarry.toml`.
//!
//! ```toml
//! [database]
//! url = "${DATABASE_URL}"
//!
//! [query]
//! max_relation_limit = 100
//! max_eager_loads = 10
//!
//! [debug]
//! log_queries = true
//! slow_query_threshold = 500
//!
//! [environments.test.database]
//! url = "sqlite::memory:"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::error::QueryError;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "quarry.toml";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("invalid configuration: {source}")]
    Toml {
        /// Underlying error.
        #[from]
        source: toml::de::Error,
    },
}

impl From<ConfigError> for QueryError {
    fn from(err: ConfigError) -> Self {
        QueryError::configuration(err.to_string()).with_source(err)
    }
}

/// Main configuration structure for `quarry.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuarryConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Query hardening limits.
    #[serde(default)]
    pub query: QueryLimits,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl QuarryConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// Get the database URL.
    pub fn database_url(&self) -> Option<&str> {
        self.database.url.as_deref()
    }

    /// Apply environment-specific overrides.
    pub fn with_environment(mut self, env: &str) -> Self {
        if let Some(overrides) = self.environments.remove(env) {
            if let Some(db) = overrides.database {
                if let Some(url) = db.url {
                    self.database.url = Some(url);
                }
            }
            if let Some(query) = overrides.query {
                if query.max_relation_limit.is_some() {
                    self.query.max_relation_limit = query.max_relation_limit;
                }
                if query.max_eager_loads.is_some() {
                    self.query.max_eager_loads = query.max_eager_loads;
                }
            }
            if let Some(debug) = overrides.debug {
                if let Some(log_queries) = debug.log_queries {
                    self.debug.log_queries = log_queries;
                }
                if let Some(threshold) = debug.slow_query_threshold {
                    self.debug.slow_query_threshold = threshold;
                }
            }
        }
        self
    }
}

/// Database configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL.
    pub url: Option<String>,
}

/// Optional caps on eager loading. Unset means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryLimits {
    /// Largest per-parent limit a load directive may ask for.
    pub max_relation_limit: Option<u64>,

    /// Most eager loads one plan may carry, nested loads included.
    pub max_eager_loads: Option<usize>,
}

impl QueryLimits {
    /// No limits.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Cap the per-parent relation limit.
    pub fn max_relation_limit(mut self, max: u64) -> Self {
        self.max_relation_limit = Some(max);
        self
    }

    /// Cap the number of eager loads.
    pub fn max_eager_loads(mut self, max: usize) -> Self {
        self.max_eager_loads = Some(max);
        self
    }
}

/// Debug/logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log every statement at debug level.
    #[serde(default)]
    pub log_queries: bool,

    /// Slow query threshold in milliseconds.
    #[serde(default = "default_slow_query_threshold")]
    pub slow_query_threshold: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_queries: false,
            slow_query_threshold: default_slow_query_threshold(),
        }
    }
}

fn default_slow_query_threshold() -> u64 {
    1000
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// Database overrides.
    pub database: Option<DatabaseConfig>,

    /// Query limit overrides.
    pub query: Option<QueryLimits>,

    /// Debug overrides.
    pub debug: Option<DebugOverride>,
}

/// Debug configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugOverride {
    /// Override log_queries.
    pub log_queries: Option<bool>,

    /// Override slow_query_threshold.
    pub slow_query_threshold: Option<u64>,
}

/// Expand environment variables in the format `${VAR_NAME}`.
///
/// Unset variables are left as written.
fn expand_env_vars(content: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return content.to_string(),
    };

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let full_match = &cap[0];

        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(full_match, &value);
        }
    }

    result
}
