use std::env;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::{CommonError, CommonResult};

/// Environment variable that caps how many actions one drain may process.
pub const MAX_DRAIN_ENV: &str = "CASCADE_MAX_DRAIN";

/// TOML-backed configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CascadeConfig {
    pub engine: EngineConfig,
    pub tree: TreeKeys,
}

impl CascadeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Dispatch engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of actions processed by a single `handle` call.
    /// `None` = unbounded; termination is then the resolvers' business.
    /// A configured `0` also means unbounded.
    #[serde(deserialize_with = "zero_is_unbounded")]
    pub max_drain: Option<usize>,
}

fn zero_is_unbounded<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let limit = Option::<usize>::deserialize(deserializer)?;
    Ok(limit.filter(|n| *n > 0))
}

impl EngineConfig {
    /// Load engine settings from the process environment.
    pub fn from_env() -> CommonResult<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load engine settings through an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> CommonResult<Self> {
        let max_drain = match lookup(MAX_DRAIN_ENV) {
            None => None,
            Some(raw) if raw.trim().is_empty() || raw.trim() == "0" => None,
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                CommonError::Config(format!("{MAX_DRAIN_ENV} must be a number, got {raw:?}"))
            })?),
        };

        Ok(Self { max_drain })
    }

    /// The effective drain limit. Zero counts as unbounded however the
    /// config was built.
    pub fn max_drain(&self) -> Option<usize> {
        self.max_drain.filter(|n| *n > 0)
    }

    pub fn log_settings(&self) {
        match self.max_drain() {
            Some(limit) => tracing::info!(max_drain = limit, "Engine drain limit set"),
            None => tracing::info!("Engine drain limit: <unbounded>"),
        }
    }
}

/// Key names used by the tree helpers when reading and writing nodes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeKeys {
    pub id: String,
    pub children: String,
    pub parent: String,
    pub reference: String,
}

impl Default for TreeKeys {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            children: "children".to_string(),
            parent: "parent".to_string(),
            reference: "reference".to_string(),
        }
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> CommonResult<CascadeConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| CommonError::Io {
        path: path.display().to_string(),
        source,
    })?;
    CascadeConfig::from_toml_str(&content).map_err(|source| CommonError::Toml {
        path: path.display().to_string(),
        source,
    })
}
