//! Layered CLI configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file given
//! with `--config`, then `FORMGUARD_*` environment variables (nested keys
//! separated by `__`, e.g. `FORMGUARD_ENGINE__RULE_POLICY=strict`). Command
//! line flags are applied on top by the caller.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use formguard_validator::config::EngineConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FORMGUARD_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Default log filter; `RUST_LOG` wins when set.
    pub log_level: String,
    /// JSON message table replacing the built-in templates.
    pub messages: Option<PathBuf>,
    /// Engine settings.
    pub engine: EngineConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            messages: None,
            engine: EngineConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(file).extract()
    }
}
