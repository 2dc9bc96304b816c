use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use room_engine::{LoopConfig, MapLayerSpec, RoomSessionConfig, TransitionPolicy};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const STRICT_FLOW_ENV_VAR: &str = "ROOM_STRICT_FLOW";

/// Everything the driver reads from `--config`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct RoomConfig {
    pub(crate) session: RoomSessionConfig,
    pub(crate) layers: MapLayerSpec,
    #[serde(rename = "loop")]
    pub(crate) loop_config: LoopConfig,
    pub(crate) strict_flow: bool,
    /// Starts the script in `InRoom` instead of `Onboarding`.
    pub(crate) skip_onboarding: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            session: RoomSessionConfig::default(),
            layers: MapLayerSpec::default(),
            loop_config: LoopConfig::default(),
            strict_flow: false,
            skip_onboarding: true,
        }
    }
}

impl RoomConfig {
    pub(crate) fn transition_policy(&self) -> TransitionPolicy {
        if resolve_strict_flow(self.strict_flow) {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Permissive
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {path} at {location}: {source}")]
    Parse {
        path: PathBuf,
        location: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads `path` if given, otherwise the built-in defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<RoomConfig, ConfigError> {
    let Some(path) = path else {
        info!("config_defaults_in_use");
        return Ok(RoomConfig::default());
    };
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&raw, path)?;
    info!(path = %path.display(), "config_loaded");
    Ok(config)
}

fn parse_config(raw: &str, path: &Path) -> Result<RoomConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let location = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            location,
            source: error.into_inner(),
        }
    })
}

fn resolve_strict_flow(config_value: bool) -> bool {
    match env::var(STRICT_FLOW_ENV_VAR) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!(
                    env_var = STRICT_FLOW_ENV_VAR,
                    value = value.as_str(),
                    "invalid strict-flow env var value; falling back to config"
                );
                config_value
            }
        },
        Err(env::VarError::NotPresent) => config_value,
        Err(err) => {
            warn!(
                env_var = STRICT_FLOW_ENV_VAR,
                error = %err,
                "unable to read strict-flow env var; falling back to config"
            );
            config_value
        }
    }
}
