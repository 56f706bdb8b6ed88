//! Server configuration.

use std::path::{Path, PathBuf};

use narrator_playback::config::PlayerConfig;
use narrator_state::config::StateConfig;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Engine tunables, loadable from YAML. Missing sections use defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Script player settings.
    pub player: PlayerConfig,
    /// Snapshot and save slot settings.
    pub state: StateConfig,
}

impl EngineConfig {
    /// Parses a YAML document and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for malformed YAML or invalid values.
    pub fn from_yaml(text: &str) -> Result<Self, AppError> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|e| AppError::Config(format!("invalid engine config: {e}")))?;
        config
            .state
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Reads the YAML file at `path`, or returns defaults when `path` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when the file cannot be read or parsed.
    pub async fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&text)
    }
}

/// Process-level settings taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Optional YAML file with an [`EngineConfig`] (`NARRATOR_CONFIG`).
    pub config_path: Option<PathBuf>,
    /// Directory scripts are loaded from (`NARRATOR_SCRIPTS_DIR`).
    pub scripts_dir: PathBuf,
    /// Directory save slots are written to (`NARRATOR_SAVES_DIR`).
    pub saves_dir: PathBuf,
    /// Bind host (`HOST`).
    pub host: String,
    /// Bind port (`PORT`).
    pub port: u16,
}

impl ServerSettings {
    /// Reads settings through `var`, which returns `None` for unset keys.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when `PORT` is not a valid port.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let port = match var("PORT") {
            Some(port) => port
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        Ok(Self {
            config_path: var("NARRATOR_CONFIG").map(PathBuf::from),
            scripts_dir: var("NARRATOR_SCRIPTS_DIR").map_or_else(|| "scripts".into(), PathBuf::from),
            saves_dir: var("NARRATOR_SAVES_DIR").map_or_else(|| "saves".into(), PathBuf::from),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
        })
    }

    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`ServerSettings::from_lookup`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
