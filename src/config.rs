//! User settings.
//!
//! Layered with figment, lowest to highest precedence:
//! built-in defaults, `settings.json` in the user config directory,
//! `MIRROR_*` environment variables, and finally `XAI_API_KEY`.
//!
//! The API key is only ever written to disk when the user ticks
//! "Remember API key".

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::provider::grok::DEFAULT_ENDPOINT;
use crate::provider::GrokModel;

const APP_DIR: &str = "mirror-mirror";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the xAI API
    pub endpoint: String,
    /// Model selected at startup
    pub model: GrokModel,
    /// Per-request timeout; the pro model regularly needs close to a minute
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub remember_key: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: GrokModel::default(),
            timeout_secs: 120,
            api_key: None,
            remember_key: false,
        }
    }
}

impl Settings {
    /// Settings file location, e.g. `~/.config/mirror-mirror/settings.json` on Linux
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load from the default location and the environment
    pub fn load() -> Result<Self> {
        Self::load_at(Self::path().as_deref())
    }

    /// Load from `path` (if any) layered under the environment
    pub fn load_at(path: Option<&Path>) -> Result<Self> {
        let mut figment = Self::base(path)
            .merge(Env::prefixed("MIRROR_").only(&["endpoint", "model", "timeout_secs"]));

        if let Ok(key) = std::env::var("XAI_API_KEY") {
            if !key.trim().is_empty() {
                figment = figment.merge(Serialized::default("api_key", key));
            }
        }

        Ok(figment.extract()?)
    }

    /// Load defaults plus a specific settings file, ignoring the environment
    #[cfg(test)]
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::base(Some(path)).extract()?)
    }

    fn base(path: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Settings::default()));
        match path {
            Some(path) => figment.merge(Json::file(path)),
            None => figment,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Persist to `path`, dropping the key unless the user opted in
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut stored = self.clone();
        if !stored.remember_key {
            stored.api_key = None;
        }

        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| Error::Encode(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| Error::io(path, e))?;

        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }
}
