use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::client::{DEFAULT_IMAGE_MODEL, DEFAULT_VERIFY_MODEL};
use crate::gemini::DEFAULT_API_BASE;

/// Variables that may carry an environment-injected key, in priority order.
pub const ENVIRONMENT_KEY_VARS: &[&str] = &["API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Clone)]
pub struct StudioConfig {
    pub api_base: String,
    pub image_model: String,
    pub verify_model: String,
    pub state_dir: PathBuf,
    pub environment_key: Option<String>,
}

impl StudioConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            api_base: non_empty("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            image_model: non_empty("WORX_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            verify_model: non_empty("WORX_VERIFY_MODEL")
                .unwrap_or_else(|| DEFAULT_VERIFY_MODEL.to_string()),
            state_dir: non_empty("WORX_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_state_dir),
            environment_key: ENVIRONMENT_KEY_VARS.iter().find_map(|&name| non_empty(name)),
        }
    }

    pub fn key_store_path(&self) -> PathBuf {
        self.state_dir.join(CREDENTIALS_FILE)
    }
}

impl fmt::Debug for StudioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudioConfig")
            .field("api_base", &self.api_base)
            .field("image_model", &self.image_model)
            .field("verify_model", &self.verify_model)
            .field("state_dir", &self.state_dir)
            .field("environment_key", &self.environment_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

fn default_state_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("worxphere"))
        .unwrap_or_else(|| PathBuf::from(".worxphere"))
}
