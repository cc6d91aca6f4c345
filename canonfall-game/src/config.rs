//! Runtime configuration shared by every platform adapter.
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ENDPOINT, DEFAULT_STORAGE_PREFIX, ENDINGS_KEY_SUFFIX, SAVE_KEY_SUFFIX,
};

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_storage_prefix() -> String {
    DEFAULT_STORAGE_PREFIX.to_string()
}

const fn default_autosave() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// URL the story service is reached at.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Namespace for the save and endings slots.
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
    /// Snapshot the session whenever an ending is reached.
    #[serde(default = "default_autosave")]
    pub autosave_on_ending: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            storage_prefix: default_storage_prefix(),
            autosave_on_ending: default_autosave(),
        }
    }
}

impl GameConfig {
    /// Parse configuration JSON; omitted keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object with compatible field types.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn save_key(&self) -> String {
        format!("{}.{SAVE_KEY_SUFFIX}", self.storage_prefix)
    }

    #[must_use]
    pub fn endings_key(&self) -> String {
        format!("{}.{ENDINGS_KEY_SUFFIX}", self.storage_prefix)
    }
}
