//! Request body posted to the story service.
use serde::{Deserialize, Serialize};

use crate::meters::Meters;
use crate::session::{LastChoice, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    pub state: Meters,
    pub chapter: String,
    pub last_choice: Option<LastChoice>,
    pub flags: Vec<String>,
    /// Joined, head-truncated dialogue summary.
    pub log: String,
}

impl From<&SessionState> for StoryRequest {
    fn from(session: &SessionState) -> Self {
        Self {
            state: session.meters,
            chapter: session.chapter.clone(),
            last_choice: session.last_choice.clone(),
            flags: session.flags.clone(),
            log: session.log.summary(),
        }
    }
}

impl StoryRequest {
    /// Serialize the request body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
