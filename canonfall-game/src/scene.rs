//! Scene payloads returned by the story service.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{NARRATOR, UNTITLED_ENDING};
use crate::meters::MeterDelta;

/// Outcome class of an ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndingKind {
    #[serde(alias = "good")]
    Good,
    #[serde(alias = "bad")]
    Bad,
}

impl EndingKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "GOOD",
            Self::Bad => "BAD",
        }
    }
}

impl fmt::Display for EndingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndingKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GOOD" => Ok(Self::Good),
            "BAD" => Ok(Self::Bad),
            _ => Err(()),
        }
    }
}

const fn default_ending_kind() -> EndingKind {
    EndingKind::Bad
}

/// Terminal payload attached to a scene. A missing `type` reads as `BAD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingPayload {
    #[serde(rename = "type", default = "default_ending_kind")]
    pub kind: EndingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl EndingPayload {
    #[must_use]
    pub fn title_or_default(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(UNTITLED_ENDING)
    }

    #[must_use]
    pub fn text_or_default(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// One selectable option of a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Choice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<MeterDelta>,
}

impl Choice {
    #[must_use]
    pub fn new(id: impl Into<String>, tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            label: label.into(),
            delta: None,
        }
    }

    #[must_use]
    pub const fn with_delta(mut self, delta: MeterDelta) -> Self {
        self.delta = Some(delta);
        self
    }
}

/// A unit of narrative content.
///
/// Every field except `choices` is optional on the wire; a missing `choices`
/// array decodes as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending: Option<EndingPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<String>>,
}

impl Scene {
    /// Parse a scene from the raw response body of the story service.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a JSON scene object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn speaker_or_default(&self) -> &str {
        self.speaker
            .as_deref()
            .filter(|speaker| !speaker.trim().is_empty())
            .unwrap_or(NARRATOR)
    }

    #[must_use]
    pub fn text_or_default(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn choice(&self, id: &str) -> Option<&Choice> {
        self.choices.iter().find(|choice| choice.id == id)
    }

    #[must_use]
    pub const fn is_ending(&self) -> bool {
        self.ending.is_some()
    }
}
