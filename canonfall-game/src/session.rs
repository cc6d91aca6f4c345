//! Player progress: turn counter, chapter, flags, last choice, dialogue log and meters.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;

use crate::constants::{DEFAULT_CHAPTER, LOG_CAPACITY, LOG_SUMMARY_MAX_CHARS};
use crate::meters::Meters;
use crate::scene::{Choice, Scene};

/// The most recently selected option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LastChoice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub label: String,
}

impl From<&Choice> for LastChoice {
    fn from(choice: &Choice) -> Self {
        Self {
            id: choice.id.clone(),
            tag: choice.tag.clone(),
            label: choice.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogEntry {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
}

impl LogEntry {
    #[must_use]
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// Dialogue history capped at [`LOG_CAPACITY`] entries, oldest evicted first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DialogueLog {
    entries: VecDeque<LogEntry>,
}

impl DialogueLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from arbitrary entries, keeping only the newest that fit.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = LogEntry>) -> Self {
        let mut log = Self::new();
        for entry in entries {
            log.push(entry);
        }
        log
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > LOG_CAPACITY {
            self.entries.pop_front();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Context summary sent to the story service.
    ///
    /// Lines are `speaker: text`, oldest first, and the joined text is cut to its
    /// first [`LOG_SUMMARY_MAX_CHARS`] characters. Long logs therefore lose their
    /// most recent lines rather than their oldest ones.
    #[must_use]
    pub fn summary(&self) -> String {
        let joined = self
            .entries
            .iter()
            .map(|entry| format!("{}: {}", entry.speaker, entry.text))
            .collect::<Vec<_>>()
            .join("\n");
        match joined.char_indices().nth(LOG_SUMMARY_MAX_CHARS) {
            Some((cut, _)) => joined[..cut].to_string(),
            None => joined,
        }
    }
}

fn default_turn() -> u32 {
    1
}

fn default_chapter() -> String {
    DEFAULT_CHAPTER.to_string()
}

/// In-memory progress of a single playthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default = "default_turn")]
    pub turn: u32,
    #[serde(default = "default_chapter")]
    pub chapter: String,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub last_choice: Option<LastChoice>,
    #[serde(default)]
    pub log: DialogueLog,
    #[serde(rename = "state", default)]
    pub meters: Meters,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            turn: default_turn(),
            chapter: default_chapter(),
            flags: Vec::new(),
            last_choice: None,
            log: DialogueLog::new(),
            meters: Meters::default(),
        }
    }
}

impl SessionState {
    /// Record `choice` and apply its effects: last choice, meter delta, turn
    /// counter and a log line for `shown`, the scene the choice was made on.
    pub fn record_choice(&mut self, choice: &Choice, shown: Option<&Scene>) {
        self.last_choice = Some(LastChoice::from(choice));
        self.meters.apply(&choice.delta.unwrap_or_default());
        self.turn = self.turn.saturating_add(1);
        if let Some(scene) = shown {
            self.log.push(LogEntry::new(
                scene.speaker_or_default(),
                scene.text_or_default(),
            ));
        }
    }

    /// Fold the session-level fields of an incoming scene into this state.
    pub fn absorb_scene(&mut self, scene: &Scene) {
        if let Some(chapter) = scene.chapter.as_ref().filter(|c| !c.trim().is_empty()) {
            self.chapter.clone_from(chapter);
        }
        if let Some(flags) = &scene.flags {
            self.flags.clone_from(flags);
        }
    }

    /// Clamp every field into its documented range.
    pub fn normalize(&mut self) {
        self.meters.clamp();
        if self.turn == 0 {
            self.turn = default_turn();
        }
    }
}

/// Field that reads as `None` when its value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Session as it may appear in persisted data: every field optional.
///
/// Merging with [`PartialSession::into_session`] yields a total state where
/// each missing or malformed field takes its new-game default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartialSession {
    #[serde(default, deserialize_with = "lenient")]
    pub turn: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub chapter: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub flags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_choice: Option<LastChoice>,
    #[serde(default, deserialize_with = "lenient")]
    pub log: Option<Vec<LogEntry>>,
    #[serde(default, deserialize_with = "lenient")]
    pub state: Option<Meters>,
}

impl PartialSession {
    /// Parse a partial session from arbitrary JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn into_session(self) -> SessionState {
        let defaults = SessionState::default();
        let mut session = SessionState {
            turn: self.turn.unwrap_or(defaults.turn),
            chapter: self.chapter.unwrap_or(defaults.chapter),
            flags: self.flags.unwrap_or(defaults.flags),
            last_choice: self.last_choice,
            log: self.log.map_or(defaults.log, DialogueLog::from_entries),
            meters: self.state.unwrap_or(defaults.meters),
        };
        session.normalize();
        session
    }
}

impl From<SessionState> for PartialSession {
    fn from(session: SessionState) -> Self {
        Self {
            turn: Some(session.turn),
            chapter: Some(session.chapter),
            flags: Some(session.flags),
            last_choice: session.last_choice,
            log: Some(session.log.to_vec()),
            state: Some(session.meters),
        }
    }
}
