//! Save slot and endings gallery on top of a key-value store.
//!
//! Reads never fail: an absent or unparsable slot reads as "no save" or as the
//! empty gallery. Only writes report backend errors.
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::rc::Rc;

use crate::clock::SystemClock;
use crate::config::GameConfig;
use crate::constants::{ENDING_ID_MAX_CHARS, ENDINGS_VERSION, SAVE_VERSION};
use crate::scene::{EndingKind, EndingPayload};
use crate::session::{PartialSession, SessionState};
use crate::{Clock, KeyValueStore};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid save: {0}")]
    InvalidSave(String),
}

/// Contents of the save slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub version: u32,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub session: SessionState,
}

/// Lenient view of the save slot used when reading it back.
#[derive(Debug, Deserialize)]
struct StoredSave {
    #[serde(default)]
    session: Option<PartialSession>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EndingKind,
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: i64,
}

const fn default_endings_version() -> u32 {
    ENDINGS_VERSION
}

/// Every ending collected so far, keyed by [`ending_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingsCollection {
    #[serde(default = "default_endings_version")]
    pub version: u32,
    #[serde(default)]
    pub items: BTreeMap<String, EndingRecord>,
}

impl Default for EndingsCollection {
    fn default() -> Self {
        Self {
            version: ENDINGS_VERSION,
            items: BTreeMap::new(),
        }
    }
}

impl EndingsCollection {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    #[must_use]
    pub fn count(&self, kind: EndingKind) -> usize {
        self.items.values().filter(|e| e.kind == kind).count()
    }

    /// Gallery order: newest first, ties broken by id.
    #[must_use]
    pub fn sorted(&self) -> Vec<EndingRecord> {
        let mut records: Vec<EndingRecord> = self.items.values().cloned().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        records
    }
}

/// Identity of an ending: `TYPE::title`, title trimmed, capped at
/// [`ENDING_ID_MAX_CHARS`] characters.
#[must_use]
pub fn ending_id(kind: EndingKind, title: &str) -> String {
    format!("{kind}::{}", title.trim())
        .chars()
        .take(ENDING_ID_MAX_CHARS)
        .collect()
}

/// Result of recording an ending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndingReceipt {
    pub id: String,
    /// False when the ending was already in the gallery.
    pub newly_collected: bool,
}

pub struct Persistence<S, K = SystemClock> {
    store: S,
    clock: K,
    save_key: String,
    endings_key: String,
}

impl<S, K> Persistence<S, K>
where
    S: KeyValueStore,
    K: Clock,
{
    pub fn new(store: S, clock: K, config: &GameConfig) -> Self {
        Self {
            store,
            clock,
            save_key: config.save_key(),
            endings_key: config.endings_key(),
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn clock(&self) -> &K {
        &self.clock
    }

    #[must_use]
    pub fn save_key(&self) -> &str {
        &self.save_key
    }

    #[must_use]
    pub fn endings_key(&self) -> &str {
        &self.endings_key
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("reading {key} failed, treating as empty: {e}");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.store
            .set_item(key, value)
            .map_err(|e| PersistenceError::Storage(e.to_string()))
    }

    /// Overwrite the save slot with `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be serialized or the store rejects the write.
    pub fn save(&self, session: &SessionState) -> Result<(), PersistenceError> {
        let record = SaveRecord {
            version: SAVE_VERSION,
            timestamp: self.clock.now_ms(),
            session: session.clone(),
        };
        let json = serde_json::to_string(&record)?;
        self.write(&self.save_key, &json)?;
        info!("saved turn {} ({})", session.turn, session.chapter);
        Ok(())
    }

    /// Session stored in the save slot, or `None` if the slot is empty or corrupt.
    #[must_use]
    pub fn load(&self) -> Option<SessionState> {
        self.load_partial().map(PartialSession::into_session)
    }

    /// Raw session of the save slot before defaults are merged in.
    #[must_use]
    pub fn load_partial(&self) -> Option<PartialSession> {
        let raw = self.read(&self.save_key)?;
        match serde_json::from_str::<StoredSave>(&raw) {
            Ok(stored) => stored.session,
            Err(e) => {
                warn!("ignoring corrupt save in {}: {e}", self.save_key);
                None
            }
        }
    }

    #[must_use]
    pub fn has_save(&self) -> bool {
        self.read(&self.save_key).is_some()
    }

    /// Remove the save slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the removal.
    pub fn clear_save(&self) -> Result<(), PersistenceError> {
        self.store
            .remove_item(&self.save_key)
            .map_err(|e| PersistenceError::Storage(e.to_string()))
    }

    /// Raw JSON of the save slot, for copying a save between devices.
    #[must_use]
    pub fn export_save(&self) -> Option<String> {
        self.read(&self.save_key)
    }

    /// Validate `text` as a save record or a bare session and store it.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidSave`] if the text holds no session;
    /// the slot is left untouched in that case.
    pub fn import_save(&self, text: &str) -> Result<SessionState, PersistenceError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| PersistenceError::InvalidSave(e.to_string()))?;
        let session_value = match value.get("session") {
            Some(inner) => inner.clone(),
            None => value,
        };
        if !session_value.is_object() {
            return Err(PersistenceError::InvalidSave(
                "expected a session object".to_string(),
            ));
        }
        let partial: PartialSession = serde_json::from_value(session_value)
            .map_err(|e| PersistenceError::InvalidSave(e.to_string()))?;
        let session = partial.into_session();
        self.save(&session)?;
        Ok(session)
    }

    /// Record an ending and return its id, whether or not it was new.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be written back.
    pub fn add_ending(&self, ending: &EndingPayload) -> Result<String, PersistenceError> {
        self.collect_ending(ending).map(|receipt| receipt.id)
    }

    /// Like [`Persistence::add_ending`], also reporting whether the ending was new.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be written back.
    pub fn collect_ending(&self, ending: &EndingPayload) -> Result<EndingReceipt, PersistenceError> {
        let title = ending.title_or_default().trim();
        let id = ending_id(ending.kind, title);
        let mut collection = self.get_endings();
        let newly_collected = !collection.contains(&id);
        if newly_collected {
            collection.items.insert(
                id.clone(),
                EndingRecord {
                    id: id.clone(),
                    kind: ending.kind,
                    title: title.to_string(),
                    text: ending.text_or_default().to_string(),
                    timestamp: self.clock.now_ms(),
                },
            );
            info!("collected ending {id}");
        }
        let json = serde_json::to_string(&collection)?;
        self.write(&self.endings_key, &json)?;
        Ok(EndingReceipt {
            id,
            newly_collected,
        })
    }

    #[must_use]
    pub fn get_endings(&self) -> EndingsCollection {
        let Some(raw) = self.read(&self.endings_key) else {
            return EndingsCollection::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("ignoring corrupt endings in {}: {e}", self.endings_key);
            EndingsCollection::default()
        })
    }

    /// Replace the gallery with the empty collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn reset_endings(&self) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(&EndingsCollection::default())?;
        self.write(&self.endings_key, &json)
    }
}

/// In-memory store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::session::LogEntry;

    fn persistence() -> Persistence<MemoryStore, FixedClock> {
        Persistence::new(
            MemoryStore::new(),
            FixedClock::new(1_700_000_000_000),
            &GameConfig::default(),
        )
    }

    fn ending(kind: EndingKind, title: &str) -> EndingPayload {
        EndingPayload {
            kind,
            title: Some(title.to_string()),
            text: Some("The end.".to_string()),
        }
    }

    #[test]
    fn save_then_load_reproduces_session() {
        let p = persistence();
        let mut session = SessionState::default();
        session.turn = 6;
        session.chapter = "ACT II".into();
        session.flags = vec!["oath".into(), "mask".into()];
        session.log.push(LogEntry::new("Archivist", "Again."));
        session.meters.corruption = 3;

        assert!(!p.has_save());
        p.save(&session).unwrap();
        assert!(p.has_save());
        assert_eq!(p.load(), Some(session));

        let raw: serde_json::Value = serde_json::from_str(&p.export_save().unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["timestamp"], 1_700_000_000_000_i64);
    }

    #[test]
    fn save_overwrites_previous_slot() {
        let p = persistence();
        let mut session = SessionState::default();
        p.save(&session).unwrap();
        session.turn = 3;
        p.save(&session).unwrap();
        assert_eq!(p.load().map(|s| s.turn), Some(3));
        assert_eq!(p.store().len(), 1);
    }

    #[test]
    fn clear_save_removes_slot() {
        let p = persistence();
        p.save(&SessionState::default()).unwrap();
        p.clear_save().unwrap();
        assert!(!p.has_save());
        assert!(p.load().is_none());
    }

    #[test]
    fn corrupt_save_reads_as_absent() {
        let p = persistence();
        p.store().set_item(p.save_key(), "{not json").unwrap();
        assert!(p.load().is_none());
        p.store().set_item(p.save_key(), r#"{"version":1}"#).unwrap();
        assert!(p.load().is_none());
    }

    #[test]
    fn save_without_state_loads_default_meters() {
        let p = persistence();
        p.store()
            .set_item(
                p.save_key(),
                r#"{"version":1,"timestamp":0,"session":{"turn":3,"chapter":"ACT I"}}"#,
            )
            .unwrap();
        let session = p.load().unwrap();
        assert_eq!(session.turn, 3);
        assert_eq!(session.meters, crate::meters::Meters::default());
        assert!(session.flags.is_empty());
    }

    #[test]
    fn add_ending_is_idempotent() {
        let p = persistence();
        let first = p.add_ending(&ending(EndingKind::Good, "RESOLUTION")).unwrap();
        p.clock().advance(5_000);
        let second = p.add_ending(&ending(EndingKind::Good, "RESOLUTION")).unwrap();
        assert_eq!(first, "GOOD::RESOLUTION");
        assert_eq!(first, second);
        let endings = p.get_endings();
        assert_eq!(endings.len(), 1);
        assert_eq!(endings.items[&first].timestamp, 1_700_000_000_000);
    }

    #[test]
    fn ending_identity_trims_and_distinguishes_kind() {
        let p = persistence();
        let receipt = p
            .collect_ending(&ending(EndingKind::Bad, "  RESOLUTION  "))
            .unwrap();
        assert!(receipt.newly_collected);
        assert_eq!(receipt.id, "BAD::RESOLUTION");
        let again = p.collect_ending(&ending(EndingKind::Bad, "RESOLUTION")).unwrap();
        assert!(!again.newly_collected);
        p.add_ending(&ending(EndingKind::Good, "RESOLUTION")).unwrap();
        let endings = p.get_endings();
        assert_eq!(endings.count(EndingKind::Bad), 1);
        assert_eq!(endings.count(EndingKind::Good), 1);
        assert_eq!(endings.items["BAD::RESOLUTION"].title, "RESOLUTION");
    }

    #[test]
    fn ending_id_is_capped() {
        let id = ending_id(EndingKind::Good, &"Ω".repeat(200));
        assert_eq!(id.chars().count(), ENDING_ID_MAX_CHARS);
        assert!(id.starts_with("GOOD::"));
    }

    #[test]
    fn untitled_ending_uses_placeholder() {
        let p = persistence();
        let id = p
            .add_ending(&EndingPayload {
                kind: EndingKind::Bad,
                title: None,
                text: None,
            })
            .unwrap();
        assert_eq!(id, "BAD::ENDING");
        assert_eq!(p.get_endings().items[&id].text, "");

        let blank = p
            .collect_ending(&EndingPayload {
                kind: EndingKind::Bad,
                title: Some("  ".to_string()),
                text: None,
            })
            .unwrap();
        assert_eq!(blank.id, "BAD::ENDING");
        assert!(!blank.newly_collected);
    }

    #[test]
    fn corrupt_endings_read_as_empty_and_heal_on_write() {
        let p = persistence();
        p.store().set_item(p.endings_key(), "[oops").unwrap();
        assert!(p.get_endings().is_empty());
        p.add_ending(&ending(EndingKind::Good, "DAWN")).unwrap();
        assert_eq!(p.get_endings().len(), 1);
    }

    #[test]
    fn reset_endings_writes_empty_shape() {
        let p = persistence();
        p.add_ending(&ending(EndingKind::Good, "DAWN")).unwrap();
        p.reset_endings().unwrap();
        let raw = p.store().get_item(p.endings_key()).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"version": 1, "items": {}}));
        assert!(p.get_endings().is_empty());
    }

    #[test]
    fn sorted_endings_put_newest_first() {
        let p = persistence();
        p.add_ending(&ending(EndingKind::Good, "ZENITH")).unwrap();
        p.clock().advance(10);
        p.add_ending(&ending(EndingKind::Bad, "ASHES")).unwrap();
        let titles: Vec<_> = p.get_endings().sorted().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["ASHES".to_string(), "ZENITH".to_string()]);
    }

    #[test]
    fn import_accepts_record_or_bare_session() {
        let p = persistence();
        let session = p
            .import_save(r#"{"version":1,"timestamp":5,"session":{"turn":8}}"#)
            .unwrap();
        assert_eq!(session.turn, 8);
        assert_eq!(p.load().map(|s| s.turn), Some(8));

        let bare = p.import_save(r#"{"chapter":"ACT IV"}"#).unwrap();
        assert_eq!(bare.chapter, "ACT IV");
        assert_eq!(bare.turn, 1);
    }

    #[test]
    fn import_rejects_garbage_without_touching_slot() {
        let p = persistence();
        let mut session = SessionState::default();
        session.turn = 4;
        p.save(&session).unwrap();
        assert!(matches!(
            p.import_save("[1,2,3]"),
            Err(PersistenceError::InvalidSave(_))
        ));
        assert!(matches!(
            p.import_save("nope"),
            Err(PersistenceError::InvalidSave(_))
        ));
        assert_eq!(p.load().map(|s| s.turn), Some(4));
    }
}
