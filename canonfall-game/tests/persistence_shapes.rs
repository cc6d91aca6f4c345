use canonfall_game::{
    EndingKind, EndingPayload, FixedClock, GameConfig, KeyValueStore, MemoryStore, Meters,
    Persistence, SessionState,
};
use serde_json::{Value, json};

fn persistence(store: MemoryStore) -> Persistence<MemoryStore, FixedClock> {
    Persistence::new(store, FixedClock::new(42), &GameConfig::default())
}

#[test]
fn save_slot_has_versioned_record_shape() {
    let store = MemoryStore::new();
    let p = persistence(store.clone());
    p.save(&SessionState::default()).unwrap();

    let raw = store.get_item("canonfall.save").unwrap().unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        value,
        json!({
            "version": 1,
            "timestamp": 42,
            "session": {
                "turn": 1,
                "chapter": "PROLOGUE",
                "flags": [],
                "lastChoice": null,
                "log": [],
                "state": {"canonity": 5, "corruption": 0, "sanity": 7, "trust": 6, "fate": 0}
            }
        })
    );
}

#[test]
fn handwritten_save_loads_with_defaults_for_missing_fields() {
    let store = MemoryStore::new();
    store
        .set_item(
            "canonfall.save",
            r#"{"version":1,"timestamp":1,"session":{
                "turn":7,
                "lastChoice":{"id":"b","tag":"DEFY","label":"Burn it"},
                "log":[{"speaker":"Archivist","text":"No!"}],
                "state":{"corruption":4}
            }}"#,
        )
        .unwrap();
    let session = persistence(store).load().unwrap();
    assert_eq!(session.turn, 7);
    assert_eq!(session.chapter, "PROLOGUE");
    assert_eq!(session.last_choice.map(|c| c.tag), Some("DEFY".to_string()));
    assert_eq!(session.log.len(), 1);
    assert_eq!(
        session.meters,
        Meters {
            corruption: 4,
            ..Meters::default()
        }
    );
}

#[test]
fn malformed_session_fields_fall_back_one_by_one() {
    let store = MemoryStore::new();
    store
        .set_item(
            "canonfall.save",
            r#"{"version":1,"timestamp":1,"session":{
                "turn":5,
                "chapter":"ACT II",
                "flags":"oops",
                "log":{},
                "lastChoice":7,
                "state":{"sanity":"high"}
            }}"#,
        )
        .unwrap();
    let p = persistence(store);
    assert!(p.has_save());
    let session = p.load().unwrap();
    assert_eq!(session.turn, 5);
    assert_eq!(session.chapter, "ACT II");
    assert!(session.flags.is_empty());
    assert!(session.log.is_empty());
    assert!(session.last_choice.is_none());
    assert_eq!(session.meters, Meters::default());
}

#[test]
fn endings_slot_uses_keyed_item_map() {
    let store = MemoryStore::new();
    let p = persistence(store.clone());
    p.add_ending(&EndingPayload {
        kind: EndingKind::Good,
        title: Some("RESOLUTION".to_string()),
        text: Some("Peace.".to_string()),
    })
    .unwrap();

    let raw = store.get_item("canonfall.endings").unwrap().unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        value,
        json!({
            "version": 1,
            "items": {
                "GOOD::RESOLUTION": {
                    "id": "GOOD::RESOLUTION",
                    "type": "GOOD",
                    "title": "RESOLUTION",
                    "text": "Peace.",
                    "timestamp": 42
                }
            }
        })
    );
}

#[test]
fn prefixes_isolate_games_sharing_a_store() {
    let store = MemoryStore::new();
    let demo = Persistence::new(
        store.clone(),
        FixedClock::new(0),
        &GameConfig {
            storage_prefix: "demo".to_string(),
            ..GameConfig::default()
        },
    );
    let main = persistence(store);
    demo.save(&SessionState::default()).unwrap();
    assert!(demo.has_save());
    assert!(!main.has_save());
}
