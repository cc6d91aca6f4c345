//! Offline scenarios: each builds its own controller over scripted scenes and
//! an in-memory store, plays through a situation and checks the outcome.
use anyhow::{Context, Result, bail, ensure};
use canonfall_game::constants::{LOG_CAPACITY, LOG_SUMMARY_MAX_CHARS, METER_MAX, METER_MIN};
use canonfall_game::{
    Choice, EndingKind, EndingPayload, FixedClock, GameConfig, GameError, GameSession,
    KeyValueStore, MemoryStore, MeterDelta, MeterKind, Meters, Scene, SceneController,
    ScriptedStoryService, ServiceError,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::playthrough::{ChoicePolicy, StopReason, run_playthrough};

type OfflineController = SceneController<ScriptedStoryService, MemoryStore, FixedClock>;

const EPOCH_MS: i64 = 1_700_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Smoke,
    MeterBounds,
    LogWindow,
    SaveRoundtrip,
    EndingCollection,
    ServiceFailure,
    CorruptStorage,
    PartialSave,
    ScriptedPlaythrough,
}

impl Scenario {
    pub const ALL: [Self; 9] = [
        Self::Smoke,
        Self::MeterBounds,
        Self::LogWindow,
        Self::SaveRoundtrip,
        Self::EndingCollection,
        Self::ServiceFailure,
        Self::CorruptStorage,
        Self::PartialSave,
        Self::ScriptedPlaythrough,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::MeterBounds => "meter-bounds",
            Self::LogWindow => "log-window",
            Self::SaveRoundtrip => "save-roundtrip",
            Self::EndingCollection => "ending-collection",
            Self::ServiceFailure => "service-failure",
            Self::CorruptStorage => "corrupt-storage",
            Self::PartialSave => "partial-save",
            Self::ScriptedPlaythrough => "scripted-playthrough",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Smoke => "New game, one choice, turn and log advance",
            Self::MeterBounds => "Random deltas never push a meter outside 0..=10",
            Self::LogWindow => "Dialogue log keeps only the most recent entries",
            Self::SaveRoundtrip => "Saved progress is restored by continue",
            Self::EndingCollection => "Endings are collected once per identity",
            Self::ServiceFailure => "Failed fetch keeps the applied choice and recovers",
            Self::CorruptStorage => "Unreadable slots degrade to empty",
            Self::PartialSave => "Handwritten saves take new-game defaults",
            Self::ScriptedPlaythrough => "Policy-driven play reaches a scripted ending",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    /// Run once; `seed` drives every random decision.
    pub async fn run(self, seed: u64) -> Result<()> {
        match self {
            Self::Smoke => smoke().await,
            Self::MeterBounds => meter_bounds(seed).await,
            Self::LogWindow => log_window(seed).await,
            Self::SaveRoundtrip => save_roundtrip(seed).await,
            Self::EndingCollection => ending_collection().await,
            Self::ServiceFailure => service_failure().await,
            Self::CorruptStorage => corrupt_storage().await,
            Self::PartialSave => partial_save().await,
            Self::ScriptedPlaythrough => scripted_playthrough(seed).await,
        }
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    Scenario::ALL
        .into_iter()
        .map(|s| (s.key(), s.description()))
        .collect()
}

fn offline(service: ScriptedStoryService, store: MemoryStore) -> OfflineController {
    SceneController::new(
        service,
        store,
        FixedClock::new(EPOCH_MS),
        GameConfig::default(),
    )
}

fn scene(speaker: &str, text: &str, choices: Vec<Choice>) -> Scene {
    Scene {
        speaker: Some(speaker.to_string()),
        text: Some(text.to_string()),
        choices,
        ..Scene::default()
    }
}

fn ending(kind: EndingKind, title: &str) -> Scene {
    Scene {
        text: Some("The canon closes.".to_string()),
        ending: Some(EndingPayload {
            kind,
            title: Some(title.to_string()),
            text: Some("Fin.".to_string()),
        }),
        ..Scene::default()
    }
}

fn random_delta(rng: &mut ChaCha8Rng) -> MeterDelta {
    MeterKind::ALL
        .into_iter()
        .fold(MeterDelta::default(), |delta, kind| {
            delta.with(kind, rng.gen_range(-20..=20))
        })
}

fn clamp_model(meters: &mut [i64; 5], delta: &MeterDelta) {
    for (value, kind) in meters.iter_mut().zip(MeterKind::ALL) {
        *value = (*value + delta.get(kind)).clamp(i64::from(METER_MIN), i64::from(METER_MAX));
    }
}

fn model_of(meters: &Meters) -> [i64; 5] {
    MeterKind::ALL.map(|kind| i64::from(meters.get(kind)))
}

async fn smoke() -> Result<()> {
    let opening = scene(
        "Archivist",
        "The index is burning.",
        vec![Choice::new("a", "LOYAL", "Save the index")
            .with_delta(MeterDelta::default().with(MeterKind::Trust, 1))],
    );
    let controller = offline(
        ScriptedStoryService::new()
            .then_scene(opening)
            .then_scene(scene("Archivist", "Ash settles.", Vec::new())),
        MemoryStore::new(),
    );
    let mut session = GameSession::new();
    let turn = controller.start_new_game(&mut session).await?;
    ensure!(session.state.turn == 1, "new game should start on turn 1");
    ensure!(turn.scene.choices.len() == 1, "opening scene lost its choices");

    controller.submit_choice_by_id(&mut session, "a").await?;
    ensure!(session.state.turn == 2, "turn did not advance");
    ensure!(session.state.log.len() == 1, "choice did not log the scene");
    ensure!(
        session.state.meters.trust == 7,
        "trust should be 7, got {}",
        session.state.meters.trust
    );
    let requests = controller.service().requests();
    ensure!(
        requests.last().and_then(|r| r.last_choice.as_ref()).map(|c| c.id.as_str()) == Some("a"),
        "request did not carry the last choice"
    );
    Ok(())
}

async fn meter_bounds(seed: u64) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let service = ScriptedStoryService::new().with_fallback(scene("Fate", "Again.", Vec::new()));
    let controller = offline(service, MemoryStore::new());
    let mut session = GameSession::new();
    controller.start_new_game(&mut session).await?;
    let mut model = model_of(&session.state.meters);

    for step in 0..50 {
        let delta = random_delta(&mut rng);
        let choice = Choice::new(format!("c{step}"), "ROLL", "Roll").with_delta(delta);
        controller.submit_choice(&mut session, &choice).await?;
        clamp_model(&mut model, &delta);
        let meters = session.state.meters;
        ensure!(meters.in_range(), "step {step}: meters out of range: {meters:?}");
        ensure!(
            model_of(&meters) == model,
            "step {step}: expected {model:?}, got {meters:?}"
        );
    }
    Ok(())
}

async fn log_window(seed: u64) -> Result<()> {
    let turns = 20 + usize::try_from(seed % 20).unwrap_or(0);
    let service = ScriptedStoryService::new();
    for i in 0..=turns {
        service.push_scene(scene(
            "Chorus",
            &format!("{i}: {}", "verse ".repeat(40)),
            vec![Choice::new("next", "ONWARD", "Continue")],
        ));
    }
    let controller = offline(service, MemoryStore::new());
    let mut session = GameSession::new();
    controller.start_new_game(&mut session).await?;
    for _ in 0..turns {
        controller.submit_choice_by_id(&mut session, "next").await?;
    }

    let log = &session.state.log;
    ensure!(
        log.len() == LOG_CAPACITY,
        "log holds {} entries, expected {LOG_CAPACITY}",
        log.len()
    );
    let newest = log.iter().last().context("log is empty")?;
    ensure!(
        newest.text.starts_with(&format!("{}:", turns - 1)),
        "newest entry is {:?}",
        newest.text
    );
    let summary = log.summary();
    ensure!(
        summary.chars().count() <= LOG_SUMMARY_MAX_CHARS,
        "summary is {} chars",
        summary.chars().count()
    );
    let sent = controller
        .service()
        .requests()
        .last()
        .map(|r| r.log.clone())
        .unwrap_or_default();
    ensure!(sent == summary, "request log differs from the session summary");
    Ok(())
}

async fn save_roundtrip(seed: u64) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let store = MemoryStore::new();
    let chaptered = Scene {
        chapter: Some("ACT II".to_string()),
        flags: Some(vec!["met_archivist".to_string()]),
        ..scene("Archivist", "Welcome back.", Vec::new())
    };
    let first = offline(
        ScriptedStoryService::new().with_fallback(chaptered.clone()),
        store.clone(),
    );
    let mut session = GameSession::new();
    first.start_new_game(&mut session).await?;
    for step in 0..5 {
        let choice = Choice::new(format!("s{step}"), "WALK", "Walk").with_delta(random_delta(&mut rng));
        first.submit_choice(&mut session, &choice).await?;
    }
    first.save(&session)?;

    let second = offline(ScriptedStoryService::new().with_fallback(chaptered), store);
    ensure!(second.persistence().has_save(), "save slot is empty");
    let mut restored = GameSession::new();
    second.continue_game(&mut restored).await?;
    ensure!(restored.state == session.state, "restored state differs");
    ensure!(restored.state.chapter == "ACT II", "chapter not restored");
    ensure!(
        second.service().request_count() == 1,
        "continue should fetch exactly one scene"
    );
    Ok(())
}

async fn ending_collection() -> Result<()> {
    let store = MemoryStore::new();
    let offer = || scene("Oracle", "Choose.", vec![Choice::new("end", "FINAL", "End it")]);
    let controller = offline(
        ScriptedStoryService::new()
            .then_scene(offer())
            .then_scene(ending(EndingKind::Good, "DAWN"))
            .then_scene(offer())
            .then_scene(ending(EndingKind::Good, "  DAWN "))
            .then_scene(offer())
            .then_scene(ending(EndingKind::Bad, "DAWN")),
        store,
    );

    let mut seen = Vec::new();
    for _ in 0..3 {
        let mut session = GameSession::new();
        controller.start_new_game(&mut session).await?;
        let turn = controller.submit_choice_by_id(&mut session, "end").await?;
        let notice = turn.ending.context("ending scene produced no notice")?;
        ensure!(turn.autosaved, "ending should autosave");
        seen.push((notice.id, notice.newly_collected));
    }

    ensure!(
        seen == vec![
            ("GOOD::DAWN".to_string(), true),
            ("GOOD::DAWN".to_string(), false),
            ("BAD::DAWN".to_string(), true),
        ],
        "unexpected collection sequence {seen:?}"
    );
    let endings = controller.persistence().get_endings();
    ensure!(endings.len() == 2, "gallery holds {} endings", endings.len());
    ensure!(endings.count(EndingKind::Good) == 1, "duplicate good ending");
    Ok(())
}

async fn service_failure() -> Result<()> {
    let controller = offline(
        ScriptedStoryService::new()
            .then_scene(scene(
                "Warden",
                "Halt.",
                vec![Choice::new("run", "DEFY", "Run")
                    .with_delta(MeterDelta::default().with(MeterKind::Fate, 3))],
            ))
            .then_error(ServiceError::Status {
                status: 503,
                body: "story engine asleep".to_string(),
            })
            .then_scene(scene("Warden", "You got away.", Vec::new())),
        MemoryStore::new(),
    );
    let mut session = GameSession::new();
    controller.start_new_game(&mut session).await?;

    let Err(err) = controller.submit_choice_by_id(&mut session, "run").await else {
        bail!("scripted failure was not reported");
    };
    ensure!(
        matches!(err, GameError::Service(ServiceError::Status { status: 503, .. })),
        "unexpected error {err}"
    );
    ensure!(
        err.user_message().contains("story engine asleep"),
        "message hides the body: {}",
        err.user_message()
    );
    ensure!(session.state.turn == 2, "failed fetch rolled the turn back");
    ensure!(session.state.meters.fate == 3, "failed fetch rolled the meters back");
    ensure!(
        session.scene.as_ref().and_then(|s| s.text.as_deref()) == Some("Halt."),
        "scene changed without a response"
    );

    controller.submit_choice_by_id(&mut session, "run").await?;
    ensure!(session.state.turn == 3, "retry did not advance");
    Ok(())
}

async fn corrupt_storage() -> Result<()> {
    let store = MemoryStore::new();
    let controller = offline(
        ScriptedStoryService::new().then_scene(ending(EndingKind::Bad, "ASH")),
        store.clone(),
    );
    let save_key = controller.config().save_key();
    let endings_key = controller.config().endings_key();
    store.set_item(&save_key, "{not json")?;
    store.set_item(&endings_key, "gallery?")?;

    let persistence = controller.persistence();
    ensure!(persistence.load().is_none(), "corrupt save was loaded");
    ensure!(persistence.get_endings().is_empty(), "corrupt endings were read");

    let mut session = GameSession::new();
    match controller.continue_game(&mut session).await {
        Err(GameError::InvalidSave) => {}
        other => bail!("continue over a corrupt save returned {other:?}"),
    }

    controller.start_new_game(&mut session).await?;
    let endings = persistence.get_endings();
    ensure!(endings.contains("BAD::ASH"), "ending not recorded over corrupt slot");
    ensure!(persistence.load().is_some(), "autosave did not replace corrupt save");
    Ok(())
}

async fn partial_save() -> Result<()> {
    let store = MemoryStore::new();
    let controller = offline(
        ScriptedStoryService::new().with_fallback(scene("Archivist", "Hm.", Vec::new())),
        store,
    );
    let imported = controller
        .persistence()
        .import_save(r#"{"turn":6,"chapter":"ACT III","state":{"sanity":42}}"#)?;
    ensure!(imported.turn == 6, "turn not imported");
    ensure!(imported.meters.sanity == METER_MAX, "sanity not clamped");
    ensure!(imported.meters == Meters { sanity: METER_MAX, ..Meters::default() }, "missing meters not defaulted");
    ensure!(imported.log.is_empty() && imported.flags.is_empty(), "collections not defaulted");

    let mut session = GameSession::new();
    controller.continue_game(&mut session).await?;
    ensure!(session.state == imported, "continue disagrees with import");

    ensure!(
        controller.persistence().import_save("[]").is_err(),
        "array accepted as a save"
    );
    ensure!(
        controller.persistence().load().as_ref() == Some(&imported),
        "rejected import touched the slot"
    );
    Ok(())
}

async fn scripted_playthrough(seed: u64) -> Result<()> {
    let length = 3 + usize::try_from(seed % 5).unwrap_or(0);
    let service = ScriptedStoryService::new();
    for i in 0..length {
        service.push_scene(scene(
            "Narrator",
            &format!("Scene {i}"),
            vec![
                Choice::new("left", "LEFT", "Left")
                    .with_delta(MeterDelta::default().with(MeterKind::Corruption, 2)),
                Choice::new("right", "RIGHT", "Right")
                    .with_delta(MeterDelta::default().with(MeterKind::Canonity, -2)),
            ],
        ));
    }
    service.push_scene(ending(EndingKind::Good, "THE LAST PAGE"));
    let controller = offline(service, MemoryStore::new());

    let report = run_playthrough(&controller, ChoicePolicy::Random, seed, 100).await;
    if let Some(error) = &report.error {
        bail!("playthrough failed: {error}");
    }
    ensure!(report.stop == StopReason::Ending, "stopped by {:?}", report.stop);
    ensure!(
        report.turns == u32::try_from(length + 1)?,
        "ended on turn {} instead of {}",
        report.turns,
        length + 1
    );
    ensure!(report.meters.in_range(), "meters out of range");
    ensure!(
        controller.persistence().get_endings().contains("GOOD::THE LAST PAGE"),
        "ending not collected"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(Scenario::from_key(scenario.key()), Some(scenario));
        }
        assert_eq!(Scenario::from_key("nope"), None);
        assert_eq!(list_scenarios().len(), Scenario::ALL.len());
    }

    #[test]
    fn clamp_model_matches_worked_example() {
        let mut model = [7, 0, 0, 0, 0];
        for amount in [5, 5, -20, 3] {
            clamp_model(&mut model, &MeterDelta::default().with(MeterKind::Canonity, amount));
        }
        assert_eq!(model[0], 3);
    }

    #[tokio::test]
    async fn every_scenario_passes_for_a_few_seeds() {
        for scenario in Scenario::ALL {
            for seed in [1, 42, 1337] {
                if let Err(e) = scenario.run(seed).await {
                    panic!("{} failed for seed {seed}: {e:#}", scenario.key());
                }
            }
        }
    }
}
