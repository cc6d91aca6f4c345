//! Automated playthroughs: pick choices by policy until an ending or a turn cap.
use canonfall_game::{
    Choice, Clock, EndingNotice, GameSession, KeyValueStore, Meters, SceneController,
    StoryService,
};
use clap::ValueEnum;
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoicePolicy {
    /// Always take the first offered choice
    First,
    /// Take the last offered choice
    Last,
    /// Seeded uniform pick
    Random,
}

impl ChoicePolicy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Random => "random",
        }
    }
}

struct Picker {
    policy: ChoicePolicy,
    rng: ChaCha8Rng,
}

impl Picker {
    fn new(policy: ChoicePolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn pick<'a>(&mut self, choices: &'a [Choice]) -> Option<&'a Choice> {
        match self.policy {
            ChoicePolicy::First => choices.first(),
            ChoicePolicy::Last => choices.last(),
            ChoicePolicy::Random if choices.is_empty() => None,
            ChoicePolicy::Random => choices.get(self.rng.gen_range(0..choices.len())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Ending,
    NoChoices,
    TurnLimit,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaythroughReport {
    pub policy: ChoicePolicy,
    pub seed: u64,
    pub turns: u32,
    pub chapter: String,
    pub meters: Meters,
    pub stop: StopReason,
    pub ending: Option<EndingNotice>,
    pub error: Option<String>,
    pub transcript: Vec<String>,
}

impl PlaythroughReport {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Play one game from a fresh session.
///
/// Service errors end the run and are recorded in the report instead of being
/// returned, so a partial transcript is always available.
pub async fn run_playthrough<C, S, K>(
    controller: &SceneController<C, S, K>,
    policy: ChoicePolicy,
    seed: u64,
    max_turns: u32,
) -> PlaythroughReport
where
    C: StoryService,
    S: KeyValueStore,
    K: Clock,
{
    let mut picker = Picker::new(policy, seed);
    let mut session = GameSession::new();
    let mut transcript = Vec::new();
    let mut ending = None;
    let mut error = None;

    let mut outcome = controller.start_new_game(&mut session).await;
    let stop = loop {
        let turn = match outcome {
            Ok(turn) => turn,
            Err(e) => {
                error = Some(e.user_message());
                break StopReason::Error;
            }
        };
        transcript.push(format!(
            "[{}] {}: {}",
            session.state.turn,
            turn.scene.speaker_or_default(),
            turn.scene.text_or_default()
        ));
        if let Some(notice) = turn.ending {
            transcript.push(format!("== {} ending: {} ==", notice.kind, notice.title));
            ending = Some(notice);
            break StopReason::Ending;
        }
        if session.state.turn >= max_turns {
            break StopReason::TurnLimit;
        }
        let Some(choice) = picker.pick(&turn.scene.choices).cloned() else {
            break StopReason::NoChoices;
        };
        transcript.push(format!("  > {} [{}]", choice.label, choice.tag));
        outcome = controller.submit_choice(&mut session, &choice).await;
    };

    info!(
        "playthrough stopped after turn {} ({stop:?})",
        session.state.turn
    );
    PlaythroughReport {
        policy,
        seed,
        turns: session.state.turn,
        chapter: session.state.chapter.clone(),
        meters: session.state.meters,
        stop,
        ending,
        error,
        transcript,
    }
}
