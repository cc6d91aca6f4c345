//! Turn orchestration: apply a choice, fetch the next scene, collect endings.
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::clock::SystemClock;
use crate::config::GameConfig;
use crate::persistence::{Persistence, PersistenceError, ending_id};
use crate::request::StoryRequest;
use crate::scene::{Choice, EndingKind, EndingPayload, Scene};
use crate::service::ServiceError;
use crate::session::{PartialSession, SessionState};
use crate::{Clock, KeyValueStore, StoryService};

/// A single game instance: progress plus the scene currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GameSession {
    pub state: SessionState,
    #[serde(default)]
    pub scene: Option<Scene>,
}

impl GameSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }
}

/// Ending reached during a turn, as shown on the ending overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndingNotice {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EndingKind,
    pub title: String,
    pub text: String,
    /// True only the first time this ending enters the gallery.
    pub newly_collected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub scene: Scene,
    pub ending: Option<EndingNotice>,
    pub autosaved: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("no saved game to load")]
    InvalidSave,
    #[error("choice {0:?} is not offered by the current scene")]
    UnknownChoice(String),
}

impl GameError {
    /// Single dismissible message for the player.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Service(ServiceError::Status { status, body }) => {
                format!("The story could not continue (HTTP {status}): {body}")
            }
            Self::Service(_) => "The story service could not be reached.".to_string(),
            Self::Persistence(e) => format!("Saving failed: {e}"),
            Self::InvalidSave => "There is no saved game to load.".to_string(),
            Self::UnknownChoice(_) => "That choice is no longer available.".to_string(),
        }
    }
}

/// Drives play for any [`GameSession`] handed to it.
///
/// The controller owns the collaborators; sessions are owned by the caller and
/// passed in by `&mut` so several games can share one controller.
pub struct SceneController<C, S, K = SystemClock> {
    service: C,
    persistence: Persistence<S, K>,
    config: GameConfig,
}

impl<C, S, K> SceneController<C, S, K>
where
    C: StoryService,
    S: KeyValueStore,
    K: Clock,
{
    pub fn new(service: C, store: S, clock: K, config: GameConfig) -> Self {
        let persistence = Persistence::new(store, clock, &config);
        Self {
            service,
            persistence,
            config,
        }
    }

    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    pub const fn persistence(&self) -> &Persistence<S, K> {
        &self.persistence
    }

    pub const fn service(&self) -> &C {
        &self.service
    }

    /// Reset `session` to new-game values and fetch the opening scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the story service fails; the reset still stands.
    pub async fn start_new_game(&self, session: &mut GameSession) -> Result<TurnOutcome, GameError> {
        *session = GameSession::new();
        info!("starting new game");
        self.advance(session).await
    }

    /// Replace `session` with `saved` and fetch the scene that follows it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidSave`] when `saved` is `None`, or a service error.
    pub async fn load_game(
        &self,
        session: &mut GameSession,
        saved: Option<PartialSession>,
    ) -> Result<TurnOutcome, GameError> {
        let saved = saved.ok_or(GameError::InvalidSave)?;
        *session = GameSession {
            state: saved.into_session(),
            scene: None,
        };
        info!(
            "restored turn {} ({})",
            session.state.turn, session.state.chapter
        );
        self.advance(session).await
    }

    /// [`SceneController::load_game`] fed from the save slot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidSave`] when there is no readable save, or a service error.
    pub async fn continue_game(&self, session: &mut GameSession) -> Result<TurnOutcome, GameError> {
        let saved = self.persistence.load_partial();
        self.load_game(session, saved).await
    }

    /// Apply `choice` to `session` and fetch the next scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the story service fails. The choice is not rolled
    /// back, so the session may be ahead of the scene on screen.
    pub async fn submit_choice(
        &self,
        session: &mut GameSession,
        choice: &Choice,
    ) -> Result<TurnOutcome, GameError> {
        session.state.record_choice(choice, session.scene.as_ref());
        debug!(
            "turn {} after choice {} [{}]",
            session.state.turn, choice.id, choice.tag
        );
        self.advance(session).await
    }

    /// Look `id` up among the current scene's choices and submit it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownChoice`] without touching the session when the
    /// current scene offers no such choice; otherwise as [`SceneController::submit_choice`].
    pub async fn submit_choice_by_id(
        &self,
        session: &mut GameSession,
        id: &str,
    ) -> Result<TurnOutcome, GameError> {
        let choice = session
            .scene
            .as_ref()
            .and_then(|scene| scene.choice(id))
            .cloned()
            .ok_or_else(|| GameError::UnknownChoice(id.to_string()))?;
        self.submit_choice(session, &choice).await
    }

    /// Snapshot `session` into the save slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn save(&self, session: &GameSession) -> Result<(), GameError> {
        self.persistence.save(&session.state)?;
        Ok(())
    }

    async fn advance(&self, session: &mut GameSession) -> Result<TurnOutcome, GameError> {
        let request = StoryRequest::from(&session.state);
        let scene = self
            .service
            .next_scene(&request)
            .await
            .inspect_err(|e| warn!("story request for turn {} failed: {e}", session.state.turn))?;
        session.state.absorb_scene(&scene);
        session.scene = Some(scene.clone());

        let (ending, autosaved) = match &scene.ending {
            Some(payload) => self.finish(session, payload),
            None => (None, false),
        };
        Ok(TurnOutcome {
            scene,
            ending,
            autosaved,
        })
    }

    /// Collect the ending and optionally autosave. Storage failures here are
    /// logged and reported through the notice instead of aborting the turn.
    fn finish(&self, session: &GameSession, payload: &EndingPayload) -> (Option<EndingNotice>, bool) {
        let title = payload.title_or_default().trim().to_string();
        let receipt = self.persistence.collect_ending(payload);
        let (id, newly_collected) = match receipt {
            Ok(receipt) => (receipt.id, receipt.newly_collected),
            Err(e) => {
                warn!("could not record ending: {e}");
                (ending_id(payload.kind, &title), false)
            }
        };
        info!("ending reached: {id}");

        let autosaved = self.config.autosave_on_ending
            && match self.persistence.save(&session.state) {
                Ok(()) => true,
                Err(e) => {
                    warn!("autosave at ending failed: {e}");
                    false
                }
            };

        let notice = EndingNotice {
            id,
            kind: payload.kind,
            title,
            text: payload.text_or_default().to_string(),
            newly_collected,
        };
        (Some(notice), autosaved)
    }
}
