//! Named UI triggers and their mapping onto controller operations.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::controller::{GameError, GameSession, SceneController, TurnOutcome};
use crate::persistence::EndingRecord;
use crate::session::LogEntry;
use crate::{Clock, KeyValueStore, StoryService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UiAction {
    NewGame,
    Continue,
    Save,
    Load,
    Restart,
    ResetEndings,
    OpenLog,
    OpenEndings,
}

impl UiAction {
    pub const ALL: [Self; 8] = [
        Self::NewGame,
        Self::Continue,
        Self::Save,
        Self::Load,
        Self::Restart,
        Self::ResetEndings,
        Self::OpenLog,
        Self::OpenEndings,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewGame => "new-game",
            Self::Continue => "continue",
            Self::Save => "save",
            Self::Load => "load",
            Self::Restart => "restart",
            Self::ResetEndings => "reset-endings",
            Self::OpenLog => "open-log",
            Self::OpenEndings => "open-endings",
        }
    }
}

impl fmt::Display for UiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UiAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum ActionOutcome {
    Turn(TurnOutcome),
    Saved,
    EndingsReset,
    Log(Vec<LogEntry>),
    Endings(Vec<EndingRecord>),
}

impl<C, S, K> SceneController<C, S, K>
where
    C: StoryService,
    S: KeyValueStore,
    K: Clock,
{
    /// Run the operation bound to `action`.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying operation.
    pub async fn perform(
        &self,
        session: &mut GameSession,
        action: UiAction,
    ) -> Result<ActionOutcome, GameError> {
        match action {
            UiAction::NewGame | UiAction::Restart => self
                .start_new_game(session)
                .await
                .map(ActionOutcome::Turn),
            UiAction::Continue | UiAction::Load => {
                self.continue_game(session).await.map(ActionOutcome::Turn)
            }
            UiAction::Save => {
                self.save(session)?;
                Ok(ActionOutcome::Saved)
            }
            UiAction::ResetEndings => {
                self.persistence().reset_endings()?;
                Ok(ActionOutcome::EndingsReset)
            }
            UiAction::OpenLog => Ok(ActionOutcome::Log(session.state.log.to_vec())),
            UiAction::OpenEndings => Ok(ActionOutcome::Endings(
                self.persistence().get_endings().sorted(),
            )),
        }
    }
}
