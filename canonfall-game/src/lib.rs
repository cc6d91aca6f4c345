//! Canonfall Game Runtime
//!
//! Platform-agnostic core of the Canonfall narrative game: bounded meters,
//! session progress, save slot and endings gallery, and the scene controller
//! that drives turns against a remote story service.
//! This crate provides the runtime without UI or platform-specific dependencies.

pub mod actions;
pub mod clock;
pub mod config;
pub mod constants;
pub mod controller;
pub mod meters;
pub mod numbers;
pub mod persistence;
pub mod request;
pub mod scene;
pub mod service;
pub mod session;

// Re-export commonly used types
pub use actions::{ActionOutcome, UiAction};
pub use clock::{FixedClock, SystemClock};
pub use config::GameConfig;
pub use controller::{EndingNotice, GameError, GameSession, SceneController, TurnOutcome};
pub use meters::{MeterDelta, MeterKind, Meters};
pub use persistence::{
    EndingReceipt, EndingRecord, EndingsCollection, MemoryStore, Persistence, PersistenceError,
    SaveRecord, ending_id,
};
pub use request::StoryRequest;
pub use scene::{Choice, EndingKind, EndingPayload, Scene};
pub use service::{ScriptedStoryService, ServiceError, decode_response};
pub use session::{DialogueLog, LastChoice, LogEntry, PartialSession, SessionState};

/// Trait for abstracting string key-value persistence
/// Platform-specific implementations should provide this
pub trait KeyValueStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage rejects the write.
    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Remove `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage rejects the removal.
    fn remove_item(&self, key: &str) -> Result<(), Self::Error>;
}

/// Trait for abstracting the remote story generator
///
/// Futures are not required to be `Send`; the browser runtime is single-threaded.
#[async_trait::async_trait(?Send)]
pub trait StoryService {
    /// Request the scene that follows the progress described by `request`
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an
    /// unreadable response body.
    async fn next_scene(&self, request: &StoryRequest) -> Result<Scene, ServiceError>;
}

/// Source of wall-clock timestamps in milliseconds since the Unix epoch
pub trait Clock {
    fn now_ms(&self) -> i64;
}
