//! Story service errors and an in-process scripted implementation.
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::VecDeque;

use crate::StoryService;
use crate::request::StoryRequest;
use crate::scene::Scene;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The service answered with a non-success status; `body` is its diagnostic text.
    #[error("story service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("story service unreachable: {0}")]
    Network(String),
    #[error("story service sent an unreadable scene: {0}")]
    Decode(String),
}

/// Map an HTTP status and body to a scene; 2xx bodies are decoded, anything
/// else is a [`ServiceError::Status`] carrying the body.
///
/// # Errors
///
/// Returns [`ServiceError::Status`] for non-2xx statuses and
/// [`ServiceError::Decode`] for bodies that are not a scene.
pub fn decode_response(status: u16, body: &str) -> Result<Scene, ServiceError> {
    if !(200..300).contains(&status) {
        return Err(ServiceError::Status {
            status,
            body: body.to_string(),
        });
    }
    Scene::from_json(body).map_err(|e| ServiceError::Decode(e.to_string()))
}

/// Replays queued replies in order and records every request it receives.
///
/// Once the queue is drained it answers with the fallback scene, or with a
/// network error when no fallback is set.
#[derive(Debug, Default)]
pub struct ScriptedStoryService {
    replies: RefCell<VecDeque<Result<Scene, ServiceError>>>,
    requests: RefCell<Vec<StoryRequest>>,
    fallback: Option<Scene>,
}

impl ScriptedStoryService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fallback(mut self, scene: Scene) -> Self {
        self.fallback = Some(scene);
        self
    }

    #[must_use]
    pub fn then_scene(self, scene: Scene) -> Self {
        self.push_scene(scene);
        self
    }

    #[must_use]
    pub fn then_error(self, error: ServiceError) -> Self {
        self.push_error(error);
        self
    }

    pub fn push_scene(&self, scene: Scene) {
        self.replies.borrow_mut().push_back(Ok(scene));
    }

    pub fn push_error(&self, error: ServiceError) {
        self.replies.borrow_mut().push_back(Err(error));
    }

    #[must_use]
    pub fn requests(&self) -> Vec<StoryRequest> {
        self.requests.borrow().clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

#[async_trait(?Send)]
impl StoryService for ScriptedStoryService {
    async fn next_scene(&self, request: &StoryRequest) -> Result<Scene, ServiceError> {
        self.requests.borrow_mut().push(request.clone());
        let next = self.replies.borrow_mut().pop_front();
        match next {
            Some(reply) => reply,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ServiceError::Network("script exhausted".to_string())),
        }
    }
}
