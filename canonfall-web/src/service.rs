//! Story service client over `window.fetch`.
use async_trait::async_trait;
use canonfall_game::{Scene, ServiceError, StoryRequest, StoryService, decode_response};
use log::debug;

use crate::dom;

#[derive(Debug, Clone)]
pub struct FetchStoryService {
    endpoint: String,
}

impl FetchStoryService {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl StoryService for FetchStoryService {
    async fn next_scene(&self, request: &StoryRequest) -> Result<Scene, ServiceError> {
        let body = request
            .to_json()
            .map_err(|e| ServiceError::Network(format!("could not encode request: {e}")))?;
        debug!("POST {} ({} bytes)", self.endpoint, body.len());
        let (status, text) = dom::post_json(&self.endpoint, &body)
            .await
            .map_err(|e| ServiceError::Network(dom::js_error_message(&e)))?;
        decode_response(status, &text)
    }
}
