//! Browser-backed implementations of the core persistence seams.
use canonfall_game::numbers::round_f64_to_i64;
use canonfall_game::{Clock, KeyValueStore};

use crate::dom;

#[derive(Debug, thiserror::Error)]
#[error("Storage error: {0}")]
pub struct WebStorageError(String);

impl From<wasm_bindgen::JsValue> for WebStorageError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        Self(dom::js_error_message(&value))
    }
}

/// Key-value store over `window.localStorage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl KeyValueStore for BrowserStorage {
    type Error = WebStorageError;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(dom::local_storage()?.get_item(key)?)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        Ok(dom::local_storage()?.set_item(key, value)?)
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        Ok(dom::local_storage()?.remove_item(key)?)
    }
}

/// Clock reading `Date.now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> i64 {
        round_f64_to_i64(dom::now_ms())
    }
}
