//! JavaScript-facing game handle: one method per UI trigger.
use canonfall_game::{GameConfig, GameError, GameSession, SceneController, UiAction};
use js_sys::Promise;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::dom;
use crate::service::FetchStoryService;
use crate::storage::{BrowserStorage, JsClock};

type WebController = SceneController<FetchStoryService, BrowserStorage, JsClock>;

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

fn game_error(err: &GameError) -> JsValue {
    dom::console_error(&err.to_string());
    js_sys::Error::new(&err.user_message()).into()
}

#[wasm_bindgen]
pub struct GameHandle {
    controller: Rc<WebController>,
    session: Rc<RefCell<GameSession>>,
}

#[wasm_bindgen]
impl GameHandle {
    /// Build a handle from optional configuration JSON.
    ///
    /// # Errors
    /// Returns an error if the configuration is not valid JSON.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<GameHandle, JsValue> {
        let config = match config_json {
            Some(text) => GameConfig::from_json(&text)
                .map_err(|e| JsValue::from_str(&format!("invalid config: {e}")))?,
            None => GameConfig::default(),
        };
        let service = FetchStoryService::new(config.endpoint.clone());
        Ok(Self {
            controller: Rc::new(SceneController::new(
                service,
                BrowserStorage,
                JsClock,
                config,
            )),
            session: Rc::new(RefCell::new(GameSession::new())),
        })
    }

    #[wasm_bindgen(js_name = newGame)]
    pub fn new_game(&self) -> Promise {
        self.run(UiAction::NewGame)
    }

    #[wasm_bindgen(js_name = continueGame)]
    pub fn continue_game(&self) -> Promise {
        self.run(UiAction::Continue)
    }

    pub fn load(&self) -> Promise {
        self.run(UiAction::Load)
    }

    pub fn restart(&self) -> Promise {
        self.run(UiAction::Restart)
    }

    /// Run a UI trigger by its kebab-case name, e.g. `"open-log"`.
    pub fn perform(&self, action: &str) -> Promise {
        match action.parse::<UiAction>() {
            Ok(action) => self.run(action),
            Err(()) => Promise::reject(&js_sys::Error::new(&format!("unknown action {action}"))),
        }
    }

    #[wasm_bindgen(js_name = submitChoice)]
    pub fn submit_choice(&self, id: String) -> Promise {
        let controller = Rc::clone(&self.controller);
        let cell = Rc::clone(&self.session);
        future_to_promise(async move {
            let mut session = cell.borrow().clone();
            let result = controller.submit_choice_by_id(&mut session, &id).await;
            *cell.borrow_mut() = session;
            to_js(&result.map_err(|e| game_error(&e))?)
        })
    }

    /// # Errors
    /// Returns the player-facing message if the save cannot be written.
    pub fn save(&self) -> Result<(), JsValue> {
        self.controller
            .save(&self.session.borrow())
            .map_err(|e| game_error(&e))
    }

    /// # Errors
    /// Returns the player-facing message if the gallery cannot be written.
    #[wasm_bindgen(js_name = resetEndings)]
    pub fn reset_endings(&self) -> Result<(), JsValue> {
        self.controller
            .persistence()
            .reset_endings()
            .map_err(|e| game_error(&GameError::from(e)))
    }

    #[wasm_bindgen(js_name = hasSave)]
    pub fn has_save(&self) -> bool {
        self.controller.persistence().has_save()
    }

    /// # Errors
    /// Returns an error if the log cannot be converted to a JS value.
    #[wasm_bindgen(js_name = openLog)]
    pub fn open_log(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.borrow().state.log.to_vec())
    }

    /// # Errors
    /// Returns an error if the gallery cannot be converted to a JS value.
    #[wasm_bindgen(js_name = openEndings)]
    pub fn open_endings(&self) -> Result<JsValue, JsValue> {
        to_js(&self.controller.persistence().get_endings().sorted())
    }

    /// Current progress, for the HUD.
    ///
    /// # Errors
    /// Returns an error if the state cannot be converted to a JS value.
    pub fn session(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.borrow().state)
    }

    /// Scene currently on screen, or `null`.
    ///
    /// # Errors
    /// Returns an error if the scene cannot be converted to a JS value.
    pub fn scene(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.borrow().scene)
    }

    #[wasm_bindgen(js_name = exportSave)]
    pub fn export_save(&self) -> Option<String> {
        self.controller.persistence().export_save()
    }

    /// # Errors
    /// Returns the player-facing message if the text holds no valid save.
    #[wasm_bindgen(js_name = importSave)]
    pub fn import_save(&self, text: &str) -> Result<(), JsValue> {
        self.controller
            .persistence()
            .import_save(text)
            .map(|_| ())
            .map_err(|e| game_error(&GameError::from(e)))
    }
}

impl GameHandle {
    fn run(&self, action: UiAction) -> Promise {
        let controller = Rc::clone(&self.controller);
        let cell = Rc::clone(&self.session);
        future_to_promise(async move {
            let mut session = cell.borrow().clone();
            let result = controller.perform(&mut session, action).await;
            *cell.borrow_mut() = session;
            to_js(&result.map_err(|e| game_error(&e))?)
        })
    }
}
