// ==================== Imports ====================
use wasm_bindgen::prelude::*;

#[macro_use]
pub mod browser;
pub mod engine;
pub mod game;
pub mod level;
pub mod sprite;

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - installs the panic hook
/// - loads every image, then starts the game loop
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();

    browser::spawn_local(async move {
        let game = game::Crossing::new();
        if let Err(err) = engine::GameLoop::start(game).await {
            error!("Could not start the game : {:#?}", err);
        }
    });

    Ok(())
}
