use crate::browser::{self, html};
use anyhow::{anyhow, Context, Error, Result};
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use futures::future::try_join_all;
use std::collections::HashMap;
// web assembly is single threaded, Rc RefCell over Arc Mutex
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Element, HtmlImageElement};

use self::input::KeyState;

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    /// Advance the simulation by `dt` seconds
    fn update(&mut self, keystate: &KeyState, dt: f64);
    fn draw(&self, renderer: &Renderer);
}

// length of a frame in milliseconds
const FRAME_SIZE: f64 = 1.0 / 60.0 * 1000.0;
// a backgrounded tab can hand us seconds of delta at once, cap it so we don't
// replay hundreds of steps in one frame
const MAX_ACCUMULATED_DELTA: f64 = 250.0;

pub struct GameLoop {
    last_frame: f64,
    accumulated_delta: f64,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let mut input_receiver = input::prepare_input()?;
        let mut game = game.initialize().await?;
        let mut game_loop = GameLoop {
            last_frame: browser::now()?,
            accumulated_delta: 0.0,
        };
        let renderer = Renderer::new()?;
        let mut keystate = KeyState::new();

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            input::process_input(&mut keystate, &mut input_receiver);

            game_loop.accumulated_delta += perf - game_loop.last_frame;
            if game_loop.accumulated_delta > MAX_ACCUMULATED_DELTA {
                log!(
                    "Frame took {:.1}ms, capping to {}ms",
                    game_loop.accumulated_delta,
                    MAX_ACCUMULATED_DELTA
                );
                game_loop.accumulated_delta = MAX_ACCUMULATED_DELTA;
            }
            while game_loop.accumulated_delta > FRAME_SIZE {
                game.update(&keystate, FRAME_SIZE / 1000.0);
                // events are consumed by the first step that sees them
                keystate.end_step();
                game_loop.accumulated_delta -= FRAME_SIZE;
            }
            game_loop.last_frame = perf;
            game.draw(&renderer);

            if let Some(callback) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(callback) {
                    error!("GameLoop stopped : {:#?}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub const fn new_from_x_y(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            position: Point { x, y },
            size: Size { width, height },
        }
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }
}

/// HUD text fields living outside the canvas. Any of them may be missing
/// from the page, in which case writes to it are dropped.
struct Scoreboard {
    level: Option<Element>,
    highest: Option<Element>,
    lives: Option<Element>,
}

impl Scoreboard {
    fn new() -> Result<Self> {
        Ok(Scoreboard {
            level: browser::find_element(html::LEVEL_DISPLAY)?,
            highest: browser::find_element(html::HIGHEST_DISPLAY)?,
            lives: browser::find_element(html::LIFE_DISPLAY)?,
        })
    }

    fn write(field: &Option<Element>, value: &str) {
        if let Some(element) = field {
            if element.text_content().as_deref() != Some(value) {
                element.set_text_content(Some(value));
            }
        }
    }
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
    scoreboard: Scoreboard,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        Ok(Renderer {
            context: browser::context()?,
            scoreboard: Scoreboard::new()?,
        })
    }

    pub fn clear(&self, rect: &Rect) {
        self.context
            .clear_rect(rect.x(), rect.y(), rect.width(), rect.height());
    }

    pub fn draw_image(&self, image: &HtmlImageElement, frame: &Rect, destination: &Rect) {
        self.context
            .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                image,
                frame.x(),
                frame.y(),
                frame.width(),
                frame.height(),
                destination.x(),
                destination.y(),
                destination.width(),
                destination.height(),
            )
            .expect("Drawing is throwing exceptions! Unrecoverable error");
    }

    pub fn draw_entire_image(&self, image: &HtmlImageElement, position: &Point) {
        self.context
            .draw_image_with_html_image_element(image, position.x, position.y)
            .expect("Drawing is throwing exceptions! Unrecoverable error");
    }

    pub fn draw_text(&self, text: &str, position: &Point, font: &str, color: &str) -> Result<()> {
        self.context.set_font(font);
        self.context.set_fill_style(&JsValue::from_str(color));
        self.context
            .fill_text(text, position.x, position.y)
            .map_err(|err| anyhow!("Error filling text '{}' : {:#?}", text, err))
    }

    pub fn show_scoreboard(&self, level: usize, highest: usize, lives: i32) {
        Scoreboard::write(&self.scoreboard.level, &level.to_string());
        Scoreboard::write(&self.scoreboard.highest, &highest.to_string());
        Scoreboard::write(&self.scoreboard.lives, &lives.to_string());
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::create_html_image_element()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[engine.rs::load_image] Error loading image: {:#?}",
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // ?? - first for the channel being cancelled, second for the load result
    rx.await??;

    Ok(image)
}

/// Image cache keyed by source path. Everything is loaded up front, the game
/// only starts once every image is ready.
pub struct Resources {
    images: HashMap<String, HtmlImageElement>,
}

impl Resources {
    pub async fn load(sources: &[&str]) -> Result<Self> {
        // images load in parallel, total time is the slowest image
        let images = try_join_all(sources.iter().map(|source| async move {
            load_image(source)
                .await
                .with_context(|| format!("Failed to load image resource from : {}", source))
                .map(|image| (source.to_string(), image))
        }))
        .await?;
        log!("Loaded {} images", images.len());

        Ok(Resources {
            images: images.into_iter().collect(),
        })
    }

    pub fn get(&self, source: &str) -> Result<&HtmlImageElement> {
        self.images
            .get(source)
            .ok_or_else(|| anyhow!("Image '{}' was never loaded", source))
    }
}

pub mod input {
    use crate::browser::{self, html};
    use anyhow::{anyhow, Result};
    use futures::channel::mpsc::{unbounded, UnboundedReceiver};
    use wasm_bindgen::JsCast;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum InputEvent {
        /// `KeyboardEvent.code`, e.g. "ArrowUp"
        KeyDown(String),
        KeyUp(String),
        Restart,
    }

    /// Events that arrived since the last simulation step. Held keys are
    /// tracked by whoever consumes the presses and releases.
    #[derive(Debug, Default)]
    pub struct KeyState {
        events: Vec<InputEvent>,
    }

    impl KeyState {
        pub fn new() -> Self {
            KeyState::default()
        }

        pub fn events(&self) -> &[InputEvent] {
            &self.events
        }

        pub fn record(&mut self, event: InputEvent) {
            self.events.push(event);
        }

        pub fn end_step(&mut self) {
            self.events.clear();
        }
    }

    pub fn process_input(state: &mut KeyState, receiver: &mut UnboundedReceiver<InputEvent>) {
        // Ok(None) means every sender is gone, Err means the queue is empty
        while let Ok(Some(event)) = receiver.try_next() {
            state.record(event);
        }
    }

    /// Wires keyboard and restart-button listeners into a single channel
    pub fn prepare_input() -> Result<UnboundedReceiver<InputEvent>> {
        let (keydown_sender, receiver) = unbounded();
        let keyup_sender = keydown_sender.clone();
        let restart_sender = keydown_sender.clone();

        let onkeydown = browser::closure_wrap(Box::new(move |event: web_sys::KeyboardEvent| {
            let _ = keydown_sender.unbounded_send(InputEvent::KeyDown(event.code()));
        }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);

        let onkeyup = browser::closure_wrap(Box::new(move |event: web_sys::KeyboardEvent| {
            let _ = keyup_sender.unbounded_send(InputEvent::KeyUp(event.code()));
        }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);

        let document = browser::document()?;
        document.set_onkeydown(Some(onkeydown.as_ref().unchecked_ref()));
        document.set_onkeyup(Some(onkeyup.as_ref().unchecked_ref()));
        onkeydown.forget();
        onkeyup.forget();

        match browser::find_element(html::RESTART_BUTTON)? {
            Some(button) => {
                let onclick = browser::closure_wrap(Box::new(move |_event: web_sys::MouseEvent| {
                    let _ = restart_sender.unbounded_send(InputEvent::Restart);
                }) as Box<dyn FnMut(web_sys::MouseEvent)>);
                button
                    .add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())
                    .map_err(|err| anyhow!("Could not listen to restart control : {:#?}", err))?;
                onclick.forget();
            }
            None => {
                log!("No restart control found at '{}'", html::RESTART_BUTTON);
            }
        }

        Ok(receiver)
    }

}
