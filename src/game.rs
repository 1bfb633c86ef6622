use crate::engine::input::{InputEvent, KeyState};
use crate::engine::{Game, Point, Rect, Renderer, Resources};
use crate::level::Levels;
use crate::sprite::grid::{self, CELL_HEIGHT, CELL_WIDTH};
use crate::sprite::player::InputKind;
use crate::sprite::{Direction, Entity, Texture};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

/// TABLE
/// ┌────────────────────────── Level Lifecycle ──────────────────────────────┐
/// │                                                                         │
/// │   Loading ──► Intro ──(pause ends)──► Playing ──(collision)──► Dying    │
/// │                 ▲                        │                       │      │
/// │                 │                    (goal row)              (reset)    │
/// │                 │                        ▼                       │      │
/// │                 └──────(reset)──── LevelComplete                 │      │
/// │                 ▲                        │                       │      │
/// │                 │                 (no next level)                │      │
/// │                 │                        ▼                       │      │
/// │                 │                       Won        Lost ◄─(no lives)    │
/// │                 └───────────────────(lives left)─────────────────┘      │
/// │                                                                         │
/// ├──────────────────────────── Frame Tick ─────────────────────────────────┤
/// │  1. advance clock                                                       │
/// │  2. route input (arrow keys to the player, restart to the Director)     │
/// │  3. fire due deadlines : reset, pause, message                          │
/// │  4. Playing and not paused : update ─► collisions ─► goal               │
/// │  5. draw, every frame                                                   │
/// └─────────────────────────────────────────────────────────────────────────┘
pub enum Crossing {
    /// Images are still loading
    Loading,
    Loaded(World),
}

pub struct World {
    director: Director,
    resources: Resources,
}

impl Crossing {
    pub fn new() -> Self {
        Crossing::Loading
    }
}

impl Default for Crossing {
    fn default() -> Self {
        Crossing::new()
    }
}

#[async_trait(?Send)]
impl Game for Crossing {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            Crossing::Loading => {
                let sources = Texture::ALL.map(Texture::source);
                let resources = Resources::load(&sources)
                    .await
                    .context("Failed to load game images")?;
                let director = Director::new(Levels::default());
                Ok(Box::new(Crossing::Loaded(World {
                    director,
                    resources,
                })))
            }
            Crossing::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, keystate: &KeyState, dt: f64) {
        if let Crossing::Loaded(world) = self {
            world.director.tick(keystate.events(), dt);
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let Crossing::Loaded(world) = self {
            world.director.draw(renderer, &world.resources);
        }
    }
}

// durations in milliseconds
mod timing {
    pub const INTRO_PAUSE: f64 = 1500.0;
    pub const INTRO_BANNER: f64 = 1500.0;
    pub const DEATH_PAUSE: f64 = 3000.0;
    pub const DEATH_BANNER: f64 = 1500.0;
    pub const DEATH_RESET: f64 = 1600.0;
    pub const COMPLETE_PAUSE: f64 = 2200.0;
    pub const COMPLETE_BANNER: f64 = 2000.0;
    pub const COMPLETE_RESET: f64 = 2100.0;
}

const STARTING_LEVEL: usize = 1;
const STARTING_LIVES: i32 = 2;

/// The goal row, reaching it completes the level
const GOAL_Y: f64 = 0.0;

const ROW_TEXTURES: [Texture; grid::ROWS] = [
    Texture::StoneBlock,
    Texture::GrassBlock,
    Texture::GrassBlock,
    Texture::GrassBlock,
    Texture::GrassBlock,
    Texture::GrassBlock,
    Texture::StoneBlock,
];

struct Banner {
    position: Point,
    font: &'static str,
    color: &'static str,
}

const LEVEL_BANNER: Banner = Banner {
    position: Point { x: 265.0, y: 285.0 },
    font: "72px Creepster",
    color: "red",
};
const DIED_BANNER: Banner = Banner {
    position: Point { x: 125.0, y: 285.0 },
    font: "72px Nosifer",
    color: "red",
};
const COMPLETE_BANNER: Banner = Banner {
    position: Point { x: 155.0, y: 285.0 },
    font: "72px Creepster",
    color: "white",
};
const WON_BANNER: Banner = Banner {
    position: Point { x: 195.0, y: 292.0 },
    font: "96px Creepster",
    color: "white",
};
const LOST_BANNER: Banner = Banner {
    position: Point { x: 110.0, y: 285.0 },
    font: "72px Nosifer",
    color: "black",
};

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub text: String,
    pub position: Point,
    pub font: &'static str,
    pub color: &'static str,
    /// None keeps the message up until it is replaced
    expires_at: Option<f64>,
}

/// Values shown in the page's level / highest level / lives fields
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Scoreboard {
    pub level: usize,
    pub highest: usize,
    pub lives: i32,
}

/// Everything that survives a level reset. Timers are deadlines on `clock`,
/// a later request replaces an earlier one instead of racing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub current_level: usize,
    pub highest_level: usize,
    pub extra_lives: i32,
    scoreboard: Scoreboard,
    clock: f64,
    paused_until: Option<f64>,
    reset_at: Option<f64>,
    message: Option<Message>,
}

impl Session {
    pub fn new() -> Self {
        Session {
            current_level: STARTING_LEVEL,
            highest_level: 0,
            extra_lives: STARTING_LIVES,
            scoreboard: Scoreboard::default(),
            clock: 0.0,
            paused_until: None,
            reset_at: None,
            message: None,
        }
    }

    /// Milliseconds of simulated time
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn is_paused(&self) -> bool {
        self.paused_until.is_some()
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn scoreboard(&self) -> Scoreboard {
        self.scoreboard
    }

    /// Back to level one with full lives, the highest level is kept
    fn restart(&mut self) {
        self.current_level = STARTING_LEVEL;
        self.extra_lives = STARTING_LIVES;
        self.paused_until = None;
        self.reset_at = None;
        self.message = None;
    }

    fn advance(&mut self, elapsed: f64) {
        self.clock += elapsed;
    }

    fn pause(&mut self, duration: f64) {
        self.paused_until = Some(self.clock + duration);
    }

    fn schedule_reset(&mut self, delay: f64) {
        self.reset_at = Some(self.clock + delay);
    }

    fn show(&mut self, text: impl Into<String>, banner: &Banner, duration: Option<f64>) {
        self.message = Some(Message {
            text: text.into(),
            position: banner.position,
            font: banner.font,
            color: banner.color,
            expires_at: duration.map(|duration| self.clock + duration),
        });
    }

    /// True once per scheduled reset, when its deadline has passed
    fn take_due_reset(&mut self) -> bool {
        match self.reset_at {
            Some(at) if at <= self.clock => {
                self.reset_at = None;
                true
            }
            _ => false,
        }
    }

    fn expire_timers(&mut self) {
        if self.paused_until.is_some_and(|until| until <= self.clock) {
            self.paused_until = None;
        }
        let message_expired = self
            .message
            .as_ref()
            .and_then(|message| message.expires_at)
            .is_some_and(|at| at <= self.clock);
        if message_expired {
            self.message = None;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Paused behind the "LEVEL N" banner
    Intro,
    Playing,
    /// Hit by an enemy, waiting for the reset
    Dying,
    LevelComplete,
    Won,
    Lost,
}

/// Runs the level lifecycle on top of the level registry
pub struct Director {
    session: Session,
    levels: Levels,
    phase: Phase,
}

impl Director {
    /// Takes ownership of the registry and starts its first level
    pub fn new(levels: Levels) -> Self {
        let mut director = Director {
            session: Session::new(),
            levels,
            phase: Phase::Intro,
        };
        director.reset();
        director
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn levels(&self) -> &Levels {
        &self.levels
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// One simulation step of `dt` seconds
    pub fn tick(&mut self, events: &[InputEvent], dt: f64) {
        self.session.advance(dt * 1000.0);

        for event in events {
            self.handle_event(event);
        }

        if self.session.take_due_reset() {
            self.reset();
        }
        self.session.expire_timers();
        if self.phase == Phase::Intro && !self.session.is_paused() {
            self.phase = Phase::Playing;
        }

        if self.phase == Phase::Playing && !self.session.is_paused() {
            self.update_entities(dt);
            if !self.check_collisions() {
                self.check_goal();
            }
        }
    }

    pub fn restart(&mut self) {
        log!("Restarting from level {}", STARTING_LEVEL);
        self.session.restart();
        self.reset();
    }

    fn handle_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(code) => {
                if let Some(direction) = Direction::from_key_code(code) {
                    self.levels.handle_input(InputKind::Press, direction);
                }
            }
            InputEvent::KeyUp(code) => {
                if let Some(direction) = Direction::from_key_code(code) {
                    self.levels.handle_input(InputKind::Release, direction);
                }
            }
            InputEvent::Restart => self.restart(),
        }
    }

    fn update_entities(&mut self, dt: f64) {
        if let Some((player, enemies)) = self.levels.entities_mut() {
            player.update(dt);
            for enemy in enemies.iter_mut() {
                enemy.update(dt);
            }
        }
    }

    /// Stops at the first enemy touching the player
    fn check_collisions(&mut self) -> bool {
        let Some(player) = self.levels.player() else {
            return false;
        };
        let hit = self
            .levels
            .enemies()
            .iter()
            .any(|enemy| enemy.sprite().collides_with(player.sprite()));
        if hit {
            self.die();
        }
        hit
    }

    fn check_goal(&mut self) {
        let reached = self
            .levels
            .player()
            .is_some_and(|player| player.sprite().position.y == GOAL_Y);
        if reached {
            self.complete_level();
        }
    }

    fn die(&mut self) {
        self.session.extra_lives -= 1;
        log!(
            "Died on level {}, {} extra lives left",
            self.session.current_level,
            self.session.extra_lives
        );
        self.phase = Phase::Dying;
        self.session.pause(timing::DEATH_PAUSE);
        self.session
            .show("YOU DIED", &DIED_BANNER, Some(timing::DEATH_BANNER));
        self.session.schedule_reset(timing::DEATH_RESET);
    }

    fn complete_level(&mut self) {
        log!("Level {} complete", self.session.current_level);
        self.session.highest_level = self.session.highest_level.max(self.session.current_level);
        self.session.current_level += 1;
        self.phase = Phase::LevelComplete;
        self.session.pause(timing::COMPLETE_PAUSE);
        self.session
            .show("LEVEL COMPLETE", &COMPLETE_BANNER, Some(timing::COMPLETE_BANNER));
        self.session.schedule_reset(timing::COMPLETE_RESET);
    }

    /// Tears the level down and builds whatever comes next
    fn reset(&mut self) {
        self.levels.clear();

        if self.session.extra_lives < 0 {
            log!("Out of lives on level {}", self.session.current_level);
            self.session.show("YOU LOST!", &LOST_BANNER, None);
            self.phase = Phase::Lost;
            return;
        }

        self.session.scoreboard.highest = self.session.highest_level;
        self.session.scoreboard.lives = self.session.extra_lives;

        let level = self.session.current_level;
        if self.levels.run(level - 1) {
            log!("Starting level {}", level);
            self.session.scoreboard.level = level;
            self.session.pause(timing::INTRO_PAUSE);
            self.session
                .show(format!("LEVEL {}", level), &LEVEL_BANNER, Some(timing::INTRO_BANNER));
            self.phase = Phase::Intro;
        } else {
            log!("All {} levels cleared", self.levels.len());
            self.session.show("YOU WON!", &WON_BANNER, None);
            self.phase = Phase::Won;
        }
    }

    pub fn draw(&self, renderer: &Renderer, resources: &Resources) {
        renderer.clear(&Rect::new_from_x_y(
            0.0,
            0.0,
            grid::CANVAS_WIDTH,
            grid::CANVAS_HEIGHT,
        ));
        if let Err(err) = self.draw_scene(renderer, resources) {
            error!("Could not draw frame : {:#?}", err);
        }

        let scoreboard = self.session.scoreboard();
        renderer.show_scoreboard(scoreboard.level, scoreboard.highest, scoreboard.lives);
    }

    // Draw order matters : board -> player -> enemies -> message
    fn draw_scene(&self, renderer: &Renderer, resources: &Resources) -> Result<()> {
        for (row, texture) in ROW_TEXTURES.iter().enumerate() {
            let image = resources.get(texture.source())?;
            for column in 0..grid::COLUMNS {
                let position = Point {
                    x: column as f64 * CELL_WIDTH,
                    y: row as f64 * CELL_HEIGHT,
                };
                renderer.draw_entire_image(image, &position);
            }
        }

        if let Some(player) = self.levels.player() {
            player.draw(renderer, resources)?;
        }
        for enemy in self.levels.enemies() {
            enemy.draw(renderer, resources)?;
        }

        if let Some(message) = self.session.message() {
            renderer.draw_text(&message.text, &message.position, message.font, message.color)?;
        }
        Ok(())
    }
}
