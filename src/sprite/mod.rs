// ┌──────────────────────────────────────────────────────────────────────────┐
// │                        Sprite Layering                                   │
// ├───────────────────┬──────────────────────────────────────────────────────┤
// │ File              │ Adds                                                 │
// ├───────────────────┼──────────────────────────────────────────────────────┤
// │ mod.rs            │ Sprite: texture, frame, position, velocity, hitbox   │
// │ unit.rs           │ Unit: one-cell moves, walk cycle, Behavior scripts   │
// │ player.rs         │ Player: held-key steering, board bounds              │
// └───────────────────┴──────────────────────────────────────────────────────┘
// Each layer wraps the one above it instead of inheriting, and all three share
// the Entity trait.
pub mod player;
pub mod unit;

use crate::engine::{Point, Rect, Renderer, Resources, Size};
use anyhow::Result;

/// Board geometry, in canvas pixels
pub mod grid {
    pub const CELL_WIDTH: f64 = 101.0;
    pub const CELL_HEIGHT: f64 = 83.0;
    pub const COLUMNS: usize = 7;
    pub const ROWS: usize = 7;
    pub const BOARD_WIDTH: f64 = CELL_WIDTH * COLUMNS as f64;
    pub const BOARD_HEIGHT: f64 = CELL_HEIGHT * ROWS as f64;
    pub const CANVAS_WIDTH: f64 = 707.0;
    pub const CANVAS_HEIGHT: f64 = 707.0;
    // last cell a unit can stand on, the player may not step past it
    pub const MAX_X: f64 = BOARD_WIDTH - CELL_WIDTH;
    pub const MAX_Y: f64 = BOARD_HEIGHT - CELL_HEIGHT;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Left,
    Right,
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Up,
    ];

    /// Maps a `KeyboardEvent.code` to a direction, anything but the arrow
    /// keys is not a movement command
    pub fn from_key_code(code: &str) -> Option<Self> {
        match code {
            "ArrowLeft" => Some(Direction::Left),
            "ArrowUp" => Some(Direction::Up),
            "ArrowRight" => Some(Direction::Right),
            "ArrowDown" => Some(Direction::Down),
            _ => None,
        }
    }

    /// Row of this direction's walk cycle on a character sheet
    fn sheet_row(self) -> usize {
        match self {
            Direction::Down => 0,
            Direction::Left => 1,
            Direction::Right => 2,
            Direction::Up => 3,
        }
    }
}

pub const FRAMES_PER_DIRECTION: usize = 4;

/// Walk cycle frames for every direction. Character sheets are a 4x4 grid,
/// one row per direction in `Direction::ALL` order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameSet {
    frames: [[Rect; FRAMES_PER_DIRECTION]; 4],
}

impl FrameSet {
    pub fn grid(frame_width: f64, frame_height: f64) -> Self {
        let mut frames = [[Rect::default(); FRAMES_PER_DIRECTION]; 4];
        for direction in Direction::ALL {
            let row = direction.sheet_row();
            for (column, frame) in frames[row].iter_mut().enumerate() {
                *frame = Rect::new_from_x_y(
                    column as f64 * frame_width,
                    row as f64 * frame_height,
                    frame_width,
                    frame_height,
                );
            }
        }
        FrameSet { frames }
    }

    pub fn frame(&self, direction: Direction, index: usize) -> Rect {
        self.frames[direction.sheet_row()][index % FRAMES_PER_DIRECTION]
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Texture {
    StoneBlock,
    GrassBlock,
    CatGirl,
    Goul,
    Murloc,
    Orc,
    Wolf,
    Spider,
    Werewolf,
}

impl Texture {
    pub const ALL: [Texture; 9] = [
        Texture::StoneBlock,
        Texture::GrassBlock,
        Texture::CatGirl,
        Texture::Goul,
        Texture::Murloc,
        Texture::Orc,
        Texture::Wolf,
        Texture::Spider,
        Texture::Werewolf,
    ];

    pub fn source(self) -> &'static str {
        match self {
            Texture::StoneBlock => "images/Stone Block.png",
            Texture::GrassBlock => "images/Grass Block.png",
            Texture::CatGirl => "images/Cat Girl.png",
            Texture::Goul => "images/Goul.png",
            Texture::Murloc => "images/Murloc.png",
            Texture::Orc => "images/Orc.png",
            Texture::Wolf => "images/Wolf.png",
            Texture::Spider => "images/Spider.png",
            Texture::Werewolf => "images/Werewolf.png",
        }
    }
}

/// Anything the Director updates and draws every frame
pub trait Entity {
    fn sprite(&self) -> &Sprite;

    fn update(&mut self, dt: f64);

    /// Movement command, ignored by entities that can't walk
    fn set_move(&mut self, _direction: Direction) {}

    fn draw(&self, renderer: &Renderer, resources: &Resources) -> Result<()> {
        self.sprite().draw(renderer, resources)
    }
}

/// Shared data for :
/// - display : texture, frame, render size and offset
/// - physics : position, velocity, collision box
///
/// `position` is the logical position used for movement and collisions, the
/// image is drawn at `position + offset`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sprite {
    pub texture: Texture,
    pub position: Point,
    pub size: Size,
    pub offset: Point,
    pub frame: Rect,
    pub velocity: Point,
    pub collision_box: Size,
}

impl Sprite {
    pub fn new(texture: Texture, size: Size, offset: Point, collision_box: Size) -> Self {
        Sprite {
            texture,
            position: Point::default(),
            size,
            offset,
            frame: Rect::new(Point::default(), size),
            velocity: Point::default(),
            collision_box,
        }
    }

    pub fn destination_rect(&self) -> Rect {
        Rect::new(
            Point {
                x: self.position.x + self.offset.x,
                y: self.position.y + self.offset.y,
            },
            self.size,
        )
    }

    pub fn draw(&self, renderer: &Renderer, resources: &Resources) -> Result<()> {
        let image = resources.get(self.texture.source())?;
        renderer.draw_image(image, &self.frame, &self.destination_rect());
        Ok(())
    }

    /// Overlap test on logical positions. Boxes are compared against the
    /// smaller of the two collision boxes, touching edges don't count.
    pub fn collides_with(&self, other: &Sprite) -> bool {
        (self.position.x - other.position.x).abs()
            < self.collision_box.width.min(other.collision_box.width)
            && (self.position.y - other.position.y).abs()
                < self.collision_box.height.min(other.collision_box.height)
    }
}

impl Entity for Sprite {
    fn sprite(&self) -> &Sprite {
        self
    }

    /// Raw per-call velocity, not scaled by `dt`. Units override this.
    fn update(&mut self, _dt: f64) {
        self.position.x += self.velocity.x;
        self.position.y += self.velocity.y;
    }
}
