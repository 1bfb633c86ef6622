use super::grid::{MAX_X, MAX_Y};
use super::unit::Unit;
use super::{Direction, Entity, Sprite};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InputKind {
    Press,
    Release,
}

/// The player's unit, steered by held arrow keys and kept on the board.
///
/// While a direction is held the player re-issues that move every time it
/// comes to rest. Several keys can be held at once, the most recently pressed
/// one that is still down wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    unit: Unit,
    held: Vec<Direction>,
}

impl Player {
    pub fn new(unit: Unit) -> Self {
        Player {
            unit,
            held: Vec::new(),
        }
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn handle_input(&mut self, kind: InputKind, direction: Direction) {
        self.held.retain(|held| *held != direction);
        if kind == InputKind::Press {
            self.held.push(direction);
        }
    }

    pub fn steering(&self) -> Option<Direction> {
        self.held.last().copied()
    }

    /// Whether a one-cell move in `direction` stays on the board
    pub fn can_move(&self, direction: Direction) -> bool {
        let position = self.unit.position();
        match direction {
            Direction::Left => position.x > 0.0,
            Direction::Right => position.x < MAX_X,
            Direction::Up => position.y > 0.0,
            Direction::Down => position.y < MAX_Y,
        }
    }
}

impl Entity for Player {
    fn sprite(&self) -> &Sprite {
        self.unit.sprite()
    }

    fn update(&mut self, dt: f64) {
        if self.unit.is_moving() {
            self.unit.advance(dt);
        } else if let Some(direction) = self.steering() {
            self.set_move(direction);
        }
        self.unit.refresh_frame();
    }

    fn set_move(&mut self, direction: Direction) {
        if !self.unit.is_moving() && self.can_move(direction) {
            self.unit.set_move(direction);
        }
    }
}
