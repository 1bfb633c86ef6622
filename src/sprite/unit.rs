use super::grid::{BOARD_WIDTH, CELL_HEIGHT, CELL_WIDTH};
use super::{Direction, Entity, FrameSet, Sprite, FRAMES_PER_DIRECTION};
use crate::engine::Point;

/// Odometer distance covered by one walk cycle frame
const DISTANCE_PER_FRAME: f64 = 10.0;

// units leaving the board reappear one cell beyond the opposite edge
const WRAP_LEFT: f64 = -CELL_WIDTH;
const WRAP_RIGHT: f64 = BOARD_WIDTH;

/// Idle-time scripts for enemies. A behavior only runs while its unit is
/// standing still, and only ever issues a new move (after wrapping around the
/// board edge when needed).
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Behavior {
    SweepRight,
    SweepLeft,
    /// Like `SweepRight`, gaining `step` cells/s on every wrap until `max_speed`
    SweepRightAccelerating { step: f64, max_speed: f64 },
    SweepLeftAccelerating { step: f64, max_speed: f64 },
}

impl Behavior {
    fn run(self, unit: &mut Unit) {
        match self {
            Behavior::SweepRight => {
                unit.wrap_right();
                unit.set_move(Direction::Right);
            }
            Behavior::SweepLeft => {
                unit.wrap_left();
                unit.set_move(Direction::Left);
            }
            Behavior::SweepRightAccelerating { step, max_speed } => {
                if unit.wrap_right() {
                    unit.accelerate(step, max_speed);
                }
                unit.set_move(Direction::Right);
            }
            Behavior::SweepLeftAccelerating { step, max_speed } => {
                if unit.wrap_left() {
                    unit.accelerate(step, max_speed);
                }
                unit.set_move(Direction::Left);
            }
        }
    }
}

/// A sprite that walks one cell at a time.
///
/// ┌──────── Movement ─────────────────────────────────────┐
/// │  Idle    → set_move   →  Moving  (destination set)    │
/// │  Moving  → update     →  Moving  (integrate)          │
/// │  Moving  → update     →  Idle    (snap to destination)│
/// │  any     → teleport   →  Idle                         │
/// └───────────────────────────────────────────────────────┘
/// Moving is nothing more than a non-zero velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    sprite: Sprite,
    frame_set: FrameSet,
    direction: Direction,
    destination: Point,
    /// cells per second
    speed: f64,
    /// distance walked since the unit last stood still
    odometer: f64,
    behavior: Option<Behavior>,
}

impl Unit {
    pub fn new(sprite: Sprite, frame_set: FrameSet, direction: Direction) -> Self {
        let destination = sprite.position;
        let mut unit = Unit {
            sprite,
            frame_set,
            direction,
            destination,
            speed: 0.0,
            odometer: 0.0,
            behavior: None,
        };
        unit.refresh_frame();
        unit
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.teleport(x, y);
        self
    }

    pub fn is_moving(&self) -> bool {
        self.sprite.velocity.x != 0.0 || self.sprite.velocity.y != 0.0
    }

    pub fn position(&self) -> Point {
        self.sprite.position
    }

    pub fn destination(&self) -> Point {
        self.destination
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn odometer(&self) -> f64 {
        self.odometer
    }

    pub fn behavior(&self) -> Option<Behavior> {
        self.behavior
    }

    pub fn frame_index(&self) -> usize {
        (self.odometer / DISTANCE_PER_FRAME).floor() as usize % FRAMES_PER_DIRECTION
    }

    /// Instant relocation, cancels any move in progress
    pub fn teleport(&mut self, x: f64, y: f64) {
        self.sprite.position = Point { x, y };
        self.destination = Point { x, y };
        self.sprite.velocity = Point::default();
        self.odometer = 0.0;
    }

    /// One step of an in-progress move. The x check runs first and the y
    /// check only when x didn't snap; a unit only ever moves on one axis so
    /// the chain never skips a needed snap.
    pub(crate) fn advance(&mut self, dt: f64) {
        let step = Point {
            x: self.sprite.velocity.x * dt,
            y: self.sprite.velocity.y * dt,
        };
        let position = &mut self.sprite.position;

        if (position.x - self.destination.x).abs() < step.x.abs() {
            position.x = self.destination.x;
            self.sprite.velocity.x = 0.0;
            self.odometer = 0.0;
        } else if (position.y - self.destination.y).abs() < step.y.abs() {
            position.y = self.destination.y;
            self.sprite.velocity.y = 0.0;
            self.odometer = 0.0;
        } else {
            position.x += step.x;
            position.y += step.y;
            self.odometer += step.x.abs() + step.y.abs();
        }
    }

    pub(crate) fn refresh_frame(&mut self) {
        self.sprite.frame = self.frame_set.frame(self.direction, self.frame_index());
    }

    /// Teleports to the left edge once past the right one, true when it did
    fn wrap_right(&mut self) -> bool {
        if self.sprite.position.x >= WRAP_RIGHT {
            self.teleport(WRAP_LEFT, self.sprite.position.y);
            return true;
        }
        false
    }

    fn wrap_left(&mut self) -> bool {
        if self.sprite.position.x <= WRAP_LEFT {
            self.teleport(WRAP_RIGHT, self.sprite.position.y);
            return true;
        }
        false
    }

    fn accelerate(&mut self, step: f64, max_speed: f64) {
        if self.speed < max_speed {
            self.speed += step;
        }
    }
}

impl Entity for Unit {
    fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    fn update(&mut self, dt: f64) {
        if self.is_moving() {
            self.advance(dt);
        } else if let Some(behavior) = self.behavior {
            behavior.run(self);
        }
        self.refresh_frame();
    }

    /// Starts a one-cell move, does nothing while a move is in progress
    fn set_move(&mut self, direction: Direction) {
        if self.is_moving() {
            return;
        }
        self.direction = direction;
        self.destination = self.sprite.position;
        match direction {
            Direction::Left => {
                self.destination.x -= CELL_WIDTH;
                self.sprite.velocity.x = -self.speed * CELL_WIDTH;
            }
            Direction::Right => {
                self.destination.x += CELL_WIDTH;
                self.sprite.velocity.x = self.speed * CELL_WIDTH;
            }
            Direction::Up => {
                self.destination.y -= CELL_HEIGHT;
                self.sprite.velocity.y = -self.speed * CELL_HEIGHT;
            }
            Direction::Down => {
                self.destination.y += CELL_HEIGHT;
                self.sprite.velocity.y = self.speed * CELL_HEIGHT;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Size;
    use crate::sprite::Texture;
    use approx::assert_relative_eq;

    fn goul(speed: f64) -> Unit {
        let sprite = Sprite::new(
            Texture::Goul,
            Size {
                width: 80.0,
                height: 110.0,
            },
            Point { x: 10.0, y: 0.0 },
            Size {
                width: 72.0,
                height: 59.0,
            },
        );
        Unit::new(sprite, FrameSet::grid(40.0, 55.0), Direction::Down)
            .with_speed(speed)
            .at(303.0, 249.0)
    }

    fn run_until_idle(unit: &mut Unit, dt: f64) -> usize {
        let mut steps = 0;
        while unit.is_moving() {
            unit.update(dt);
            steps += 1;
            assert!(steps < 10_000, "unit never reached its destination");
        }
        steps
    }

    #[test]
    fn every_direction_lands_exactly_one_cell_away() {
        let offsets = [
            (Direction::Down, 0.0, CELL_HEIGHT),
            (Direction::Left, -CELL_WIDTH, 0.0),
            (Direction::Right, CELL_WIDTH, 0.0),
            (Direction::Up, 0.0, -CELL_HEIGHT),
        ];
        for dt in [1.0 / 60.0, 1.0 / 7.0, 0.33] {
            for (direction, dx, dy) in offsets {
                let mut unit = goul(1.5);
                let start = unit.position();

                unit.set_move(direction);
                assert!(unit.is_moving());
                run_until_idle(&mut unit, dt);

                assert_eq!(unit.position().x, start.x + dx, "{direction:?} dt={dt}");
                assert_eq!(unit.position().y, start.y + dy, "{direction:?} dt={dt}");
            }
        }
    }

    #[test]
    fn a_step_longer_than_the_cell_snaps_instead_of_overshooting() {
        let mut unit = goul(1.0);
        unit.set_move(Direction::Right);

        // a full second covers the whole cell, 10 seconds would overshoot it
        unit.update(10.0);

        assert!(!unit.is_moving());
        assert_eq!(unit.position().x, 404.0);
        assert_eq!(unit.odometer(), 0.0);
    }

    #[test]
    fn set_move_is_ignored_while_moving() {
        let mut unit = goul(1.0);
        unit.set_move(Direction::Up);
        unit.update(0.1);

        unit.set_move(Direction::Left);

        assert_eq!(unit.direction(), Direction::Up);
        assert_eq!(unit.destination(), Point { x: 303.0, y: 166.0 });
        assert_relative_eq!(unit.sprite().velocity.x, 0.0);
    }

    #[test]
    fn velocity_scales_speed_by_cell_size() {
        let mut unit = goul(2.5);
        unit.set_move(Direction::Left);
        assert_relative_eq!(unit.sprite().velocity.x, -252.5);

        let mut unit = goul(2.0);
        unit.set_move(Direction::Down);
        assert_relative_eq!(unit.sprite().velocity.y, 166.0);
    }

    #[test]
    fn animation_frame_follows_the_odometer() {
        let mut unit = goul(1.0);
        unit.set_move(Direction::Right);

        // 101 px/s, 0.1s steps cover 10.1 px each
        unit.update(0.1);
        assert_relative_eq!(unit.odometer(), 10.1, epsilon = 1e-9);
        assert_eq!(unit.frame_index(), 1);
        assert_eq!(unit.sprite().frame, FrameSet::grid(40.0, 55.0).frame(Direction::Right, 1));

        for _ in 0..4 {
            unit.update(0.1);
        }
        // 50.5 px walked, floor(5.05) % 4
        assert_eq!(unit.frame_index(), 1);

        run_until_idle(&mut unit, 0.1);
        assert_eq!(unit.odometer(), 0.0);
        assert_eq!(unit.frame_index(), 0);
    }

    #[test]
    fn teleport_always_leaves_the_unit_idle() {
        let mut unit = goul(1.0);
        unit.set_move(Direction::Down);
        unit.update(0.2);
        assert!(unit.is_moving());

        unit.teleport(0.0, 83.0);

        assert!(!unit.is_moving());
        assert_eq!(unit.position(), Point { x: 0.0, y: 83.0 });
        assert_eq!(unit.destination(), unit.position());
        assert_eq!(unit.odometer(), 0.0);
    }

    #[test]
    fn sweep_left_wraps_to_the_right_edge() {
        let mut unit = goul(1.0)
            .with_behavior(Behavior::SweepLeft)
            .at(-101.0, 332.0);

        unit.update(1.0 / 60.0);

        assert_eq!(unit.position(), Point { x: 707.0, y: 332.0 });
        assert!(unit.is_moving());
        assert_eq!(unit.direction(), Direction::Left);
        assert_eq!(unit.destination().x, 606.0);
    }

    #[test]
    fn sweep_right_wraps_to_the_left_edge() {
        let mut unit = goul(1.0)
            .with_behavior(Behavior::SweepRight)
            .at(707.0, 83.0);

        unit.update(1.0 / 60.0);

        assert_eq!(unit.position(), Point { x: -101.0, y: 83.0 });
        assert_eq!(unit.destination().x, 0.0);
    }

    #[test]
    fn sweep_keeps_walking_without_wrapping_inside_the_board() {
        let mut unit = goul(1.0).with_behavior(Behavior::SweepRight);

        unit.update(1.0 / 60.0);
        assert_eq!(unit.position().x, 303.0);
        assert_eq!(unit.destination().x, 404.0);

        // behavior doesn't run while moving
        unit.update(1.0 / 60.0);
        assert_eq!(unit.destination().x, 404.0);
        assert!(unit.position().x > 303.0);
    }

    #[test]
    fn accelerating_sweep_speeds_up_on_each_wrap_until_capped() {
        let behavior = Behavior::SweepLeftAccelerating {
            step: 0.6,
            max_speed: 10.0,
        };
        let mut unit = goul(2.2).with_behavior(behavior).at(-101.0, 166.0);

        unit.update(1.0 / 60.0);
        assert_relative_eq!(unit.speed(), 2.8);

        // no wrap, no acceleration
        unit.teleport(303.0, 166.0);
        unit.update(1.0 / 60.0);
        assert_relative_eq!(unit.speed(), 2.8);

        let mut unit = goul(9.9).with_behavior(behavior).at(-101.0, 166.0);
        unit.update(1.0 / 60.0);
        assert_relative_eq!(unit.speed(), 10.5);
        unit.teleport(-101.0, 166.0);
        unit.update(1.0 / 60.0);
        assert_relative_eq!(unit.speed(), 10.5);
    }

    #[test]
    fn right_accelerating_sweep_gains_speed_when_it_wraps() {
        let behavior = Behavior::SweepRightAccelerating {
            step: 0.6,
            max_speed: 10.0,
        };
        let mut unit = goul(2.2).with_behavior(behavior).at(606.0, 249.0);

        // walks off the right edge at its starting speed
        unit.update(1.0 / 60.0);
        run_until_idle(&mut unit, 1.0 / 60.0);
        assert_eq!(unit.position(), Point { x: 707.0, y: 249.0 });
        assert_relative_eq!(unit.speed(), 2.2);

        unit.update(1.0 / 60.0);
        assert_eq!(unit.position(), Point { x: -101.0, y: 249.0 });
        assert_eq!(unit.destination().x, 0.0);
        assert_relative_eq!(unit.speed(), 2.8);

        let mut unit = goul(9.9).with_behavior(behavior).at(707.0, 249.0);
        unit.update(1.0 / 60.0);
        assert_relative_eq!(unit.speed(), 10.5);
        unit.teleport(707.0, 249.0);
        unit.update(1.0 / 60.0);
        assert_relative_eq!(unit.speed(), 10.5);
    }

    #[test]
    fn zero_speed_unit_never_starts_moving() {
        let mut unit = goul(0.0).with_behavior(Behavior::SweepRight);
        unit.update(1.0);
        assert!(!unit.is_moving());
        assert_eq!(unit.position().x, 303.0);
    }
}
