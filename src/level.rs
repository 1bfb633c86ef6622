use crate::engine::{Point, Size};
use crate::sprite::grid::{CELL_HEIGHT, CELL_WIDTH};
use crate::sprite::player::{InputKind, Player};
use crate::sprite::unit::{Behavior, Unit};
use crate::sprite::{Direction, FrameSet, Sprite, Texture};

const PLAYER_SPAWN: Point = Point { x: 303.0, y: 498.0 };
const PLAYER_SPEED: f64 = 1.5;

const WEREWOLF_ACCELERATION: f64 = 0.6;
const WEREWOLF_MAX_SPEED: f64 = 10.0;

/// Builds the enemy roster of one level
pub type Layout = fn() -> Vec<Unit>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EnemyKind {
    Goul,
    Murloc,
    Orc,
    Werewolf,
    Wolf,
    Spider,
}

/// Art and hitbox of a character, everything needed to build its Unit
struct Template {
    texture: Texture,
    size: Size,
    offset: Point,
    collision_box: Size,
    frame_size: Size,
}

impl Template {
    const fn new(
        texture: Texture,
        size: (f64, f64),
        offset: (f64, f64),
        collision_box: (f64, f64),
        frame_size: (f64, f64),
    ) -> Self {
        Template {
            texture,
            size: Size {
                width: size.0,
                height: size.1,
            },
            offset: Point {
                x: offset.0,
                y: offset.1,
            },
            collision_box: Size {
                width: collision_box.0,
                height: collision_box.1,
            },
            frame_size: Size {
                width: frame_size.0,
                height: frame_size.1,
            },
        }
    }

    fn unit(&self) -> Unit {
        let sprite = Sprite::new(self.texture, self.size, self.offset, self.collision_box);
        let frame_set = FrameSet::grid(self.frame_size.width, self.frame_size.height);
        Unit::new(sprite, frame_set, Direction::Down)
    }
}

const CAT_GIRL: Template = Template::new(
    Texture::CatGirl,
    (64.0, 96.0),
    (18.0, 14.0),
    (57.0, 47.0),
    (32.0, 48.0),
);

impl EnemyKind {
    fn template(self) -> Template {
        match self {
            EnemyKind::Goul => Template::new(
                Texture::Goul,
                (80.0, 110.0),
                (10.0, 0.0),
                (72.0, 59.0),
                (40.0, 55.0),
            ),
            EnemyKind::Murloc => Template::new(
                Texture::Murloc,
                (70.0, 104.0),
                (10.0, -1.0),
                (63.0, 59.0),
                (41.0, 61.0),
            ),
            EnemyKind::Orc => Template::new(
                Texture::Orc,
                (73.0, 110.0),
                (10.0, -2.0),
                (65.0, 59.0),
                (55.0, 77.0),
            ),
            EnemyKind::Werewolf => Template::new(
                Texture::Werewolf,
                (81.0, 112.0),
                (10.0, -7.0),
                (72.0, 59.0),
                (51.0, 70.0),
            ),
            EnemyKind::Wolf => Template::new(
                Texture::Wolf,
                (104.0, 83.0),
                (0.0, 25.0),
                (93.0, 59.0),
                (58.0, 46.0),
            ),
            EnemyKind::Spider => Template::new(
                Texture::Spider,
                (80.0, 67.0),
                (10.0, 40.0),
                (72.0, 59.0),
                (132.0, 112.0),
            ),
        }
    }

    /// A fresh enemy standing on the given board cell
    pub fn spawn(self, column: f64, row: f64, speed: f64, behavior: Behavior) -> Unit {
        self.template()
            .unit()
            .with_speed(speed)
            .with_behavior(behavior)
            .at(column * CELL_WIDTH, row * CELL_HEIGHT)
    }
}

pub fn spawn_player() -> Player {
    let unit = CAT_GIRL
        .unit()
        .with_speed(PLAYER_SPEED)
        .at(PLAYER_SPAWN.x, PLAYER_SPAWN.y);
    Player::new(unit)
}

fn level_one() -> Vec<Unit> {
    let mut enemies = vec![EnemyKind::Murloc.spawn(4.0, 1.0, 1.0, Behavior::SweepRight)];
    for row in 0..3 {
        // middle lane runs against the other two
        let behavior = if row == 1 {
            Behavior::SweepLeft
        } else {
            Behavior::SweepRight
        };
        for column in 0..3 {
            enemies.push(EnemyKind::Goul.spawn(
                (column * 2 + 1) as f64,
                (row + 2) as f64,
                0.5,
                behavior,
            ));
        }
    }
    enemies
}

fn level_two() -> Vec<Unit> {
    let wolves = (0..4).map(|i| {
        EnemyKind::Wolf.spawn((i * 2) as f64, (i + 1) as f64, 2.5, Behavior::SweepRight)
    });
    let orcs = (0..4).map(|i| {
        EnemyKind::Orc.spawn((7 - i * 2) as f64, (i + 2) as f64, 1.8, Behavior::SweepLeft)
    });
    wolves.chain(orcs).collect()
}

fn level_three() -> Vec<Unit> {
    let mut enemies = Vec::new();
    for i in 0..2 {
        enemies.push(EnemyKind::Werewolf.spawn(
            (i * 2) as f64,
            (i * 2 + 2) as f64,
            2.2,
            Behavior::SweepRightAccelerating {
                step: WEREWOLF_ACCELERATION,
                max_speed: WEREWOLF_MAX_SPEED,
            },
        ));
    }
    for i in 0..2 {
        enemies.push(EnemyKind::Werewolf.spawn(
            (7 - i * 2) as f64,
            (i * 2 + 3) as f64,
            2.2,
            Behavior::SweepLeftAccelerating {
                step: WEREWOLF_ACCELERATION,
                max_speed: WEREWOLF_MAX_SPEED,
            },
        ));
    }
    // a gap in the spider line at column 3
    for column in (0..7).filter(|column| *column != 3) {
        enemies.push(EnemyKind::Spider.spawn(column as f64, 1.0, 1.0, Behavior::SweepLeft));
    }
    enemies
}

/// Level registry: builds the player and enemies of one level at a time and
/// routes input to the live player.
pub struct Levels {
    layouts: Vec<Layout>,
    player: Option<Player>,
    enemies: Vec<Unit>,
}

impl Default for Levels {
    fn default() -> Self {
        Levels::with_layouts(vec![level_one, level_two, level_three])
    }
}

impl Levels {
    pub fn with_layouts(layouts: Vec<Layout>) -> Self {
        Levels {
            layouts,
            player: None,
            enemies: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Builds level `index` (0-based). Returns false when there is no such
    /// level, which the caller treats as the game being won.
    pub fn run(&mut self, index: usize) -> bool {
        let Some(layout) = self.layouts.get(index) else {
            return false;
        };
        self.enemies = layout();
        self.player = Some(spawn_player());
        true
    }

    /// Drops the current level, input goes nowhere until the next `run`
    pub fn clear(&mut self) {
        self.player = None;
        self.enemies.clear();
    }

    pub fn is_running(&self) -> bool {
        self.player.is_some()
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    pub fn enemies(&self) -> &[Unit] {
        &self.enemies
    }

    pub fn entities_mut(&mut self) -> Option<(&mut Player, &mut [Unit])> {
        let player = self.player.as_mut()?;
        Some((player, &mut self.enemies))
    }

    pub fn handle_input(&mut self, kind: InputKind, direction: Direction) {
        if let Some(player) = self.player.as_mut() {
            player.handle_input(kind, direction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Rect;
    use crate::sprite::Entity;

    fn positions(enemies: &[Unit]) -> Vec<(f64, f64)> {
        enemies
            .iter()
            .map(|enemy| (enemy.position().x, enemy.position().y))
            .collect()
    }

    #[test]
    fn run_builds_player_and_enemies() {
        let mut levels = Levels::default();
        assert_eq!(levels.len(), 3);

        assert!(levels.run(0));

        let player = levels.player().expect("player should be spawned");
        assert_eq!(player.unit().position(), PLAYER_SPAWN);
        assert_eq!(player.unit().speed(), 1.5);
        assert_eq!(player.sprite().texture, Texture::CatGirl);
        assert_eq!(levels.enemies().len(), 10);
    }

    #[test]
    fn out_of_range_level_is_reported() {
        let mut levels = Levels::default();
        assert!(!levels.run(3));
        assert!(!levels.is_running());
        assert!(levels.enemies().is_empty());
    }

    #[test]
    fn clear_drops_entities_and_input() {
        let mut levels = Levels::default();
        levels.run(1);
        levels.clear();

        assert!(levels.player().is_none());
        assert!(levels.enemies().is_empty());
        assert!(levels.entities_mut().is_none());
        // no player to receive it, must not panic
        levels.handle_input(InputKind::Press, Direction::Up);
    }

    #[test]
    fn each_run_starts_from_a_fresh_layout() {
        let mut levels = Levels::default();
        levels.run(0);
        if let Some((player, enemies)) = levels.entities_mut() {
            player.update(1.0);
            for enemy in enemies.iter_mut() {
                enemy.teleport(0.0, 0.0);
            }
        }

        levels.run(0);

        assert_eq!(levels.player().map(|p| p.unit().position()), Some(PLAYER_SPAWN));
        assert_eq!(levels.enemies()[0].position(), Point { x: 404.0, y: 83.0 });
    }

    #[test]
    fn level_one_layout() {
        let enemies = level_one();
        let placed = positions(&enemies);

        assert_eq!(placed[0], (404.0, 83.0));
        assert_eq!(enemies[0].sprite().texture, Texture::Murloc);
        assert_eq!(enemies[0].speed(), 1.0);
        assert_eq!(&placed[1..4], &[(101.0, 166.0), (303.0, 166.0), (505.0, 166.0)]);
        assert_eq!(enemies[4].behavior(), Some(Behavior::SweepLeft));
        assert_eq!(enemies[1].behavior(), Some(Behavior::SweepRight));
        assert_eq!(enemies[7].behavior(), Some(Behavior::SweepRight));
        assert!(enemies[1..].iter().all(|goul| goul.speed() == 0.5));
    }

    #[test]
    fn level_two_layout() {
        let enemies = level_two();
        let placed = positions(&enemies);

        assert_eq!(enemies.len(), 8);
        assert_eq!(&placed[..4], &[(0.0, 83.0), (202.0, 166.0), (404.0, 249.0), (606.0, 332.0)]);
        assert_eq!(&placed[4..], &[(707.0, 166.0), (505.0, 249.0), (303.0, 332.0), (101.0, 415.0)]);
        assert!(enemies[4..]
            .iter()
            .all(|orc| orc.behavior() == Some(Behavior::SweepLeft) && orc.speed() == 1.8));
    }

    #[test]
    fn level_three_layout() {
        let enemies = level_three();
        let spiders: Vec<_> = enemies
            .iter()
            .filter(|enemy| enemy.sprite().texture == Texture::Spider)
            .collect();

        assert_eq!(enemies.len(), 10);
        assert_eq!(spiders.len(), 6);
        assert!(spiders.iter().all(|spider| spider.position().x != 303.0));
        assert_eq!(
            enemies[2].behavior(),
            Some(Behavior::SweepLeftAccelerating {
                step: 0.6,
                max_speed: 10.0
            })
        );
        assert_eq!(enemies[3].position(), Point { x: 505.0, y: 415.0 });
    }

    #[test]
    fn enemy_templates_carry_their_hitboxes() {
        let wolf = EnemyKind::Wolf.spawn(0.0, 1.0, 2.5, Behavior::SweepRight);
        assert_eq!(
            wolf.sprite().collision_box,
            Size {
                width: 93.0,
                height: 59.0
            }
        );
        assert_eq!(wolf.sprite().offset, Point { x: 0.0, y: 25.0 });
        assert_eq!(wolf.sprite().frame, Rect::new_from_x_y(0.0, 0.0, 58.0, 46.0));
    }
}
