// Shared types module - grid coordinates and headings used by every other module

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Grid cell. Signed so that a step off the board can be represented and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// Position one step along `direction`
    pub fn step(&self, direction: Direction) -> Position {
        let (dx, dy) = direction.delta();
        Position { x: self.x + dx, y: self.y + dy }
    }

    pub fn in_bounds(&self, grid_size: i32) -> bool {
        self.x >= 0 && self.x < grid_size && self.y >= 0 && self.y < grid_size
    }
}

/// Heading of an agent. `Still` is the "not yet moving" state of a fresh player.
///
/// The y axis grows downward, so `Down` is `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Right,
    Left,
    Down,
    Up,
    #[default]
    Still,
}

impl Direction {
    /// Fixed enumeration order `{+x, -x, +y, -y}` used for every tie-break
    pub const CARDINALS: [Direction; 4] = [Direction::Right, Direction::Left, Direction::Down, Direction::Up];

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
            Direction::Down => (0, 1),
            Direction::Up => (0, -1),
            Direction::Still => (0, 0),
        }
    }

    pub fn from_delta(dx: i32, dy: i32) -> Option<Direction> {
        match (dx, dy) {
            (1, 0) => Some(Direction::Right),
            (-1, 0) => Some(Direction::Left),
            (0, 1) => Some(Direction::Down),
            (0, -1) => Some(Direction::Up),
            (0, 0) => Some(Direction::Still),
            _ => None,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Right,
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::Still => Direction::Still,
        }
    }

    /// True for a 180 degree turn. `Still` is never a reversal of anything.
    pub fn is_reverse_of(&self, other: Direction) -> bool {
        *self != Direction::Still && other != Direction::Still && self.opposite() == other
    }

    pub fn is_moving(&self) -> bool {
        *self != Direction::Still
    }

    // Turn 90 degrees left
    fn turn_left_90(&self) -> Direction {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Up,
            Direction::Still => Direction::Still,
        }
    }

    // Turn 90 degrees right
    fn turn_right_90(&self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
            Direction::Still => Direction::Still,
        }
    }

    /// Both headings at right angles to this one, left turn first
    pub fn perpendiculars(&self) -> [Direction; 2] {
        [self.turn_left_90(), self.turn_right_90()]
    }

    pub fn random_cardinal<R: Rng + ?Sized>(rng: &mut R) -> Direction {
        Direction::CARDINALS[rng.gen_range(0..Direction::CARDINALS.len())]
    }
}

/// Manhattan distance `|dx| + |dy|`
pub fn manhattan_distance(a: Position, b: Position) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}
