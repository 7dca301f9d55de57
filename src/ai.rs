// AI decision policies - one pure decision function dispatched on the agent's tier
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pathfinding::{
    count_open_spaces, direction_between, find_closest_food, find_sorted_food, plan_path_to_food, would_collide,
    OPEN_SPACE_CAP,
};
use crate::snake::Snake;
use crate::types::{manhattan_distance, Direction, Position};

/// Food targets the advanced tier tries to path to, nearest first
pub const ADVANCED_FOOD_CANDIDATES: usize = 3;
/// Forward steps the intermediate tier simulates per candidate heading
pub const LOOKAHEAD_STEPS: i32 = 3;

/// AI difficulty level selecting the decision policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

impl Tier {
    pub fn from_level(level: u8) -> Option<Tier> {
        match level {
            1 => Some(Tier::Basic),
            2 => Some(Tier::Intermediate),
            3 => Some(Tier::Advanced),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Tier::Basic => 1,
            Tier::Intermediate => 2,
            Tier::Advanced => 3,
        }
    }

    /// Tier for AI agents derived from the player's score
    pub fn for_player_score(score: u32) -> Tier {
        if score >= 100 {
            Tier::Advanced
        } else if score >= 50 {
            Tier::Intermediate
        } else {
            Tier::Basic
        }
    }
}

/// Outcome of one think
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Move(Direction),
    /// No safe heading exists; the agent dies this tick without moving
    Trapped,
}

/// What an agent can see while deciding
pub struct View<'a> {
    pub others: &'a [&'a Snake],
    pub food: &'a [Position],
    pub grid_size: i32,
}

pub fn decide<R: Rng + ?Sized>(me: &Snake, view: &View, rng: &mut R) -> Decision {
    match me.tier {
        Tier::Basic => decide_basic(me, view, rng),
        Tier::Intermediate => decide_intermediate(me, view, rng),
        Tier::Advanced => decide_advanced(me, view, rng),
    }
}

fn collides<R: Rng + ?Sized>(pos: Position, me: &Snake, view: &View, rng: &mut R) -> bool {
    would_collide(pos, me, view.others, view.grid_size, false, rng)
}

// Choose direction based on which axis has greater difference
fn greedy_direction(from: Position, to: Position, current: Direction) -> Direction {
    let dx = to.x - from.x;
    let dy = to.y - from.y;

    if dx.abs() > dy.abs() {
        if dx > 0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if dy != 0 {
        if dy > 0 {
            Direction::Down
        } else {
            Direction::Up
        }
    } else {
        current
    }
}

// Headings that are not a 180 degree turn for this agent
fn non_reversing(me: &Snake) -> impl Iterator<Item = Direction> + '_ {
    Direction::CARDINALS
        .into_iter()
        .filter(move |d| !me.is_reversal(*d))
}

fn first_safe_cardinal<R: Rng + ?Sized>(me: &Snake, view: &View, rng: &mut R) -> Decision {
    let head = me.head();
    for dir in Direction::CARDINALS {
        if !collides(head.step(dir), me, view, rng) {
            return Decision::Move(dir);
        }
    }
    Decision::Trapped
}

/// Safe heading with the most reachable room, ties to enumeration order
fn survival_direction<R: Rng + ?Sized>(me: &Snake, view: &View, rng: &mut R) -> Option<Direction> {
    let head = me.head();
    let mut best: Option<(Direction, usize)> = None;
    for dir in non_reversing(me) {
        let next = head.step(dir);
        if collides(next, me, view, rng) {
            continue;
        }
        let space = count_open_spaces(next, me, view.others, view.grid_size, OPEN_SPACE_CAP, rng);
        if best.map_or(true, |(_, s)| space > s) {
            best = Some((dir, space));
        }
    }
    best.map(|(dir, _)| dir)
}

// Empty board: no target to chase, so stay alive
fn decide_without_food<R: Rng + ?Sized>(me: &Snake, view: &View, rng: &mut R) -> Decision {
    match survival_direction(me, view, rng) {
        Some(dir) => Decision::Move(dir),
        None => first_safe_cardinal(me, view, rng),
    }
}

fn decide_basic<R: Rng + ?Sized>(me: &Snake, view: &View, rng: &mut R) -> Decision {
    let head = me.head();
    let Some(target) = find_closest_food(head, view.food) else {
        return decide_without_food(me, view, rng);
    };

    let greedy = greedy_direction(head, target, me.direction);
    if greedy.is_moving() && !collides(head.step(greedy), me, view, rng) {
        return Decision::Move(greedy);
    }
    first_safe_cardinal(me, view, rng)
}

fn decide_intermediate<R: Rng + ?Sized>(me: &Snake, view: &View, rng: &mut R) -> Decision {
    let head = me.head();
    let Some(target) = find_closest_food(head, view.food) else {
        return decide_without_food(me, view, rng);
    };

    let greedy = greedy_direction(head, target, me.direction);
    if greedy.is_moving() {
        let one = head.step(greedy);
        let two = one.step(greedy);
        if !collides(one, me, view, rng) && !collides(two, me, view, rng) {
            return Decision::Move(greedy);
        }
    }

    // Projection unsafe: score every non-reversing heading by room ahead and food distance
    let mut best: Option<(Direction, i32)> = None;
    for dir in non_reversing(me) {
        let mut pos = head;
        let mut safe_steps = 0;
        for _ in 0..LOOKAHEAD_STEPS {
            pos = pos.step(dir);
            if collides(pos, me, view, rng) {
                break;
            }
            safe_steps += 1;
        }
        if safe_steps == 0 {
            continue;
        }

        let first = head.step(dir);
        let food_distance = find_closest_food(first, view.food)
            .map(|f| manhattan_distance(first, f))
            .unwrap_or(0);
        let score = 3 * safe_steps - food_distance;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((dir, score));
        }
    }

    match best {
        Some((dir, _)) => Decision::Move(dir),
        None => decide_basic(me, view, rng),
    }
}

fn decide_advanced<R: Rng + ?Sized>(me: &Snake, view: &View, rng: &mut R) -> Decision {
    let head = me.head();
    let candidates = find_sorted_food(head, view.food);

    for target in candidates.into_iter().take(ADVANCED_FOOD_CANDIDATES) {
        let path = plan_path_to_food(me, target, view.others, view.grid_size, rng);
        let Some(first) = path.first() else {
            continue;
        };
        if let Some(dir) = direction_between(head, *first) {
            if !me.is_reversal(dir) {
                return Decision::Move(dir);
            }
        }
    }

    match survival_direction(me, view, rng) {
        Some(dir) => Decision::Move(dir),
        None => decide_intermediate(me, view, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(1)
    }

    fn snake(cells: &[(i32, i32)], direction: Direction, tier: Tier) -> Snake {
        Snake::with_body(1, cells.iter().map(|(x, y)| Position::new(*x, *y)), direction, tier)
    }

    fn view<'a>(others: &'a [&'a Snake], food: &'a [Position], grid_size: i32) -> View<'a> {
        View { others, food, grid_size }
    }

    #[test]
    fn test_tier_levels() {
        for level in 1..=3 {
            assert_eq!(Tier::from_level(level).unwrap().level(), level);
        }
        assert_eq!(Tier::from_level(0), None);
        assert_eq!(Tier::for_player_score(0), Tier::Basic);
        assert_eq!(Tier::for_player_score(50), Tier::Intermediate);
        assert_eq!(Tier::for_player_score(99), Tier::Intermediate);
        assert_eq!(Tier::for_player_score(100), Tier::Advanced);
    }

    #[test]
    fn test_greedy_prefers_dominant_axis() {
        let from = Position::new(5, 5);
        assert_eq!(greedy_direction(from, Position::new(9, 7), Direction::Up), Direction::Right);
        assert_eq!(greedy_direction(from, Position::new(4, 1), Direction::Up), Direction::Up);
        assert_eq!(greedy_direction(from, Position::new(7, 7), Direction::Up), Direction::Down);
    }

    #[test]
    fn test_basic_steers_toward_food() {
        let me = snake(&[(5, 5)], Direction::Right, Tier::Basic);
        let food = [Position::new(7, 5)];
        assert_eq!(decide(&me, &view(&[], &food, 10), &mut rng()), Decision::Move(Direction::Right));
    }

    #[test]
    fn test_basic_falls_back_in_fixed_order() {
        // Food straight right but blocked by another agent
        let me = snake(&[(5, 5), (5, 6)], Direction::Up, Tier::Basic);
        let blocker = Snake::with_body(2, [Position::new(6, 5)], Direction::Up, Tier::Basic);
        let food = [Position::new(8, 5)];
        let others = [&blocker];
        // +x blocked, -x free
        assert_eq!(decide(&me, &view(&others, &food, 10), &mut rng()), Decision::Move(Direction::Left));
    }

    #[test]
    fn test_basic_trapped_in_corner() {
        let me = snake(&[(0, 0), (1, 0)], Direction::Left, Tier::Basic);
        let wall = Snake::with_body(2, [Position::new(0, 1), Position::new(1, 1)], Direction::Up, Tier::Basic);
        let food = [Position::new(5, 5)];
        let others = [&wall];
        assert_eq!(decide(&me, &view(&others, &food, 10), &mut rng()), Decision::Trapped);
    }

    #[test]
    fn test_intermediate_with_no_safe_heading_falls_back_to_basic() {
        let me = snake(&[(0, 0), (1, 0)], Direction::Left, Tier::Intermediate);
        let wall = Snake::with_body(2, [Position::new(0, 1), Position::new(1, 1)], Direction::Up, Tier::Basic);
        let food = [Position::new(5, 5)];
        let others = [&wall];
        let view = view(&others, &food, 10);
        let basic = Snake { tier: Tier::Basic, ..me.clone() };
        assert_eq!(decide(&me, &view, &mut rng()), decide(&basic, &view, &mut rng()));
        assert_eq!(decide(&me, &view, &mut rng()), Decision::Trapped);
    }

    #[test]
    fn test_intermediate_avoids_two_step_trap() {
        // Heading right toward food; the cell two steps ahead is blocked
        let me = snake(&[(5, 5), (4, 5)], Direction::Right, Tier::Intermediate);
        let wall = Snake::with_body(2, [Position::new(7, 5)], Direction::Up, Tier::Basic);
        let food = [Position::new(9, 5)];
        let others = [&wall];
        let decision = decide(&me, &view(&others, &food, 10), &mut rng());
        // Right scores 3*1 - 3 = 0; down and up both score 3*3 - 5 = 4, down enumerates first
        assert_eq!(decision, Decision::Move(Direction::Down));
    }

    #[test]
    fn test_intermediate_keeps_heading_when_safe() {
        let me = snake(&[(2, 5), (1, 5)], Direction::Right, Tier::Intermediate);
        let food = [Position::new(8, 5)];
        assert_eq!(decide(&me, &view(&[], &food, 10), &mut rng()), Decision::Move(Direction::Right));
    }

    #[test]
    fn test_advanced_paths_around_wall() {
        let me = snake(&[(1, 2), (0, 2)], Direction::Right, Tier::Advanced);
        let wall = Snake::with_body(
            2,
            [Position::new(2, 1), Position::new(2, 2), Position::new(2, 3), Position::new(2, 4)],
            Direction::Up,
            Tier::Basic,
        );
        let food = [Position::new(3, 2)];
        let others = [&wall];
        let decision = decide(&me, &view(&others, &food, 10), &mut rng());
        assert_eq!(decision, Decision::Move(Direction::Up));
    }

    #[test]
    fn test_advanced_survives_without_reachable_food() {
        // Food sealed in the corner; the agent picks the roomiest safe heading
        let me = snake(&[(5, 5), (5, 6)], Direction::Up, Tier::Advanced);
        let seal = Snake::with_body(2, [Position::new(8, 9), Position::new(9, 8), Position::new(8, 8)], Direction::Up, Tier::Basic);
        let food = [Position::new(9, 9)];
        let others = [&seal];
        match decide(&me, &view(&others, &food, 10), &mut rng()) {
            Decision::Move(dir) => assert_ne!(dir, Direction::Down),
            Decision::Trapped => panic!("open board should never trap"),
        }
    }

    #[test]
    fn test_no_food_routes_to_survival() {
        for tier in [Tier::Basic, Tier::Intermediate, Tier::Advanced] {
            let me = snake(&[(0, 5), (1, 5)], Direction::Left, tier);
            match decide(&me, &view(&[], &[], 10), &mut rng()) {
                Decision::Move(dir) => assert!(matches!(dir, Direction::Down | Direction::Up)),
                Decision::Trapped => panic!("{:?} trapped on an empty board", tier),
            }
        }
    }
}
