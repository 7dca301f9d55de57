// Pathfinding utilities - pure functions over the current board state
use rand::Rng;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::powerups::{Effect, INVISIBLE_SKIP_CHANCE};
use crate::snake::Snake;
use crate::types::{manhattan_distance, Direction, Position};

/// Default flood-fill cap for `count_open_spaces`
pub const OPEN_SPACE_CAP: usize = 30;
/// Maximum nodes A* expands before giving up
pub const ASTAR_EXPANSION_CAP: usize = 100;

/// Food sorted nearest-first by Manhattan distance from `from`.
/// Equal distances keep their board order.
pub fn find_sorted_food(from: Position, food: &[Position]) -> Vec<Position> {
    let mut sorted = food.to_vec();
    sorted.sort_by_key(|f| manhattan_distance(from, *f));
    sorted
}

/// Nearest food, or `None` when the board has none
pub fn find_closest_food(from: Position, food: &[Position]) -> Option<Position> {
    food.iter().copied().min_by_key(|f| manhattan_distance(from, *f))
}

/// True if stepping onto `next` would kill `agent`.
///
/// Walls always count. With `respect_shield` a shielded agent ignores bodies.
/// Each check against an invisible agent is skipped with `INVISIBLE_SKIP_CHANCE`.
pub fn would_collide<R: Rng + ?Sized>(
    next: Position,
    agent: &Snake,
    others: &[&Snake],
    grid_size: i32,
    respect_shield: bool,
    rng: &mut R,
) -> bool {
    if !next.in_bounds(grid_size) {
        return true;
    }
    if respect_shield && agent.holds(Effect::Shield) {
        return false;
    }
    if agent.occupies(next) {
        return true;
    }
    for other in others {
        if !other.alive {
            continue;
        }
        if other.holds(Effect::Invisible) && rng.gen_bool(INVISIBLE_SKIP_CHANCE) {
            continue;
        }
        if other.occupies(next) {
            return true;
        }
    }
    false
}

/// Breadth-first count of free cells reachable from `start`, `start` included, up to `cap`
pub fn count_open_spaces<R: Rng + ?Sized>(
    start: Position,
    agent: &Snake,
    others: &[&Snake],
    grid_size: i32,
    cap: usize,
    rng: &mut R,
) -> usize {
    if would_collide(start, agent, others, grid_size, false, rng) {
        return 0;
    }

    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);
    let mut count = 0;

    while let Some(pos) = queue.pop_front() {
        count += 1;
        if count >= cap {
            break;
        }
        for dir in Direction::CARDINALS {
            let neighbor = pos.step(dir);
            if visited.contains(&neighbor) {
                continue;
            }
            visited.insert(neighbor);
            if !would_collide(neighbor, agent, others, grid_size, false, rng) {
                queue.push_back(neighbor);
            }
        }
    }

    count
}

// A* node for pathfinding
#[derive(Clone, Eq, PartialEq)]
struct AStarNode {
    pos: Position,
    g_cost: i32, // Cost from start
    h_cost: i32, // Heuristic to goal
    seq: u32,    // Insertion order, breaks f-cost ties deterministically
}

impl AStarNode {
    fn f_cost(&self) -> i32 {
        self.g_cost + self.h_cost
    }
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .f_cost()
            .cmp(&self.f_cost())
            .then_with(|| other.h_cost.cmp(&self.h_cost))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* from the agent's head to `target` over axis-aligned steps.
///
/// Returns the path without the start cell, or an empty path when `target` is
/// unreachable within `ASTAR_EXPANSION_CAP` expanded nodes.
pub fn plan_path_to_food<R: Rng + ?Sized>(
    agent: &Snake,
    target: Position,
    others: &[&Snake],
    grid_size: i32,
    rng: &mut R,
) -> Vec<Position> {
    let start = agent.head();
    if start == target {
        return Vec::new();
    }

    let mut open_set = BinaryHeap::new();
    let mut closed_set = HashSet::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut best_g: HashMap<Position, i32> = HashMap::new();
    let mut seq = 0u32;

    open_set.push(AStarNode {
        pos: start,
        g_cost: 0,
        h_cost: manhattan_distance(start, target),
        seq,
    });
    best_g.insert(start, 0);

    let mut expanded = 0;
    while let Some(current) = open_set.pop() {
        if current.pos == target {
            // Reconstruct path
            let mut path = vec![current.pos];
            let mut pos = current.pos;
            while let Some(parent) = came_from.get(&pos) {
                if *parent == start {
                    break;
                }
                path.push(*parent);
                pos = *parent;
            }
            path.reverse();
            return path;
        }

        if !closed_set.insert(current.pos) {
            continue;
        }
        expanded += 1;
        if expanded > ASTAR_EXPANSION_CAP {
            break;
        }

        for dir in Direction::CARDINALS {
            let neighbor = current.pos.step(dir);
            if closed_set.contains(&neighbor) {
                continue;
            }
            if would_collide(neighbor, agent, others, grid_size, false, rng) {
                continue;
            }

            let g_cost = current.g_cost + 1;
            if best_g.get(&neighbor).is_some_and(|g| *g <= g_cost) {
                continue;
            }
            best_g.insert(neighbor, g_cost);
            came_from.insert(neighbor, current.pos);
            seq += 1;
            open_set.push(AStarNode {
                pos: neighbor,
                g_cost,
                h_cost: manhattan_distance(neighbor, target),
                seq,
            });
        }
    }

    Vec::new() // No path found
}

/// Heading for a single axis-aligned step from `from` to the adjacent `to`
pub fn direction_between(from: Position, to: Position) -> Option<Direction> {
    Direction::from_delta(to.x - from.x, to.y - from.y).filter(|d| d.is_moving())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Tier;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::time::Instant;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn snake_at(id: u32, cells: &[(i32, i32)]) -> Snake {
        Snake::with_body(id, cells.iter().map(|(x, y)| Position::new(*x, *y)), Direction::Right, Tier::Basic)
    }

    #[test]
    fn test_sorted_food_nearest_first() {
        let food = [Position::new(9, 9), Position::new(2, 1), Position::new(5, 5)];
        let sorted = find_sorted_food(Position::new(1, 1), &food);
        assert_eq!(sorted, vec![Position::new(2, 1), Position::new(5, 5), Position::new(9, 9)]);
        assert_eq!(find_closest_food(Position::new(1, 1), &food), Some(Position::new(2, 1)));
        assert_eq!(find_closest_food(Position::new(1, 1), &[]), None);
    }

    #[test]
    fn test_wall_collision_ignores_shield() {
        let mut agent = snake_at(1, &[(9, 5)]);
        agent.grant(Effect::Shield, Instant::now());
        assert!(would_collide(Position::new(10, 5), &agent, &[], 10, true, &mut rng()));
        assert!(would_collide(Position::new(-1, 5), &agent, &[], 10, true, &mut rng()));
    }

    #[test]
    fn test_body_collisions() {
        let agent = snake_at(1, &[(5, 5), (4, 5), (3, 5)]);
        let other = snake_at(2, &[(6, 5), (6, 6)]);
        let mut r = rng();
        assert!(would_collide(Position::new(4, 5), &agent, &[], 10, false, &mut r));
        assert!(would_collide(Position::new(6, 5), &agent, &[&other], 10, false, &mut r));
        assert!(!would_collide(Position::new(5, 4), &agent, &[&other], 10, false, &mut r));
    }

    #[test]
    fn test_shield_ignores_bodies_when_respected() {
        let mut agent = snake_at(1, &[(5, 5), (4, 5)]);
        agent.grant(Effect::Shield, Instant::now());
        let other = snake_at(2, &[(6, 5)]);
        let mut r = rng();
        assert!(!would_collide(Position::new(6, 5), &agent, &[&other], 10, true, &mut r));
        assert!(would_collide(Position::new(6, 5), &agent, &[&other], 10, false, &mut r));
    }

    #[test]
    fn test_dead_agents_ignored() {
        let agent = snake_at(1, &[(5, 5)]);
        let mut other = snake_at(2, &[(6, 5)]);
        other.alive = false;
        assert!(!would_collide(Position::new(6, 5), &agent, &[&other], 10, false, &mut rng()));
    }

    #[test]
    fn test_invisible_skip_is_partial() {
        let agent = snake_at(1, &[(5, 5)]);
        let mut other = snake_at(2, &[(6, 5)]);
        other.grant(Effect::Invisible, Instant::now());
        let mut r = rng();
        let hits = (0..1000)
            .filter(|_| would_collide(Position::new(6, 5), &agent, &[&other], 10, false, &mut r))
            .count();
        // Roughly 30% of checks still see the invisible agent
        assert!(hits > 200 && hits < 400, "hits = {}", hits);
    }

    #[test]
    fn test_open_spaces_capped_and_bounded() {
        let agent = snake_at(1, &[(0, 0)]);
        let mut r = rng();
        assert_eq!(count_open_spaces(Position::new(5, 5), &agent, &[], 10, OPEN_SPACE_CAP, &mut r), 30);
        assert_eq!(count_open_spaces(Position::new(5, 5), &agent, &[], 10, 1000, &mut r), 99);
        assert_eq!(count_open_spaces(Position::new(0, 0), &agent, &[], 10, 30, &mut r), 0);
    }

    #[test]
    fn test_open_spaces_in_pocket() {
        // Wall of another agent sealing off column 0..=1 rows 0..=1
        let agent = snake_at(1, &[(8, 8)]);
        let wall = snake_at(2, &[(2, 0), (2, 1), (2, 2), (1, 2), (0, 2)]);
        let n = count_open_spaces(Position::new(0, 0), &agent, &[&wall], 10, 30, &mut rng());
        assert_eq!(n, 4);
    }

    #[test]
    fn test_astar_straight_path() {
        let agent = snake_at(1, &[(1, 1)]);
        let path = plan_path_to_food(&agent, Position::new(4, 1), &[], 10, &mut rng());
        assert_eq!(path, vec![Position::new(2, 1), Position::new(3, 1), Position::new(4, 1)]);
    }

    #[test]
    fn test_astar_routes_around_obstacle() {
        let agent = snake_at(1, &[(1, 2)]);
        let wall = snake_at(2, &[(2, 1), (2, 2), (2, 3)]);
        let path = plan_path_to_food(&agent, Position::new(3, 2), &[&wall], 10, &mut rng());
        assert_eq!(path.len(), 6);
        assert_eq!(*path.last().unwrap(), Position::new(3, 2));
        for window in path.windows(2) {
            assert_eq!(manhattan_distance(window[0], window[1]), 1);
        }
        assert!(path.iter().all(|p| !wall.occupies(*p)));
    }

    #[test]
    fn test_astar_unreachable_returns_empty() {
        let agent = snake_at(1, &[(0, 0)]);
        let wall = snake_at(2, &[(1, 0), (1, 1), (0, 1)]);
        let path = plan_path_to_food(&agent, Position::new(5, 5), &[&wall], 10, &mut rng());
        assert!(path.is_empty());
    }

    #[test]
    fn test_astar_gives_up_past_cap() {
        // Target sealed inside a box far away forces exhaustive search
        let agent = snake_at(1, &[(0, 0)]);
        let walls = snake_at(2, &[(38, 39), (39, 38), (38, 38)]);
        let path = plan_path_to_food(&agent, Position::new(39, 39), &[&walls], 40, &mut rng());
        assert!(path.is_empty());
    }

    #[test]
    fn test_direction_between() {
        assert_eq!(direction_between(Position::new(1, 1), Position::new(1, 2)), Some(Direction::Down));
        assert_eq!(direction_between(Position::new(1, 1), Position::new(1, 1)), None);
        assert_eq!(direction_between(Position::new(1, 1), Position::new(3, 1)), None);
    }
}
