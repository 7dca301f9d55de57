// Snake agent model - body, heading, score, effects and the optional split child
use rand::Rng;
use std::collections::VecDeque;
use std::time::Instant;

use crate::ai::Tier;
use crate::powerups::{ActivePowerUps, Effect, SPLIT_MIN_LENGTH};
use crate::types::{Direction, Position};

/// Why an agent stopped being alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Wall,
    OwnBody,
    Agent(u32),
    Trapped,
    ParentDied,
}

#[derive(Debug, Clone)]
pub struct Snake {
    pub id: u32,
    pub body: VecDeque<Position>, // head first, never empty
    pub direction: Direction,
    pub score: u32,
    pub alive: bool,
    pub is_player: bool,
    pub tier: Tier,
    pub skin: usize,
    pub unique_ability: Option<Effect>,
    pub power_ups: ActivePowerUps,
    pub split_child: Option<Box<Snake>>,
    pub has_teleported: bool, // reset at the start of every think
    pub death_cause: Option<DeathCause>,
}

impl Snake {
    pub fn new(id: u32, head: Position, direction: Direction, is_player: bool, tier: Tier, skin: usize) -> Self {
        let mut body = VecDeque::new();
        body.push_back(head);
        Snake {
            id,
            body,
            direction,
            score: 0,
            alive: true,
            is_player,
            tier,
            skin,
            unique_ability: None,
            power_ups: ActivePowerUps::new(),
            split_child: None,
            has_teleported: false,
            death_cause: None,
        }
    }

    /// Build an agent from an explicit head-first body
    pub fn with_body(id: u32, body: impl IntoIterator<Item = Position>, direction: Direction, tier: Tier) -> Self {
        let body: VecDeque<Position> = body.into_iter().collect();
        assert!(!body.is_empty(), "snake body must not be empty");
        Snake {
            body,
            ..Snake::new(id, Position::default(), direction, false, tier, 0)
        }
    }

    pub fn head(&self) -> Position {
        *self.body.front().expect("snake body is never empty")
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn occupies(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    pub fn holds(&self, effect: Effect) -> bool {
        self.power_ups.holds(effect)
    }

    /// Heading of the last move made, read from the neck. Falls back to the
    /// queued heading for single-cell bodies.
    pub fn moved_direction(&self) -> Direction {
        match (self.body.get(1), self.body.front()) {
            (Some(neck), Some(head)) => Direction::from_delta(head.x - neck.x, head.y - neck.y).unwrap_or(self.direction),
            _ => self.direction,
        }
    }

    /// True if `direction` would turn the head back into the neck
    pub fn is_reversal(&self, direction: Direction) -> bool {
        self.len() > 1 && direction.is_reverse_of(self.moved_direction())
    }

    /// Change heading. A 180 degree turn against the last move is refused while
    /// the body is longer than one cell, unless the agent holds `Split`.
    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if !direction.is_moving() {
            return false;
        }
        if self.is_reversal(direction) && !self.holds(Effect::Split) {
            return false;
        }
        self.direction = direction;
        true
    }

    pub fn kill(&mut self, cause: DeathCause) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.death_cause = Some(cause);
        if let Some(child) = self.split_child.as_mut() {
            child.kill(DeathCause::ParentDied);
        }
    }

    /// This agent followed by its split child chain
    pub fn family(&self) -> Vec<&Snake> {
        let mut members = vec![self];
        let mut current = self;
        while let Some(child) = current.split_child.as_deref() {
            members.push(child);
            current = child;
        }
        members
    }

    pub fn find(&self, id: u32) -> Option<&Snake> {
        if self.id == id {
            return Some(self);
        }
        self.split_child.as_deref().and_then(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: u32) -> Option<&mut Snake> {
        if self.id == id {
            return Some(self);
        }
        self.split_child.as_deref_mut().and_then(|child| child.find_mut(id))
    }

    /// Drop split children that are no longer alive
    pub fn prune_dead_children(&mut self) {
        let dead = matches!(self.split_child.as_deref(), Some(child) if !child.alive);
        if dead {
            self.split_child = None;
        }
        if let Some(child) = self.split_child.as_deref_mut() {
            child.prune_dead_children();
        }
    }

    /// Move the head one cell; the tail follows unless `grow` is set
    pub fn advance(&mut self, next: Position, grow: bool) {
        self.body.push_front(next);
        if !grow {
            self.body.pop_back();
        }
    }

    /// Collapse the body to a single cell at `target`
    pub fn teleport(&mut self, target: Position) -> bool {
        if self.has_teleported {
            return false;
        }
        self.body.clear();
        self.body.push_back(target);
        self.has_teleported = true;
        true
    }

    /// Detach the back half of the body into a new child heading at a right angle
    /// to the current direction. No-op for bodies of `SPLIT_MIN_LENGTH - 1` or
    /// fewer cells, and while a living child already exists.
    pub fn split<R: Rng + ?Sized>(&mut self, child_id: u32, grid_size: i32, rng: &mut R) -> bool {
        if self.len() < SPLIT_MIN_LENGTH {
            return false;
        }
        if matches!(self.split_child.as_deref(), Some(child) if child.alive) {
            return false;
        }

        let keep = self.len().div_ceil(2);
        let mut detached = self.body.split_off(keep);
        // Old tail becomes the child's head so it starts away from the parent
        detached.make_contiguous().reverse();

        let heading = if self.direction.is_moving() {
            self.direction
        } else {
            Direction::random_cardinal(rng)
        };
        let mut options = heading.perpendiculars();
        if rng.gen_bool(0.5) {
            options.swap(0, 1);
        }
        let child_head = detached[0];
        let child_direction = options
            .iter()
            .copied()
            .find(|dir| {
                let next = child_head.step(*dir);
                next.in_bounds(grid_size) && !detached.contains(&next) && !self.occupies(next)
            })
            .unwrap_or(options[0]);

        let mut child = Snake::with_body(child_id, detached, child_direction, self.tier);
        child.skin = self.skin;
        self.split_child = Some(Box::new(child));
        true
    }

    /// Record an effect timer (refreshing it if already held)
    pub fn grant(&mut self, effect: Effect, now: Instant) -> bool {
        self.power_ups.grant(effect, now)
    }
}
