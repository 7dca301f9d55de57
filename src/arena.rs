// Arena orchestrator - owns every agent, food cell and power-up item and runs the tick
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

use crate::ai::{self, Decision, Tier, View};
use crate::config::ArenaConfig;
use crate::error::{ArenaError, Result};
use crate::pathfinding::would_collide;
use crate::powerups::{Effect, PowerUpItem, MAGNET_RANGE, SPEED_STEPS};
use crate::skins::SkinTable;
use crate::snake::{DeathCause, Snake};
use crate::stats::{rank_agents, AgentScore, ArenaStats, PowerUpStatus, StatsObserver};
use crate::types::{manhattan_distance, Direction, Position};

/// Points for one food
pub const FOOD_SCORE: u32 = 10;

const SPAWN_MARGIN: i32 = 2;
const SPAWN_MIN_DISTANCE: i32 = 4;
const MAX_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaState {
    Idle,
    Running,
    Stopped,
}

pub struct Arena {
    config: ArenaConfig,
    grid_size: i32,
    snakes: Vec<Snake>,
    food: Vec<Position>,
    power_up_items: Vec<PowerUpItem>,
    tier: Tier,
    player_id: Option<u32>,
    skins: SkinTable,
    rng: ChaCha8Rng,
    next_id: u32,
    state: ArenaState,
    started_at: Option<Instant>,
    last_update: Instant,
    last_power_up_spawn: Instant,
    update_interval: Duration,
    tick: u64,
    observer: Option<StatsObserver>,
}

// Every living agent except `id`, split children included
fn others_of(snakes: &[Snake], id: u32) -> Vec<&Snake> {
    snakes
        .iter()
        .flat_map(|s| s.family())
        .filter(|s| s.id != id && s.alive)
        .collect()
}

fn find_snake(snakes: &[Snake], id: u32) -> Option<&Snake> {
    snakes.iter().find_map(|s| s.find(id))
}

fn find_snake_mut(snakes: &mut [Snake], id: u32) -> Option<&mut Snake> {
    snakes.iter_mut().find_map(|s| s.find_mut(id))
}

fn family_ids(snake: &Snake) -> Vec<u32> {
    snake.family().iter().map(|s| s.id).collect()
}

impl Arena {
    pub fn new(config: ArenaConfig, skins: SkinTable) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let now = Instant::now();
        let mut arena = Arena {
            grid_size: config.grid_size as i32,
            snakes: Vec::new(),
            food: Vec::new(),
            power_up_items: Vec::new(),
            tier: config.tier(),
            player_id: None,
            skins,
            rng,
            next_id: 1,
            state: ArenaState::Idle,
            started_at: None,
            last_update: now,
            last_power_up_spawn: now,
            update_interval: config.tick_interval(),
            tick: 0,
            observer: None,
            config,
        };

        if arena.config.player_enabled {
            let id = arena.allocate_id();
            let head = arena.spawn_position().ok_or(ArenaError::NoFreeCell(id))?;
            let skin = arena.config.player_skin.min(arena.skins.len().saturating_sub(1));
            arena
                .snakes
                .push(Snake::new(id, head, Direction::Still, true, arena.tier, skin));
            arena.player_id = Some(id);
        }

        for _ in 0..arena.config.agent_count {
            let id = arena.allocate_id();
            let head = arena.spawn_position().ok_or(ArenaError::NoFreeCell(id))?;
            let direction = Direction::random_cardinal(&mut arena.rng);
            let skin = if arena.skins.is_empty() {
                0
            } else {
                arena.rng.gen_range(0..arena.skins.len())
            };
            let mut snake = Snake::new(id, head, direction, false, arena.tier, skin);
            if arena.rng.gen_bool(arena.config.unique_ability_chance) {
                let pick = arena.rng.gen_range(0..Effect::UNIQUE_ABILITIES.len());
                snake.unique_ability = Some(Effect::UNIQUE_ABILITIES[pick]);
            }
            arena.snakes.push(snake);
        }

        arena.replenish_food();

        tracing::info!(
            grid = arena.grid_size,
            agents = arena.snakes.len(),
            player = arena.player_id.is_some(),
            difficulty = arena.tier.level(),
            "Arena created"
        );
        Ok(arena)
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // Random interior cell, spaced from other agents when possible
    fn spawn_position(&mut self) -> Option<Position> {
        let lo = SPAWN_MARGIN;
        let hi = self.grid_size - SPAWN_MARGIN;
        if lo >= hi {
            return None;
        }

        for _ in 0..MAX_ATTEMPTS {
            let pos = Position::new(self.rng.gen_range(lo..hi), self.rng.gen_range(lo..hi));
            let too_close = self
                .snakes
                .iter()
                .any(|s| manhattan_distance(s.head(), pos) < SPAWN_MIN_DISTANCE);
            if !too_close && !self.is_occupied(pos) {
                return Some(pos);
            }
        }

        // Fallback: first free interior cell, spacing ignored
        (lo..hi)
            .flat_map(|y| (lo..hi).map(move |x| Position::new(x, y)))
            .find(|p| !self.is_occupied(*p))
    }

    /// True if `pos` holds a body, food or a power-up item
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.occupied_by_body(pos) || self.food.contains(&pos) || self.power_up_items.iter().any(|i| i.position == pos)
    }

    fn occupied_by_body(&self, pos: Position) -> bool {
        self.snakes.iter().flat_map(|s| s.family()).any(|s| s.occupies(pos))
    }

    /// Uniformly random cell free of bodies, food and items
    pub fn random_free_cell(&mut self) -> Option<Position> {
        for _ in 0..MAX_ATTEMPTS {
            let pos = Position::new(
                self.rng.gen_range(0..self.grid_size),
                self.rng.gen_range(0..self.grid_size),
            );
            if !self.is_occupied(pos) {
                return Some(pos);
            }
        }

        // Crowded board: pick among the free cells that remain
        let free: Vec<Position> = (0..self.grid_size)
            .flat_map(|y| (0..self.grid_size).map(move |x| Position::new(x, y)))
            .filter(|p| !self.is_occupied(*p))
            .collect();
        if free.is_empty() {
            None
        } else {
            Some(free[self.rng.gen_range(0..free.len())])
        }
    }

    /// Place one food on a free cell. Returns false when the board is full.
    pub fn spawn_food(&mut self) -> bool {
        match self.random_free_cell() {
            Some(pos) => {
                self.food.push(pos);
                true
            }
            None => false,
        }
    }

    fn replenish_food(&mut self) {
        while self.food.len() < self.config.food_count {
            if !self.spawn_food() {
                break;
            }
        }
    }

    /// Place one power-up item with a random effect, if below the cap
    pub fn spawn_power_up(&mut self) -> Option<PowerUpItem> {
        if self.power_up_items.len() >= self.config.max_power_ups {
            return None;
        }
        let position = self.random_free_cell()?;
        let effect = Effect::random(&mut self.rng);
        let item = PowerUpItem { position, effect };
        self.power_up_items.push(item);
        tracing::debug!(x = position.x, y = position.y, effect = ?effect, "Power-up spawned");
        Some(item)
    }

    // ------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, now: Instant) {
        if self.state == ArenaState::Running || self.is_game_over() {
            return;
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
            self.last_power_up_spawn = now;
        }
        self.last_update = now;
        self.state = ArenaState::Running;
    }

    /// Halt future ticks. A tick in progress always runs to completion.
    pub fn stop(&mut self) {
        if self.state == ArenaState::Running {
            self.state = ArenaState::Stopped;
        }
    }

    /// Steer the player. Reversals are refused the same way they are for AI agents.
    pub fn set_player_direction(&mut self, direction: Direction) -> bool {
        let Some(id) = self.player_id else {
            return false;
        };
        match find_snake_mut(&mut self.snakes, id) {
            Some(player) if player.alive => player.set_direction(direction),
            _ => false,
        }
    }

    pub fn set_observer(&mut self, observer: StatsObserver) {
        self.observer = Some(observer);
    }

    pub fn take_observer(&mut self) -> Option<StatsObserver> {
        self.observer.take()
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Run one tick if the fixed interval has elapsed. Early calls are coalesced.
    pub fn update(&mut self) -> bool {
        if self.last_update.elapsed() < self.update_interval {
            return false;
        }
        let now = Instant::now();
        self.last_update = now;
        self.step(now)
    }

    /// Run one tick at `now` regardless of the wall-clock gate
    pub fn step(&mut self, now: Instant) -> bool {
        if self.state != ArenaState::Running {
            return false;
        }
        self.tick += 1;

        // Power-up and food spawning
        if now.saturating_duration_since(self.last_power_up_spawn) >= self.config.power_up_interval() {
            self.last_power_up_spawn = now;
            self.spawn_power_up();
        }
        self.replenish_food();

        self.ramp_difficulty();
        self.think_all(now);
        self.resolve_collisions();
        let (eaten, pickups) = self.move_all();

        for _ in 0..eaten {
            self.spawn_food();
        }
        for (id, effect) in pickups {
            self.grant_effect(id, effect, now);
        }

        for snake in &mut self.snakes {
            snake.prune_dead_children();
        }

        if self.is_game_over() {
            tracing::info!(tick = self.tick, "Game over");
            self.state = ArenaState::Stopped;
        }

        self.publish(now);
        true
    }

    /// Player dead, or nobody left alive
    pub fn is_game_over(&self) -> bool {
        match self.player_id {
            Some(id) => !find_snake(&self.snakes, id).is_some_and(|p| p.alive),
            None => !self.snakes.iter().any(|s| s.alive),
        }
    }

    fn ramp_difficulty(&mut self) {
        let Some(score) = self.player().map(|p| p.score) else {
            return;
        };
        let tier = Tier::for_player_score(score);
        if tier != self.tier {
            tracing::info!(from = self.tier.level(), to = tier.level(), score, "Difficulty changed");
            self.tier = tier;
        }
        for snake in &mut self.snakes {
            if snake.is_player {
                // The player's split child is AI driven
                if let Some(child) = snake.split_child.as_deref_mut() {
                    set_family_tier(child, tier);
                }
            } else {
                set_family_tier(snake, tier);
            }
        }
    }

    fn think_all(&mut self, now: Instant) {
        for index in 0..self.snakes.len() {
            if !self.snakes[index].alive {
                continue;
            }
            for id in family_ids(&self.snakes[index]) {
                self.think(id, now);
            }
        }
    }

    fn think(&mut self, id: u32, now: Instant) {
        let ability = {
            let Some(snake) = find_snake_mut(&mut self.snakes, id) else {
                return;
            };
            if !snake.alive {
                return;
            }
            snake.has_teleported = false;
            for effect in snake.power_ups.update(now) {
                tracing::debug!(id, effect = ?effect, "Power-up expired");
            }
            if snake.is_player {
                return;
            }
            snake.unique_ability
        };

        if let Some(effect) = ability {
            if self.rng.gen_bool(self.config.ability_trigger_chance) {
                tracing::debug!(id, effect = ?effect, "Ability triggered");
                self.grant_effect(id, effect, now);
            }
        }

        let decision = {
            let Some(me) = find_snake(&self.snakes, id) else {
                return;
            };
            let others = others_of(&self.snakes, id);
            let view = View {
                others: &others,
                food: &self.food,
                grid_size: self.grid_size,
            };
            ai::decide(me, &view, &mut self.rng)
        };

        if let Some(snake) = find_snake_mut(&mut self.snakes, id) {
            match decision {
                Decision::Move(direction) => {
                    snake.set_direction(direction);
                }
                Decision::Trapped => {
                    tracing::debug!(id, "Agent trapped");
                    snake.kill(DeathCause::Trapped);
                }
            }
        }
    }

    // Every check reads the pre-movement state, so iteration order does not matter
    fn resolve_collisions(&mut self) {
        let mut deaths = Vec::new();
        for member in self.snakes.iter().flat_map(|s| s.family()) {
            if !member.alive || !member.direction.is_moving() {
                continue;
            }
            let next = member.head().step(member.direction);
            let others = others_of(&self.snakes, member.id);
            if would_collide(next, member, &others, self.grid_size, true, &mut self.rng) {
                deaths.push((member.id, death_cause(next, member, &others, self.grid_size)));
            }
        }

        for (id, cause) in deaths {
            if let Some(snake) = find_snake_mut(&mut self.snakes, id) {
                tracing::debug!(id, cause = ?cause, "Agent died");
                snake.kill(cause);
            }
        }
    }

    // Returns food eaten and power-up pickups as (agent id, effect)
    fn move_all(&mut self) -> (usize, Vec<(u32, Effect)>) {
        let mut eaten = 0;
        let mut pickups = Vec::new();
        for index in 0..self.snakes.len() {
            for id in family_ids(&self.snakes[index]) {
                eaten += self.move_snake(id, &mut pickups);
            }
        }
        (eaten, pickups)
    }

    fn move_snake(&mut self, id: u32, pickups: &mut Vec<(u32, Effect)>) -> usize {
        let (steps, direction) = match find_snake(&self.snakes, id) {
            Some(s) if s.alive && s.direction.is_moving() => {
                let steps = if s.holds(Effect::Speed) { SPEED_STEPS } else { 1 };
                (steps, s.direction)
            }
            _ => return 0,
        };

        // Magnet pulls once per tick, from where the head starts
        if let Some(head) = find_snake(&self.snakes, id).filter(|s| s.holds(Effect::Magnet)).map(Snake::head) {
            self.apply_magnet(head);
        }

        for step in 0..steps {
            let Some(head) = find_snake(&self.snakes, id).map(Snake::head) else {
                return 0;
            };
            let next = head.step(direction);

            // Extra speed steps were not part of the collision phase
            if step > 0 {
                let blocked = {
                    let me = find_snake(&self.snakes, id);
                    let others = others_of(&self.snakes, id);
                    me.map(|me| {
                        let hit = would_collide(next, me, &others, self.grid_size, true, &mut self.rng);
                        (hit, death_cause(next, me, &others, self.grid_size))
                    })
                };
                if let Some((true, cause)) = blocked {
                    if let Some(snake) = find_snake_mut(&mut self.snakes, id) {
                        tracing::debug!(id, cause = ?cause, "Agent died on speed step");
                        snake.kill(cause);
                    }
                    return 0;
                }
            }

            let ate = match self.food.iter().position(|f| *f == next) {
                Some(i) => {
                    self.food.swap_remove(i);
                    true
                }
                None => false,
            };
            if let Some(i) = self.power_up_items.iter().position(|item| item.position == next) {
                let item = self.power_up_items.swap_remove(i);
                pickups.push((id, item.effect));
            }

            let grid_size = self.grid_size;
            let Some(snake) = find_snake_mut(&mut self.snakes, id) else {
                return 0;
            };
            snake.advance(next, ate);
            assert!(
                snake.body.iter().all(|p| p.in_bounds(grid_size)),
                "agent {} left the board",
                id
            );

            if ate {
                snake.score += FOOD_SCORE;
                return 1;
            }
        }
        0
    }

    // Pull food within range one cell toward `head`
    fn apply_magnet(&mut self, head: Position) {
        for i in 0..self.food.len() {
            let food = self.food[i];
            let distance = manhattan_distance(food, head);
            if distance == 0 || distance > MAGNET_RANGE {
                continue;
            }
            let dx = head.x - food.x;
            let dy = head.y - food.y;
            let pulled = if dx.abs() >= dy.abs() {
                Position::new(food.x + dx.signum(), food.y)
            } else {
                Position::new(food.x, food.y + dy.signum())
            };
            if pulled == head || self.is_occupied(pulled) {
                continue;
            }
            self.food[i] = pulled;
        }
    }

    /// Give `effect` to agent `id` as if it had collected it
    pub fn grant_effect(&mut self, id: u32, effect: Effect, now: Instant) {
        // Gather what the side effect needs before borrowing the agent
        let teleport_target = if effect == Effect::Teleport {
            self.random_free_cell()
        } else {
            None
        };
        let child_id = if effect == Effect::Split {
            Some(self.allocate_id())
        } else {
            None
        };

        let grid_size = self.grid_size;
        let Some(snake) = find_snake_mut(&mut self.snakes, id) else {
            return;
        };
        if !snake.alive {
            return;
        }

        let refreshed = snake.grant(effect, now);
        tracing::debug!(id, effect = ?effect, refreshed, "Power-up granted");

        match effect {
            Effect::Teleport => {
                if let Some(target) = teleport_target {
                    if snake.teleport(target) {
                        tracing::debug!(id, x = target.x, y = target.y, "Agent teleported");
                    }
                }
            }
            Effect::Split => {
                if let Some(child_id) = child_id {
                    if snake.split(child_id, grid_size, &mut self.rng) {
                        tracing::debug!(id, child = child_id, "Agent split");
                    }
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    pub fn stats(&self, now: Instant) -> ArenaStats {
        let members: Vec<&Snake> = self.snakes.iter().flat_map(|s| s.family()).collect();
        let scores: Vec<AgentScore> = members
            .iter()
            .map(|s| AgentScore {
                id: s.id,
                skin: s.skin,
                score: s.score,
                is_player: s.is_player,
                alive: s.alive,
            })
            .collect();

        let player = self.player();
        let player_score = player.map(|p| p.score);
        let active_player_power_ups: Vec<PowerUpStatus> = player
            .map(|p| {
                p.power_ups
                    .iter()
                    .map(|(effect, timer)| PowerUpStatus {
                        effect: *effect,
                        remaining_ms: timer.remaining(now).as_millis() as u64,
                    })
                    .collect()
            })
            .unwrap_or_default();

        ArenaStats {
            tick: self.tick,
            top_agents: rank_agents(scores),
            alive_agent_count: members.iter().filter(|s| s.alive).count(),
            food_count: self.food.len(),
            elapsed_ms: self.elapsed(now).as_millis() as u64,
            player_score,
            difficulty: self.tier.level(),
            unlocked_skin_count: self.skins.unlocked_count(player_score.unwrap_or(0)),
            active_player_power_ups,
            is_player_alive: player.is_some_and(|p| p.alive),
        }
    }

    fn publish(&mut self, now: Instant) {
        if self.observer.is_none() {
            return;
        }
        let stats = self.stats(now);
        if let Some(observer) = self.observer.as_mut() {
            observer(&stats);
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Read-only access for renderers and tests
    // ------------------------------------------------------------------

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn grid_size(&self) -> i32 {
        self.grid_size
    }

    pub fn snakes(&self) -> &[Snake] {
        &self.snakes
    }

    /// Every agent including split children
    pub fn agents(&self) -> Vec<&Snake> {
        self.snakes.iter().flat_map(|s| s.family()).collect()
    }

    pub fn snake(&self, id: u32) -> Option<&Snake> {
        find_snake(&self.snakes, id)
    }

    pub fn player(&self) -> Option<&Snake> {
        self.player_id.and_then(|id| find_snake(&self.snakes, id))
    }

    pub fn food(&self) -> &[Position] {
        &self.food
    }

    pub fn power_up_items(&self) -> &[PowerUpItem] {
        &self.power_up_items
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn state(&self) -> ArenaState {
        self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn skins(&self) -> &SkinTable {
        &self.skins
    }

    // ------------------------------------------------------------------
    // Board setup for scripted scenarios
    // ------------------------------------------------------------------

    /// Remove every agent, food and item
    pub fn clear_board(&mut self) {
        self.snakes.clear();
        self.food.clear();
        self.power_up_items.clear();
        self.player_id = None;
    }

    /// Add an agent; its id is replaced with a fresh one, which is returned
    pub fn add_snake(&mut self, mut snake: Snake) -> u32 {
        assert!(
            snake.body.iter().all(|p| p.in_bounds(self.grid_size)),
            "agent body must lie on the board"
        );
        let id = self.allocate_id();
        snake.id = id;
        if snake.is_player {
            self.player_id = Some(id);
        }
        self.snakes.push(snake);
        id
    }

    pub fn add_food(&mut self, pos: Position) {
        assert!(pos.in_bounds(self.grid_size), "food must lie on the board");
        self.food.push(pos);
    }

    pub fn add_power_up_item(&mut self, item: PowerUpItem) {
        assert!(item.position.in_bounds(self.grid_size), "item must lie on the board");
        self.power_up_items.push(item);
    }

    pub fn snake_mut(&mut self, id: u32) -> Option<&mut Snake> {
        find_snake_mut(&mut self.snakes, id)
    }
}

fn set_family_tier(snake: &mut Snake, tier: Tier) {
    snake.tier = tier;
    if let Some(child) = snake.split_child.as_deref_mut() {
        set_family_tier(child, tier);
    }
}

// Best-effort explanation of a collision, for logs
fn death_cause(next: Position, me: &Snake, others: &[&Snake], grid_size: i32) -> DeathCause {
    if !next.in_bounds(grid_size) {
        DeathCause::Wall
    } else if me.occupies(next) {
        DeathCause::OwnBody
    } else {
        others
            .iter()
            .find(|o| o.occupies(next))
            .map(|o| DeathCause::Agent(o.id))
            .unwrap_or(DeathCause::Agent(0))
    }
}
