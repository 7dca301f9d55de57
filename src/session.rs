// Session controller - owns the arena and rebuilds it whenever its configuration changes
use std::time::Instant;

use crate::arena::{Arena, ArenaState};
use crate::config::ArenaConfig;
use crate::error::Result;
use crate::skins::SkinTable;
use crate::stats::{ArenaStats, StatsObserver};
use crate::types::Direction;

pub struct Session {
    config: ArenaConfig,
    skins: SkinTable,
    arena: Arena,
}

impl Session {
    pub fn new(config: ArenaConfig, skins: SkinTable) -> Result<Self> {
        let arena = Arena::new(config.clone(), skins.clone())?;
        Ok(Session { config, skins, arena })
    }

    pub fn start(&mut self) {
        self.arena.start();
    }

    pub fn stop(&mut self) {
        self.arena.stop();
    }

    pub fn is_running(&self) -> bool {
        self.arena.state() == ArenaState::Running
    }

    pub fn is_game_over(&self) -> bool {
        self.arena.is_game_over()
    }

    /// Fresh arena from the current configuration, started immediately
    pub fn restart(&mut self) -> Result<()> {
        self.apply_config(self.config.clone())?;
        self.arena.start();
        Ok(())
    }

    pub fn set_player_direction(&mut self, direction: Direction) -> bool {
        self.arena.set_player_direction(direction)
    }

    pub fn set_agent_count(&mut self, agent_count: usize) -> Result<()> {
        let config = ArenaConfig { agent_count, ..self.config.clone() };
        self.apply_config(config)
    }

    pub fn set_difficulty(&mut self, difficulty: u8) -> Result<()> {
        let config = ArenaConfig { difficulty, ..self.config.clone() };
        self.apply_config(config)
    }

    pub fn set_speed_multiplier(&mut self, speed_multiplier: f64) -> Result<()> {
        let config = ArenaConfig { speed_multiplier, ..self.config.clone() };
        self.apply_config(config)
    }

    /// Replace the arena with one built from `config`. The observer moves to the new
    /// arena. On an invalid config the current arena is kept untouched.
    pub fn apply_config(&mut self, config: ArenaConfig) -> Result<()> {
        let mut arena = match Arena::new(config.clone(), self.skins.clone()) {
            Ok(arena) => arena,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected arena configuration");
                return Err(e);
            }
        };

        let was_running = self.is_running();
        if let Some(observer) = self.arena.take_observer() {
            arena.set_observer(observer);
        }
        self.arena.stop();
        self.arena = arena;
        self.config = config;
        if was_running {
            self.arena.start();
        }

        tracing::info!(
            grid = self.config.grid_size,
            agents = self.config.agent_count,
            difficulty = self.config.difficulty,
            speed = self.config.speed_multiplier,
            "Arena rebuilt"
        );
        Ok(())
    }

    pub fn set_observer(&mut self, observer: StatsObserver) {
        self.arena.set_observer(observer);
    }

    /// Wall-clock gated tick
    pub fn update(&mut self) -> bool {
        self.arena.update()
    }

    pub fn step(&mut self, now: Instant) -> bool {
        self.arena.step(now)
    }

    pub fn stats(&self, now: Instant) -> ArenaStats {
        self.arena.stats(now)
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn skins(&self) -> &SkinTable {
        &self.skins
    }
}
