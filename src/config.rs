// Config Module - Arena parameters, the TOML config file and command-line argument parsing
use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ai::Tier;
use crate::error::ArenaError;

/// Smallest board the arena accepts
pub const MIN_GRID_SIZE: usize = 8;

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Multiplayer snake arena with reactive, lookahead and pathfinding AI opponents",
    long_about = "Runs a snake arena in the terminal: one player against AI snakes competing for food\n\
                  and power-ups. AI difficulty ramps with the player's score. Settings are stored in\n\
                  ~/.config/snakearena/config.toml and changes to that file rebuild the arena live."
)]
pub struct Args {
    /// Config name (in ~/.config/snakearena/) or path to a config file
    #[arg(long)]
    pub cfg: Option<String>,

    /// Board width and height in cells
    #[arg(short, long)]
    pub grid: Option<usize>,

    /// Number of AI opponents
    #[arg(short, long)]
    pub agents: Option<usize>,

    /// Spectate only: no player-controlled snake
    #[arg(long)]
    pub no_player: bool,

    /// Initial AI difficulty (1 = basic, 2 = lookahead, 3 = pathfinding)
    #[arg(short, long)]
    pub difficulty: Option<u8>,

    /// Game speed multiplier (tick interval is divided by this)
    #[arg(short, long)]
    pub speed: Option<f64>,

    /// Seed for a reproducible session
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run without a terminal UI and print stats as JSON lines
    #[arg(long)]
    pub headless: bool,

    /// Ticks to simulate in headless mode
    #[arg(long, default_value_t = 600)]
    pub ticks: u64,

    /// Print a stats line every N ticks in headless mode
    #[arg(long, default_value_t = 50)]
    pub report_every: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Everything needed to construct one arena. Changing any of it means a new arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub grid_size: usize,          // square board side (default 30)
    pub agent_count: usize,        // AI opponents (default 5)
    pub player_enabled: bool,      // spawn a player-controlled snake
    pub difficulty: u8,            // 1-3, fixed when there is no player
    pub speed_multiplier: f64,     // tick interval = tick_ms / speed_multiplier
    pub tick_ms: u64,              // base tick interval (default 100ms)
    pub food_count: usize,         // food kept on the board
    pub power_up_interval_ms: u64, // power-up spawn interval (default 10s)
    pub max_power_ups: usize,      // concurrent power-up items (default 3)
    pub player_skin: usize,        // index into the skin table
    pub seed: Option<u64>,         // deterministic RNG when set
    pub unique_ability_chance: f64, // chance an AI agent gets a unique ability (default 0.3)
    pub ability_trigger_chance: f64, // per-tick self-trigger chance of that ability (default 0.005)
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            grid_size: 30,
            agent_count: 5,
            player_enabled: true,
            difficulty: 1,
            speed_multiplier: 1.0,
            tick_ms: 100,
            food_count: 5,
            power_up_interval_ms: 10_000,
            max_power_ups: 3,
            player_skin: 0,
            seed: None,
            unique_ability_chance: 0.3,
            ability_trigger_chance: 0.005,
        }
    }
}

impl ArenaConfig {
    pub fn total_agents(&self) -> usize {
        self.agent_count + usize::from(self.player_enabled)
    }

    /// Agents that fit: one per 4x4 block of the board
    pub fn agent_capacity(&self) -> usize {
        (self.grid_size / 4) * (self.grid_size / 4)
    }

    pub fn tier(&self) -> Tier {
        Tier::from_level(self.difficulty).unwrap_or_default()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_ms as f64 / 1000.0 / self.speed_multiplier)
    }

    pub fn power_up_interval(&self) -> Duration {
        Duration::from_millis(self.power_up_interval_ms)
    }

    /// Reject anything the arena cannot run
    pub fn validate(&self) -> Result<(), ArenaError> {
        let invalid = |msg: String| Err(ArenaError::InvalidConfig(msg));

        if self.grid_size < MIN_GRID_SIZE {
            return invalid(format!("grid size {} is below the minimum of {}", self.grid_size, MIN_GRID_SIZE));
        }
        if self.grid_size > i32::MAX as usize {
            return invalid(format!("grid size {} is too large", self.grid_size));
        }
        if self.total_agents() == 0 {
            return invalid("arena needs at least one agent".to_string());
        }
        if self.total_agents() > self.agent_capacity() {
            return invalid(format!(
                "{} agents do not fit on a {}x{} grid (max {})",
                self.total_agents(),
                self.grid_size,
                self.grid_size,
                self.agent_capacity()
            ));
        }
        if Tier::from_level(self.difficulty).is_none() {
            return invalid(format!("difficulty {} is outside 1-3", self.difficulty));
        }
        if !self.speed_multiplier.is_finite() || self.speed_multiplier <= 0.0 {
            return invalid(format!("speed multiplier {} must be positive", self.speed_multiplier));
        }
        if self.tick_ms == 0 {
            return invalid("tick interval must be non-zero".to_string());
        }
        if self.food_count == 0 {
            return invalid("food count must be at least 1".to_string());
        }
        for (name, chance) in [
            ("unique ability chance", self.unique_ability_chance),
            ("ability trigger chance", self.ability_trigger_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return invalid(format!("{} {} is outside 0-1", name, chance));
            }
        }
        if self.food_count + self.total_agents() + self.max_power_ups >= self.grid_size * self.grid_size {
            return invalid(format!("food count {} leaves no free cells", self.food_count));
        }
        Ok(())
    }
}

/// On-disk configuration for the terminal runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub arena: ArenaConfig,
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: "info".to_string(),
            arena: ArenaConfig::default(),
            config_path: None,
        }
    }
}

impl AppConfig {
    /// Override file values with explicitly given arguments. Returns true if any were given.
    pub fn merge_with_args(&mut self, args: &Args) -> bool {
        let mut args_provided = false;

        if let Some(grid) = args.grid {
            self.arena.grid_size = grid;
            args_provided = true;
        }

        if let Some(agents) = args.agents {
            self.arena.agent_count = agents;
            args_provided = true;
        }

        if args.no_player {
            self.arena.player_enabled = false;
            args_provided = true;
        }

        if let Some(difficulty) = args.difficulty {
            self.arena.difficulty = difficulty;
            args_provided = true;
        }

        if let Some(speed) = args.speed {
            self.arena.speed_multiplier = speed;
            args_provided = true;
        }

        if let Some(seed) = args.seed {
            self.arena.seed = Some(seed);
            args_provided = true;
        }

        if let Some(ref level) = args.log_level {
            self.log_level = level.clone();
            args_provided = true;
        }

        args_provided
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")?;
        let config_dir = PathBuf::from(home).join(".config").join("snakearena");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn config_path(cfg_arg: Option<&str>) -> Result<PathBuf> {
        if let Some(cfg) = cfg_arg {
            // Check if it's an absolute path
            let path = PathBuf::from(cfg);
            if path.is_absolute() {
                return Ok(path);
            }

            // Check if it contains path separators (relative path)
            if cfg.contains('/') || cfg.contains('\\') {
                return Ok(path);
            }

            // Otherwise treat as config name in config directory
            let filename = if cfg.ends_with(".toml") {
                cfg.to_string()
            } else {
                format!("{}.toml", cfg)
            };

            Ok(Self::config_dir()?.join(filename))
        } else {
            Ok(Self::config_dir()?.join("config.toml"))
        }
    }

    pub fn load_with_path(cfg_arg: Option<&str>) -> Result<Self> {
        let path = Self::config_path(cfg_arg)?;
        Self::load_from(path)
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)?;
        let mut parsed = Self::from_toml(&contents)?;
        parsed.config_path = Some(path);
        Ok(parsed)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut parsed: Self = toml::from_str(contents)?;
        parsed.sanitize();
        Ok(parsed)
    }

    /// Clamp values to ranges the terminal runner supports
    pub fn sanitize(&mut self) {
        self.log_level = self.log_level.trim().to_lowercase();
        if self.log_level.is_empty() {
            self.log_level = "info".to_string();
        }

        let arena = &mut self.arena;
        arena.grid_size = arena.grid_size.clamp(MIN_GRID_SIZE, 128);
        arena.agent_count = arena.agent_count.min(32);
        arena.difficulty = arena.difficulty.clamp(1, 3);
        arena.speed_multiplier = if arena.speed_multiplier.is_finite() {
            arena.speed_multiplier.clamp(0.25, 4.0)
        } else {
            1.0
        };
        arena.tick_ms = arena.tick_ms.clamp(20, 2000);
        arena.food_count = arena.food_count.clamp(1, 100);
        arena.power_up_interval_ms = arena.power_up_interval_ms.clamp(1000, 600_000);
        arena.max_power_ups = arena.max_power_ups.min(10);
        for chance in [&mut arena.unique_ability_chance, &mut arena.ability_trigger_chance] {
            *chance = if chance.is_finite() { chance.clamp(0.0, 1.0) } else { 0.0 };
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        let mut sanitized = self.clone();
        sanitized.sanitize();

        let body = toml::to_string_pretty(&sanitized)?;
        Ok(format!(
            "# snakearena configuration\n\
             # Any change to the [arena] table rebuilds the running arena.\n\
             # difficulty: 1 = basic, 2 = lookahead, 3 = pathfinding (ramps with player score)\n\
             # speed_multiplier divides tick_ms; seed makes sessions reproducible\n\n{}",
            body
        ))
    }

    pub fn save(&self) -> Result<()> {
        let path = match self.config_path.clone() {
            Some(path) => path,
            None => Self::config_path(None)?,
        };
        std::fs::write(&path, self.to_toml()?)?;
        Ok(())
    }

    /// Log file kept next to the config file
    pub fn log_path(&self) -> Option<PathBuf> {
        self.config_path
            .as_ref()
            .and_then(|p| p.parent())
            .map(|dir| dir.join("snakearena.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ArenaConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_configs() {
        let small = ArenaConfig { grid_size: 4, ..ArenaConfig::default() };
        assert!(matches!(small.validate(), Err(ArenaError::InvalidConfig(_))));

        let empty = ArenaConfig { agent_count: 0, player_enabled: false, ..ArenaConfig::default() };
        assert!(empty.validate().is_err());

        let crowded = ArenaConfig { grid_size: 8, agent_count: 4, ..ArenaConfig::default() };
        assert!(crowded.validate().is_err());

        let hard = ArenaConfig { difficulty: 4, ..ArenaConfig::default() };
        assert!(hard.validate().is_err());

        let frozen = ArenaConfig { speed_multiplier: 0.0, ..ArenaConfig::default() };
        assert!(frozen.validate().is_err());

        let starved = ArenaConfig { food_count: 0, ..ArenaConfig::default() };
        assert!(starved.validate().is_err());

        let eager = ArenaConfig { ability_trigger_chance: 1.5, ..ArenaConfig::default() };
        assert!(eager.validate().is_err());

        let gifted = ArenaConfig { unique_ability_chance: -0.1, ..ArenaConfig::default() };
        assert!(gifted.validate().is_err());
    }

    #[test]
    fn test_player_only_is_valid() {
        let solo = ArenaConfig { agent_count: 0, player_enabled: true, ..ArenaConfig::default() };
        assert!(solo.validate().is_ok());
        assert_eq!(solo.total_agents(), 1);
    }

    #[test]
    fn test_tick_interval_scaled_by_speed() {
        let fast = ArenaConfig { speed_multiplier: 2.0, ..ArenaConfig::default() };
        assert_eq!(fast.tick_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = AppConfig::default();
        assert!(!config.merge_with_args(&Args::default()));

        let args = Args { agents: Some(3), difficulty: Some(2), no_player: true, ..Args::default() };
        assert!(config.merge_with_args(&args));
        assert_eq!(config.arena.agent_count, 3);
        assert_eq!(config.arena.difficulty, 2);
        assert!(!config.arena.player_enabled);
    }

    #[test]
    fn test_toml_round_trip_and_sanitize() {
        let text = "log_level = \" DEBUG \"\n[arena]\ngrid_size = 500\ndifficulty = 9\nspeed_multiplier = 0.01\nability_trigger_chance = 2.0\n";
        let config = AppConfig::from_toml(text).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.arena.grid_size, 128);
        assert_eq!(config.arena.difficulty, 3);
        assert_eq!(config.arena.speed_multiplier, 0.25);
        assert_eq!(config.arena.agent_count, 5);
        assert_eq!(config.arena.ability_trigger_chance, 1.0);
        assert_eq!(config.arena.unique_ability_chance, 0.3);

        let reparsed = AppConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }
}
