// Snake Arena - multi-agent snake simulation with AI tiers, power-ups and a terminal runner
pub mod ai;
pub mod arena;
pub mod config;
pub mod error;
pub mod logging;
pub mod pathfinding;
pub mod powerups;
pub mod render;
pub mod session;
pub mod skins;
pub mod snake;
pub mod stats;
pub mod types;

pub use arena::{Arena, ArenaState};
pub use config::{AppConfig, ArenaConfig};
pub use error::ArenaError;
pub use session::Session;
pub use stats::ArenaStats;
