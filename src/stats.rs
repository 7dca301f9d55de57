//! Per-tick stats snapshot published to the registered observer.

use serde::Serialize;

use crate::powerups::Effect;

/// Number of agents listed in `ArenaStats::top_agents`
pub const TOP_AGENTS: usize = 5;

/// Callback receiving one immutable snapshot per tick
pub type StatsObserver = Box<dyn FnMut(&ArenaStats)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentScore {
    pub id: u32,
    pub skin: usize,
    pub score: u32,
    pub is_player: bool,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerUpStatus {
    pub effect: Effect,
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArenaStats {
    pub tick: u64,
    pub top_agents: Vec<AgentScore>, // score descending, at most TOP_AGENTS
    pub alive_agent_count: usize,
    pub food_count: usize,
    pub elapsed_ms: u64,
    pub player_score: Option<u32>,
    pub difficulty: u8,
    pub unlocked_skin_count: usize,
    pub active_player_power_ups: Vec<PowerUpStatus>,
    pub is_player_alive: bool,
}

/// Highest scores first; equal scores keep ascending id order
pub fn rank_agents(mut scores: Vec<AgentScore>) -> Vec<AgentScore> {
    scores.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
    scores.truncate(TOP_AGENTS);
    scores
}
