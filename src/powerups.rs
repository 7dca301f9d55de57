// Power-up catalog, collectible items and per-agent effect timers

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::types::Position;

/// Chance that a single collision check ignores an agent holding `Invisible`
pub const INVISIBLE_SKIP_CHANCE: f64 = 0.7;
/// Manhattan radius inside which `Magnet` pulls food toward the head
pub const MAGNET_RANGE: i32 = 5;
/// Single-cell steps per tick while `Speed` is active
pub const SPEED_STEPS: usize = 2;
/// Minimum body length for `Split` to do anything
pub const SPLIT_MIN_LENGTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Speed,
    Shield,
    Invisible,
    Magnet,
    Teleport,
    Split,
}

/// Catalog entry: duration 0 means the effect fires once on acquisition
#[derive(Debug, Clone, Copy)]
pub struct EffectSpec {
    pub effect: Effect,
    pub name: &'static str,
    pub duration_secs: u64,
    pub glyph: char,
}

pub const CATALOG: [EffectSpec; 6] = [
    EffectSpec { effect: Effect::Speed, name: "Speed", duration_secs: 5, glyph: '»' },
    EffectSpec { effect: Effect::Shield, name: "Shield", duration_secs: 5, glyph: '◆' },
    EffectSpec { effect: Effect::Invisible, name: "Invisible", duration_secs: 7, glyph: '○' },
    EffectSpec { effect: Effect::Magnet, name: "Magnet", duration_secs: 8, glyph: 'U' },
    EffectSpec { effect: Effect::Teleport, name: "Teleport", duration_secs: 0, glyph: '@' },
    EffectSpec { effect: Effect::Split, name: "Split", duration_secs: 0, glyph: '%' },
];

impl Effect {
    pub const ALL: [Effect; 6] = [
        Effect::Speed,
        Effect::Shield,
        Effect::Invisible,
        Effect::Magnet,
        Effect::Teleport,
        Effect::Split,
    ];

    /// Abilities that can be assigned to AI agents at creation
    pub const UNIQUE_ABILITIES: [Effect; 3] = [Effect::Teleport, Effect::Split, Effect::Magnet];

    pub fn spec(&self) -> &'static EffectSpec {
        match self {
            Effect::Speed => &CATALOG[0],
            Effect::Shield => &CATALOG[1],
            Effect::Invisible => &CATALOG[2],
            Effect::Magnet => &CATALOG[3],
            Effect::Teleport => &CATALOG[4],
            Effect::Split => &CATALOG[5],
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.spec().duration_secs)
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Effect {
        Effect::ALL[rng.gen_range(0..Effect::ALL.len())]
    }
}

/// A collectible power-up lying on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PowerUpItem {
    pub position: Position,
    pub effect: Effect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePowerUp {
    pub time_left: Duration,
    pub start_time: Instant,
}

impl ActivePowerUp {
    pub fn remaining(&self, now: Instant) -> Duration {
        self.time_left.saturating_sub(now.saturating_duration_since(self.start_time))
    }
}

/// Active effects of one agent, at most one timer per effect
#[derive(Debug, Clone, Default)]
pub struct ActivePowerUps {
    active: BTreeMap<Effect, ActivePowerUp>,
}

impl ActivePowerUps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or refresh the timer for `effect`. Returns true when it was already held.
    ///
    /// Instant effects are recorded with a zero timer; they drop out on the next
    /// `update` and mark the agent as holding the effect until then.
    pub fn grant(&mut self, effect: Effect, now: Instant) -> bool {
        self.grant_for(effect, effect.duration(), now)
    }

    pub fn grant_for(&mut self, effect: Effect, time_left: Duration, now: Instant) -> bool {
        self.active
            .insert(effect, ActivePowerUp { time_left, start_time: now })
            .is_some()
    }

    /// Drop every effect whose elapsed time reached its `time_left`
    pub fn update(&mut self, now: Instant) -> Vec<Effect> {
        let mut expired = Vec::new();
        self.active.retain(|effect, timer| {
            let elapsed = now.saturating_duration_since(timer.start_time);
            if elapsed >= timer.time_left {
                expired.push(*effect);
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn holds(&self, effect: Effect) -> bool {
        self.active.contains_key(&effect)
    }

    pub fn get(&self, effect: Effect) -> Option<&ActivePowerUp> {
        self.active.get(&effect)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Effect, &ActivePowerUp)> {
        self.active.iter()
    }
}
