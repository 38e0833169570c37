//! PvP rule settings
//!
//! Stored and transmitted as JSON, so every field has its own serde default and
//! a partial document only overrides what it names.

use serde::{Deserialize, Serialize};
use skirmish_domain::Percent;

use crate::use_cases::pvp::EligibilityRules;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvpSettings {
    // Arena
    #[serde(default = "default_arena_min_level")]
    pub arena_min_level: u32,
    #[serde(default = "default_arena_level_range")]
    pub arena_level_range: u32,
    /// Shared by arena fights and sleep attacks.
    #[serde(default = "default_max_attacks_per_day")]
    pub max_attacks_per_day: u32,
    #[serde(default = "default_arena_gold_theft")]
    pub arena_gold_theft: Percent,
    #[serde(default = "default_arena_xp_min")]
    pub arena_xp_min: i64,
    #[serde(default = "default_arena_xp_max")]
    pub arena_xp_max: i64,
    #[serde(default = "default_death_xp_penalty")]
    pub death_xp_penalty: Percent,
    #[serde(default = "default_death_gold_penalty")]
    pub death_gold_penalty: Percent,

    // Sleep attacks
    #[serde(default = "default_sleep_level_range")]
    pub sleep_level_range: u32,
    #[serde(default = "default_sleep_gold_theft")]
    pub sleep_gold_theft: Percent,
    #[serde(default = "default_sleep_xp_loss")]
    pub sleep_xp_loss: Percent,
    #[serde(default = "default_npc_raid_min_level")]
    pub npc_raid_min_level: u32,

    // Lodging and guards
    #[serde(default = "default_dormitory_cost")]
    pub dormitory_cost: i64,
    #[serde(default = "default_inn_cost_per_level")]
    pub inn_cost_per_level: i64,
    #[serde(default = "default_inn_defense_boost")]
    pub inn_defense_boost: Percent,
    #[serde(default = "default_max_guards")]
    pub max_guards: usize,
    #[serde(default = "default_extra_guard_surcharge")]
    pub extra_guard_surcharge: f64,

    /// Fresh-read retries when a settlement hits a stale write.
    #[serde(default = "default_stale_write_retries")]
    pub stale_write_retries: u32,
}

fn default_arena_min_level() -> u32 {
    5
}
fn default_arena_level_range() -> u32 {
    20
}
fn default_max_attacks_per_day() -> u32 {
    5
}
fn default_arena_gold_theft() -> Percent {
    Percent::from_basis_points(1_000)
}
fn default_arena_xp_min() -> i64 {
    25
}
fn default_arena_xp_max() -> i64 {
    5_000
}
fn default_death_xp_penalty() -> Percent {
    Percent::from_basis_points(1_000)
}
fn default_death_gold_penalty() -> Percent {
    Percent::from_basis_points(2_500)
}
fn default_sleep_level_range() -> u32 {
    5
}
fn default_sleep_gold_theft() -> Percent {
    Percent::from_basis_points(5_000)
}
fn default_sleep_xp_loss() -> Percent {
    Percent::from_basis_points(1_000)
}
fn default_npc_raid_min_level() -> u32 {
    5
}
fn default_dormitory_cost() -> i64 {
    10
}
fn default_inn_cost_per_level() -> i64 {
    75
}
fn default_inn_defense_boost() -> Percent {
    Percent::from_basis_points(5_000)
}
fn default_max_guards() -> usize {
    5
}
fn default_extra_guard_surcharge() -> f64 {
    0.5
}
fn default_stale_write_retries() -> u32 {
    3
}

impl Default for PvpSettings {
    fn default() -> Self {
        Self {
            arena_min_level: default_arena_min_level(),
            arena_level_range: default_arena_level_range(),
            max_attacks_per_day: default_max_attacks_per_day(),
            arena_gold_theft: default_arena_gold_theft(),
            arena_xp_min: default_arena_xp_min(),
            arena_xp_max: default_arena_xp_max(),
            death_xp_penalty: default_death_xp_penalty(),
            death_gold_penalty: default_death_gold_penalty(),
            sleep_level_range: default_sleep_level_range(),
            sleep_gold_theft: default_sleep_gold_theft(),
            sleep_xp_loss: default_sleep_xp_loss(),
            npc_raid_min_level: default_npc_raid_min_level(),
            dormitory_cost: default_dormitory_cost(),
            inn_cost_per_level: default_inn_cost_per_level(),
            inn_defense_boost: default_inn_defense_boost(),
            max_guards: default_max_guards(),
            extra_guard_surcharge: default_extra_guard_surcharge(),
            stale_write_retries: default_stale_write_retries(),
        }
    }
}

impl PvpSettings {
    pub fn arena_rules(&self) -> EligibilityRules {
        EligibilityRules {
            min_level: self.arena_min_level,
            max_level_delta: self.arena_level_range,
            max_attacks_per_day: self.max_attacks_per_day,
        }
    }

    pub fn sleep_rules(&self) -> EligibilityRules {
        EligibilityRules {
            min_level: 0,
            max_level_delta: self.sleep_level_range,
            max_attacks_per_day: self.max_attacks_per_day,
        }
    }

    /// Sleep-attack rules for NPC raiders: no daily cap, and fresh characters are spared.
    pub fn npc_raid_rules(&self) -> EligibilityRules {
        EligibilityRules {
            min_level: self.npc_raid_min_level,
            max_level_delta: self.sleep_level_range,
            max_attacks_per_day: u32::MAX,
        }
    }

    /// Inn room price for a character of `level`.
    pub fn inn_cost(&self, level: u32) -> i64 {
        self.inn_cost_per_level * i64::from(level.max(1))
    }

    pub fn clamp_arena_xp(&self, xp: i64) -> i64 {
        xp.clamp(self.arena_xp_min, self.arena_xp_max.max(self.arena_xp_min))
    }
}
