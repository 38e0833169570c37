//! Read-only directory views used for target selection

use serde::{Deserialize, Serialize};

use super::sleep_state::SleepLocation;
use crate::ids::PlayerId;

/// Lightweight directory entry. Never mutated by the PvP engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub display_name: String,
    pub level: u32,
    pub class_id: u32,
    pub is_online: bool,
    /// Resting at a safe house or otherwise hidden from attackers
    pub is_hidden: bool,
}

/// A registered sleeper as seen from the dormitory or inn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleeperSummary {
    pub id: PlayerId,
    pub display_name: String,
    pub level: u32,
    pub location: SleepLocation,
    pub is_dead: bool,
    pub guard_count: usize,
    pub is_hidden: bool,
    pub team: Option<String>,
    pub spouse: Option<PlayerId>,
}
