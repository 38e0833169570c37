//! Append-only attack history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AttackLogId, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackerKind {
    Player,
    Npc,
}

impl AttackerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackerKind::Player => "player",
            AttackerKind::Npc => "npc",
        }
    }
}

/// Where the attack happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackVenue {
    Arena,
    Dormitory,
    Inn,
}

impl AttackVenue {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackVenue::Arena => "arena",
            AttackVenue::Dormitory => "dormitory",
            AttackVenue::Inn => "inn",
        }
    }
}

/// Terminal outcome of one attack attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackResult {
    AttackerWon,
    GuardsRepelled,
    DefenderWon,
    AttackerFled,
}

impl AttackResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackResult::AttackerWon => "attacker_won",
            AttackResult::GuardsRepelled => "guards_repelled",
            AttackResult::DefenderWon => "defender_won",
            AttackResult::AttackerFled => "attacker_fled",
        }
    }
}

impl std::str::FromStr for AttackResult {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attacker_won" => Ok(AttackResult::AttackerWon),
            "guards_repelled" => Ok(AttackResult::GuardsRepelled),
            "defender_won" => Ok(AttackResult::DefenderWon),
            "attacker_fled" => Ok(AttackResult::AttackerFled),
            other => Err(crate::error::DomainError::parse(format!(
                "unknown attack result '{other}'"
            ))),
        }
    }
}

/// One attack attempt as recorded against the defender. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackLogEntry {
    pub id: AttackLogId,
    /// `None` for NPC attackers
    pub attacker_id: Option<PlayerId>,
    pub attacker_name: String,
    #[serde(rename = "type")]
    pub attacker_kind: AttackerKind,
    pub defender_id: PlayerId,
    pub defender_name: String,
    pub venue: AttackVenue,
    pub result: AttackResult,
    pub gold_stolen: i64,
    pub item_stolen: Option<String>,
    pub xp_lost: i64,
    pub attacker_level: u32,
    pub defender_level: u32,
    pub timestamp: DateTime<Utc>,
}

impl AttackLogEntry {
    /// True when the attacker came out on top.
    pub fn attacker_won(&self) -> bool {
        self.result == AttackResult::AttackerWon
    }
}
