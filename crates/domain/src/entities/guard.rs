//! Hired guards protecting a sleeping character
//!
//! Guards are stored in the sleeper's save record as an ordered list and are
//! fought strictly left to right. A guard's HP persists between separate attack
//! attempts, so a defense wears down slowly across attackers.

use serde::{Deserialize, Serialize};

use crate::combat::CombatCharacter;
use crate::error::DomainError;

/// Current version of the persisted guard document.
pub const GUARD_SCHEMA_VERSION: u32 = 1;

/// Kind of hired guard. Determines hiring cost, base HP and stat scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuardType {
    #[serde(rename = "rookie_npc")]
    Rookie,
    #[serde(rename = "veteran_npc")]
    Veteran,
    #[serde(rename = "elite_npc")]
    Elite,
    #[serde(rename = "hound")]
    Hound,
    #[serde(rename = "troll")]
    Troll,
    #[serde(rename = "drake")]
    Drake,
    /// Unrecognised type from an older or newer writer; fights like a rookie.
    #[serde(other, rename = "guard")]
    Unknown,
}

/// Strength, defence and agility scaling factors for a guard type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardMultipliers {
    pub strength: f64,
    pub defence: f64,
    pub agility: f64,
}

impl GuardType {
    /// Every hireable guard type, cheapest first.
    pub const HIREABLE: [GuardType; 6] = [
        GuardType::Rookie,
        GuardType::Hound,
        GuardType::Troll,
        GuardType::Veteran,
        GuardType::Elite,
        GuardType::Drake,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GuardType::Rookie => "rookie_npc",
            GuardType::Veteran => "veteran_npc",
            GuardType::Elite => "elite_npc",
            GuardType::Hound => "hound",
            GuardType::Troll => "troll",
            GuardType::Drake => "drake",
            GuardType::Unknown => "guard",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GuardType::Rookie => "Rookie Guard",
            GuardType::Veteran => "Veteran Guard",
            GuardType::Elite => "Elite Guard",
            GuardType::Hound => "Guard Hound",
            GuardType::Troll => "Guard Troll",
            GuardType::Drake => "Guard Drake",
            GuardType::Unknown => "Guard",
        }
    }

    /// Base hiring cost in gold before the per-extra-guard surcharge.
    pub fn base_cost(&self) -> i64 {
        match self {
            GuardType::Rookie | GuardType::Unknown => 100,
            GuardType::Veteran => 300,
            GuardType::Elite => 600,
            GuardType::Hound => 150,
            GuardType::Troll => 500,
            GuardType::Drake => 1000,
        }
    }

    pub fn base_hp(&self) -> i64 {
        match self {
            GuardType::Rookie | GuardType::Unknown => 80,
            GuardType::Veteran => 150,
            GuardType::Elite => 250,
            GuardType::Hound => 60,
            GuardType::Troll => 200,
            GuardType::Drake => 300,
        }
    }

    /// HP of a freshly hired guard: base HP scaled by `1 + level/10`.
    pub fn hp_for_level(&self, owner_level: u32) -> i64 {
        self.base_hp() * (10 + i64::from(owner_level)) / 10
    }

    pub fn multipliers(&self) -> GuardMultipliers {
        let (strength, defence, agility) = match self {
            GuardType::Rookie | GuardType::Unknown => (0.6, 0.5, 0.5),
            GuardType::Veteran => (0.8, 0.8, 0.6),
            GuardType::Elite => (1.0, 1.0, 0.8),
            GuardType::Hound => (0.5, 0.3, 1.2),
            GuardType::Troll => (1.0, 1.2, 0.3),
            GuardType::Drake => (1.3, 1.0, 0.5),
        };
        GuardMultipliers {
            strength,
            defence,
            agility,
        }
    }
}

impl std::str::FromStr for GuardType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rookie_npc" | "rookie" => Ok(GuardType::Rookie),
            "veteran_npc" | "veteran" => Ok(GuardType::Veteran),
            "elite_npc" | "elite" => Ok(GuardType::Elite),
            "hound" => Ok(GuardType::Hound),
            "troll" => Ok(GuardType::Troll),
            "drake" => Ok(GuardType::Drake),
            other => Err(DomainError::parse(format!("unknown guard type '{other}'"))),
        }
    }
}

/// A single hired guard with persisted, mutable HP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guard {
    #[serde(rename = "type")]
    guard_type: GuardType,
    name: String,
    hp: i64,
    max_hp: i64,
}

impl Guard {
    /// Hire a fresh guard at full HP for a sleeper of the given level.
    pub fn hire(guard_type: GuardType, owner_level: u32) -> Self {
        let hp = guard_type.hp_for_level(owner_level);
        Self {
            guard_type,
            name: guard_type.display_name().to_string(),
            hp,
            max_hp: hp,
        }
    }

    /// Reconstruct from storage (database hydration)
    pub fn from_storage(guard_type: GuardType, name: String, hp: i64, max_hp: i64) -> Self {
        Self {
            guard_type,
            name,
            hp,
            max_hp,
        }
    }

    #[inline]
    pub fn guard_type(&self) -> GuardType {
        self.guard_type
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn hp(&self) -> i64 {
        self.hp
    }

    #[inline]
    pub fn max_hp(&self) -> i64 {
        self.max_hp
    }

    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }

    /// Copy of this guard carrying the HP left after a bout, clamped to `[0, max_hp]`.
    pub fn with_remaining_hp(&self, hp: i64) -> Self {
        Self {
            hp: hp.clamp(0, self.max_hp.max(0)),
            ..self.clone()
        }
    }

    /// Combat projection of this guard, stats scaled by the sleeper's level.
    ///
    /// The guard fights with its *current* HP, which is also its ceiling for the bout.
    pub fn combatant(&self, owner_level: u32) -> CombatCharacter {
        let m = self.guard_type.multipliers();
        let level = f64::from(owner_level);
        let agility = (level * 2.0 * m.agility) as i64;

        CombatCharacter {
            name: self.name.clone(),
            level: (owner_level / 2).max(1),
            hp: self.hp,
            max_hp: self.hp,
            strength: (level * 3.0 * m.strength) as i64,
            defence: (level * 3.0 * m.defence) as i64,
            agility,
            dexterity: agility,
            weapon_power: (level * 2.0 * m.strength) as i64,
            armor_power: (level * 2.0 * m.defence) as i64,
            gold: 0,
            is_player: false,
        }
    }
}

/// Cost of hiring a guard into roster slot `index` (0-based).
///
/// Each additional guard costs `extra_surcharge` more than the base, so the
/// third guard with a 50% surcharge costs `base * 2.0`.
pub fn guard_hire_cost(guard_type: GuardType, index: usize, extra_surcharge: f64) -> i64 {
    let factor = 1.0 + extra_surcharge * index as f64;
    (guard_type.base_cost() as f64 * factor).round() as i64
}

// =============================================================================
// Persisted document
// =============================================================================

/// Guard list as written to storage: `{"version":1,"guards":[...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardDocument {
    pub version: u32,
    pub guards: Vec<Guard>,
}

impl GuardDocument {
    pub fn current(guards: Vec<Guard>) -> Self {
        Self {
            version: GUARD_SCHEMA_VERSION,
            guards,
        }
    }
}

/// Any readable shape of a stored guard list.
///
/// Version 0 is the legacy bare array (`[]` or `[{"type":..,"hp":..}]`). It is
/// upgraded to the current document on the next write.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StoredGuards {
    Versioned(GuardDocument),
    Legacy(Vec<Guard>),
}

impl StoredGuards {
    pub fn into_guards(self) -> Result<Vec<Guard>, DomainError> {
        match self {
            StoredGuards::Legacy(guards) => Ok(guards),
            StoredGuards::Versioned(doc) if doc.version <= GUARD_SCHEMA_VERSION => Ok(doc.guards),
            StoredGuards::Versioned(doc) => Err(DomainError::corrupt(format!(
                "guard document version {} is newer than supported {}",
                doc.version, GUARD_SCHEMA_VERSION
            ))),
        }
    }
}
