use serde::{Deserialize, Serialize};

use crate::value_objects::Percent;

/// Combat-ready projection of a character, guard or NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatCharacter {
    pub name: String,
    pub level: u32,
    pub hp: i64,
    pub max_hp: i64,
    pub strength: i64,
    pub defence: i64,
    pub agility: i64,
    pub dexterity: i64,
    pub weapon_power: i64,
    pub armor_power: i64,
    pub gold: i64,
    pub is_player: bool,
}

impl CombatCharacter {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Zero the projection's gold and return what it held.
    ///
    /// Defender projections go to the oracle penniless so only the engine moves gold.
    pub fn hide_gold(&mut self) -> i64 {
        std::mem::take(&mut self.gold)
    }

    /// Raise strength and defence by `boost` (an inn sleeper woken in their room).
    pub fn apply_defense_boost(&mut self, boost: Percent) {
        self.strength += boost.share_of(self.strength);
        self.defence += boost.share_of(self.defence);
    }
}
