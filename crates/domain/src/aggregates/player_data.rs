//! PlayerData - the stat block section of a save record
//!
//! The same shape is used for an attacker's live session state and for the
//! player section of an offline character's save.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::CombatCharacter;
use crate::entities::EquipmentItem;
use crate::error::DomainError;
use crate::ids::{ItemId, PlayerId};
use crate::value_objects::Percent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerData {
    pub display_name: String,
    pub level: u32,
    pub class_id: u32,
    pub hp: i64,
    pub max_hp: i64,
    pub strength: i64,
    pub defence: i64,
    pub agility: i64,
    pub dexterity: i64,
    pub weapon_power: i64,
    pub armor_power: i64,
    pub gold: i64,
    pub bank_gold: i64,
    pub experience: i64,
    pub poison: i64,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub spouse: Option<PlayerId>,
    #[serde(default)]
    pub safe_house_resting: bool,
    #[serde(default)]
    pub equipment: Vec<EquipmentItem>,
    /// Slot name to equipped item. Every value must also be in `equipment`.
    #[serde(default)]
    pub equipped: BTreeMap<String, ItemId>,
}

/// What a PvP death cost the loser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeathPenalty {
    pub xp_lost: i64,
    pub gold_lost: i64,
}

/// How a cost was split between gold on hand and the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GoldPayment {
    pub from_hand: i64,
    pub from_bank: i64,
}

impl PlayerData {
    /// Check the equipped-slot bookkeeping the equipment system guarantees.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_hp <= 0 {
            return Err(DomainError::corrupt(format!(
                "{} has non-positive max HP {}",
                self.display_name, self.max_hp
            )));
        }
        for (slot, item_id) in &self.equipped {
            if !self.equipment.iter().any(|item| item.id == *item_id) {
                return Err(DomainError::corrupt(format!(
                    "equipped slot '{slot}' references missing item {item_id}"
                )));
            }
        }
        Ok(())
    }

    /// Combat projection with the given starting HP.
    pub fn combatant(&self, hp: i64) -> CombatCharacter {
        CombatCharacter {
            name: self.display_name.clone(),
            level: self.level,
            hp: hp.clamp(0, self.max_hp),
            max_hp: self.max_hp,
            strength: self.strength,
            defence: self.defence,
            agility: self.agility,
            dexterity: self.dexterity,
            weapon_power: self.weapon_power,
            armor_power: self.armor_power,
            gold: self.gold,
            is_player: true,
        }
    }

    /// Same team or married to each other.
    pub fn is_allied_with(&self, self_id: PlayerId, other_id: PlayerId, other: &PlayerData) -> bool {
        let same_team = matches!((&self.team, &other.team), (Some(a), Some(b)) if a == b);
        let married = self.spouse == Some(other_id) || other.spouse == Some(self_id);
        same_team || married
    }

    /// Remove the item at `index` from the pack, unequipping it from any slot.
    pub fn take_item(&mut self, index: usize) -> Option<EquipmentItem> {
        if index >= self.equipment.len() {
            return None;
        }
        let item = self.equipment.remove(index);
        self.equipped.retain(|_, id| *id != item.id);
        Some(item)
    }

    /// Lose `percent` of current experience. Returns the amount lost.
    pub fn lose_experience(&mut self, percent: Percent) -> i64 {
        let lost = percent.share_of(self.experience);
        self.experience -= lost;
        lost
    }

    /// Apply the PvP death penalty and revive at half max HP (at least 1).
    ///
    /// Poison is cleared. This replaces the generic death flow for PvP losses.
    pub fn suffer_pvp_death(&mut self, xp_percent: Percent, gold_percent: Percent) -> DeathPenalty {
        let xp_lost = self.lose_experience(xp_percent);
        let gold_lost = gold_percent.share_of(self.gold);
        self.gold -= gold_lost;
        self.hp = (self.max_hp / 2).max(1);
        self.poison = 0;
        DeathPenalty { xp_lost, gold_lost }
    }

    /// Pay `cost` from gold on hand, drawing any shortfall from the bank.
    pub fn pay(&mut self, cost: i64) -> Result<GoldPayment, DomainError> {
        if cost <= 0 {
            return Ok(GoldPayment::default());
        }
        let on_hand = self.gold.max(0);
        if on_hand >= cost {
            self.gold -= cost;
            return Ok(GoldPayment {
                from_hand: cost,
                from_bank: 0,
            });
        }
        let shortfall = cost - on_hand;
        if self.bank_gold < shortfall {
            return Err(DomainError::constraint(format!(
                "cannot afford {cost} gold ({} on hand, {} in bank)",
                self.gold, self.bank_gold
            )));
        }
        self.gold -= on_hand;
        self.bank_gold -= shortfall;
        Ok(GoldPayment {
            from_hand: on_hand,
            from_bank: shortfall,
        })
    }

    pub fn can_afford(&self, cost: i64) -> bool {
        self.gold.max(0) + self.bank_gold.max(0) >= cost
    }
}
