//! PersistedCharacter aggregate - one character's full save record
//!
//! This is the unit of atomicity in the save store. `version` increments on every
//! successful write so a conditional write can detect that someone else got there
//! first.

use serde::{Deserialize, Serialize};

use super::player_data::PlayerData;
use crate::entities::{DailyCounters, PlayerSummary, SleepState, SleeperSummary};
use crate::error::DomainError;
use crate::ids::PlayerId;
use crate::value_objects::GameDay;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCharacter {
    id: PlayerId,
    version: u64,
    /// Absent when the save was created but never finished, or was damaged.
    player: Option<PlayerData>,
    daily: DailyCounters,
    sleep: Option<SleepState>,
    bounty: i64,
}

impl PersistedCharacter {
    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn new(id: PlayerId, player: PlayerData, day: GameDay) -> Self {
        Self {
            id,
            version: 0,
            player: Some(player),
            daily: DailyCounters::for_day(day),
            sleep: None,
            bounty: 0,
        }
    }

    /// Reconstruct from storage (database hydration)
    pub fn from_storage(
        id: PlayerId,
        version: u64,
        player: Option<PlayerData>,
        daily: DailyCounters,
        sleep: Option<SleepState>,
        bounty: i64,
    ) -> Self {
        Self {
            id,
            version,
            player,
            daily,
            sleep,
            bounty,
        }
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn player(&self) -> Option<&PlayerData> {
        self.player.as_ref()
    }

    #[inline]
    pub fn daily(&self) -> &DailyCounters {
        &self.daily
    }

    #[inline]
    pub fn sleep(&self) -> Option<&SleepState> {
        self.sleep.as_ref()
    }

    #[inline]
    pub fn bounty(&self) -> i64 {
        self.bounty
    }

    /// Player section, or a corrupt-record error if it is missing.
    pub fn require_player(&self) -> Result<&PlayerData, DomainError> {
        self.player
            .as_ref()
            .ok_or_else(|| DomainError::corrupt(format!("save {} has no player section", self.id)))
    }

    pub fn display_name(&self) -> &str {
        self.player
            .as_ref()
            .map(|p| p.display_name.as_str())
            .unwrap_or("")
    }

    pub fn level(&self) -> u32 {
        self.player.as_ref().map(|p| p.level).unwrap_or(0)
    }

    pub fn gold(&self) -> i64 {
        self.player.as_ref().map(|p| p.gold).unwrap_or(0)
    }

    /// Resting at a safe house: invisible to every attacker.
    pub fn is_hidden(&self) -> bool {
        self.player
            .as_ref()
            .map(|p| p.safe_house_resting)
            .unwrap_or(false)
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleep.is_some()
    }

    /// Directory entry, if the save has a player section.
    pub fn summary(&self, is_online: bool) -> Option<PlayerSummary> {
        let p = self.player.as_ref()?;
        Some(PlayerSummary {
            id: self.id,
            display_name: p.display_name.clone(),
            level: p.level,
            class_id: p.class_id,
            is_online,
            is_hidden: p.safe_house_resting,
        })
    }

    pub fn sleeper_summary(&self) -> Option<SleeperSummary> {
        let p = self.player.as_ref()?;
        let sleep = self.sleep.as_ref()?;
        Some(SleeperSummary {
            id: self.id,
            display_name: p.display_name.clone(),
            level: p.level,
            location: sleep.location,
            is_dead: sleep.is_dead,
            guard_count: sleep.guards.len(),
            is_hidden: p.safe_house_resting,
            team: p.team.clone(),
            spouse: p.spouse,
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn player_mut(&mut self) -> Option<&mut PlayerData> {
        self.player.as_mut()
    }

    pub fn daily_mut(&mut self) -> &mut DailyCounters {
        &mut self.daily
    }

    pub fn sleep_mut(&mut self) -> Option<&mut SleepState> {
        self.sleep.as_mut()
    }

    pub fn set_sleep(&mut self, sleep: Option<SleepState>) {
        self.sleep = sleep;
    }

    /// Add `amount` to the gold on hand, never leaving it below zero.
    /// Returns the delta actually applied.
    pub fn adjust_gold(&mut self, amount: i64) -> i64 {
        match self.player.as_mut() {
            Some(p) => {
                let before = p.gold;
                p.gold = p.gold.saturating_add(amount).max(0);
                p.gold - before
            }
            None => 0,
        }
    }

    pub fn add_bounty(&mut self, amount: i64) {
        self.bounty = self.bounty.saturating_add(amount.max(0));
    }

    /// Clear the bounty pool and return what it held.
    pub fn claim_bounty(&mut self) -> i64 {
        std::mem::take(&mut self.bounty)
    }

    /// Mark the sleeper dead. No-op when not sleeping.
    pub fn mark_dead(&mut self) {
        if let Some(sleep) = self.sleep.as_mut() {
            sleep.is_dead = true;
        }
    }

    /// Record a successful write. Only the store calls this.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Overwrite the version with the one the store assigned.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}
