//! Data carried across port boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skirmish_domain::{
    AttackLogEntry, EquipmentItem, Guard, ItemId, Percent, PersistedCharacter, PlayerId,
};

// =============================================================================
// Attack settlement
// =============================================================================

/// What must still be true of the defender when the settlement lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefenderPrecondition {
    /// Not resting at a safe house.
    Visible,
    /// Visible, still registered as a sleeper, and not already dead.
    LiveSleeper,
}

/// Why the store refused a settlement. Nothing was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementRefusal {
    Hidden,
    NotSleeping,
    AlreadyDead,
}

impl SettlementRefusal {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementRefusal::Hidden => "hidden",
            SettlementRefusal::NotSleeping => "not_sleeping",
            SettlementRefusal::AlreadyDead => "already_dead",
        }
    }
}

/// Every change one attack attempt makes to the defender's save, applied by the
/// store in a single atomic call together with the attack log append.
#[derive(Debug, Clone, PartialEq)]
pub struct DefenderSettlement {
    pub defender_id: PlayerId,
    /// Version the item choice was made against. `None` when the settlement only
    /// moves gold, bounty or guards and applies to whatever is current.
    pub expected_version: Option<u64>,
    /// Checked against the current record inside the atomic write.
    pub requires: Option<DefenderPrecondition>,
    /// Added to the defender's gold on hand; clamped so the balance stays `>= 0`.
    pub gold_delta: i64,
    pub xp_loss: Percent,
    pub steal_item: Option<ItemId>,
    pub claim_bounty: bool,
    pub mark_dead: bool,
    /// Replacement guard list (last writer wins).
    pub guards: Option<Vec<Guard>>,
    /// Logged with the amounts actually applied.
    pub log: AttackLogEntry,
}

impl DefenderSettlement {
    pub fn new(log: AttackLogEntry) -> Self {
        Self {
            defender_id: log.defender_id,
            expected_version: None,
            requires: None,
            gold_delta: 0,
            xp_loss: Percent::ZERO,
            steal_item: None,
            claim_bounty: false,
            mark_dead: false,
            guards: None,
            log,
        }
    }

    pub fn requiring(mut self, precondition: DefenderPrecondition) -> Self {
        self.requires = Some(precondition);
        self
    }

    pub fn with_gold_delta(mut self, delta: i64) -> Self {
        self.gold_delta = delta;
        self
    }

    pub fn with_xp_loss(mut self, loss: Percent) -> Self {
        self.xp_loss = loss;
        self
    }

    pub fn stealing_item(mut self, item: ItemId, expected_version: u64) -> Self {
        self.steal_item = Some(item);
        self.expected_version = Some(expected_version);
        self
    }

    pub fn claiming_bounty(mut self) -> Self {
        self.claim_bounty = true;
        self
    }

    pub fn killing_sleeper(mut self) -> Self {
        self.mark_dead = true;
        self
    }

    pub fn with_guards(mut self, guards: Vec<Guard>) -> Self {
        self.guards = Some(guards);
        self
    }

    /// Check the precondition against the record the store is about to update.
    pub fn check(&self, record: &PersistedCharacter) -> Result<(), SettlementRefusal> {
        let Some(requires) = self.requires else {
            return Ok(());
        };
        if record.is_hidden() {
            return Err(SettlementRefusal::Hidden);
        }
        if requires == DefenderPrecondition::LiveSleeper {
            match record.sleep() {
                None => return Err(SettlementRefusal::NotSleeping),
                Some(sleep) if sleep.is_dead => return Err(SettlementRefusal::AlreadyDead),
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Apply to an in-memory copy of the defender's record.
    ///
    /// Returns what was actually applied and the log entry carrying those amounts.
    /// The caller owns version checks and the version bump.
    pub fn apply(&self, record: &mut PersistedCharacter) -> (SettlementReceipt, AttackLogEntry) {
        let gold_applied = record.adjust_gold(self.gold_delta);

        let mut xp_lost = 0;
        let mut item_taken = None;
        if let Some(player) = record.player_mut() {
            xp_lost = player.lose_experience(self.xp_loss);
            if let Some(item_id) = self.steal_item {
                if let Some(index) = player.equipment.iter().position(|i| i.id == item_id) {
                    item_taken = player.take_item(index);
                }
            }
        }

        let bounty_claimed = if self.claim_bounty {
            record.claim_bounty()
        } else {
            0
        };

        if let Some(guards) = &self.guards {
            if let Some(sleep) = record.sleep_mut() {
                sleep.guards = guards.clone();
            }
        }

        if self.mark_dead {
            record.mark_dead();
        }

        let mut log = self.log.clone();
        log.gold_stolen = gold_applied.abs();
        log.item_stolen = item_taken.as_ref().map(|i| i.name.clone());
        log.xp_lost = xp_lost;

        let receipt = SettlementReceipt {
            gold_applied,
            bounty_claimed,
            item_taken,
            xp_lost,
            version: record.version(),
        };
        (receipt, log)
    }
}

/// What a settlement actually did once applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettlementReceipt {
    /// Signed change to the defender's gold after clamping.
    pub gold_applied: i64,
    pub bounty_claimed: i64,
    pub item_taken: Option<EquipmentItem>,
    pub xp_lost: i64,
    /// Version of the defender's record after the write.
    pub version: u64,
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Pvp,
    Combat,
    Bounty,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::Pvp => "pvp",
            NewsCategory::Combat => "combat",
            NewsCategory::Bounty => "bounty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailCategory {
    Pvp,
    SleepAttack,
    Bounty,
}

impl MailCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailCategory::Pvp => "pvp",
            MailCategory::SleepAttack => "sleep_attack",
            MailCategory::Bounty => "bounty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub message: String,
    pub category: NewsCategory,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mail {
    /// Display name of the sender (may be an NPC)
    pub from: String,
    pub to: PlayerId,
    pub category: MailCategory,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_domain::{
        AttackLogId, AttackResult, AttackVenue, AttackerKind, GameDay, GuardType, PlayerData,
        SleepState,
    };
    use std::collections::BTreeMap;

    fn record(gold: i64) -> PersistedCharacter {
        let sword = EquipmentItem::new("Night Blade");
        let mut equipped = BTreeMap::new();
        equipped.insert("weapon".to_string(), sword.id);
        let player = PlayerData {
            display_name: "Sleeper".into(),
            level: 10,
            class_id: 1,
            hp: 90,
            max_hp: 90,
            strength: 20,
            defence: 10,
            agility: 10,
            dexterity: 10,
            weapon_power: 5,
            armor_power: 5,
            gold,
            bank_gold: 0,
            experience: 1_000,
            poison: 0,
            team: None,
            spouse: None,
            safe_house_resting: false,
            equipment: vec![sword],
            equipped,
        };
        let mut r = PersistedCharacter::new(PlayerId::new(), player, GameDay::new(1));
        r.set_sleep(Some(SleepState::dormitory(Utc::now())));
        r
    }

    fn log_for(defender: PlayerId) -> AttackLogEntry {
        AttackLogEntry {
            id: AttackLogId::new(),
            attacker_id: Some(PlayerId::new()),
            attacker_name: "Raider".into(),
            attacker_kind: AttackerKind::Player,
            defender_id: defender,
            defender_name: "Sleeper".into(),
            venue: AttackVenue::Dormitory,
            result: AttackResult::AttackerWon,
            gold_stolen: 0,
            item_stolen: None,
            xp_lost: 0,
            attacker_level: 11,
            defender_level: 10,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn apply_records_actual_amounts_in_log() {
        let mut r = record(40);
        r.add_bounty(500);
        let item = r.player().map(|p| p.equipment[0].id).expect("item");

        let settlement = DefenderSettlement::new(log_for(r.id()))
            .with_gold_delta(-100)
            .with_xp_loss(Percent::from_points(10).expect("valid"))
            .stealing_item(item, r.version())
            .claiming_bounty()
            .killing_sleeper();

        let (receipt, log) = settlement.apply(&mut r);

        assert_eq!(receipt.gold_applied, -40);
        assert_eq!(receipt.bounty_claimed, 500);
        assert_eq!(receipt.xp_lost, 100);
        assert_eq!(log.gold_stolen, 40);
        assert_eq!(log.item_stolen.as_deref(), Some("Night Blade"));
        assert_eq!(log.xp_lost, 100);

        let p = r.player().expect("player");
        assert_eq!(p.gold, 0);
        assert!(p.equipment.is_empty());
        assert!(p.equipped.is_empty());
        assert_eq!(r.bounty(), 0);
        assert!(r.sleep().map(|s| s.is_dead).unwrap_or(false));
    }

    #[test]
    fn apply_replaces_guards_only_while_sleeping() {
        let mut r = record(0);
        let guards = vec![Guard::hire(GuardType::Veteran, 0).with_remaining_hp(40)];
        let settlement = DefenderSettlement::new(log_for(r.id())).with_guards(guards.clone());

        settlement.apply(&mut r);
        assert_eq!(r.sleep().map(|s| s.guards.clone()), Some(guards.clone()));

        r.set_sleep(None);
        settlement.apply(&mut r);
        assert!(r.sleep().is_none());
    }

    #[test]
    fn missing_item_is_skipped() {
        let mut r = record(10);
        let settlement =
            DefenderSettlement::new(log_for(r.id())).stealing_item(ItemId::new(), r.version());
        let (receipt, log) = settlement.apply(&mut r);
        assert!(receipt.item_taken.is_none());
        assert!(log.item_stolen.is_none());
        assert_eq!(r.player().map(|p| p.equipment.len()), Some(1));
    }

    #[test]
    fn live_sleeper_precondition_tracks_the_current_record() {
        let settlement = |r: &PersistedCharacter| {
            DefenderSettlement::new(log_for(r.id())).requiring(DefenderPrecondition::LiveSleeper)
        };

        let mut r = record(100);
        assert_eq!(settlement(&r).check(&r), Ok(()));

        r.mark_dead();
        assert_eq!(settlement(&r).check(&r), Err(SettlementRefusal::AlreadyDead));

        r.set_sleep(None);
        assert_eq!(settlement(&r).check(&r), Err(SettlementRefusal::NotSleeping));
        assert_eq!(DefenderSettlement::new(log_for(r.id())).check(&r), Ok(()));
    }

    #[test]
    fn hidden_defender_fails_every_precondition() {
        let mut r = record(100);
        if let Some(p) = r.player_mut() {
            p.safe_house_resting = true;
        }
        for precondition in [DefenderPrecondition::Visible, DefenderPrecondition::LiveSleeper] {
            let settlement = DefenderSettlement::new(log_for(r.id())).requiring(precondition);
            assert_eq!(settlement.check(&r), Err(SettlementRefusal::Hidden));
        }
    }
}
