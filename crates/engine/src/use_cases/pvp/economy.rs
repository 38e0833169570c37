//! Economic consequences of an attack.
//!
//! Everything that touches the defender's save goes through one
//! [`CharacterStore::settle_attack`] call together with the log entry, so a
//! half-applied attack is never visible. The attacker's live state is only
//! changed after that call has succeeded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use skirmish_domain::{
    AttackLogEntry, AttackLogId, AttackResult, AttackVenue, AttackerKind, DeathPenalty, Guard,
    Percent, PlayerData, PlayerId,
};

use super::error::PvpError;
use crate::infrastructure::ports::{
    CharacterStore, DefenderPrecondition, DefenderSettlement, RandomPort, RepoError,
    SettlementReceipt,
};

/// Who fought whom, where. Stamps out the log entry for the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptParties {
    pub attacker_id: Option<PlayerId>,
    pub attacker_name: String,
    pub attacker_kind: AttackerKind,
    pub attacker_level: u32,
    pub defender_id: PlayerId,
    pub defender_name: String,
    pub defender_level: u32,
    pub venue: AttackVenue,
}

impl AttemptParties {
    /// Log entry with zero amounts; the store fills in what it actually applied.
    pub fn log(&self, result: AttackResult, at: DateTime<Utc>) -> AttackLogEntry {
        AttackLogEntry {
            id: AttackLogId::new(),
            attacker_id: self.attacker_id,
            attacker_name: self.attacker_name.clone(),
            attacker_kind: self.attacker_kind,
            defender_id: self.defender_id,
            defender_name: self.defender_name.clone(),
            venue: self.venue,
            result,
            gold_stolen: 0,
            item_stolen: None,
            xp_lost: 0,
            attacker_level: self.attacker_level,
            defender_level: self.defender_level,
            timestamp: at,
        }
    }
}

/// What a winning attacker takes from the defender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TheftPolicy {
    pub gold_theft: Percent,
    pub xp_loss: Percent,
    pub steal_item: bool,
    pub claim_bounty: bool,
    /// Mark the sleeping defender dead.
    pub lethal: bool,
}

/// What a losing arena attacker pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefeatPolicy {
    /// Share of the attacker's gold handed to the defender.
    pub gold_theft: Percent,
    pub death_xp: Percent,
    pub death_gold: Percent,
}

/// Outcome of a defeat settlement from the attacker's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefeatSettlement {
    pub receipt: SettlementReceipt,
    pub gold_lost_to_defender: i64,
    pub penalty: DeathPenalty,
}

pub struct EconomyLedger {
    store: Arc<dyn CharacterStore>,
    random: Arc<dyn RandomPort>,
    stale_write_retries: u32,
}

impl EconomyLedger {
    pub fn new(
        store: Arc<dyn CharacterStore>,
        random: Arc<dyn RandomPort>,
        stale_write_retries: u32,
    ) -> Self {
        Self {
            store,
            random,
            stale_write_retries,
        }
    }

    /// Take the victor's spoils from the defender's save.
    ///
    /// The gold amount is fixed from `gold_before` (captured before combat). Item
    /// choice is pinned to the version it was made against; if the save moves
    /// on, the whole settlement is recomputed against a fresh read.
    pub async fn plunder(
        &self,
        log: AttackLogEntry,
        gold_before: i64,
        policy: &TheftPolicy,
        guards: Option<Vec<Guard>>,
    ) -> Result<SettlementReceipt, PvpError> {
        let defender = log.defender_id;
        let theft = policy.gold_theft.share_of(gold_before);

        let mut base = settlement_for(log)
            .with_gold_delta(-theft)
            .with_xp_loss(policy.xp_loss);
        if policy.claim_bounty {
            base = base.claiming_bounty();
        }
        if policy.lethal {
            base = base.killing_sleeper();
        }
        if let Some(guards) = guards {
            base = base.with_guards(guards);
        }

        let mut attempt = 0;
        loop {
            let settlement = if policy.steal_item {
                self.pick_item(base.clone(), defender).await?
            } else {
                base.clone()
            };

            match self.store.settle_attack(&settlement).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) if e.is_stale() && attempt < self.stale_write_retries => {
                    attempt += 1;
                    tracing::warn!(
                        defender_id = %defender,
                        attempt,
                        "Defender save changed mid-settlement, retrying against a fresh read"
                    );
                }
                Err(e) => return Err(abort(defender, e)),
            }
        }
    }

    /// The defender's shadow won an arena fight: hand it a share of the
    /// attacker's gold, then apply the PvP death penalty to the attacker.
    pub async fn retaliate(
        &self,
        log: AttackLogEntry,
        attacker: &mut PlayerData,
        policy: &DefeatPolicy,
    ) -> Result<DefeatSettlement, PvpError> {
        let defender = log.defender_id;
        let stolen = policy.gold_theft.share_of(attacker.gold);
        let settlement = settlement_for(log).with_gold_delta(stolen);

        let receipt = self
            .store
            .settle_attack(&settlement)
            .await
            .map_err(|e| abort(defender, e))?;

        attacker.gold = (attacker.gold - receipt.gold_applied).max(0);
        let penalty = attacker.suffer_pvp_death(policy.death_xp, policy.death_gold);

        Ok(DefeatSettlement {
            gold_lost_to_defender: receipt.gold_applied,
            receipt,
            penalty,
        })
    }

    /// Log an attempt that moves no wealth (guards held, owner won, attacker fled),
    /// replacing the guard list if one is given.
    pub async fn record_outcome(
        &self,
        log: AttackLogEntry,
        guards: Option<Vec<Guard>>,
    ) -> Result<SettlementReceipt, PvpError> {
        let defender = log.defender_id;
        let mut settlement = settlement_for(log);
        if let Some(guards) = guards {
            settlement = settlement.with_guards(guards);
        }
        self.store
            .settle_attack(&settlement)
            .await
            .map_err(|e| abort(defender, e))
    }

    /// Credit a winning player with what the settlement actually took.
    /// Returns the gold gained.
    pub fn credit_victory(
        attacker: &mut PlayerData,
        receipt: &SettlementReceipt,
        experience: i64,
    ) -> i64 {
        let gold = (-receipt.gold_applied).max(0) + receipt.bounty_claimed;
        attacker.gold = attacker.gold.saturating_add(gold);
        attacker.experience = attacker.experience.saturating_add(experience.max(0));
        if let Some(item) = &receipt.item_taken {
            attacker.equipment.push(item.clone());
        }
        gold
    }

    async fn pick_item(
        &self,
        settlement: DefenderSettlement,
        defender: PlayerId,
    ) -> Result<DefenderSettlement, PvpError> {
        let record = self
            .store
            .read_character(defender)
            .await
            .map_err(|e| abort(defender, e))?;

        let equipment = record
            .player()
            .map(|p| p.equipment.as_slice())
            .unwrap_or_default();
        if equipment.is_empty() {
            return Ok(settlement);
        }

        let index = self.random.gen_range(0, equipment.len() as i32 - 1) as usize;
        match equipment.get(index) {
            Some(item) => Ok(settlement.stealing_item(item.id, record.version())),
            None => Ok(settlement),
        }
    }
}

/// Arena defenders must still be out in the open when the fight settles;
/// sleepers must still be asleep and alive.
fn settlement_for(log: AttackLogEntry) -> DefenderSettlement {
    let precondition = match log.venue {
        AttackVenue::Arena => DefenderPrecondition::Visible,
        AttackVenue::Dormitory | AttackVenue::Inn => DefenderPrecondition::LiveSleeper,
    };
    DefenderSettlement::new(log).requiring(precondition)
}

fn abort(defender: PlayerId, err: RepoError) -> PvpError {
    if err.is_refused() {
        tracing::info!(defender_id = %defender, reason = %err, "Defender changed since the attack began, nothing applied");
    } else {
        tracing::error!(defender_id = %defender, error = %err, "Attack settlement failed, nothing applied");
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedRandom;
    use crate::infrastructure::persistence::InMemoryStore;
    use crate::infrastructure::ports::MockCharacterStore;
    use crate::test_fixtures::{log_entry, player_data, saved_character};
    use crate::use_cases::pvp::EligibilityError;
    use skirmish_domain::{EquipmentItem, PersistedCharacter, SleepState};

    fn sleep_policy() -> TheftPolicy {
        TheftPolicy {
            gold_theft: Percent::from_basis_points(5_000),
            xp_loss: Percent::from_basis_points(1_000),
            steal_item: true,
            claim_bounty: true,
            lethal: false,
        }
    }

    #[test]
    fn clamped_theft_is_floor_of_share() {
        for (gold, bp, expected) in [(1_000, 1_000, 100), (999, 1_000, 99), (7, 5_000, 3), (0, 5_000, 0)] {
            let stolen = Percent::from_basis_points(bp).share_of(gold);
            assert_eq!(stolen, expected);
            assert!(gold - stolen >= 0);
        }
    }

    #[tokio::test]
    async fn plunder_takes_gold_item_and_xp_in_one_settlement() {
        let store = Arc::new(InMemoryStore::new());
        let mut data = player_data("Yara", 12, 800);
        data.experience = 5_000;
        data.equipment = vec![EquipmentItem::new("Moon Dagger")];
        let record = saved_character(store.as_ref(), data).await;
        store
            .register_sleeping(record.id(), &SleepState::dormitory(Utc::now()))
            .await
            .expect("sleep");

        let ledger = EconomyLedger::new(store.clone(), Arc::new(FixedRandom(0)), 3);
        let log = log_entry(record.id(), AttackVenue::Dormitory, AttackResult::AttackerWon);
        let receipt = ledger
            .plunder(log, 800, &sleep_policy(), None)
            .await
            .expect("plunder");

        assert_eq!(receipt.gold_applied, -400);
        assert_eq!(receipt.xp_lost, 500);
        assert_eq!(receipt.item_taken.as_ref().map(|i| i.name.as_str()), Some("Moon Dagger"));

        let after = store.read_character(record.id()).await.expect("read");
        assert_eq!(after.gold(), 400);
        assert!(after.player().map(|p| p.equipment.is_empty()).unwrap_or(false));

        let mut attacker = player_data("Zed", 12, 10);
        let gained = EconomyLedger::credit_victory(&mut attacker, &receipt, 50);
        assert_eq!(gained, 400);
        assert_eq!(attacker.gold, 410);
        assert_eq!(attacker.equipment.len(), 1);
    }

    #[tokio::test]
    async fn plunder_of_an_awake_defender_changes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let mut data = player_data("Yara", 12, 800);
        data.experience = 5_000;
        data.equipment = vec![EquipmentItem::new("Moon Dagger")];
        let record = saved_character(store.as_ref(), data).await;

        let ledger = EconomyLedger::new(store.clone(), Arc::new(FixedRandom(0)), 3);
        let log = log_entry(record.id(), AttackVenue::Inn, AttackResult::AttackerWon);
        let err = ledger
            .plunder(log, 800, &sleep_policy(), None)
            .await
            .expect_err("awake");
        assert!(matches!(err, PvpError::Eligibility(EligibilityError::NotSleeping)));

        let after = store.read_character(record.id()).await.expect("read");
        assert_eq!(after.gold(), 800);
        assert_eq!(after.version(), record.version());
        assert!(store.attack_log_for(record.id(), None).await.expect("log").is_empty());
    }

    #[tokio::test]
    async fn plunder_retries_stale_item_choice_with_fresh_read() {
        let mut data = player_data("Yara", 12, 800);
        data.equipment = vec![EquipmentItem::new("Moon Dagger")];
        let record = PersistedCharacter::new(PlayerId::new(), data, Default::default()).with_version(4);
        let id = record.id();

        let mut store = MockCharacterStore::new();
        let mut reads = 0u64;
        store.expect_read_character().times(2).returning(move |_| {
            reads += 1;
            Ok(record.clone().with_version(4 + reads))
        });
        let mut seq = mockall::Sequence::new();
        store
            .expect_settle_attack()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|s| s.expected_version == Some(5))
            .returning(|s| Err(RepoError::stale("Character", s.defender_id, 5)));
        store
            .expect_settle_attack()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|s| s.expected_version == Some(6) && s.gold_delta == -400)
            .returning(|_| {
                Ok(SettlementReceipt {
                    gold_applied: -400,
                    version: 7,
                    ..Default::default()
                })
            });

        let ledger = EconomyLedger::new(Arc::new(store), Arc::new(FixedRandom(0)), 3);
        let log = log_entry(id, AttackVenue::Dormitory, AttackResult::AttackerWon);
        let receipt = ledger
            .plunder(log, 800, &sleep_policy(), None)
            .await
            .expect("second attempt succeeds");
        assert_eq!(receipt.version, 7);
    }

    #[tokio::test]
    async fn plunder_gives_up_after_retry_budget() {
        let record = PersistedCharacter::new(
            PlayerId::new(),
            {
                let mut d = player_data("Yara", 12, 800);
                d.equipment = vec![EquipmentItem::new("Moon Dagger")];
                d
            },
            Default::default(),
        );
        let id = record.id();
        let mut store = MockCharacterStore::new();
        store
            .expect_read_character()
            .returning(move |_| Ok(record.clone()));
        store
            .expect_settle_attack()
            .times(2)
            .returning(|s| Err(RepoError::stale("Character", s.defender_id, 0)));

        let ledger = EconomyLedger::new(Arc::new(store), Arc::new(FixedRandom(0)), 1);
        let err = ledger
            .plunder(
                log_entry(id, AttackVenue::Inn, AttackResult::AttackerWon),
                800,
                &sleep_policy(),
                None,
            )
            .await
            .expect_err("stale");
        assert!(matches!(err, PvpError::StaleWrite(_)));
    }

    #[tokio::test]
    async fn retaliation_pays_defender_then_applies_death_penalty() {
        let store = Arc::new(InMemoryStore::new());
        let defender = saved_character(store.as_ref(), player_data("Shadow", 20, 100)).await;

        let mut attacker = player_data("Brash", 20, 1_000);
        attacker.experience = 10_000;
        attacker.max_hp = 200;
        attacker.hp = 0;

        let ledger = EconomyLedger::new(store.clone(), Arc::new(FixedRandom(0)), 3);
        let policy = DefeatPolicy {
            gold_theft: Percent::from_basis_points(1_000),
            death_xp: Percent::from_basis_points(1_000),
            death_gold: Percent::from_basis_points(2_500),
        };
        let outcome = ledger
            .retaliate(
                log_entry(defender.id(), AttackVenue::Arena, AttackResult::DefenderWon),
                &mut attacker,
                &policy,
            )
            .await
            .expect("retaliate");

        assert_eq!(outcome.gold_lost_to_defender, 100);
        // 25% of the 900 left after the shadow's cut
        assert_eq!(outcome.penalty.gold_lost, 225);
        assert_eq!(outcome.penalty.xp_lost, 1_000);
        assert_eq!(attacker.gold, 675);
        assert_eq!(attacker.hp, 100);

        assert_eq!(store.read_character(defender.id()).await.expect("read").gold(), 200);
        let log = store.attack_log_for(defender.id(), None).await.expect("log");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].gold_stolen, 100);
    }

    #[tokio::test]
    async fn failed_retaliation_leaves_attacker_untouched() {
        let mut store = MockCharacterStore::new();
        store
            .expect_settle_attack()
            .returning(|_| Err(RepoError::database("settle_attack", "locked")));
        let ledger = EconomyLedger::new(Arc::new(store), Arc::new(FixedRandom(0)), 3);

        let mut attacker = player_data("Brash", 20, 1_000);
        let before = attacker.clone();
        let err = ledger
            .retaliate(
                log_entry(PlayerId::new(), AttackVenue::Arena, AttackResult::DefenderWon),
                &mut attacker,
                &DefeatPolicy {
                    gold_theft: Percent::from_basis_points(1_000),
                    death_xp: Percent::from_basis_points(1_000),
                    death_gold: Percent::from_basis_points(2_500),
                },
            )
            .await
            .expect_err("store down");
        assert!(matches!(err, PvpError::StoreUnavailable(_)));
        assert_eq!(attacker, before);
    }
}
