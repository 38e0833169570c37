//! Attacks on sleeping characters at the dormitory or the inn.
//!
//! An attempt first runs the attacker through the sleeper's hired guards, in
//! order. Only an attacker who clears every guard reaches the owner. Whatever
//! happens, the attempt ends in exactly one settlement and one log entry.

use std::sync::Arc;

use skirmish_domain::{
    AttackResult, AttackVenue, AttackerKind, CombatCharacter, CombatOutcome, PlayerData, PlayerId,
    SleepLocation, SleepState, SleeperSummary,
};

use super::arena::surviving_hp;
use super::economy::{AttemptParties, EconomyLedger, TheftPolicy};
use super::eligibility::{check_levels, find_sleep_targets, Challenger, EligibilityRules};
use super::error::{EligibilityError, PvpError};
use super::guard_chain::{GuardChain, GuardChainOutcome};
use super::notify::{
    sleep_murder_mail, sleep_murder_news, sleep_repelled_mail, sleep_survived_mail,
    NotificationDispatcher,
};
use super::rate_limit::RateLimiter;
use super::snapshot::{DefenderSnapshot, SnapshotLoader};
use crate::infrastructure::ports::{
    CharacterStore, ClockPort, CombatOracle, MailCategory, NewsCategory, SettlementReceipt,
};
use crate::infrastructure::settings::PvpSettings;

/// A world NPC looking for someone to rob in their sleep.
#[derive(Debug, Clone, PartialEq)]
pub struct NpcRaider {
    pub name: String,
    pub level: u32,
    pub team: Option<String>,
    pub spouse: Option<PlayerId>,
    pub combatant: CombatCharacter,
}

/// A checked, not yet started sleep attack. Consumed by [`SleepAttack::execute`].
#[derive(Debug)]
pub struct PreparedSleepAttack {
    target: DefenderSnapshot,
    sleep: SleepState,
}

impl PreparedSleepAttack {
    pub fn victim_name(&self) -> &str {
        self.target.name()
    }

    pub fn guard_count(&self) -> usize {
        self.sleep.guards.len()
    }

    pub fn location(&self) -> SleepLocation {
        self.sleep.location
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepAttackReport {
    pub victim: String,
    pub result: AttackResult,
    pub guards_defeated: usize,
    pub guards_remaining: usize,
    pub gold_stolen: i64,
    pub bounty_claimed: i64,
    pub item_stolen: Option<String>,
    pub experience_gained: i64,
    pub attacker_hp: i64,
    pub should_return_to_sanctuary: bool,
}

/// Internal result of one attempt before the attacker side is credited.
struct Attempt {
    result: AttackResult,
    chain: GuardChainOutcome,
    receipt: SettlementReceipt,
    owner_bout_xp: i64,
    attacker_hp: i64,
    should_return_to_sanctuary: bool,
}

impl Attempt {
    fn report(&self, victim: &str) -> SleepAttackReport {
        SleepAttackReport {
            victim: victim.to_string(),
            result: self.result,
            guards_defeated: self.chain.guards_defeated,
            guards_remaining: self.chain.surviving.len(),
            gold_stolen: (-self.receipt.gold_applied).max(0),
            bounty_claimed: self.receipt.bounty_claimed,
            item_stolen: self.receipt.item_taken.as_ref().map(|i| i.name.clone()),
            experience_gained: self.chain.experience_gained + self.owner_bout_xp,
            attacker_hp: self.attacker_hp,
            should_return_to_sanctuary: self.should_return_to_sanctuary,
        }
    }
}

pub struct SleepAttack {
    store: Arc<dyn CharacterStore>,
    snapshots: SnapshotLoader,
    limiter: Arc<RateLimiter>,
    guards: GuardChain,
    oracle: Arc<dyn CombatOracle>,
    ledger: Arc<EconomyLedger>,
    notifier: Arc<NotificationDispatcher>,
    clock: Arc<dyn ClockPort>,
    settings: PvpSettings,
}

impl SleepAttack {
    pub fn new(
        store: Arc<dyn CharacterStore>,
        limiter: Arc<RateLimiter>,
        oracle: Arc<dyn CombatOracle>,
        ledger: Arc<EconomyLedger>,
        notifier: Arc<NotificationDispatcher>,
        clock: Arc<dyn ClockPort>,
        settings: PvpSettings,
    ) -> Self {
        Self {
            snapshots: SnapshotLoader::new(store.clone()),
            guards: GuardChain::new(oracle.clone()),
            store,
            limiter,
            oracle,
            ledger,
            notifier,
            clock,
            settings,
        }
    }

    /// Sleepers at `location` the attacker may go after, closest level first.
    pub async fn list_targets(
        &self,
        attacker_id: PlayerId,
        attacker: &PlayerData,
        location: SleepLocation,
    ) -> Result<Vec<SleeperSummary>, PvpError> {
        let sleepers: Vec<SleeperSummary> = self
            .store
            .list_sleepers()
            .await?
            .into_iter()
            .filter(|s| s.location == location)
            .collect();
        let counters = self.limiter.counters(attacker_id).await?;

        Ok(find_sleep_targets(
            &Challenger::player(attacker_id, attacker),
            &sleepers,
            &counters,
            self.limiter.today(),
            &self.settings.sleep_rules(),
        ))
    }

    /// Check everything and load the sleeper. Writes nothing.
    pub async fn prepare(
        &self,
        attacker_id: PlayerId,
        attacker: &PlayerData,
        target: PlayerId,
    ) -> Result<PreparedSleepAttack, PvpError> {
        if target == attacker_id {
            return Err(EligibilityError::SelfTarget.into());
        }
        self.limiter.check(attacker_id, Some(target)).await?;

        let (target, sleep) = self
            .load_sleeper(
                &Challenger::player(attacker_id, attacker),
                target,
                &self.settings.sleep_rules(),
            )
            .await?;
        Ok(PreparedSleepAttack { target, sleep })
    }

    /// Run a prepared attack for a player and credit them with the spoils.
    pub async fn execute(
        &self,
        prepared: PreparedSleepAttack,
        attacker_id: PlayerId,
        attacker: &mut PlayerData,
    ) -> Result<SleepAttackReport, PvpError> {
        self.limiter
            .check(attacker_id, Some(prepared.target.id()))
            .await?;

        let parties = self.parties(
            Some(attacker_id),
            &attacker.display_name,
            AttackerKind::Player,
            attacker.level,
            &prepared,
        );
        let attempt = self
            .attempt(parties, attacker.combatant(attacker.hp), &prepared)
            .await?;

        attacker.hp = surviving_hp(attempt.attacker_hp, attacker.max_hp);
        if attempt.result == AttackResult::AttackerWon {
            EconomyLedger::credit_victory(
                attacker,
                &attempt.receipt,
                attempt.chain.experience_gained + attempt.owner_bout_xp,
            );
        } else {
            attacker.experience = attacker
                .experience
                .saturating_add(attempt.chain.experience_gained);
        }

        if let Err(e) = self
            .limiter
            .record_attack(attacker_id, Some(prepared.target.id()))
            .await
        {
            tracing::warn!(
                attacker_id = %attacker_id,
                error = %e,
                "Failed to record sleep attack against the daily limit"
            );
        }

        let mut report = attempt.report(prepared.target.name());
        report.attacker_hp = attacker.hp;
        Ok(report)
    }

    /// An NPC raid on a sleeping player. No daily limit applies to NPCs.
    pub async fn raid(
        &self,
        raider: &NpcRaider,
        target: PlayerId,
    ) -> Result<SleepAttackReport, PvpError> {
        let challenger = Challenger::npc(raider.level, raider.team.clone(), raider.spouse);
        let (target, sleep) = self
            .load_sleeper(&challenger, target, &self.settings.npc_raid_rules())
            .await?;
        let prepared = PreparedSleepAttack { target, sleep };

        let parties = self.parties(None, &raider.name, AttackerKind::Npc, raider.level, &prepared);
        let attempt = self
            .attempt(parties, raider.combatant.clone(), &prepared)
            .await?;
        Ok(attempt.report(prepared.target.name()))
    }

    // =========================================================================
    // Attempt pipeline
    // =========================================================================

    async fn load_sleeper(
        &self,
        challenger: &Challenger,
        target: PlayerId,
        rules: &EligibilityRules,
    ) -> Result<(DefenderSnapshot, SleepState), PvpError> {
        let snapshot = self.snapshots.load_target(target).await?;
        let sleep = snapshot
            .record
            .sleep()
            .cloned()
            .ok_or(EligibilityError::NotSleeping)?;
        if sleep.is_dead {
            return Err(EligibilityError::AlreadyDead.into());
        }
        check_levels(challenger.level, snapshot.level(), rules)?;

        let player = snapshot.record.require_player()?;
        if challenger.is_allied_with(target, player.team.as_deref(), player.spouse) {
            return Err(EligibilityError::Allied.into());
        }
        Ok((snapshot, sleep))
    }

    fn parties(
        &self,
        attacker_id: Option<PlayerId>,
        attacker_name: &str,
        attacker_kind: AttackerKind,
        attacker_level: u32,
        prepared: &PreparedSleepAttack,
    ) -> AttemptParties {
        AttemptParties {
            attacker_id,
            attacker_name: attacker_name.to_string(),
            attacker_kind,
            attacker_level,
            defender_id: prepared.target.id(),
            defender_name: prepared.target.name().to_string(),
            defender_level: prepared.target.level(),
            venue: venue_for(prepared.sleep.location),
        }
    }

    async fn attempt(
        &self,
        parties: AttemptParties,
        attacker: CombatCharacter,
        prepared: &PreparedSleepAttack,
    ) -> Result<Attempt, PvpError> {
        let target = &prepared.target;
        let sleep = &prepared.sleep;

        let chain = self
            .guards
            .resolve(&attacker, &sleep.guards, target.level())
            .await?;

        if let Some(index) = chain.halted_at {
            let receipt = self
                .ledger
                .record_outcome(
                    parties.log(AttackResult::GuardsRepelled, self.clock.now()),
                    Some(chain.surviving.clone()),
                )
                .await?;

            let guard = sleep
                .guards
                .get(index)
                .map(|g| g.name().to_string())
                .unwrap_or_else(|| "guard".to_string());
            self.notifier
                .mail_and_push(
                    &parties.attacker_name,
                    target.id(),
                    MailCategory::SleepAttack,
                    "Attacked in your sleep",
                    &sleep_repelled_mail(&parties.attacker_name, &guard),
                )
                .await;

            tracing::info!(
                defender_id = %target.id(),
                attacker = %parties.attacker_name,
                guard_index = index,
                guards_left = chain.surviving.len(),
                "Sleep attack repelled by guards"
            );
            return Ok(Attempt {
                result: AttackResult::GuardsRepelled,
                attacker_hp: chain.attacker_hp,
                should_return_to_sanctuary: chain.attacker_hp <= 0,
                chain,
                receipt,
                owner_bout_xp: 0,
            });
        }

        let mut fighter = attacker;
        fighter.hp = chain.attacker_hp;
        let owner = owner_combatant(target, sleep, &self.settings);
        let result = self.oracle.resolve_combat(&fighter, &owner).await?;

        // Every guard was beaten on the way in.
        let guards = sleep.has_guards().then(Vec::new);
        let now = self.clock.now();

        let (attack_result, receipt) = match result.outcome {
            CombatOutcome::Victory => {
                let policy = TheftPolicy {
                    gold_theft: self.settings.sleep_gold_theft,
                    xp_loss: self.settings.sleep_xp_loss,
                    steal_item: true,
                    claim_bounty: true,
                    lethal: true,
                };
                let receipt = self
                    .ledger
                    .plunder(
                        parties.log(AttackResult::AttackerWon, now),
                        target.gold_before,
                        &policy,
                        guards,
                    )
                    .await?;
                (AttackResult::AttackerWon, receipt)
            }
            CombatOutcome::Defeated => {
                let receipt = self
                    .ledger
                    .record_outcome(parties.log(AttackResult::DefenderWon, now), guards)
                    .await?;
                (AttackResult::DefenderWon, receipt)
            }
            CombatOutcome::Escaped => {
                let receipt = self
                    .ledger
                    .record_outcome(parties.log(AttackResult::AttackerFled, now), guards)
                    .await?;
                (AttackResult::AttackerFled, receipt)
            }
        };

        self.notify_owner_fight(&parties, attack_result, &receipt).await;

        tracing::info!(
            defender_id = %target.id(),
            attacker = %parties.attacker_name,
            attacker_kind = parties.attacker_kind.as_str(),
            venue = parties.venue.as_str(),
            result = attack_result.as_str(),
            gold = receipt.gold_applied,
            xp_lost = receipt.xp_lost,
            "Sleep attack resolved"
        );

        Ok(Attempt {
            result: attack_result,
            chain,
            receipt,
            owner_bout_xp: result.experience_gained,
            attacker_hp: result.final_attacker_hp,
            should_return_to_sanctuary: result.should_return_to_sanctuary,
        })
    }

    async fn notify_owner_fight(
        &self,
        parties: &AttemptParties,
        result: AttackResult,
        receipt: &SettlementReceipt,
    ) {
        match result {
            AttackResult::AttackerWon => {
                let gold = (-receipt.gold_applied).max(0);
                let item = receipt.item_taken.as_ref().map(|i| i.name.as_str());
                self.notifier
                    .mail_and_push(
                        &parties.attacker_name,
                        parties.defender_id,
                        MailCategory::SleepAttack,
                        "Murdered in your sleep",
                        &sleep_murder_mail(&parties.attacker_name, gold, item),
                    )
                    .await;
                self.notifier
                    .news(
                        &sleep_murder_news(
                            &parties.attacker_name,
                            &parties.defender_name,
                            venue_name(parties.venue),
                        ),
                        NewsCategory::Combat,
                    )
                    .await;
            }
            AttackResult::DefenderWon => {
                self.notifier
                    .mail_and_push(
                        &parties.attacker_name,
                        parties.defender_id,
                        MailCategory::SleepAttack,
                        "Attacked in your sleep",
                        &sleep_survived_mail(&parties.attacker_name),
                    )
                    .await;
            }
            AttackResult::GuardsRepelled | AttackResult::AttackerFled => {}
        }
    }
}

/// Owner projection for the bout, boosted when they paid for an inn room.
fn owner_combatant(
    target: &DefenderSnapshot,
    sleep: &SleepState,
    settings: &PvpSettings,
) -> CombatCharacter {
    let mut owner = target.combatant.clone();
    if sleep.defense_boost {
        owner.apply_defense_boost(settings.inn_defense_boost);
    }
    owner
}

fn venue_for(location: SleepLocation) -> AttackVenue {
    match location {
        SleepLocation::Dormitory => AttackVenue::Dormitory,
        SleepLocation::Inn => AttackVenue::Inn,
    }
}

fn venue_name(venue: AttackVenue) -> &'static str {
    match venue {
        AttackVenue::Arena => "Arena",
        AttackVenue::Dormitory => "Dormitory",
        AttackVenue::Inn => "Inn",
    }
}
