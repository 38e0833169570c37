//! Arena PvP against the persisted "shadow" of another player.
//!
//! A fight is two steps. [`ArenaFight::prepare`] runs every check and loads
//! the defender snapshot without writing anything; dropping the prepared fight
//! is how a player backs out at the confirmation prompt. [`ArenaFight::execute`]
//! consumes it, calls the oracle, and settles the outcome.

use std::sync::Arc;

use skirmish_domain::{
    AttackResult, AttackVenue, AttackerKind, CombatOutcome, DeathPenalty, Percent, PlayerData,
    PlayerId, PlayerSummary,
};

use super::economy::{AttemptParties, DefeatPolicy, EconomyLedger, TheftPolicy};
use super::eligibility::{check_levels, find_eligible, Challenger};
use super::error::{EligibilityError, PvpError};
use super::notify::{
    arena_defeat_mail, arena_defeat_news, arena_victory_mail, arena_victory_news,
    bounty_claimed_news, NotificationDispatcher,
};
use super::rate_limit::RateLimiter;
use super::snapshot::{DefenderSnapshot, SnapshotLoader};
use crate::infrastructure::ports::{
    ClockPort, CombatOracle, DirectoryPort, MailCategory, NewsCategory,
};
use crate::infrastructure::settings::PvpSettings;

/// A checked, not yet started arena fight. Consumed by [`ArenaFight::execute`].
#[derive(Debug)]
pub struct PreparedArenaFight {
    defender: DefenderSnapshot,
}

impl PreparedArenaFight {
    pub fn opponent_name(&self) -> &str {
        self.defender.name()
    }

    pub fn opponent_level(&self) -> u32 {
        self.defender.level()
    }

    pub fn opponent_id(&self) -> PlayerId {
        self.defender.id()
    }
}

/// What the attacker sees after the fight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaReport {
    pub opponent: String,
    pub outcome: CombatOutcome,
    pub rounds: u32,
    /// Gold taken from the defender.
    pub gold_won: i64,
    pub bounty_claimed: i64,
    pub experience_gained: i64,
    /// Gold the defender's shadow took from the attacker.
    pub gold_lost: i64,
    pub penalty: Option<DeathPenalty>,
    pub should_return_to_sanctuary: bool,
    pub attacks_remaining: u32,
}

pub struct ArenaFight {
    snapshots: SnapshotLoader,
    limiter: Arc<RateLimiter>,
    oracle: Arc<dyn CombatOracle>,
    ledger: Arc<EconomyLedger>,
    notifier: Arc<NotificationDispatcher>,
    directory: Arc<dyn DirectoryPort>,
    clock: Arc<dyn ClockPort>,
    settings: PvpSettings,
}

impl ArenaFight {
    pub fn new(
        snapshots: SnapshotLoader,
        limiter: Arc<RateLimiter>,
        oracle: Arc<dyn CombatOracle>,
        ledger: Arc<EconomyLedger>,
        notifier: Arc<NotificationDispatcher>,
        directory: Arc<dyn DirectoryPort>,
        clock: Arc<dyn ClockPort>,
        settings: PvpSettings,
    ) -> Self {
        Self {
            snapshots,
            limiter,
            oracle,
            ledger,
            notifier,
            directory,
            clock,
            settings,
        }
    }

    /// Opponents the attacker may challenge right now, strongest first.
    pub async fn list_opponents(
        &self,
        attacker_id: PlayerId,
        attacker: &PlayerData,
    ) -> Result<Vec<PlayerSummary>, PvpError> {
        let rules = self.settings.arena_rules();
        self.check_attacker_level(attacker)?;

        let directory = self.directory.list_player_summaries().await?;
        let counters = self.limiter.counters(attacker_id).await?;
        Ok(find_eligible(
            &Challenger::player(attacker_id, attacker),
            &directory,
            &counters,
            self.limiter.today(),
            &rules,
        ))
    }

    /// Check everything and load the opponent. Writes nothing.
    pub async fn prepare(
        &self,
        attacker_id: PlayerId,
        attacker: &PlayerData,
        target: PlayerId,
    ) -> Result<PreparedArenaFight, PvpError> {
        self.check_attacker_level(attacker)?;
        if target == attacker_id {
            return Err(EligibilityError::SelfTarget.into());
        }
        self.limiter.check(attacker_id, Some(target)).await?;

        let defender = self.snapshots.load_target(target).await?;
        check_levels(attacker.level, defender.level(), &self.settings.arena_rules())?;

        tracing::debug!(
            attacker_id = %attacker_id,
            defender_id = %target,
            defender_level = defender.level(),
            "Arena fight prepared"
        );
        Ok(PreparedArenaFight { defender })
    }

    /// Fight a prepared opponent and settle the result.
    ///
    /// `attacker` is the live session state; it is only changed once the
    /// defender-side settlement has been stored. Daily limits are checked
    /// again here since other fights may have been counted since `prepare`.
    pub async fn execute(
        &self,
        prepared: PreparedArenaFight,
        attacker_id: PlayerId,
        attacker: &mut PlayerData,
    ) -> Result<ArenaReport, PvpError> {
        let defender = prepared.defender;
        self.limiter.check(attacker_id, Some(defender.id())).await?;

        let result = self
            .oracle
            .resolve_combat(&attacker.combatant(attacker.hp), &defender.combatant)
            .await?;

        let parties = AttemptParties {
            attacker_id: Some(attacker_id),
            attacker_name: attacker.display_name.clone(),
            attacker_kind: AttackerKind::Player,
            attacker_level: attacker.level,
            defender_id: defender.id(),
            defender_name: defender.name().to_string(),
            defender_level: defender.level(),
            venue: AttackVenue::Arena,
        };
        let now = self.clock.now();

        let mut report = ArenaReport {
            opponent: defender.name().to_string(),
            outcome: result.outcome,
            rounds: result.rounds,
            gold_won: 0,
            bounty_claimed: 0,
            experience_gained: 0,
            gold_lost: 0,
            penalty: None,
            should_return_to_sanctuary: result.should_return_to_sanctuary,
            attacks_remaining: 0,
        };

        match result.outcome {
            CombatOutcome::Victory => {
                let policy = TheftPolicy {
                    gold_theft: self.settings.arena_gold_theft,
                    xp_loss: Percent::ZERO,
                    steal_item: false,
                    claim_bounty: true,
                    lethal: false,
                };
                let receipt = self
                    .ledger
                    .plunder(
                        parties.log(AttackResult::AttackerWon, now),
                        defender.gold_before,
                        &policy,
                        None,
                    )
                    .await?;

                let xp = self.settings.clamp_arena_xp(result.experience_gained);
                attacker.hp = surviving_hp(result.final_attacker_hp, attacker.max_hp);
                EconomyLedger::credit_victory(attacker, &receipt, xp);

                report.gold_won = -receipt.gold_applied;
                report.bounty_claimed = receipt.bounty_claimed;
                report.experience_gained = xp;

                self.notifier
                    .news(
                        &arena_victory_news(&attacker.display_name, defender.name(), report.gold_won),
                        NewsCategory::Pvp,
                    )
                    .await;
                self.notifier
                    .mail_and_push(
                        &attacker.display_name,
                        defender.id(),
                        MailCategory::Pvp,
                        "Arena",
                        &arena_victory_mail(&attacker.display_name, report.gold_won),
                    )
                    .await;
                if receipt.bounty_claimed > 0 {
                    self.notifier
                        .news(
                            &bounty_claimed_news(
                                &attacker.display_name,
                                defender.name(),
                                receipt.bounty_claimed,
                            ),
                            NewsCategory::Bounty,
                        )
                        .await;
                }
            }
            CombatOutcome::Defeated => {
                let policy = DefeatPolicy {
                    gold_theft: self.settings.arena_gold_theft,
                    death_xp: self.settings.death_xp_penalty,
                    death_gold: self.settings.death_gold_penalty,
                };
                let settled = self
                    .ledger
                    .retaliate(parties.log(AttackResult::DefenderWon, now), attacker, &policy)
                    .await?;

                report.gold_lost = settled.gold_lost_to_defender;
                report.penalty = Some(settled.penalty);

                self.notifier
                    .news(
                        &arena_defeat_news(&attacker.display_name, defender.name(), report.gold_lost),
                        NewsCategory::Pvp,
                    )
                    .await;
                self.notifier
                    .mail_and_push(
                        &attacker.display_name,
                        defender.id(),
                        MailCategory::Pvp,
                        "Arena",
                        &arena_defeat_mail(&attacker.display_name, report.gold_lost),
                    )
                    .await;
            }
            CombatOutcome::Escaped => {
                self.ledger
                    .record_outcome(parties.log(AttackResult::AttackerFled, now), None)
                    .await?;
                attacker.hp = surviving_hp(result.final_attacker_hp, attacker.max_hp);
            }
        }

        report.attacks_remaining = self.count_attack(attacker_id, defender.id()).await;

        tracing::info!(
            attacker_id = %attacker_id,
            defender_id = %defender.id(),
            outcome = ?result.outcome,
            rounds = result.rounds,
            gold_won = report.gold_won,
            gold_lost = report.gold_lost,
            xp = report.experience_gained,
            "Arena fight resolved"
        );
        Ok(report)
    }

    fn check_attacker_level(&self, attacker: &PlayerData) -> Result<(), EligibilityError> {
        let min_level = self.settings.arena_min_level;
        if attacker.level < min_level {
            return Err(EligibilityError::AttackerBelowMinimum {
                level: attacker.level,
                min_level,
            });
        }
        Ok(())
    }

    /// Count the settled fight. A counter-store fault here does not undo the fight.
    async fn count_attack(&self, attacker_id: PlayerId, defender_id: PlayerId) -> u32 {
        match self.limiter.record_attack(attacker_id, Some(defender_id)).await {
            Ok(counters) => self.limiter.attacks_remaining(&counters),
            Err(e) => {
                tracing::warn!(
                    attacker_id = %attacker_id,
                    error = %e,
                    "Failed to record arena attack against the daily limit"
                );
                0
            }
        }
    }
}

/// A fight the attacker walked away from never leaves them below 1 HP.
pub(crate) fn surviving_hp(hp: i64, max_hp: i64) -> i64 {
    hp.min(max_hp).max(1)
}
