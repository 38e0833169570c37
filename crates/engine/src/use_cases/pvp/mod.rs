//! PvP use cases: arena fights, sleep attacks, lodging, bounties and history.
//!
//! Every attempt runs sequentially within one session. Attacks from different
//! sessions meet only in the save store, which applies each attack's
//! defender-side consequences atomically.

mod arena;
mod bounty;
mod economy;
mod eligibility;
mod error;
mod guard_chain;
mod history;
mod notify;
mod rate_limit;
mod sleep;
mod sleep_attack;
mod snapshot;

use std::sync::Arc;

pub use arena::{ArenaFight, ArenaReport, PreparedArenaFight};
pub use bounty::{BountyReceipt, PlaceBounty};
pub use economy::{AttemptParties, DefeatPolicy, DefeatSettlement, EconomyLedger, TheftPolicy};
pub use eligibility::{check_levels, find_eligible, find_sleep_targets, Challenger, EligibilityRules};
pub use error::{EligibilityError, PvpError};
pub use guard_chain::{GuardChain, GuardChainOutcome};
pub use history::{ArenaHistory, LeaderboardEntry, PvpRecord};
pub use notify::NotificationDispatcher;
pub use rate_limit::RateLimiter;
pub use sleep::{Lodging, Rest, SleepReceipt, WakeReport};
pub use sleep_attack::{NpcRaider, PreparedSleepAttack, SleepAttack, SleepAttackReport};
pub use snapshot::{DefenderSnapshot, SnapshotLoader};

use crate::infrastructure::ports::{
    CharacterStore, ClockPort, CombatOracle, CounterStore, DayClockPort, DirectoryPort,
    NotificationSink, RandomPort,
};
use crate::infrastructure::settings::PvpSettings;

/// Container for PvP use cases.
pub struct PvpUseCases {
    pub arena: Arc<ArenaFight>,
    pub sleep_attack: Arc<SleepAttack>,
    pub rest: Arc<Rest>,
    pub bounty: Arc<PlaceBounty>,
    pub history: Arc<ArenaHistory>,
    pub limiter: Arc<RateLimiter>,
}

impl PvpUseCases {
    pub fn new(
        characters: Arc<dyn CharacterStore>,
        counters: Arc<dyn CounterStore>,
        directory: Arc<dyn DirectoryPort>,
        oracle: Arc<dyn CombatOracle>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        day_clock: Arc<dyn DayClockPort>,
        settings: PvpSettings,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            counters,
            day_clock,
            settings.max_attacks_per_day,
        ));
        let ledger = Arc::new(EconomyLedger::new(
            characters.clone(),
            random,
            settings.stale_write_retries,
        ));
        let notifier = Arc::new(NotificationDispatcher::new(sink, clock.clone()));

        let arena = Arc::new(ArenaFight::new(
            SnapshotLoader::new(characters.clone()),
            limiter.clone(),
            oracle.clone(),
            ledger.clone(),
            notifier.clone(),
            directory,
            clock.clone(),
            settings.clone(),
        ));
        let sleep_attack = Arc::new(SleepAttack::new(
            characters.clone(),
            limiter.clone(),
            oracle,
            ledger,
            notifier.clone(),
            clock.clone(),
            settings.clone(),
        ));
        let rest = Arc::new(Rest::new(characters.clone(), clock, settings));
        let bounty = Arc::new(PlaceBounty::new(characters.clone(), notifier));
        let history = Arc::new(ArenaHistory::new(characters));

        Self {
            arena,
            sleep_attack,
            rest,
            bounty,
            history,
            limiter,
        }
    }
}
