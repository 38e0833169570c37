//! Repository port traits for the shared save store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skirmish_domain::{
    AttackLogEntry, AttackVenue, DailyCounters, GameDay, Guard, PersistedCharacter, PlayerId,
    PlayerSummary, SleepState, SleeperSummary,
};

use super::error::RepoError;
use super::types::{DefenderSettlement, Mail, NewsItem, SettlementReceipt};

// =============================================================================
// Character saves
// =============================================================================

/// Transactional boundary around character saves. Every method is atomic per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterStore: Send + Sync {
    /// Full save record as of one point in time, with its current version.
    async fn read_character(&self, id: PlayerId) -> Result<PersistedCharacter, RepoError>;

    /// Overwrite the full record, conditional on `record.version()` still being
    /// current (`0` creates a new record). Returns the new version.
    ///
    /// Daily counters are owned by [`CounterStore`] and are not written here.
    async fn write_character(&self, record: &PersistedCharacter) -> Result<u64, RepoError>;

    /// Atomic increment/decrement of gold on hand, clamped at zero at write time.
    /// Returns the delta actually applied.
    async fn adjust_gold(&self, id: PlayerId, delta: i64) -> Result<i64, RepoError>;

    /// Append-only; entries are never overwritten.
    async fn append_attack_log(&self, entry: &AttackLogEntry) -> Result<(), RepoError>;

    async fn register_sleeping(&self, id: PlayerId, sleep: &SleepState) -> Result<(), RepoError>;

    /// Remove the sleep registration, returning what it was.
    async fn clear_sleeping(&self, id: PlayerId) -> Result<Option<SleepState>, RepoError>;

    async fn mark_dead(&self, id: PlayerId) -> Result<(), RepoError>;

    /// Replace the guard list. Last writer wins.
    async fn update_guards(&self, id: PlayerId, guards: &[Guard]) -> Result<(), RepoError>;

    /// Add to the bounty pool. Returns the new pool size.
    async fn add_bounty(&self, id: PlayerId, amount: i64) -> Result<i64, RepoError>;

    /// Apply every defender-side consequence of one attack and append its log
    /// entry, all or nothing.
    ///
    /// Fails with [`RepoError::StaleWrite`] when `expected_version` is set and the
    /// record has moved on.
    async fn settle_attack(
        &self,
        settlement: &DefenderSettlement,
    ) -> Result<SettlementReceipt, RepoError>;

    // Queries
    async fn list_summaries(&self) -> Result<Vec<PlayerSummary>, RepoError>;
    async fn list_sleepers(&self) -> Result<Vec<SleeperSummary>, RepoError>;
    async fn attack_log_for(
        &self,
        defender: PlayerId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AttackLogEntry>, RepoError>;
    /// Newest first. `None` returns the whole log.
    async fn recent_attacks(
        &self,
        venue: Option<AttackVenue>,
        limit: Option<usize>,
    ) -> Result<Vec<AttackLogEntry>, RepoError>;
}

// =============================================================================
// Daily counters
// =============================================================================

/// Backing store for per-attacker daily counters.
///
/// Day roll-over is lazy: a stored counter from an earlier day reads as empty.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn load_counters(
        &self,
        player: PlayerId,
        today: GameDay,
    ) -> Result<DailyCounters, RepoError>;

    /// Atomically roll over if needed, count one attack and remember the defender.
    async fn record_attack(
        &self,
        attacker: PlayerId,
        defender: Option<PlayerId>,
        today: GameDay,
    ) -> Result<DailyCounters, RepoError>;
}

// =============================================================================
// News and mail
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_news(&self, item: &NewsItem) -> Result<(), RepoError>;
    async fn save_mail(&self, mail: &Mail) -> Result<(), RepoError>;
    async fn mail_for(&self, recipient: PlayerId) -> Result<Vec<Mail>, RepoError>;
    /// Newest first.
    async fn recent_news(&self, limit: usize) -> Result<Vec<NewsItem>, RepoError>;
}
