//! In-memory save store for single-session play and tests
//!
//! One write lock covers every record and the attack log, so each call is
//! trivially atomic. Nothing survives the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skirmish_domain::{
    AttackLogEntry, AttackVenue, DailyCounters, GameDay, Guard, PersistedCharacter, PlayerId,
    PlayerSummary, SleepState, SleeperSummary,
};
use tokio::sync::RwLock;

use crate::infrastructure::ports::{
    CharacterStore, CounterStore, DefenderSettlement, Mail, MessageStore, NewsItem, RepoError,
    SettlementReceipt,
};

const ENTITY: &str = "Character";

// =============================================================================
// Daily counters
// =============================================================================

/// Process-local daily counters.
#[derive(Clone, Default)]
pub struct InMemoryCounterStore {
    counters: Arc<RwLock<HashMap<PlayerId, DailyCounters>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters exactly as stored, without any roll-over.
    async fn stored(&self, player: PlayerId) -> Option<DailyCounters> {
        self.counters.read().await.get(&player).cloned()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn load_counters(
        &self,
        player: PlayerId,
        today: GameDay,
    ) -> Result<DailyCounters, RepoError> {
        Ok(self
            .counters
            .read()
            .await
            .get(&player)
            .map(|c| c.as_of(today))
            .unwrap_or_else(|| DailyCounters::for_day(today)))
    }

    async fn record_attack(
        &self,
        attacker: PlayerId,
        defender: Option<PlayerId>,
        today: GameDay,
    ) -> Result<DailyCounters, RepoError> {
        let mut counters = self.counters.write().await;
        let entry = counters
            .entry(attacker)
            .or_insert_with(|| DailyCounters::for_day(today));
        entry.record_attack(today, defender);
        Ok(entry.clone())
    }
}

// =============================================================================
// Character saves
// =============================================================================

#[derive(Default)]
struct MemoryState {
    characters: HashMap<PlayerId, PersistedCharacter>,
    attack_log: Vec<AttackLogEntry>,
    news: Vec<NewsItem>,
    mail: Vec<Mail>,
}

impl MemoryState {
    fn get_mut(&mut self, id: PlayerId) -> Result<&mut PersistedCharacter, RepoError> {
        self.characters
            .get_mut(&id)
            .ok_or_else(|| RepoError::not_found(ENTITY, id))
    }
}

/// In-memory implementation of every store port.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
    counters: InMemoryCounterStore,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_by_id<T>(mut items: Vec<(PlayerId, T)>) -> Vec<T> {
        items.sort_by_key(|(id, _)| *id);
        items.into_iter().map(|(_, item)| item).collect()
    }
}

#[async_trait]
impl CharacterStore for InMemoryStore {
    async fn read_character(&self, id: PlayerId) -> Result<PersistedCharacter, RepoError> {
        let mut record = self
            .state
            .read()
            .await
            .characters
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::not_found(ENTITY, id))?;
        if let Some(counters) = self.counters.stored(id).await {
            *record.daily_mut() = counters;
        }
        Ok(record)
    }

    async fn write_character(&self, record: &PersistedCharacter) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let current_version = state.characters.get(&record.id()).map(|c| c.version());
        match current_version {
            Some(v) if v != record.version() => {
                return Err(RepoError::stale(ENTITY, record.id(), record.version()))
            }
            None if record.version() != 0 => return Err(RepoError::not_found(ENTITY, record.id())),
            _ => {}
        }
        let version = record.version() + 1;
        state
            .characters
            .insert(record.id(), record.clone().with_version(version));
        Ok(version)
    }

    async fn adjust_gold(&self, id: PlayerId, delta: i64) -> Result<i64, RepoError> {
        let mut state = self.state.write().await;
        let record = state.get_mut(id)?;
        let applied = record.adjust_gold(delta);
        record.bump_version();
        Ok(applied)
    }

    async fn append_attack_log(&self, entry: &AttackLogEntry) -> Result<(), RepoError> {
        self.state.write().await.attack_log.push(entry.clone());
        Ok(())
    }

    async fn register_sleeping(&self, id: PlayerId, sleep: &SleepState) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let record = state.get_mut(id)?;
        record.set_sleep(Some(sleep.clone()));
        record.bump_version();
        Ok(())
    }

    async fn clear_sleeping(&self, id: PlayerId) -> Result<Option<SleepState>, RepoError> {
        let mut state = self.state.write().await;
        let record = state.get_mut(id)?;
        let previous = record.sleep().cloned();
        record.set_sleep(None);
        record.bump_version();
        Ok(previous)
    }

    async fn mark_dead(&self, id: PlayerId) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let record = state.get_mut(id)?;
        record.mark_dead();
        record.bump_version();
        Ok(())
    }

    async fn update_guards(&self, id: PlayerId, guards: &[Guard]) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let record = state.get_mut(id)?;
        if let Some(sleep) = record.sleep_mut() {
            sleep.guards = guards.to_vec();
        }
        record.bump_version();
        Ok(())
    }

    async fn add_bounty(&self, id: PlayerId, amount: i64) -> Result<i64, RepoError> {
        let mut state = self.state.write().await;
        let record = state.get_mut(id)?;
        record.add_bounty(amount);
        record.bump_version();
        Ok(record.bounty())
    }

    async fn settle_attack(
        &self,
        settlement: &DefenderSettlement,
    ) -> Result<SettlementReceipt, RepoError> {
        let mut state = self.state.write().await;
        let record = state.get_mut(settlement.defender_id)?;
        if let Some(expected) = settlement.expected_version {
            if record.version() != expected {
                return Err(RepoError::stale(ENTITY, settlement.defender_id, expected));
            }
        }
        settlement
            .check(record)
            .map_err(|reason| RepoError::refused(settlement.defender_id, reason))?;
        let (mut receipt, log) = settlement.apply(record);
        record.bump_version();
        receipt.version = record.version();
        state.attack_log.push(log);
        Ok(receipt)
    }

    async fn list_summaries(&self) -> Result<Vec<PlayerSummary>, RepoError> {
        let state = self.state.read().await;
        let items = state
            .characters
            .values()
            .filter_map(|c| c.summary(false).map(|s| (c.id(), s)))
            .collect();
        Ok(Self::sorted_by_id(items))
    }

    async fn list_sleepers(&self) -> Result<Vec<SleeperSummary>, RepoError> {
        let state = self.state.read().await;
        let items = state
            .characters
            .values()
            .filter_map(|c| c.sleeper_summary().map(|s| (c.id(), s)))
            .collect();
        Ok(Self::sorted_by_id(items))
    }

    async fn attack_log_for(
        &self,
        defender: PlayerId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AttackLogEntry>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .attack_log
            .iter()
            .filter(|e| e.defender_id == defender)
            .filter(|e| since.map_or(true, |t| e.timestamp >= t))
            .cloned()
            .collect())
    }

    async fn recent_attacks(
        &self,
        venue: Option<AttackVenue>,
        limit: Option<usize>,
    ) -> Result<Vec<AttackLogEntry>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .attack_log
            .iter()
            .rev()
            .filter(|e| venue.map_or(true, |v| e.venue == v))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn load_counters(
        &self,
        player: PlayerId,
        today: GameDay,
    ) -> Result<DailyCounters, RepoError> {
        self.counters.load_counters(player, today).await
    }

    async fn record_attack(
        &self,
        attacker: PlayerId,
        defender: Option<PlayerId>,
        today: GameDay,
    ) -> Result<DailyCounters, RepoError> {
        self.counters.record_attack(attacker, defender, today).await
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn save_news(&self, item: &NewsItem) -> Result<(), RepoError> {
        self.state.write().await.news.push(item.clone());
        Ok(())
    }

    async fn save_mail(&self, mail: &Mail) -> Result<(), RepoError> {
        self.state.write().await.mail.push(mail.clone());
        Ok(())
    }

    async fn mail_for(&self, recipient: PlayerId) -> Result<Vec<Mail>, RepoError> {
        Ok(self
            .state
            .read()
            .await
            .mail
            .iter()
            .filter(|m| m.to == recipient)
            .cloned()
            .collect())
    }

    async fn recent_news(&self, limit: usize) -> Result<Vec<NewsItem>, RepoError> {
        Ok(self
            .state
            .read()
            .await
            .news
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
