//! SQLite-backed shared save store.
//!
//! One row per character. Gold and bounty live in their own columns so they can
//! be adjusted with a single statement; the rest of the stat block is a JSON
//! document. Every successful change bumps `version`, which is what conditional
//! writes and settlements compare against.
//!
//! Read-modify-write transactions start with a write so SQLite takes the write
//! lock up front instead of upgrading a read lock mid-transaction.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skirmish_domain::{
    AttackLogEntry, AttackVenue, DailyCounters, GameDay, Guard, GuardDocument, PersistedCharacter,
    PlayerData, PlayerId, PlayerSummary, SleepLocation, SleepState, SleeperSummary, StoredGuards,
};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::infrastructure::ports::{
    CharacterStore, ClockPort, CounterStore, DefenderSettlement, Mail, MessageStore, NewsItem,
    RepoError, SettlementReceipt,
};

const ENTITY: &str = "Character";

/// Fresh-read attempts for settlements that do not pin a version.
const SETTLE_ATTEMPTS: u32 = 5;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS characters (
        id TEXT PRIMARY KEY,
        version INTEGER NOT NULL,
        gold INTEGER NOT NULL DEFAULT 0,
        bounty INTEGER NOT NULL DEFAULT 0,
        player_json TEXT,
        sleep_location TEXT,
        sleep_guards TEXT,
        sleep_is_dead INTEGER NOT NULL DEFAULT 0,
        sleep_defense_boost INTEGER NOT NULL DEFAULT 0,
        sleep_since TEXT,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attack_log (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        defender_id TEXT NOT NULL,
        venue TEXT NOT NULL,
        result TEXT NOT NULL,
        entry_json TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_attack_log_defender ON attack_log (defender_id, created_at_ms)",
    r#"
    CREATE TABLE IF NOT EXISTS daily_counters (
        player_id TEXT PRIMARY KEY,
        day INTEGER NOT NULL,
        attacks_today INTEGER NOT NULL,
        arm_wrestles_today INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fought_today (
        attacker_id TEXT NOT NULL,
        defender_id TEXT NOT NULL,
        day INTEGER NOT NULL,
        PRIMARY KEY (attacker_id, defender_id, day)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS news (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        news_json TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mail (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        recipient TEXT NOT NULL,
        mail_json TEXT NOT NULL
    )
    "#,
];

/// SQLite implementation of the save, counter and message stores.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file.
    pub async fn open(db_path: &str, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        Self::connect(&format!("sqlite:{}?mode=rwc", db_path), clock).await
    }

    /// Connect with a full `sqlite:` URL.
    pub async fn connect(url: &str, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        ensure_parent_dir(url)?;
        let pool = SqlitePool::connect(url)
            .await
            .map_err(|e| RepoError::database("connect", e))?;
        Self::with_pool(pool, clock).await
    }

    /// Private in-memory database. A single pinned connection keeps it alive.
    pub async fn in_memory(clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| RepoError::database("connect", e))?;
        Self::with_pool(pool, clock).await
    }

    async fn with_pool(pool: SqlitePool, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| RepoError::database("schema", e))?;
        }
        Ok(Self { pool, clock })
    }

    fn now(&self) -> String {
        self.clock.now().to_rfc3339()
    }

    // =========================================================================
    // Row helpers
    // =========================================================================

    async fn stored_counters(&self, player: PlayerId) -> Result<Option<DailyCounters>, RepoError> {
        let row = sqlx::query(
            "SELECT day, attacks_today, arm_wrestles_today FROM daily_counters WHERE player_id = ?",
        )
        .bind(player.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("load_counters", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let day: i64 = row.get("day");

        let fought = sqlx::query(
            "SELECT defender_id FROM fought_today WHERE attacker_id = ? AND day = ?",
        )
        .bind(player.to_string())
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("load_counters", e))?;

        let already_fought = fought
            .iter()
            .map(|r| parse_player_id(&r.get::<String, _>("defender_id")))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Some(DailyCounters {
            day: GameDay::new(day),
            attacks_today: row.get::<i64, _>("attacks_today").max(0) as u32,
            arm_wrestles_today: row.get::<i64, _>("arm_wrestles_today").max(0) as u32,
            already_fought,
        }))
    }

    async fn exists(&self, id: PlayerId) -> Result<bool, RepoError> {
        let row = sqlx::query("SELECT 1 FROM characters WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("exists", e))?;
        Ok(row.is_some())
    }

    /// Conditional full-row update. Returns `false` when `read_version` is no longer current.
    async fn update_record(
        tx: &mut Transaction<'_, Sqlite>,
        record: &PersistedCharacter,
        read_version: u64,
        now: &str,
    ) -> Result<bool, RepoError> {
        let player_json = record
            .player()
            .map(serde_json::to_string)
            .transpose()
            .map_err(RepoError::serialization)?;
        let sleep = SleepColumns::encode(record.sleep())?;

        let result = sqlx::query(
            r#"
            UPDATE characters SET
                version = ?, gold = ?, bounty = ?, player_json = ?,
                sleep_location = ?, sleep_guards = ?, sleep_is_dead = ?,
                sleep_defense_boost = ?, sleep_since = ?, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind((read_version + 1) as i64)
        .bind(record.gold())
        .bind(record.bounty())
        .bind(player_json)
        .bind(sleep.location)
        .bind(sleep.guards)
        .bind(sleep.is_dead)
        .bind(sleep.defense_boost)
        .bind(sleep.since)
        .bind(now)
        .bind(record.id().to_string())
        .bind(read_version as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| RepoError::database("update_record", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_log(
        tx: &mut Transaction<'_, Sqlite>,
        entry: &AttackLogEntry,
    ) -> Result<(), RepoError> {
        let json = serde_json::to_string(entry).map_err(RepoError::serialization)?;
        sqlx::query(
            r#"
            INSERT INTO attack_log (id, defender_id, venue, result, entry_json, created_at_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.defender_id.to_string())
        .bind(entry.venue.as_str())
        .bind(entry.result.as_str())
        .bind(json)
        .bind(entry.timestamp.timestamp_millis())
        .execute(&mut **tx)
        .await
        .map_err(|e| RepoError::database("append_attack_log", e))?;
        Ok(())
    }

    async fn begin(&self, operation: &'static str) -> Result<Transaction<'static, Sqlite>, RepoError> {
        self.pool
            .begin()
            .await
            .map_err(|e| RepoError::database(operation, e))
    }

    /// Bump the version of a sleeping character's row, with an extra column update.
    async fn update_sleeper(
        &self,
        operation: &'static str,
        id: PlayerId,
        set_clause: &'static str,
        value: Option<String>,
    ) -> Result<(), RepoError> {
        let sql = format!(
            "UPDATE characters SET {set_clause}, version = version + 1, updated_at = ? \
             WHERE id = ? AND sleep_location IS NOT NULL"
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = value {
            query = query.bind(value);
        }
        let result = query
            .bind(self.now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database(operation, e))?;

        if result.rows_affected() == 0 && !self.exists(id).await? {
            return Err(RepoError::not_found(ENTITY, id));
        }
        Ok(())
    }
}

// =============================================================================
// Encoding
// =============================================================================

struct SleepColumns {
    location: Option<String>,
    guards: Option<String>,
    is_dead: bool,
    defense_boost: bool,
    since: Option<String>,
}

impl SleepColumns {
    fn encode(sleep: Option<&SleepState>) -> Result<Self, RepoError> {
        match sleep {
            Some(s) => Ok(Self {
                location: Some(s.location.as_str().to_string()),
                guards: Some(encode_guards(&s.guards)?),
                is_dead: s.is_dead,
                defense_boost: s.defense_boost,
                since: Some(s.since.to_rfc3339()),
            }),
            None => Ok(Self {
                location: None,
                guards: None,
                is_dead: false,
                defense_boost: false,
                since: None,
            }),
        }
    }

    fn decode(row: &SqliteRow) -> Result<Option<SleepState>, RepoError> {
        let Some(location) = row.get::<Option<String>, _>("sleep_location") else {
            return Ok(None);
        };
        let location = SleepLocation::from_str(&location)?;
        let guards = match row.get::<Option<String>, _>("sleep_guards") {
            Some(json) => decode_guards(&json)?,
            None => Vec::new(),
        };
        let since = match row.get::<Option<String>, _>("sleep_since") {
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map_err(RepoError::serialization)?
                .with_timezone(&Utc),
            None => DateTime::<Utc>::default(),
        };
        Ok(Some(SleepState {
            location,
            guards,
            is_dead: row.get("sleep_is_dead"),
            defense_boost: row.get("sleep_defense_boost"),
            since,
        }))
    }
}

/// Guards are always written as the current versioned document.
fn encode_guards(guards: &[Guard]) -> Result<String, RepoError> {
    serde_json::to_string(&GuardDocument::current(guards.to_vec())).map_err(RepoError::serialization)
}

/// Accepts the current document and the legacy bare array.
fn decode_guards(json: &str) -> Result<Vec<Guard>, RepoError> {
    let stored: StoredGuards = serde_json::from_str(json).map_err(RepoError::serialization)?;
    Ok(stored.into_guards()?)
}

fn parse_player_id(s: &str) -> Result<PlayerId, RepoError> {
    PlayerId::from_str(s).map_err(RepoError::serialization)
}

fn decode_character(row: &SqliteRow, daily: DailyCounters) -> Result<PersistedCharacter, RepoError> {
    let id = parse_player_id(&row.get::<String, _>("id"))?;
    let version: i64 = row.get("version");
    let gold: i64 = row.get("gold");

    let player = match row.get::<Option<String>, _>("player_json") {
        Some(json) => {
            let mut data: PlayerData =
                serde_json::from_str(&json).map_err(RepoError::serialization)?;
            data.gold = gold;
            Some(data)
        }
        None => None,
    };

    Ok(PersistedCharacter::from_storage(
        id,
        version.max(0) as u64,
        player,
        daily,
        SleepColumns::decode(row)?,
        row.get("bounty"),
    ))
}

fn ensure_parent_dir(url: &str) -> Result<(), RepoError> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| RepoError::database("connect", e))?;
        }
    }
    Ok(())
}

// =============================================================================
// CharacterStore
// =============================================================================

#[async_trait]
impl CharacterStore for SqliteStore {
    async fn read_character(&self, id: PlayerId) -> Result<PersistedCharacter, RepoError> {
        let row = sqlx::query("SELECT * FROM characters WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("read_character", e))?
            .ok_or_else(|| RepoError::not_found(ENTITY, id))?;

        let daily = self.stored_counters(id).await?.unwrap_or_default();
        decode_character(&row, daily)
    }

    async fn write_character(&self, record: &PersistedCharacter) -> Result<u64, RepoError> {
        let now = self.now();
        if record.version() == 0 {
            let player_json = record
                .player()
                .map(serde_json::to_string)
                .transpose()
                .map_err(RepoError::serialization)?;
            let sleep = SleepColumns::encode(record.sleep())?;
            let result = sqlx::query(
                r#"
                INSERT INTO characters (
                    id, version, gold, bounty, player_json,
                    sleep_location, sleep_guards, sleep_is_dead, sleep_defense_boost, sleep_since,
                    updated_at
                )
                VALUES (?, 1, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(record.id().to_string())
            .bind(record.gold())
            .bind(record.bounty())
            .bind(player_json)
            .bind(sleep.location)
            .bind(sleep.guards)
            .bind(sleep.is_dead)
            .bind(sleep.defense_boost)
            .bind(sleep.since)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("write_character", e))?;

            if result.rows_affected() == 0 {
                return Err(RepoError::stale(ENTITY, record.id(), 0));
            }
            return Ok(1);
        }

        let mut tx = self.begin("write_character").await?;
        if !Self::update_record(&mut tx, record, record.version(), &now).await? {
            drop(tx);
            return Err(if self.exists(record.id()).await? {
                RepoError::stale(ENTITY, record.id(), record.version())
            } else {
                RepoError::not_found(ENTITY, record.id())
            });
        }
        tx.commit()
            .await
            .map_err(|e| RepoError::database("write_character", e))?;
        Ok(record.version() + 1)
    }

    async fn adjust_gold(&self, id: PlayerId, delta: i64) -> Result<i64, RepoError> {
        let mut tx = self.begin("adjust_gold").await?;

        let claimed = sqlx::query(
            "UPDATE characters SET version = version + 1, updated_at = ? WHERE id = ?",
        )
        .bind(self.now())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("adjust_gold", e))?;
        if claimed.rows_affected() == 0 {
            return Err(RepoError::not_found(ENTITY, id));
        }

        let before: i64 = sqlx::query("SELECT gold FROM characters WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepoError::database("adjust_gold", e))?
            .get("gold");
        let after = before.saturating_add(delta).max(0);

        sqlx::query("UPDATE characters SET gold = ? WHERE id = ?")
            .bind(after)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("adjust_gold", e))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::database("adjust_gold", e))?;
        Ok(after - before)
    }

    async fn append_attack_log(&self, entry: &AttackLogEntry) -> Result<(), RepoError> {
        let mut tx = self.begin("append_attack_log").await?;
        Self::insert_log(&mut tx, entry).await?;
        tx.commit()
            .await
            .map_err(|e| RepoError::database("append_attack_log", e))
    }

    async fn register_sleeping(&self, id: PlayerId, sleep: &SleepState) -> Result<(), RepoError> {
        let cols = SleepColumns::encode(Some(sleep))?;
        let result = sqlx::query(
            r#"
            UPDATE characters SET
                sleep_location = ?, sleep_guards = ?, sleep_is_dead = ?,
                sleep_defense_boost = ?, sleep_since = ?,
                version = version + 1, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(cols.location)
        .bind(cols.guards)
        .bind(cols.is_dead)
        .bind(cols.defense_boost)
        .bind(cols.since)
        .bind(self.now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("register_sleeping", e))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::not_found(ENTITY, id));
        }
        Ok(())
    }

    async fn clear_sleeping(&self, id: PlayerId) -> Result<Option<SleepState>, RepoError> {
        let mut tx = self.begin("clear_sleeping").await?;

        let claimed = sqlx::query(
            "UPDATE characters SET version = version + 1, updated_at = ? WHERE id = ?",
        )
        .bind(self.now())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("clear_sleeping", e))?;
        if claimed.rows_affected() == 0 {
            return Err(RepoError::not_found(ENTITY, id));
        }

        let row = sqlx::query(
            r#"
            SELECT sleep_location, sleep_guards, sleep_is_dead, sleep_defense_boost, sleep_since
            FROM characters WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepoError::database("clear_sleeping", e))?;
        let previous = SleepColumns::decode(&row)?;

        sqlx::query(
            r#"
            UPDATE characters SET
                sleep_location = NULL, sleep_guards = NULL, sleep_is_dead = 0,
                sleep_defense_boost = 0, sleep_since = NULL
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("clear_sleeping", e))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::database("clear_sleeping", e))?;
        Ok(previous)
    }

    async fn mark_dead(&self, id: PlayerId) -> Result<(), RepoError> {
        self.update_sleeper("mark_dead", id, "sleep_is_dead = 1", None)
            .await
    }

    async fn update_guards(&self, id: PlayerId, guards: &[Guard]) -> Result<(), RepoError> {
        let json = encode_guards(guards)?;
        self.update_sleeper("update_guards", id, "sleep_guards = ?", Some(json))
            .await
    }

    async fn add_bounty(&self, id: PlayerId, amount: i64) -> Result<i64, RepoError> {
        let row = sqlx::query(
            r#"
            UPDATE characters SET bounty = bounty + ?, version = version + 1, updated_at = ?
            WHERE id = ?
            RETURNING bounty
            "#,
        )
        .bind(amount.max(0))
        .bind(self.now())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("add_bounty", e))?
        .ok_or_else(|| RepoError::not_found(ENTITY, id))?;
        Ok(row.get("bounty"))
    }

    async fn settle_attack(
        &self,
        settlement: &DefenderSettlement,
    ) -> Result<SettlementReceipt, RepoError> {
        let id = settlement.defender_id;
        let attempts = if settlement.expected_version.is_some() {
            1
        } else {
            SETTLE_ATTEMPTS
        };

        let mut last_version = 0;
        for _ in 0..attempts {
            let mut record = self.read_character(id).await?;
            let read_version = record.version();
            last_version = read_version;
            if let Some(expected) = settlement.expected_version {
                if read_version != expected {
                    return Err(RepoError::stale(ENTITY, id, expected));
                }
            }
            // Checked against the version the conditional update below is pinned to.
            settlement
                .check(&record)
                .map_err(|reason| RepoError::refused(id, reason))?;

            let (mut receipt, log) = settlement.apply(&mut record);

            let mut tx = self.begin("settle_attack").await?;
            if !Self::update_record(&mut tx, &record, read_version, &self.now()).await? {
                tracing::debug!(defender_id = %id, read_version, "Settlement raced a concurrent write, re-reading");
                continue;
            }
            Self::insert_log(&mut tx, &log).await?;
            tx.commit()
                .await
                .map_err(|e| RepoError::database("settle_attack", e))?;

            receipt.version = read_version + 1;
            return Ok(receipt);
        }

        Err(RepoError::stale(
            ENTITY,
            id,
            settlement.expected_version.unwrap_or(last_version),
        ))
    }

    async fn list_summaries(&self) -> Result<Vec<PlayerSummary>, RepoError> {
        let rows = sqlx::query("SELECT * FROM characters ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_summaries", e))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            match decode_character(row, DailyCounters::default()) {
                Ok(record) => summaries.extend(record.summary(false)),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable save in directory listing"),
            }
        }
        Ok(summaries)
    }

    async fn list_sleepers(&self) -> Result<Vec<SleeperSummary>, RepoError> {
        let rows = sqlx::query("SELECT * FROM characters WHERE sleep_location IS NOT NULL ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_sleepers", e))?;

        let mut sleepers = Vec::with_capacity(rows.len());
        for row in &rows {
            match decode_character(row, DailyCounters::default()) {
                Ok(record) => sleepers.extend(record.sleeper_summary()),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable sleeper"),
            }
        }
        Ok(sleepers)
    }

    async fn attack_log_for(
        &self,
        defender: PlayerId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AttackLogEntry>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT entry_json FROM attack_log
            WHERE defender_id = ? AND created_at_ms >= ?
            ORDER BY seq
            "#,
        )
        .bind(defender.to_string())
        .bind(since.map_or(i64::MIN, |t| t.timestamp_millis()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("attack_log_for", e))?;

        rows.iter()
            .map(|r| {
                serde_json::from_str(&r.get::<String, _>("entry_json"))
                    .map_err(RepoError::serialization)
            })
            .collect()
    }

    async fn recent_attacks(
        &self,
        venue: Option<AttackVenue>,
        limit: Option<usize>,
    ) -> Result<Vec<AttackLogEntry>, RepoError> {
        let venue = venue.map(|v| v.as_str());
        // SQLite reads a negative LIMIT as unbounded.
        let limit = limit
            .and_then(|l| i64::try_from(l).ok())
            .unwrap_or(-1);
        let rows = sqlx::query(
            r#"
            SELECT entry_json FROM attack_log
            WHERE (? IS NULL OR venue = ?)
            ORDER BY seq DESC
            LIMIT ?
            "#,
        )
        .bind(venue)
        .bind(venue)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("recent_attacks", e))?;

        rows.iter()
            .map(|r| {
                serde_json::from_str(&r.get::<String, _>("entry_json"))
                    .map_err(RepoError::serialization)
            })
            .collect()
    }
}

// =============================================================================
// CounterStore
// =============================================================================

#[async_trait]
impl CounterStore for SqliteStore {
    async fn load_counters(
        &self,
        player: PlayerId,
        today: GameDay,
    ) -> Result<DailyCounters, RepoError> {
        Ok(self
            .stored_counters(player)
            .await?
            .map(|c| c.as_of(today))
            .unwrap_or_else(|| DailyCounters::for_day(today)))
    }

    async fn record_attack(
        &self,
        attacker: PlayerId,
        defender: Option<PlayerId>,
        today: GameDay,
    ) -> Result<DailyCounters, RepoError> {
        let attacker_key = attacker.to_string();
        let mut tx = self.begin("record_attack").await?;

        sqlx::query(
            r#"
            INSERT INTO daily_counters (player_id, day, attacks_today, arm_wrestles_today)
            VALUES (?, ?, 1, 0)
            ON CONFLICT(player_id) DO UPDATE SET
                attacks_today = CASE WHEN excluded.day > daily_counters.day
                    THEN 1 ELSE daily_counters.attacks_today + 1 END,
                arm_wrestles_today = CASE WHEN excluded.day > daily_counters.day
                    THEN 0 ELSE daily_counters.arm_wrestles_today END,
                day = MAX(daily_counters.day, excluded.day)
            "#,
        )
        .bind(&attacker_key)
        .bind(today.value())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("record_attack", e))?;

        if let Some(defender) = defender {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO fought_today (attacker_id, defender_id, day)
                SELECT ?, ?, day FROM daily_counters WHERE player_id = ?
                "#,
            )
            .bind(&attacker_key)
            .bind(defender.to_string())
            .bind(&attacker_key)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("record_attack", e))?;
        }

        // Superseded days are never read again
        sqlx::query(
            r#"
            DELETE FROM fought_today
            WHERE attacker_id = ?
              AND day < (SELECT day FROM daily_counters WHERE player_id = ?)
            "#,
        )
        .bind(&attacker_key)
        .bind(&attacker_key)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("record_attack", e))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::database("record_attack", e))?;

        self.load_counters(attacker, today).await
    }
}

// =============================================================================
// MessageStore
// =============================================================================

#[async_trait]
impl MessageStore for SqliteStore {
    async fn save_news(&self, item: &NewsItem) -> Result<(), RepoError> {
        let json = serde_json::to_string(item).map_err(RepoError::serialization)?;
        sqlx::query("INSERT INTO news (news_json) VALUES (?)")
            .bind(json)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("save_news", e))?;
        Ok(())
    }

    async fn save_mail(&self, mail: &Mail) -> Result<(), RepoError> {
        let json = serde_json::to_string(mail).map_err(RepoError::serialization)?;
        sqlx::query("INSERT INTO mail (recipient, mail_json) VALUES (?, ?)")
            .bind(mail.to.to_string())
            .bind(json)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("save_mail", e))?;
        Ok(())
    }

    async fn mail_for(&self, recipient: PlayerId) -> Result<Vec<Mail>, RepoError> {
        let rows = sqlx::query("SELECT mail_json FROM mail WHERE recipient = ? ORDER BY seq")
            .bind(recipient.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("mail_for", e))?;
        rows.iter()
            .map(|r| {
                serde_json::from_str(&r.get::<String, _>("mail_json"))
                    .map_err(RepoError::serialization)
            })
            .collect()
    }

    async fn recent_news(&self, limit: usize) -> Result<Vec<NewsItem>, RepoError> {
        let rows = sqlx::query("SELECT news_json FROM news ORDER BY seq DESC LIMIT ?")
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("recent_news", e))?;
        rows.iter()
            .map(|r| {
                serde_json::from_str(&r.get::<String, _>("news_json"))
                    .map_err(RepoError::serialization)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::ports::{DefenderPrecondition, SettlementRefusal};
    use crate::test_fixtures::{log_entry, player_data, saved_character};
    use skirmish_domain::{AttackResult, GuardType};

    async fn store() -> SqliteStore {
        SqliteStore::in_memory(Arc::new(SystemClock::new()))
            .await
            .expect("in-memory sqlite")
    }

    #[tokio::test]
    async fn round_trips_full_record() {
        let store = store().await;
        let mut data = player_data("Ilse", 14, 640);
        data.team = Some("Night Owls".into());
        let record = saved_character(&store, data.clone()).await;

        let read = store.read_character(record.id()).await.expect("read");
        assert_eq!(read.version(), 1);
        assert_eq!(read.player(), Some(&data));
        assert!(read.sleep().is_none());
    }

    #[tokio::test]
    async fn conditional_write_rejects_stale_version() {
        let store = store().await;
        let record = saved_character(&store, player_data("Jory", 10, 100)).await;

        let fresh = store.read_character(record.id()).await.expect("read");
        assert_eq!(store.write_character(&fresh).await.expect("write"), 2);

        let err = store.write_character(&fresh).await.expect_err("stale");
        assert!(err.is_stale());
    }

    #[tokio::test]
    async fn adjust_gold_clamps_at_write_time() {
        let store = store().await;
        let record = saved_character(&store, player_data("Kael", 10, 70)).await;

        assert_eq!(store.adjust_gold(record.id(), -200).await.expect("adjust"), -70);
        assert_eq!(store.adjust_gold(record.id(), 15).await.expect("adjust"), 15);
        assert_eq!(store.read_character(record.id()).await.expect("read").gold(), 15);
    }

    #[tokio::test]
    async fn settlement_and_log_commit_together() {
        let store = store().await;
        let record = saved_character(&store, player_data("Lune", 22, 1_000)).await;
        store.add_bounty(record.id(), 250).await.expect("bounty");

        let settlement = DefenderSettlement::new(log_entry(
            record.id(),
            AttackVenue::Arena,
            AttackResult::AttackerWon,
        ))
        .with_gold_delta(-100)
        .claiming_bounty();
        let receipt = store.settle_attack(&settlement).await.expect("settle");

        assert_eq!(receipt.gold_applied, -100);
        assert_eq!(receipt.bounty_claimed, 250);

        let after = store.read_character(record.id()).await.expect("read");
        assert_eq!(after.gold(), 900);
        assert_eq!(after.bounty(), 0);
        assert_eq!(after.version(), receipt.version);

        let log = store.attack_log_for(record.id(), None).await.expect("log");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].gold_stolen, 100);
        assert_eq!(log[0].result, AttackResult::AttackerWon);
    }

    #[tokio::test]
    async fn refused_settlement_leaves_record_and_log_untouched() {
        let store = store().await;
        let record = saved_character(&store, player_data("Mott", 10, 500)).await;

        let settlement = DefenderSettlement::new(log_entry(
            record.id(),
            AttackVenue::Dormitory,
            AttackResult::AttackerWon,
        ))
        .requiring(DefenderPrecondition::LiveSleeper)
        .with_gold_delta(-250)
        .killing_sleeper();

        let err = store.settle_attack(&settlement).await.expect_err("awake");
        assert!(matches!(
            err,
            RepoError::Refused {
                reason: SettlementRefusal::NotSleeping,
                ..
            }
        ));

        let after = store.read_character(record.id()).await.expect("read");
        assert_eq!(after.gold(), 500);
        assert_eq!(after.version(), record.version());
        assert!(store.recent_attacks(None, None).await.expect("log").is_empty());
    }

    #[tokio::test]
    async fn recent_attacks_without_limit_returns_whole_log() {
        let store = store().await;
        let record = saved_character(&store, player_data("Nell", 10, 0)).await;
        for _ in 0..3 {
            let settlement = DefenderSettlement::new(log_entry(
                record.id(),
                AttackVenue::Arena,
                AttackResult::DefenderWon,
            ));
            store.settle_attack(&settlement).await.expect("settle");
        }

        assert_eq!(store.recent_attacks(None, None).await.expect("all").len(), 3);
        assert_eq!(store.recent_attacks(None, Some(2)).await.expect("two").len(), 2);
        assert_eq!(store.recent_attacks(None, Some(usize::MAX)).await.expect("max").len(), 3);
    }

    #[tokio::test]
    async fn pinned_settlement_fails_on_newer_version() {
        let store = store().await;
        let record = saved_character(&store, player_data("Mott", 10, 500)).await;
        store.adjust_gold(record.id(), 1).await.expect("adjust");

        let settlement = DefenderSettlement::new(log_entry(
            record.id(),
            AttackVenue::Dormitory,
            AttackResult::AttackerWon,
        ))
        .with_gold_delta(-250)
        .stealing_item(skirmish_domain::ItemId::new(), record.version());

        let err = store.settle_attack(&settlement).await.expect_err("stale");
        assert!(err.is_stale());
        assert_eq!(store.read_character(record.id()).await.expect("read").gold(), 501);
        assert!(store.recent_attacks(None, Some(10)).await.expect("log").is_empty());
    }

    #[tokio::test]
    async fn sleep_registration_round_trips_guards() {
        let store = store().await;
        let record = saved_character(&store, player_data("Nyx", 10, 0)).await;
        let guards = vec![
            Guard::hire(GuardType::Rookie, 10),
            Guard::hire(GuardType::Veteran, 10).with_remaining_hp(40),
        ];
        let sleep = SleepState::new(SleepLocation::Inn, guards.clone(), true, Utc::now());

        store.register_sleeping(record.id(), &sleep).await.expect("register");
        let sleepers = store.list_sleepers().await.expect("sleepers");
        assert_eq!(sleepers.len(), 1);
        assert_eq!(sleepers[0].guard_count, 2);

        store.update_guards(record.id(), &guards[1..]).await.expect("guards");
        store.mark_dead(record.id()).await.expect("dead");

        let cleared = store.clear_sleeping(record.id()).await.expect("clear");
        let cleared = cleared.expect("was sleeping");
        assert!(cleared.is_dead);
        assert!(cleared.defense_boost);
        assert_eq!(cleared.guards, guards[1..].to_vec());
        assert!(store.list_sleepers().await.expect("sleepers").is_empty());
    }

    #[tokio::test]
    async fn legacy_guard_array_is_readable() {
        let guards = decode_guards(r#"[{"type":"veteran_npc","name":"Veteran Guard","hp":40,"maxHp":150}]"#)
            .expect("legacy");
        assert_eq!(guards.len(), 1);
        assert_eq!(guards[0].guard_type(), GuardType::Veteran);
        assert_eq!(guards[0].hp(), 40);
        assert!(decode_guards("[]").expect("empty").is_empty());
    }

    #[tokio::test]
    async fn counters_roll_over_and_remember_opponents() {
        let store = store().await;
        let attacker = PlayerId::new();
        let defender = PlayerId::new();

        store
            .record_attack(attacker, Some(defender), GameDay::new(10))
            .await
            .expect("record");
        let same_day = store
            .record_attack(attacker, None, GameDay::new(10))
            .await
            .expect("record");
        assert_eq!(same_day.attacks_today, 2);
        assert!(same_day.already_fought.contains(&defender));

        let next_day = store
            .load_counters(attacker, GameDay::new(11))
            .await
            .expect("load");
        assert_eq!(next_day.attacks_today, 0);
        assert!(next_day.already_fought.is_empty());

        let recorded = store
            .record_attack(attacker, None, GameDay::new(11))
            .await
            .expect("record");
        assert_eq!(recorded.attacks_today, 1);
        assert!(recorded.already_fought.is_empty());
    }

    #[tokio::test]
    async fn on_disk_database_survives_reconnect() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("saves").join("skirmish.db");
        let path = path.to_string_lossy().to_string();

        let id = {
            let store = SqliteStore::open(&path, Arc::new(SystemClock::new()))
                .await
                .expect("open");
            saved_character(&store, player_data("Oren", 8, 42)).await.id()
        };

        let reopened = SqliteStore::open(&path, Arc::new(SystemClock::new()))
            .await
            .expect("reopen");
        assert_eq!(reopened.read_character(id).await.expect("read").gold(), 42);
    }

    #[tokio::test]
    async fn news_and_mail_are_kept_in_order() {
        let store = store().await;
        let to = PlayerId::new();
        for n in 0..3 {
            store
                .save_news(&NewsItem {
                    message: format!("news {n}"),
                    category: crate::infrastructure::ports::NewsCategory::Pvp,
                    posted_at: Utc::now(),
                })
                .await
                .expect("news");
        }
        store
            .save_mail(&Mail {
                from: "Raider".into(),
                to,
                category: crate::infrastructure::ports::MailCategory::Pvp,
                subject: "[Arena]".into(),
                body: "You lost".into(),
                sent_at: Utc::now(),
            })
            .await
            .expect("mail");

        let news = store.recent_news(2).await.expect("news");
        assert_eq!(news.len(), 2);
        assert_eq!(news[0].message, "news 2");
        assert_eq!(store.mail_for(to).await.expect("mail").len(), 1);
        assert!(store.mail_for(PlayerId::new()).await.expect("mail").is_empty());
    }
}
