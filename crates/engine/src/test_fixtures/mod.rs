//! Shared builders for engine tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{player_data, saved_character};
//!
//! #[tokio::test]
//! async fn test_defender_exists() {
//!     let store = InMemoryStore::new();
//!     let record = saved_character(&store, player_data("Ayla", 10, 500)).await;
//!     // ... test logic
//! }
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use skirmish_domain::{
    AttackLogEntry, AttackLogId, AttackResult, AttackVenue, AttackerKind, CombatCharacter,
    CombatOutcome, CombatResult, GameDay, PersistedCharacter, PlayerData, PlayerId,
};

use crate::infrastructure::clock::{FixedClock, FixedDay, FixedRandom};
use crate::infrastructure::directory::PlayerDirectory;
use crate::infrastructure::live::LiveConnections;
use crate::infrastructure::notifier::Notifier;
use crate::infrastructure::persistence::InMemoryStore;
use crate::infrastructure::ports::{CharacterStore, CombatOracle, OracleError};
use crate::infrastructure::settings::PvpSettings;
use crate::use_cases::pvp::PvpUseCases;

// =============================================================================
// Saves
// =============================================================================

/// A level-scaled character with no equipment, full HP and no affiliations.
pub fn player_data(name: &str, level: u32, gold: i64) -> PlayerData {
    let level_i = i64::from(level);
    PlayerData {
        display_name: name.to_string(),
        level,
        class_id: 1,
        hp: 50 + level_i * 10,
        max_hp: 50 + level_i * 10,
        strength: 10 + level_i * 2,
        defence: 5 + level_i,
        agility: 10 + level_i,
        dexterity: 10 + level_i,
        weapon_power: 5,
        armor_power: 5,
        gold,
        bank_gold: 0,
        experience: 1_000 * level_i,
        poison: 0,
        team: None,
        spouse: None,
        safe_house_resting: false,
        equipment: Vec::new(),
        equipped: BTreeMap::new(),
    }
}

/// Create the save and read it back so the caller holds the stored version.
pub async fn saved_character(store: &dyn CharacterStore, player: PlayerData) -> PersistedCharacter {
    let record = PersistedCharacter::new(PlayerId::new(), player, GameDay::new(1));
    store.write_character(&record).await.expect("create save");
    store.read_character(record.id()).await.expect("read save")
}

pub fn log_entry(defender: PlayerId, venue: AttackVenue, result: AttackResult) -> AttackLogEntry {
    AttackLogEntry {
        id: AttackLogId::new(),
        attacker_id: Some(PlayerId::new()),
        attacker_name: "Raider".into(),
        attacker_kind: AttackerKind::Player,
        defender_id: defender,
        defender_name: "Defender".into(),
        venue,
        result,
        gold_stolen: 0,
        item_stolen: None,
        xp_lost: 0,
        attacker_level: 10,
        defender_level: 10,
        timestamp: Utc::now(),
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 21, 0, 0)
        .single()
        .expect("valid timestamp")
}

// =============================================================================
// Combat
// =============================================================================

pub fn attacker_combatant(name: &str, hp: i64) -> CombatCharacter {
    let mut c = player_data(name, 20, 0).combatant(hp);
    c.max_hp = c.max_hp.max(hp);
    c.hp = hp;
    c
}

pub fn victory(attacker_hp: i64, experience: i64) -> CombatResult {
    CombatResult {
        outcome: CombatOutcome::Victory,
        rounds: 3,
        experience_gained: experience,
        final_attacker_hp: attacker_hp,
        final_defender_hp: 0,
        should_return_to_sanctuary: false,
    }
}

pub fn defeat(defender_hp: i64) -> CombatResult {
    CombatResult {
        outcome: CombatOutcome::Defeated,
        rounds: 4,
        experience_gained: 0,
        final_attacker_hp: 0,
        final_defender_hp: defender_hp,
        should_return_to_sanctuary: true,
    }
}

pub fn escape(attacker_hp: i64, defender_hp: i64) -> CombatResult {
    CombatResult {
        outcome: CombatOutcome::Escaped,
        rounds: 2,
        experience_gained: 0,
        final_attacker_hp: attacker_hp,
        final_defender_hp: defender_hp,
        should_return_to_sanctuary: false,
    }
}

/// Oracle that replays a fixed list of results and records who it was asked about.
pub struct ScriptedOracle {
    results: Mutex<VecDeque<CombatResult>>,
    bouts: Mutex<Vec<(String, i64)>>,
}

impl ScriptedOracle {
    pub fn new(results: Vec<CombatResult>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            bouts: Mutex::new(Vec::new()),
        }
    }

    pub fn defenders_fought(&self) -> Vec<String> {
        self.bouts
            .lock()
            .expect("bouts lock")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn attacker_hp_per_bout(&self) -> Vec<i64> {
        self.bouts
            .lock()
            .expect("bouts lock")
            .iter()
            .map(|(_, hp)| *hp)
            .collect()
    }
}

#[async_trait]
impl CombatOracle for ScriptedOracle {
    async fn resolve_combat(
        &self,
        attacker: &CombatCharacter,
        defender: &CombatCharacter,
    ) -> Result<CombatResult, OracleError> {
        self.bouts
            .lock()
            .expect("bouts lock")
            .push((defender.name.clone(), attacker.hp));
        self.results
            .lock()
            .expect("results lock")
            .pop_front()
            .ok_or_else(|| OracleError::ResolutionFailed("script exhausted".into()))
    }
}

// =============================================================================
// Use-case harness
// =============================================================================

/// Use cases wired over in-memory adapters with a scripted oracle.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub oracle: Arc<ScriptedOracle>,
    pub live: Arc<LiveConnections>,
    pub day: Arc<FixedDay>,
    pub pvp: PvpUseCases,
}

impl Harness {
    pub fn new(results: Vec<CombatResult>) -> Self {
        Self::with_settings(results, PvpSettings::default())
    }

    pub fn with_settings(results: Vec<CombatResult>, settings: PvpSettings) -> Self {
        crate::infrastructure::telemetry::init_for_tests();

        let store = Arc::new(InMemoryStore::new());
        let oracle = Arc::new(ScriptedOracle::new(results));
        let live = Arc::new(LiveConnections::new());
        let day = Arc::new(FixedDay::new(1));
        let clock = Arc::new(FixedClock(fixed_now()));
        let notifier = Arc::new(Notifier::new(store.clone(), live.clone(), clock.clone()));

        let directory = Arc::new(PlayerDirectory::new(store.clone(), live.clone()));

        let pvp = PvpUseCases::new(
            store.clone(),
            store.clone(),
            directory,
            oracle.clone(),
            notifier,
            clock,
            Arc::new(FixedRandom(0)),
            day.clone(),
            settings,
        );

        Self {
            store,
            oracle,
            live,
            day,
            pvp,
        }
    }

    pub async fn save(&self, player: PlayerData) -> PersistedCharacter {
        saved_character(self.store.as_ref(), player).await
    }

    pub async fn reload(&self, id: PlayerId) -> PersistedCharacter {
        self.store.read_character(id).await.expect("reload save")
    }
}
