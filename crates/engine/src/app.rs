//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    clock::{GameDayClock, SystemClock, SystemRandom},
    config::{CounterMode, EngineConfig, StoreBackend},
    directory::PlayerDirectory,
    headless_combat::HeadlessCombatOracle,
    live::LiveConnections,
    notifier::Notifier,
    persistence::{InMemoryCounterStore, InMemoryStore, SqliteStore},
    ports::{CharacterStore, ClockPort, CounterStore, MessageStore, RepoError},
};
use crate::use_cases::pvp::PvpUseCases;

/// Main application state.
///
/// Session layers hold one `App` and call into `pvp` for every attack,
/// rest and bounty request. `live` is where sessions register their push
/// channels.
pub struct App {
    pub pvp: PvpUseCases,
    pub live: Arc<LiveConnections>,
    pub stores: Stores,
}

/// The store handles the use cases were wired with.
pub struct Stores {
    pub characters: Arc<dyn CharacterStore>,
    pub counters: Arc<dyn CounterStore>,
    pub messages: Arc<dyn MessageStore>,
}

impl App {
    /// Connect the configured store and wire every use case over it.
    pub async fn from_config(config: EngineConfig) -> Result<Self, RepoError> {
        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
        let stores = Self::open_stores(&config, clock.clone()).await?;

        let live = Arc::new(LiveConnections::new());
        let notifier = Arc::new(Notifier::new(
            stores.messages.clone(),
            live.clone(),
            clock.clone(),
        ));
        let directory = Arc::new(PlayerDirectory::new(
            stores.characters.clone(),
            live.clone(),
        ));
        let day_clock = Arc::new(GameDayClock::new(clock.clone(), config.day_reset_hour_utc));

        let pvp = PvpUseCases::new(
            stores.characters.clone(),
            stores.counters.clone(),
            directory,
            Arc::new(HeadlessCombatOracle::new(config.combat_seed)),
            notifier,
            clock,
            Arc::new(SystemRandom::new()),
            day_clock,
            config.pvp,
        );

        tracing::info!(
            counter_mode = ?config.counter_mode,
            day_reset_hour_utc = config.day_reset_hour_utc,
            "Skirmish engine ready"
        );
        Ok(Self { pvp, live, stores })
    }

    async fn open_stores(
        config: &EngineConfig,
        clock: Arc<dyn ClockPort>,
    ) -> Result<Stores, RepoError> {
        let (characters, shared_counters, messages): (
            Arc<dyn CharacterStore>,
            Arc<dyn CounterStore>,
            Arc<dyn MessageStore>,
        ) = match &config.store {
            StoreBackend::Sqlite { url } => {
                tracing::info!(url = %url, "Opening SQLite save store");
                let store = Arc::new(SqliteStore::connect(url, clock).await?);
                (store.clone(), store.clone(), store)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory save store; saves are lost on exit");
                let store = Arc::new(InMemoryStore::new());
                (store.clone(), store.clone(), store)
            }
        };

        let counters: Arc<dyn CounterStore> = match config.counter_mode {
            CounterMode::Shared => shared_counters,
            CounterMode::Session => Arc::new(InMemoryCounterStore::new()),
        };

        Ok(Stores {
            characters,
            counters,
            messages,
        })
    }
}
