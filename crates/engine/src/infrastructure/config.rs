//! Engine configuration

use std::env;
use std::path::Path;

use anyhow::{Context, Result};

use super::settings::PvpSettings;

/// Where character saves live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process memory only. Saves vanish on exit.
    Memory,
    /// SQLite database shared by every session.
    Sqlite { url: String },
}

/// Where daily attack counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMode {
    /// In the save store, visible across sessions and reconnects.
    Shared,
    /// In this process only.
    Session,
}

impl std::str::FromStr for CounterMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" | "online" => Ok(CounterMode::Shared),
            "session" | "local" | "memory" => Ok(CounterMode::Session),
            other => anyhow::bail!("unknown counter mode '{other}' (expected shared|session)"),
        }
    }
}

/// Engine configuration loaded from environment
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub store: StoreBackend,
    pub counter_mode: CounterMode,
    /// Hour (UTC) at which a new game day starts
    pub day_reset_hour_utc: u32,
    /// Mixed into every headless combat seed
    pub combat_seed: u64,
    pub pvp: PvpSettings,
}

impl EngineConfig {
    /// Load configuration from environment variables (after `.env` files).
    pub fn from_env() -> Result<Self> {
        Self::load_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("SKIRMISH_DATABASE_URL")
            .unwrap_or_else(|| "sqlite:./data/skirmish.db?mode=rwc".to_string());
        let store = if database_url.trim().eq_ignore_ascii_case("memory") {
            StoreBackend::Memory
        } else {
            StoreBackend::Sqlite { url: database_url }
        };

        let counter_mode = lookup("SKIRMISH_COUNTER_MODE")
            .unwrap_or_else(|| "shared".to_string())
            .parse()?;

        let day_reset_hour_utc: u32 = lookup("SKIRMISH_DAY_RESET_HOUR_UTC")
            .unwrap_or_else(|| "0".to_string())
            .parse()
            .context("SKIRMISH_DAY_RESET_HOUR_UTC must be an hour 0-23")?;
        if day_reset_hour_utc > 23 {
            anyhow::bail!("SKIRMISH_DAY_RESET_HOUR_UTC must be an hour 0-23, got {day_reset_hour_utc}");
        }

        let combat_seed = lookup("SKIRMISH_COMBAT_SEED")
            .unwrap_or_else(|| "0".to_string())
            .parse()
            .context("SKIRMISH_COMBAT_SEED must be an unsigned integer")?;

        let mut pvp = match lookup("SKIRMISH_PVP_SETTINGS") {
            Some(json) => serde_json::from_str::<PvpSettings>(&json)
                .context("SKIRMISH_PVP_SETTINGS must be a PvP settings JSON document")?,
            None => PvpSettings::default(),
        };

        if let Some(v) = lookup("SKIRMISH_MAX_ATTACKS_PER_DAY") {
            pvp.max_attacks_per_day = v
                .parse()
                .context("SKIRMISH_MAX_ATTACKS_PER_DAY must be a number")?;
        }
        if let Some(v) = lookup("SKIRMISH_ARENA_LEVEL_RANGE") {
            pvp.arena_level_range = v
                .parse()
                .context("SKIRMISH_ARENA_LEVEL_RANGE must be a number")?;
        }
        if let Some(v) = lookup("SKIRMISH_MAX_GUARDS") {
            pvp.max_guards = v.parse().context("SKIRMISH_MAX_GUARDS must be a number")?;
        }

        Ok(Self {
            store,
            counter_mode,
            day_reset_hour_utc,
            combat_seed,
            pvp,
        })
    }

    /// Load `.env.local` then `.env` from the repository root, if present.
    ///
    /// Variables already set in the process environment win.
    pub fn load_dotenv() {
        let repo_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");

        // Prefer local overrides.
        for filename in [".env.local", ".env"] {
            let path = repo_root.join(filename);
            if path.exists() {
                let _ = dotenvy::from_path(path);
            }
        }
    }
}
