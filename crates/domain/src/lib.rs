//! Skirmish Domain - pure PvP domain types and rules
//!
//! Save records, guards, daily counters, attack logs and combat projections.
//! This crate has no I/O and no async; adapters and use cases live in the
//! engine crate.

pub mod aggregates;
pub mod combat;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use aggregates::{DeathPenalty, GoldPayment, PersistedCharacter, PlayerData};
pub use combat::{CombatCharacter, CombatOutcome, CombatResult};
pub use entities::{
    guard_hire_cost, AttackLogEntry, AttackResult, AttackVenue, AttackerKind, DailyCounters,
    EquipmentItem, Guard, GuardDocument, GuardMultipliers, GuardType, PlayerSummary,
    SleepLocation, SleepState, SleeperSummary, StoredGuards, GUARD_SCHEMA_VERSION,
};
pub use error::DomainError;
pub use ids::{AttackLogId, ItemId, PlayerId};
pub use value_objects::{GameDay, Percent};
