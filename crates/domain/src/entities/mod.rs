//! Entities - records with identity or a lifecycle inside a save

mod attack_log;
mod daily_counters;
mod directory;
mod equipment;
mod guard;
mod sleep_state;

pub use attack_log::{AttackLogEntry, AttackResult, AttackVenue, AttackerKind};
pub use daily_counters::DailyCounters;
pub use directory::{PlayerSummary, SleeperSummary};
pub use equipment::EquipmentItem;
pub use guard::{
    guard_hire_cost, Guard, GuardDocument, GuardMultipliers, GuardType, StoredGuards,
    GUARD_SCHEMA_VERSION,
};
pub use sleep_state::{SleepLocation, SleepState};
