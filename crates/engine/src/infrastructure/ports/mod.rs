//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - The shared save store (could swap SQLite -> Postgres)
//! - Daily counters (shared store or process memory)
//! - Combat resolution (headless resolver or a full combat engine)
//! - Directory and notifications (owned by the session layer)
//! - Clock/Random/Day (for testing)

mod error;
mod external;
mod repos;
mod testing;
mod types;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{CharacterStore, CounterStore, MessageStore};

pub use error::{NotifyError, OracleError, RepoError};

pub use types::{
    DefenderPrecondition, DefenderSettlement, Mail, MailCategory, NewsCategory, NewsItem,
    SettlementReceipt, SettlementRefusal,
};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{CombatOracle, DirectoryPort, NotificationSink};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{MockCharacterStore, MockCounterStore, MockMessageStore};

#[cfg(test)]
pub use external::{MockCombatOracle, MockDirectoryPort, MockNotificationSink};

#[cfg(test)]
pub use testing::{MockClockPort, MockDayClockPort};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, DayClockPort, RandomPort};
