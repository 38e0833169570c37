//! Testability ports for injecting time, randomness and the game day.

use chrono::{DateTime, Utc};
use skirmish_domain::GameDay;

// =============================================================================
// Testability Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait RandomPort: Send + Sync {
    /// Inclusive on both ends.
    fn gen_range(&self, min: i32, max: i32) -> i32;
}

/// Source of the persisted day marker. Every daily reset is decided against this.
#[cfg_attr(test, mockall::automock)]
pub trait DayClockPort: Send + Sync {
    fn current_day(&self) -> GameDay;
}
