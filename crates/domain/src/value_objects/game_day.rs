//! GameDay - the persisted day marker that drives daily counter resets

use serde::{Deserialize, Serialize};

/// Ordinal of the current game day.
///
/// Days only move forward in normal operation; comparisons are what decide
/// whether a stored counter belongs to today or to an earlier day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameDay(i64);

impl GameDay {
    pub const fn new(day: i64) -> Self {
        Self(day)
    }

    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// True when `self` is a later day than `marker`.
    #[inline]
    pub fn is_after(self, marker: GameDay) -> bool {
        self.0 > marker.0
    }
}

impl std::fmt::Display for GameDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "day {}", self.0)
    }
}

impl From<i64> for GameDay {
    fn from(value: i64) -> Self {
        Self(value)
    }
}
