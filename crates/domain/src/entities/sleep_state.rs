//! Where and how a logged-out character is sleeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::guard::Guard;
use crate::error::DomainError;

/// Sleeping location tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepLocation {
    /// Cheap shared bunks. No guards, easy pickings.
    Dormitory,
    /// Private room. Guards may be hired and the sleeper fights back harder.
    Inn,
}

impl SleepLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SleepLocation::Dormitory => "dormitory",
            SleepLocation::Inn => "inn",
        }
    }
}

impl std::fmt::Display for SleepLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SleepLocation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dormitory" => Ok(SleepLocation::Dormitory),
            "inn" => Ok(SleepLocation::Inn),
            other => Err(DomainError::parse(format!("unknown sleep location '{other}'"))),
        }
    }
}

/// Persisted sleep registration of an offline character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepState {
    pub location: SleepLocation,
    pub guards: Vec<Guard>,
    pub is_dead: bool,
    pub defense_boost: bool,
    pub since: DateTime<Utc>,
}

impl SleepState {
    pub fn new(
        location: SleepLocation,
        guards: Vec<Guard>,
        defense_boost: bool,
        since: DateTime<Utc>,
    ) -> Self {
        Self {
            location,
            guards,
            is_dead: false,
            defense_boost,
            since,
        }
    }

    /// Unguarded dormitory bunk, used when a session drops without logging out.
    pub fn dormitory(since: DateTime<Utc>) -> Self {
        Self::new(SleepLocation::Dormitory, Vec::new(), false, since)
    }

    pub fn has_guards(&self) -> bool {
        !self.guards.is_empty()
    }
}
