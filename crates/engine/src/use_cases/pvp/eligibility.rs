//! Target eligibility.
//!
//! Pure filters over directory data. The same rules are re-checked against a
//! fresh read when a target is actually attacked, so a stale menu can never
//! let a forbidden fight through.

use std::cmp::Reverse;

use skirmish_domain::{DailyCounters, GameDay, PlayerData, PlayerId, PlayerSummary, SleeperSummary};

use super::error::EligibilityError;

/// Level and rate rules for one kind of fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityRules {
    pub min_level: u32,
    pub max_level_delta: u32,
    pub max_attacks_per_day: u32,
}

/// Whoever is picking a fight: a player session or a world NPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenger {
    pub id: Option<PlayerId>,
    pub level: u32,
    pub team: Option<String>,
    pub spouse: Option<PlayerId>,
}

impl Challenger {
    pub fn player(id: PlayerId, data: &PlayerData) -> Self {
        Self {
            id: Some(id),
            level: data.level,
            team: data.team.clone(),
            spouse: data.spouse,
        }
    }

    pub fn npc(level: u32, team: Option<String>, spouse: Option<PlayerId>) -> Self {
        Self {
            id: None,
            level,
            team,
            spouse,
        }
    }

    fn is_self(&self, target: PlayerId) -> bool {
        self.id == Some(target)
    }

    /// Same team, or married to each other in either direction.
    pub fn is_allied_with(
        &self,
        target: PlayerId,
        target_team: Option<&str>,
        target_spouse: Option<PlayerId>,
    ) -> bool {
        let same_team = matches!((self.team.as_deref(), target_team), (Some(a), Some(b)) if a.eq_ignore_ascii_case(b));
        let married = self.spouse == Some(target) || (self.id.is_some() && target_spouse == self.id);
        same_team || married
    }
}

fn level_delta(a: u32, b: u32) -> u32 {
    a.abs_diff(b)
}

/// Check the level window between challenger and target.
pub fn check_levels(
    challenger_level: u32,
    target_level: u32,
    rules: &EligibilityRules,
) -> Result<(), EligibilityError> {
    if target_level < rules.min_level {
        return Err(EligibilityError::TargetBelowMinimum {
            level: target_level,
            min_level: rules.min_level,
        });
    }
    let delta = level_delta(challenger_level, target_level);
    if delta > rules.max_level_delta {
        return Err(EligibilityError::OutOfRange {
            delta,
            max_delta: rules.max_level_delta,
        });
    }
    Ok(())
}

/// Arena opponents, strongest first.
///
/// Arena fights ignore team and marriage ties.
pub fn find_eligible(
    challenger: &Challenger,
    directory: &[PlayerSummary],
    counters: &DailyCounters,
    today: GameDay,
    rules: &EligibilityRules,
) -> Vec<PlayerSummary> {
    let mut eligible: Vec<PlayerSummary> = directory
        .iter()
        .filter(|p| !challenger.is_self(p.id))
        .filter(|p| !p.is_hidden)
        .filter(|p| check_levels(challenger.level, p.level, rules).is_ok())
        .filter(|p| !counters.has_fought(today, p.id))
        .cloned()
        .collect();

    eligible.sort_by(|a, b| {
        Reverse(a.level)
            .cmp(&Reverse(b.level))
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.id.cmp(&b.id))
    });

    tracing::debug!(
        candidates = directory.len(),
        eligible = eligible.len(),
        "Arena eligibility computed"
    );
    eligible
}

/// Sleep-attack targets, closest level first.
///
/// Dead sleepers, hidden characters and allies are never offered. Sleepers have
/// no level floor here; that is a per-attacker policy applied by the caller.
pub fn find_sleep_targets(
    challenger: &Challenger,
    sleepers: &[SleeperSummary],
    counters: &DailyCounters,
    today: GameDay,
    rules: &EligibilityRules,
) -> Vec<SleeperSummary> {
    let mut eligible: Vec<SleeperSummary> = sleepers
        .iter()
        .filter(|s| !challenger.is_self(s.id))
        .filter(|s| !s.is_dead && !s.is_hidden)
        .filter(|s| s.level >= rules.min_level)
        .filter(|s| level_delta(challenger.level, s.level) <= rules.max_level_delta)
        .filter(|s| !challenger.is_allied_with(s.id, s.team.as_deref(), s.spouse))
        .filter(|s| !counters.has_fought(today, s.id))
        .cloned()
        .collect();

    eligible.sort_by(|a, b| {
        level_delta(challenger.level, a.level)
            .cmp(&level_delta(challenger.level, b.level))
            .then_with(|| Reverse(a.level).cmp(&Reverse(b.level)))
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.id.cmp(&b.id))
    });

    tracing::debug!(
        candidates = sleepers.len(),
        eligible = eligible.len(),
        "Sleep-attack eligibility computed"
    );
    eligible
}
