//! Per-character daily counters
//!
//! Counters carry the day they were recorded on. Every read and write goes
//! through [`DailyCounters::roll_over`], so there is exactly one place that
//! decides whether a stored counter is stale.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;
use crate::value_objects::GameDay;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCounters {
    pub day: GameDay,
    pub attacks_today: u32,
    pub arm_wrestles_today: u32,
    pub already_fought: BTreeSet<PlayerId>,
}

impl DailyCounters {
    /// Empty counters for `day`.
    pub fn for_day(day: GameDay) -> Self {
        Self {
            day,
            ..Self::default()
        }
    }

    /// Reset to `today` if the stored day marker is older. Returns `true` on reset.
    ///
    /// A marker from a *later* day than `today` (clock moved backwards) is kept as-is.
    pub fn roll_over(&mut self, today: GameDay) -> bool {
        if today.is_after(self.day) {
            *self = Self::for_day(today);
            true
        } else {
            false
        }
    }

    /// View of these counters as seen on `today`.
    pub fn as_of(&self, today: GameDay) -> Self {
        let mut view = self.clone();
        view.roll_over(today);
        view
    }

    /// Count one attack on `today`, remembering the defender if it was a player.
    pub fn record_attack(&mut self, today: GameDay, defender: Option<PlayerId>) {
        self.roll_over(today);
        self.attacks_today = self.attacks_today.saturating_add(1);
        if let Some(defender) = defender {
            self.already_fought.insert(defender);
        }
    }

    pub fn attacks_on(&self, today: GameDay) -> u32 {
        if today.is_after(self.day) {
            0
        } else {
            self.attacks_today
        }
    }

    pub fn has_fought(&self, today: GameDay, defender: PlayerId) -> bool {
        !today.is_after(self.day) && self.already_fought.contains(&defender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_recorded_yesterday_reads_zero_today() {
        let day = GameDay::new(7);
        let defender = PlayerId::new();

        let mut counters = DailyCounters::for_day(day);
        counters.record_attack(day, Some(defender));
        counters.record_attack(day, None);
        assert_eq!(counters.attacks_on(day), 2);
        assert!(counters.has_fought(day, defender));

        let tomorrow = day.next();
        assert_eq!(counters.attacks_on(tomorrow), 0);
        assert!(!counters.has_fought(tomorrow, defender));

        counters.record_attack(tomorrow, None);
        assert_eq!(counters.day, tomorrow);
        assert_eq!(counters.attacks_today, 1);
        assert!(counters.already_fought.is_empty());
    }

    #[test]
    fn roll_over_resets_every_counter() {
        let mut counters = DailyCounters {
            day: GameDay::new(1),
            attacks_today: 4,
            arm_wrestles_today: 2,
            already_fought: [PlayerId::new()].into_iter().collect(),
        };
        assert!(counters.roll_over(GameDay::new(3)));
        assert_eq!(counters, DailyCounters::for_day(GameDay::new(3)));
        assert!(!counters.roll_over(GameDay::new(3)));
    }

    #[test]
    fn earlier_day_does_not_reset() {
        let mut counters = DailyCounters::for_day(GameDay::new(5));
        counters.record_attack(GameDay::new(5), None);
        assert!(!counters.roll_over(GameDay::new(4)));
        assert_eq!(counters.attacks_today, 1);
    }

    #[test]
    fn as_of_leaves_original_untouched() {
        let mut counters = DailyCounters::for_day(GameDay::new(1));
        counters.record_attack(GameDay::new(1), None);
        let view = counters.as_of(GameDay::new(2));
        assert_eq!(view.attacks_today, 0);
        assert_eq!(counters.attacks_today, 1);
    }
}
