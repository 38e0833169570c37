//! Per-attacker daily attack limits.
//!
//! Counters live behind [`CounterStore`]: in the shared save store when online,
//! in process memory for single-session play. Day roll-over is decided by the
//! store against the injected day clock, never here.

use std::sync::Arc;

use skirmish_domain::{DailyCounters, GameDay, PlayerId};

use super::error::{EligibilityError, PvpError};
use crate::infrastructure::ports::{CounterStore, DayClockPort, RepoError};

pub struct RateLimiter {
    counters: Arc<dyn CounterStore>,
    day_clock: Arc<dyn DayClockPort>,
    max_attacks_per_day: u32,
}

impl RateLimiter {
    pub fn new(
        counters: Arc<dyn CounterStore>,
        day_clock: Arc<dyn DayClockPort>,
        max_attacks_per_day: u32,
    ) -> Self {
        Self {
            counters,
            day_clock,
            max_attacks_per_day,
        }
    }

    pub fn today(&self) -> GameDay {
        self.day_clock.current_day()
    }

    /// Today's counters for `attacker`.
    pub async fn counters(&self, attacker: PlayerId) -> Result<DailyCounters, RepoError> {
        self.counters.load_counters(attacker, self.today()).await
    }

    pub fn attacks_remaining(&self, counters: &DailyCounters) -> u32 {
        self.max_attacks_per_day
            .saturating_sub(counters.attacks_on(self.today()))
    }

    pub async fn can_attack(
        &self,
        attacker: PlayerId,
        defender: Option<PlayerId>,
    ) -> Result<bool, RepoError> {
        let counters = self.counters(attacker).await?;
        Ok(self.refusal(&counters, defender).is_none())
    }

    /// Like [`Self::can_attack`], but says why not.
    pub async fn check(&self, attacker: PlayerId, defender: Option<PlayerId>) -> Result<(), PvpError> {
        let counters = self.counters(attacker).await?;
        match self.refusal(&counters, defender) {
            Some(reason) => {
                tracing::debug!(attacker_id = %attacker, reason = %reason, "Attack refused by rate limiter");
                Err(reason.into())
            }
            None => Ok(()),
        }
    }

    /// Count one settled attempt against today.
    pub async fn record_attack(
        &self,
        attacker: PlayerId,
        defender: Option<PlayerId>,
    ) -> Result<DailyCounters, RepoError> {
        self.counters
            .record_attack(attacker, defender, self.today())
            .await
    }

    fn refusal(&self, counters: &DailyCounters, defender: Option<PlayerId>) -> Option<EligibilityError> {
        let today = self.today();
        if counters.attacks_on(today) >= self.max_attacks_per_day {
            return Some(EligibilityError::DailyCapReached {
                limit: self.max_attacks_per_day,
            });
        }
        match defender {
            Some(d) if counters.has_fought(today, d) => {
                Some(EligibilityError::AlreadyFought { defender: d })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedDay;
    use crate::infrastructure::persistence::InMemoryCounterStore;
    use crate::infrastructure::ports::MockCounterStore;
    use mockall::predicate::eq;

    fn limiter(day: Arc<FixedDay>, cap: u32) -> RateLimiter {
        RateLimiter::new(Arc::new(InMemoryCounterStore::new()), day, cap)
    }

    #[tokio::test]
    async fn rejects_repeat_opponent_independently_of_menus() {
        let rl = limiter(Arc::new(FixedDay::new(10)), 5);
        let attacker = PlayerId::new();
        let defender = PlayerId::new();

        assert!(rl.can_attack(attacker, Some(defender)).await.expect("check"));
        rl.record_attack(attacker, Some(defender)).await.expect("record");

        assert!(!rl.can_attack(attacker, Some(defender)).await.expect("check"));
        assert!(rl.can_attack(attacker, Some(PlayerId::new())).await.expect("check"));
        assert!(matches!(
            rl.check(attacker, Some(defender)).await,
            Err(PvpError::Eligibility(EligibilityError::AlreadyFought { .. }))
        ));
    }

    #[tokio::test]
    async fn daily_cap_resets_next_day() {
        let day = Arc::new(FixedDay::new(1));
        let rl = limiter(day.clone(), 2);
        let attacker = PlayerId::new();

        rl.record_attack(attacker, None).await.expect("record");
        rl.record_attack(attacker, None).await.expect("record");
        assert!(matches!(
            rl.check(attacker, None).await,
            Err(PvpError::Eligibility(EligibilityError::DailyCapReached { limit: 2 }))
        ));

        day.advance();
        let counters = rl.counters(attacker).await.expect("counters");
        assert_eq!(counters.attacks_today, 0);
        assert_eq!(rl.attacks_remaining(&counters), 2);
        rl.check(attacker, None).await.expect("allowed again");
    }

    #[tokio::test]
    async fn records_against_current_day() {
        let attacker = PlayerId::new();
        let mut store = MockCounterStore::new();
        store
            .expect_record_attack()
            .with(eq(attacker), eq(None), eq(GameDay::new(42)))
            .times(1)
            .returning(|_, _, day| {
                let mut c = DailyCounters::for_day(day);
                c.attacks_today = 1;
                Ok(c)
            });

        let rl = RateLimiter::new(Arc::new(store), Arc::new(FixedDay::new(42)), 5);
        let counters = rl.record_attack(attacker, None).await.expect("record");
        assert_eq!(counters.attacks_today, 1);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_fault() {
        let mut store = MockCounterStore::new();
        store
            .expect_load_counters()
            .returning(|_, _| Err(RepoError::database("load_counters", "locked")));
        let rl = RateLimiter::new(Arc::new(store), Arc::new(FixedDay::new(1)), 5);

        let err = rl.check(PlayerId::new(), None).await.expect_err("fails");
        assert!(err.is_fault());
    }
}
