//! Clock, random and game-day implementations.

use std::sync::Arc;

use crate::infrastructure::ports::{ClockPort, DayClockPort, RandomPort};
use chrono::{DateTime, Duration, Utc};
use skirmish_domain::GameDay;

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        use rand::Rng;
        rand::thread_rng().gen_range(min..=max)
    }
}

/// Game day derived from wall-clock time.
///
/// A new day starts at `reset_hour_utc` every day; the marker is the number of
/// whole days since the Unix epoch, shifted by that hour.
pub struct GameDayClock {
    clock: Arc<dyn ClockPort>,
    reset_hour_utc: u32,
}

impl GameDayClock {
    pub fn new(clock: Arc<dyn ClockPort>, reset_hour_utc: u32) -> Self {
        Self {
            clock,
            reset_hour_utc: reset_hour_utc % 24,
        }
    }
}

impl DayClockPort for GameDayClock {
    fn current_day(&self) -> GameDay {
        let shifted = self.clock.now() - Duration::hours(i64::from(self.reset_hour_utc));
        GameDay::new(shifted.timestamp().div_euclid(86_400))
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Fixed random for testing.
#[cfg(test)]
pub struct FixedRandom(pub i32);

#[cfg(test)]
impl RandomPort for FixedRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        self.0.clamp(min, max)
    }
}

/// Settable game day for testing.
#[cfg(test)]
pub struct FixedDay(pub std::sync::atomic::AtomicI64);

#[cfg(test)]
impl FixedDay {
    pub fn new(day: i64) -> Self {
        Self(std::sync::atomic::AtomicI64::new(day))
    }

    pub fn advance(&self) {
        self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl DayClockPort for FixedDay {
    fn current_day(&self) -> GameDay {
        GameDay::new(self.0.load(std::sync::atomic::Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_turns_over_at_reset_hour() {
        let before = Utc.with_ymd_and_hms(2024, 3, 10, 5, 59, 59).single().expect("time");
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).single().expect("time");

        let day_before = GameDayClock::new(Arc::new(FixedClock(before)), 6).current_day();
        let day_after = GameDayClock::new(Arc::new(FixedClock(after)), 6).current_day();

        assert_eq!(day_after, day_before.next());
    }

    #[test]
    fn midnight_reset_counts_days_since_epoch() {
        let t = Utc.with_ymd_and_hms(1970, 1, 3, 12, 0, 0).single().expect("time");
        assert_eq!(GameDayClock::new(Arc::new(FixedClock(t)), 0).current_day(), GameDay::new(2));
    }
}
