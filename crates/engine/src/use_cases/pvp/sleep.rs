//! Going to sleep, dropping off without logging out, and waking up.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use skirmish_domain::{
    guard_hire_cost, AttackLogEntry, GoldPayment, Guard, GuardType, PersistedCharacter, PlayerId,
    SleepLocation, SleepState,
};

use super::error::PvpError;
use crate::infrastructure::ports::{CharacterStore, ClockPort, RepoError};
use crate::infrastructure::settings::PvpSettings;

/// Where to spend the night.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lodging {
    /// Cheap shared bunk. No guards, no boost.
    Dormitory,
    /// Private room with the defence boost and optional hired guards, fought in this order.
    Inn { guards: Vec<GuardType> },
}

impl Lodging {
    pub fn location(&self) -> SleepLocation {
        match self {
            Lodging::Dormitory => SleepLocation::Dormitory,
            Lodging::Inn { .. } => SleepLocation::Inn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepReceipt {
    pub location: SleepLocation,
    pub cost: i64,
    pub payment: GoldPayment,
    pub guards: Vec<Guard>,
}

/// What happened while the character slept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeReport {
    pub location: SleepLocation,
    pub slept_since: DateTime<Utc>,
    /// Oldest first.
    pub attacks: Vec<AttackLogEntry>,
    pub was_killed: bool,
    pub guards_left: Vec<Guard>,
}

pub struct Rest {
    store: Arc<dyn CharacterStore>,
    clock: Arc<dyn ClockPort>,
    settings: PvpSettings,
}

impl Rest {
    pub fn new(store: Arc<dyn CharacterStore>, clock: Arc<dyn ClockPort>, settings: PvpSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    /// Total price of a night at `lodging` for a character of `level`.
    pub fn quote(&self, lodging: &Lodging, level: u32) -> Result<i64, PvpError> {
        match lodging {
            Lodging::Dormitory => Ok(self.settings.dormitory_cost),
            Lodging::Inn { guards } => {
                if guards.len() > self.settings.max_guards {
                    return Err(PvpError::InvalidRequest(format!(
                        "You can hire at most {} guards.",
                        self.settings.max_guards
                    )));
                }
                if guards.contains(&GuardType::Unknown) {
                    return Err(PvpError::InvalidRequest(
                        "No such guard for hire.".to_string(),
                    ));
                }
                let hire: i64 = guards
                    .iter()
                    .enumerate()
                    .map(|(i, t)| guard_hire_cost(*t, i, self.settings.extra_guard_surcharge))
                    .sum();
                Ok(self.settings.inn_cost(level) + hire)
            }
        }
    }

    /// Pay for the night, restore HP and register as a sleeper.
    ///
    /// Fails with `InsufficientFunds` before anything is written.
    pub async fn go_to_sleep(
        &self,
        player_id: PlayerId,
        lodging: Lodging,
    ) -> Result<SleepReceipt, PvpError> {
        let mut attempt = 0;
        loop {
            let mut record = self.store.read_character(player_id).await?;
            let receipt = self.check_in(&mut record, &lodging)?;

            match self.store.write_character(&record).await {
                Ok(_) => {
                    tracing::info!(
                        player_id = %player_id,
                        location = receipt.location.as_str(),
                        cost = receipt.cost,
                        guards = receipt.guards.len(),
                        "Player went to sleep"
                    );
                    return Ok(receipt);
                }
                Err(e) if e.is_stale() && attempt < self.settings.stale_write_retries => {
                    attempt += 1;
                    tracing::warn!(player_id = %player_id, attempt, "Save changed while checking in, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Register a player whose session dropped without going to sleep as an
    /// unguarded dormitory sleeper. Returns whether a registration was made.
    pub async fn ensure_sleeping(&self, player_id: PlayerId) -> Result<bool, PvpError> {
        let record = self.store.read_character(player_id).await?;
        if record.is_sleeping() || record.is_hidden() {
            return Ok(false);
        }
        self.store
            .register_sleeping(player_id, &SleepState::dormitory(self.clock.now()))
            .await?;
        tracing::info!(player_id = %player_id, "Disconnected player left sleeping in the dormitory");
        Ok(true)
    }

    /// Clear the sleep registration and report what happened overnight.
    ///
    /// A sleeper who was murdered wakes at 1 HP. Returns `None` if the player
    /// was not asleep.
    pub async fn wake_up(&self, player_id: PlayerId) -> Result<Option<WakeReport>, PvpError> {
        let Some(sleep) = self.store.clear_sleeping(player_id).await? else {
            return Ok(None);
        };

        let attacks = self
            .store
            .attack_log_for(player_id, Some(sleep.since))
            .await?;

        if sleep.is_dead {
            self.revive(player_id).await?;
        }

        tracing::info!(
            player_id = %player_id,
            attacks = attacks.len(),
            was_killed = sleep.is_dead,
            "Player woke up"
        );
        Ok(Some(WakeReport {
            location: sleep.location,
            slept_since: sleep.since,
            attacks,
            was_killed: sleep.is_dead,
            guards_left: sleep.guards,
        }))
    }

    fn check_in(
        &self,
        record: &mut PersistedCharacter,
        lodging: &Lodging,
    ) -> Result<SleepReceipt, PvpError> {
        if record.is_sleeping() {
            return Err(PvpError::InvalidRequest("You are already asleep.".to_string()));
        }

        let mut player = record.require_player()?.clone();
        let cost = self.quote(lodging, player.level)?;
        let available = player.gold.max(0) + player.bank_gold.max(0);
        let payment = player
            .pay(cost)
            .map_err(|_| PvpError::InsufficientFunds {
                needed: cost,
                available,
            })?;
        player.hp = player.max_hp;

        let (guards, defense_boost) = match lodging {
            Lodging::Dormitory => (Vec::new(), false),
            Lodging::Inn { guards } => (
                guards
                    .iter()
                    .map(|t| Guard::hire(*t, player.level))
                    .collect::<Vec<_>>(),
                true,
            ),
        };

        if let Some(p) = record.player_mut() {
            *p = player;
        }
        record.set_sleep(Some(SleepState::new(
            lodging.location(),
            guards.clone(),
            defense_boost,
            self.clock.now(),
        )));

        Ok(SleepReceipt {
            location: lodging.location(),
            cost,
            payment,
            guards,
        })
    }

    async fn revive(&self, player_id: PlayerId) -> Result<(), RepoError> {
        let mut attempt = 0;
        loop {
            let mut record = self.store.read_character(player_id).await?;
            if let Some(p) = record.player_mut() {
                p.hp = 1;
            }
            match self.store.write_character(&record).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_stale() && attempt < self.settings.stale_write_retries => {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockCharacterStore;
    use crate::test_fixtures::{fixed_now, log_entry, player_data, Harness};
    use skirmish_domain::{AttackResult, AttackVenue};

    #[test]
    fn inn_quote_adds_escalating_guard_costs() {
        let h = Harness::new(vec![]);
        let quote = h
            .pvp
            .rest
            .quote(
                &Lodging::Inn {
                    guards: vec![GuardType::Rookie, GuardType::Veteran],
                },
                10,
            )
            .expect("quote");
        // 75 * 10 + 100 + 300 * 1.5
        assert_eq!(quote, 1_300);
        assert_eq!(h.pvp.rest.quote(&Lodging::Dormitory, 40).expect("quote"), 10);

        let too_many = Lodging::Inn {
            guards: vec![GuardType::Hound; 6],
        };
        assert!(matches!(
            h.pvp.rest.quote(&too_many, 10),
            Err(PvpError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn inn_stay_draws_shortfall_from_bank_and_hires_guards() {
        let h = Harness::new(vec![]);
        let mut data = player_data("Orla", 10, 1_000);
        data.bank_gold = 500;
        data.hp = 7;
        let record = h.save(data).await;

        let receipt = h
            .pvp
            .rest
            .go_to_sleep(
                record.id(),
                Lodging::Inn {
                    guards: vec![GuardType::Rookie, GuardType::Veteran],
                },
            )
            .await
            .expect("sleep");

        assert_eq!(receipt.cost, 1_300);
        assert_eq!(receipt.payment, GoldPayment { from_hand: 1_000, from_bank: 300 });

        let after = h.reload(record.id()).await;
        let player = after.player().expect("player");
        assert_eq!(player.gold, 0);
        assert_eq!(player.bank_gold, 200);
        assert_eq!(player.hp, player.max_hp);

        let sleep = after.sleep().expect("asleep");
        assert_eq!(sleep.location, SleepLocation::Inn);
        assert!(sleep.defense_boost);
        assert_eq!(
            sleep.guards.iter().map(|g| g.guard_type()).collect::<Vec<_>>(),
            vec![GuardType::Rookie, GuardType::Veteran]
        );
    }

    #[tokio::test]
    async fn unaffordable_room_changes_nothing() {
        let h = Harness::new(vec![]);
        let record = h.save(player_data("Orla", 10, 100)).await;

        let err = h
            .pvp
            .rest
            .go_to_sleep(record.id(), Lodging::Inn { guards: vec![] })
            .await
            .expect_err("too poor");
        assert!(matches!(
            err,
            PvpError::InsufficientFunds { needed: 750, available: 100 }
        ));
        assert_eq!(h.reload(record.id()).await, record);
    }

    #[tokio::test]
    async fn dropped_session_becomes_dormitory_sleeper_once() {
        let h = Harness::new(vec![]);
        let record = h.save(player_data("Orla", 10, 100)).await;

        assert!(h.pvp.rest.ensure_sleeping(record.id()).await.expect("first"));
        assert!(!h.pvp.rest.ensure_sleeping(record.id()).await.expect("second"));

        let after = h.reload(record.id()).await;
        assert_eq!(after.sleep().map(|s| s.location), Some(SleepLocation::Dormitory));
        assert_eq!(after.gold(), 100);
    }

    #[tokio::test]
    async fn murdered_sleeper_wakes_at_one_hp_with_overnight_log() {
        let h = Harness::new(vec![]);
        let record = h.save(player_data("Orla", 10, 100)).await;
        h.pvp
            .rest
            .go_to_sleep(record.id(), Lodging::Dormitory)
            .await
            .expect("sleep");

        let mut entry = log_entry(record.id(), AttackVenue::Dormitory, AttackResult::AttackerWon);
        entry.timestamp = fixed_now();
        h.store.append_attack_log(&entry).await.expect("log");
        h.store.mark_dead(record.id()).await.expect("dead");

        let report = h
            .pvp
            .rest
            .wake_up(record.id())
            .await
            .expect("wake")
            .expect("was asleep");
        assert!(report.was_killed);
        assert_eq!(report.attacks.len(), 1);
        assert_eq!(report.location, SleepLocation::Dormitory);

        let after = h.reload(record.id()).await;
        assert!(!after.is_sleeping());
        assert_eq!(after.player().map(|p| p.hp), Some(1));

        assert!(h.pvp.rest.wake_up(record.id()).await.expect("wake").is_none());
    }

    #[tokio::test]
    async fn store_fault_on_check_in_surfaces_as_store_unavailable() {
        let record = PersistedCharacter::new(
            PlayerId::new(),
            player_data("Orla", 10, 100),
            Default::default(),
        );
        let mut store = MockCharacterStore::new();
        store
            .expect_read_character()
            .returning(move |_| Ok(record.clone()));
        store
            .expect_write_character()
            .times(1)
            .returning(|_| Err(RepoError::database("write_character", "disk I/O error")));

        let rest = Rest::new(
            Arc::new(store),
            Arc::new(crate::infrastructure::clock::FixedClock(fixed_now())),
            PvpSettings::default(),
        );
        let err = rest
            .go_to_sleep(PlayerId::new(), Lodging::Dormitory)
            .await
            .expect_err("store down");
        assert!(matches!(err, PvpError::StoreUnavailable(_)));
    }
}
