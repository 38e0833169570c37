//! Hired guard layer in front of an inn sleeper.
//!
//! Guards are fought strictly in stored order. Beating a guard removes it for
//! good; losing to one (or running) stops the attempt and leaves that guard
//! with whatever HP it has left, so a defense wears down across attackers.

use std::sync::Arc;

use skirmish_domain::{CombatCharacter, CombatOutcome, Guard};

use crate::infrastructure::ports::{CombatOracle, OracleError};

/// Result of running an attacker through a guard list.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardChainOutcome {
    /// Guard list going forward (empty once cleared).
    pub surviving: Vec<Guard>,
    /// Index into the original list of the guard that stopped the attacker.
    pub halted_at: Option<usize>,
    pub guards_defeated: usize,
    /// Attacker HP after the last bout.
    pub attacker_hp: i64,
    pub experience_gained: i64,
    pub bouts: u32,
}

impl GuardChainOutcome {
    pub fn cleared(&self) -> bool {
        self.halted_at.is_none()
    }
}

pub struct GuardChain {
    oracle: Arc<dyn CombatOracle>,
}

impl GuardChain {
    pub fn new(oracle: Arc<dyn CombatOracle>) -> Self {
        Self { oracle }
    }

    /// Fight through `guards` in order. Attacker HP carries from bout to bout.
    ///
    /// Guards already at 0 HP (only possible in legacy data) count as defeated
    /// without a bout.
    pub async fn resolve(
        &self,
        attacker: &CombatCharacter,
        guards: &[Guard],
        owner_level: u32,
    ) -> Result<GuardChainOutcome, OracleError> {
        let mut fighter = attacker.clone();
        let mut experience_gained = 0;
        let mut bouts = 0;

        for (index, guard) in guards.iter().enumerate() {
            if guard.is_down() {
                continue;
            }

            let result = self
                .oracle
                .resolve_combat(&fighter, &guard.combatant(owner_level))
                .await?;
            bouts += 1;
            fighter.hp = result.final_attacker_hp.max(0);

            if result.outcome == CombatOutcome::Victory {
                experience_gained += result.experience_gained;
                tracing::debug!(guard = %guard.name(), index, "Guard defeated");
                continue;
            }

            let mut surviving = Vec::with_capacity(guards.len() - index);
            surviving.push(guard.with_remaining_hp(result.final_defender_hp));
            surviving.extend(guards[index + 1..].iter().cloned());

            tracing::debug!(
                guard = %guard.name(),
                index,
                guard_hp = result.final_defender_hp,
                "Guard held"
            );
            return Ok(GuardChainOutcome {
                surviving,
                halted_at: Some(index),
                guards_defeated: index,
                attacker_hp: fighter.hp,
                experience_gained,
                bouts,
            });
        }

        Ok(GuardChainOutcome {
            surviving: Vec::new(),
            halted_at: None,
            guards_defeated: guards.len(),
            attacker_hp: fighter.hp,
            experience_gained,
            bouts,
        })
    }
}
