//! Headless combat resolver.
//!
//! Fights a bout without any terminal: the attacker strikes first, blows
//! alternate, and the bout is called off after [`HeadlessCombatOracle::MAX_ROUNDS`].
//! The RNG is seeded from the configured seed plus a fingerprint of both
//! combatants, so the same two characters always fight the same fight.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skirmish_domain::{CombatCharacter, CombatOutcome, CombatResult};

use crate::infrastructure::ports::{CombatOracle, OracleError};

const CRIT_CHANCE: f64 = 0.10;
const CRIT_MULTIPLIER: f64 = 1.5;
const XP_PER_DEFENDER_LEVEL: i64 = 25;

pub struct HeadlessCombatOracle {
    seed: u64,
}

impl HeadlessCombatOracle {
    pub const MAX_ROUNDS: u32 = 30;

    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, attacker: &CombatCharacter, defender: &CombatCharacter) -> StdRng {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        fingerprint(attacker, &mut hasher);
        fingerprint(defender, &mut hasher);
        StdRng::seed_from_u64(hasher.finish())
    }

    /// Resolve one bout.
    pub fn resolve(&self, attacker: &CombatCharacter, defender: &CombatCharacter) -> CombatResult {
        let mut rng = self.rng_for(attacker, defender);
        let mut attacker_hp = attacker.hp.max(0);
        let mut defender_hp = defender.hp.max(0);

        let finish = |outcome: CombatOutcome, rounds: u32, attacker_hp: i64, defender_hp: i64| CombatResult {
            outcome,
            rounds,
            experience_gained: match outcome {
                CombatOutcome::Victory => XP_PER_DEFENDER_LEVEL * i64::from(defender.level.max(1)),
                _ => 0,
            },
            final_attacker_hp: attacker_hp,
            final_defender_hp: defender_hp,
            should_return_to_sanctuary: outcome == CombatOutcome::Defeated,
        };

        if attacker_hp == 0 {
            return finish(CombatOutcome::Defeated, 0, 0, defender_hp);
        }
        if defender_hp == 0 {
            return finish(CombatOutcome::Victory, 0, attacker_hp, 0);
        }

        for round in 1..=Self::MAX_ROUNDS {
            defender_hp = (defender_hp - strike(&mut rng, attacker, defender)).max(0);
            if defender_hp == 0 {
                return finish(CombatOutcome::Victory, round, attacker_hp, 0);
            }

            attacker_hp = (attacker_hp - strike(&mut rng, defender, attacker)).max(0);
            if attacker_hp == 0 {
                return finish(CombatOutcome::Defeated, round, 0, defender_hp);
            }
        }

        finish(
            CombatOutcome::Escaped,
            Self::MAX_ROUNDS,
            attacker_hp,
            defender_hp,
        )
    }
}

fn fingerprint(c: &CombatCharacter, hasher: &mut DefaultHasher) {
    c.name.hash(hasher);
    c.level.hash(hasher);
    c.hp.hash(hasher);
    c.max_hp.hash(hasher);
    c.strength.hash(hasher);
    c.defence.hash(hasher);
    c.weapon_power.hash(hasher);
    c.armor_power.hash(hasher);
}

/// Damage of one blow: `(STR + WeapPow/2) * 0.8..1.2 - (DEF/3 + ArmPow/4)`,
/// crits for 1.5x, never less than 1.
fn strike(rng: &mut StdRng, striker: &CombatCharacter, target: &CombatCharacter) -> i64 {
    let variance = rng.gen_range(0.8..=1.2);
    let attack = (striker.strength + striker.weapon_power / 2) as f64 * variance;
    let mitigation = (target.defence / 3 + target.armor_power / 4) as f64;

    let mut damage = attack - mitigation;
    if rng.gen_bool(CRIT_CHANCE) {
        damage *= CRIT_MULTIPLIER;
    }
    (damage as i64).max(1)
}

#[async_trait]
impl CombatOracle for HeadlessCombatOracle {
    async fn resolve_combat(
        &self,
        attacker: &CombatCharacter,
        defender: &CombatCharacter,
    ) -> Result<CombatResult, OracleError> {
        let result = self.resolve(attacker, defender);
        tracing::debug!(
            attacker = %attacker.name,
            defender = %defender.name,
            outcome = ?result.outcome,
            rounds = result.rounds,
            "Bout resolved"
        );
        Ok(result)
    }
}
