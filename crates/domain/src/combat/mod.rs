//! Combat projections and bout results
//!
//! A [`CombatCharacter`] is a throwaway value fed to the combat oracle. It never
//! aliases the record that will later be saved.

mod character;
mod result;

pub use character::CombatCharacter;
pub use result::{CombatOutcome, CombatResult};
