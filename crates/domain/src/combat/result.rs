use serde::{Deserialize, Serialize};

/// Outcome of a bout from the attacker's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatOutcome {
    Victory,
    Defeated,
    /// The attacker fled, or the bout ran out of rounds.
    Escaped,
}

/// Result of one bout. Produced once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatResult {
    pub outcome: CombatOutcome,
    pub rounds: u32,
    pub experience_gained: i64,
    pub final_attacker_hp: i64,
    pub final_defender_hp: i64,
    /// Replaces the old "return to sanctuary" control-flow signal.
    pub should_return_to_sanctuary: bool,
}

impl CombatResult {
    pub fn attacker_won(&self) -> bool {
        self.outcome == CombatOutcome::Victory
    }
}
