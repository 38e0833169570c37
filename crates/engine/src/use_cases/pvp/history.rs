//! Arena history derived from the append-only attack log.

use std::collections::HashMap;
use std::sync::Arc;

use skirmish_domain::{AttackLogEntry, AttackResult, AttackVenue, PlayerId};

use super::error::PvpError;
use crate::infrastructure::ports::CharacterStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub gold_stolen: i64,
}

/// One player's PvP kills and deaths across every venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PvpRecord {
    pub player_id: PlayerId,
    pub kills: u32,
    pub deaths: u32,
}

impl PvpRecord {
    pub fn total_fights(&self) -> u32 {
        self.kills + self.deaths
    }

    /// Kills as a share of decided fights, 0 when there are none.
    pub fn win_rate_percent(&self) -> f64 {
        match self.total_fights() {
            0 => 0.0,
            total => f64::from(self.kills) * 100.0 / f64::from(total),
        }
    }
}

pub struct ArenaHistory {
    store: Arc<dyn CharacterStore>,
}

impl ArenaHistory {
    pub fn new(store: Arc<dyn CharacterStore>) -> Self {
        Self { store }
    }

    /// Most recent arena fights, newest first.
    pub async fn recent_fights(&self, limit: usize) -> Result<Vec<AttackLogEntry>, PvpError> {
        Ok(self
            .store
            .recent_attacks(Some(AttackVenue::Arena), Some(limit))
            .await?)
    }

    /// Players ranked by arena wins, then gold stolen, then name.
    ///
    /// Both sides of a decided fight are counted; fled fights count for no one.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, PvpError> {
        let log = self
            .store
            .recent_attacks(Some(AttackVenue::Arena), None)
            .await?;
        Ok(rank(&log, limit))
    }

    /// Kills and deaths for one player over the whole attack log.
    pub async fn record_for(&self, player_id: PlayerId) -> Result<PvpRecord, PvpError> {
        let log = self.store.recent_attacks(None, None).await?;
        Ok(tally(&log, player_id))
    }
}

fn tally(log: &[AttackLogEntry], player_id: PlayerId) -> PvpRecord {
    let mut record = PvpRecord {
        player_id,
        kills: 0,
        deaths: 0,
    };
    for entry in log {
        let attacked = entry.attacker_id == Some(player_id);
        let defended = entry.defender_id == player_id;
        match entry.result {
            AttackResult::AttackerWon if attacked => record.kills += 1,
            AttackResult::AttackerWon if defended => record.deaths += 1,
            AttackResult::DefenderWon if defended => record.kills += 1,
            AttackResult::DefenderWon if attacked => record.deaths += 1,
            _ => {}
        }
    }
    record
}

fn row<'a>(
    table: &'a mut HashMap<PlayerId, LeaderboardEntry>,
    id: PlayerId,
    name: &str,
) -> &'a mut LeaderboardEntry {
    table.entry(id).or_insert_with(|| LeaderboardEntry {
        player_id: id,
        name: name.to_string(),
        wins: 0,
        losses: 0,
        gold_stolen: 0,
    })
}

fn rank(log: &[AttackLogEntry], limit: usize) -> Vec<LeaderboardEntry> {
    let mut table: HashMap<PlayerId, LeaderboardEntry> = HashMap::new();

    // Newest first, so the first name seen for a player is their current one.
    for entry in log {
        match entry.result {
            AttackResult::AttackerWon => {
                if let Some(attacker) = entry.attacker_id {
                    let r = row(&mut table, attacker, &entry.attacker_name);
                    r.wins += 1;
                    r.gold_stolen += entry.gold_stolen;
                }
                row(&mut table, entry.defender_id, &entry.defender_name).losses += 1;
            }
            AttackResult::DefenderWon => {
                let r = row(&mut table, entry.defender_id, &entry.defender_name);
                r.wins += 1;
                r.gold_stolen += entry.gold_stolen;
                if let Some(attacker) = entry.attacker_id {
                    row(&mut table, attacker, &entry.attacker_name).losses += 1;
                }
            }
            AttackResult::GuardsRepelled | AttackResult::AttackerFled => {}
        }
    }

    let mut ranked: Vec<LeaderboardEntry> = table.into_values().collect();
    ranked.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then_with(|| b.gold_stolen.cmp(&a.gold_stolen))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    ranked.truncate(limit);
    ranked
}
