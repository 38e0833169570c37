//! Aggregates - units of atomicity in the save store

pub mod persisted_character;
pub mod player_data;

pub use persisted_character::PersistedCharacter;
pub use player_data::{DeathPenalty, GoldPayment, PlayerData};
