//! Combat snapshots of offline characters.

use std::sync::Arc;

use skirmish_domain::{CombatCharacter, PersistedCharacter, PlayerId};

use super::error::PvpError;
use crate::infrastructure::ports::CharacterStore;

/// A defender as read at attack start.
#[derive(Debug, Clone, PartialEq)]
pub struct DefenderSnapshot {
    pub record: PersistedCharacter,
    /// Oracle-facing projection, gold already hidden.
    pub combatant: CombatCharacter,
    /// Gold on hand when the snapshot was taken; theft is computed from this.
    pub gold_before: i64,
}

impl DefenderSnapshot {
    pub fn id(&self) -> PlayerId {
        self.record.id()
    }

    pub fn name(&self) -> &str {
        self.record.display_name()
    }

    pub fn level(&self) -> u32 {
        self.record.level()
    }
}

pub struct SnapshotLoader {
    store: Arc<dyn CharacterStore>,
}

impl SnapshotLoader {
    pub fn new(store: Arc<dyn CharacterStore>) -> Self {
        Self { store }
    }

    /// Project a save record into a combat-ready character at full HP.
    ///
    /// Pure; fails with `CorruptSave` when the player section is missing or invalid.
    pub fn project(record: &PersistedCharacter) -> Result<CombatCharacter, PvpError> {
        let player = record.require_player()?;
        player.validate()?;
        Ok(player.combatant(player.max_hp))
    }

    /// Read `id` and build an attack snapshot.
    ///
    /// Hidden characters are refused before anything else is looked at.
    pub async fn load_target(&self, id: PlayerId) -> Result<DefenderSnapshot, PvpError> {
        let record = self.store.read_character(id).await?;
        if record.is_hidden() {
            return Err(PvpError::ProtectedTarget(record.display_name().to_string()));
        }

        let mut combatant = Self::project(&record)?;
        let gold_before = combatant.hide_gold();

        Ok(DefenderSnapshot {
            record,
            combatant,
            gold_before,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryStore;
    use crate::infrastructure::ports::{MockCharacterStore, RepoError};
    use crate::test_fixtures::{player_data, saved_character};
    use skirmish_domain::{DailyCounters, GameDay, ItemId};

    #[tokio::test]
    async fn snapshot_hides_gold_and_uses_full_hp() {
        let store = Arc::new(InMemoryStore::new());
        let mut data = player_data("Wren", 20, 1_000);
        data.hp = 3;
        let record = saved_character(store.as_ref(), data).await;

        let snapshot = SnapshotLoader::new(store)
            .load_target(record.id())
            .await
            .expect("snapshot");

        assert_eq!(snapshot.gold_before, 1_000);
        assert_eq!(snapshot.combatant.gold, 0);
        assert_eq!(snapshot.combatant.hp, snapshot.combatant.max_hp);
        assert_eq!(snapshot.record.gold(), 1_000);
    }

    #[tokio::test]
    async fn hidden_character_is_protected() {
        let store = Arc::new(InMemoryStore::new());
        let mut data = player_data("Shade", 20, 0);
        data.safe_house_resting = true;
        let record = saved_character(store.as_ref(), data).await;

        let err = SnapshotLoader::new(store)
            .load_target(record.id())
            .await
            .expect_err("protected");
        assert!(matches!(err, PvpError::ProtectedTarget(name) if name == "Shade"));
    }

    #[tokio::test]
    async fn deleted_save_is_unavailable() {
        let mut store = MockCharacterStore::new();
        store
            .expect_read_character()
            .returning(|id| Err(RepoError::not_found("Character", id)));

        let err = SnapshotLoader::new(Arc::new(store))
            .load_target(PlayerId::new())
            .await
            .expect_err("missing");
        assert!(matches!(err, PvpError::UnavailableTarget(_)));
    }

    #[test]
    fn missing_player_section_is_corrupt() {
        let record = PersistedCharacter::from_storage(
            PlayerId::new(),
            1,
            None,
            DailyCounters::default(),
            None,
            0,
        );
        assert!(matches!(
            SnapshotLoader::project(&record),
            Err(PvpError::CorruptSave(_))
        ));
    }

    #[test]
    fn dangling_equipped_slot_is_corrupt() {
        let mut data = player_data("Tarn", 10, 0);
        data.equipped.insert("weapon".into(), ItemId::new());
        let record = PersistedCharacter::new(PlayerId::new(), data, GameDay::new(1));
        assert!(matches!(
            SnapshotLoader::project(&record),
            Err(PvpError::CorruptSave(_))
        ));
    }
}
