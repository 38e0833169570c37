//! Player directory assembled from the save store and live connections.

use std::sync::Arc;

use async_trait::async_trait;
use skirmish_domain::{PlayerId, PlayerSummary};

use crate::infrastructure::live::LiveConnections;
use crate::infrastructure::ports::{CharacterStore, DirectoryPort, RepoError};

pub struct PlayerDirectory {
    store: Arc<dyn CharacterStore>,
    live: Arc<LiveConnections>,
}

impl PlayerDirectory {
    pub fn new(store: Arc<dyn CharacterStore>, live: Arc<LiveConnections>) -> Self {
        Self { store, live }
    }
}

#[async_trait]
impl DirectoryPort for PlayerDirectory {
    async fn list_player_summaries(&self) -> Result<Vec<PlayerSummary>, RepoError> {
        let mut summaries = self.store.list_summaries().await?;
        for summary in &mut summaries {
            summary.is_online = self.live.is_online(summary.id);
        }
        Ok(summaries)
    }

    async fn is_online(&self, id: PlayerId) -> bool {
        self.live.is_online(id)
    }
}
