//! External collaborator ports (directory, combat, notifications).

use async_trait::async_trait;
use skirmish_domain::{CombatCharacter, CombatResult, PlayerId, PlayerSummary};

use super::error::{NotifyError, OracleError, RepoError};
use super::types::{Mail, NewsCategory};

/// Who exists and who is connected right now. Read-only from the PvP engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryPort: Send + Sync {
    async fn list_player_summaries(&self) -> Result<Vec<PlayerSummary>, RepoError>;
    async fn is_online(&self, id: PlayerId) -> bool;
}

/// Resolves one bout. Turn-by-turn resolution is the oracle's business.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CombatOracle: Send + Sync {
    async fn resolve_combat(
        &self,
        attacker: &CombatCharacter,
        defender: &CombatCharacter,
    ) -> Result<CombatResult, OracleError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn post_news(&self, message: &str, category: NewsCategory) -> Result<(), NotifyError>;
    async fn send_mail(&self, mail: &Mail) -> Result<(), NotifyError>;
    /// No-op if the target is offline.
    async fn push_live(&self, target: PlayerId, message: &str) -> Result<(), NotifyError>;
}
