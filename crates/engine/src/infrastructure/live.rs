//! Live connection registry.
//!
//! Tracks which players currently have a session attached and lets the engine
//! push a one-line message to them. A player is online exactly while a sender
//! is registered and its receiver is still alive.

use dashmap::DashMap;
use skirmish_domain::PlayerId;
use tokio::sync::mpsc;

/// Registry of connected players.
#[derive(Default)]
pub struct LiveConnections {
    senders: DashMap<PlayerId, mpsc::UnboundedSender<String>>,
}

impl LiveConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a session. Returns the receiving half the session should drain.
    ///
    /// A second registration for the same player replaces the first.
    pub fn register(&self, player: PlayerId) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.senders.insert(player, tx).is_some() {
            tracing::debug!(player_id = %player, "Replaced existing live connection");
        } else {
            tracing::debug!(player_id = %player, "Live connection registered");
        }
        rx
    }

    pub fn unregister(&self, player: PlayerId) {
        if self.senders.remove(&player).is_some() {
            tracing::debug!(player_id = %player, "Live connection unregistered");
        }
    }

    pub fn is_online(&self, player: PlayerId) -> bool {
        self.senders
            .get(&player)
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    /// Deliver `message` if the player is connected. Returns whether it was delivered.
    pub fn push(&self, player: PlayerId, message: &str) -> bool {
        let delivered = match self.senders.get(&player) {
            Some(tx) => tx.send(message.to_string()).is_ok(),
            None => return false,
        };
        if !delivered {
            // Receiver dropped without unregistering
            self.senders.remove(&player);
            tracing::debug!(player_id = %player, "Dropped stale live connection");
        }
        delivered
    }

    pub fn online_count(&self) -> usize {
        self.senders.iter().filter(|e| !e.value().is_closed()).count()
    }
}
