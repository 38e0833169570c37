//! Notification sink backed by the message store and live connections.

use std::sync::Arc;

use async_trait::async_trait;
use skirmish_domain::PlayerId;

use crate::infrastructure::live::LiveConnections;
use crate::infrastructure::ports::{
    ClockPort, Mail, MessageStore, NewsCategory, NewsItem, NotificationSink, NotifyError,
};

/// Persists news and mail, and pushes to players who are connected.
pub struct Notifier {
    messages: Arc<dyn MessageStore>,
    live: Arc<LiveConnections>,
    clock: Arc<dyn ClockPort>,
}

impl Notifier {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        live: Arc<LiveConnections>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            messages,
            live,
            clock,
        }
    }
}

#[async_trait]
impl NotificationSink for Notifier {
    async fn post_news(&self, message: &str, category: NewsCategory) -> Result<(), NotifyError> {
        let item = NewsItem {
            message: message.to_string(),
            category,
            posted_at: self.clock.now(),
        };
        self.messages.save_news(&item).await?;
        Ok(())
    }

    async fn send_mail(&self, mail: &Mail) -> Result<(), NotifyError> {
        self.messages.save_mail(mail).await?;
        Ok(())
    }

    async fn push_live(&self, target: PlayerId, message: &str) -> Result<(), NotifyError> {
        if !self.live.push(target, message) {
            tracing::debug!(player_id = %target, "Live push skipped, player offline");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::persistence::InMemoryStore;
    use crate::infrastructure::ports::{MailCategory, MockMessageStore, RepoError};
    use chrono::Utc;

    #[tokio::test]
    async fn news_is_stamped_and_stored() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let notifier = Notifier::new(
            store.clone(),
            Arc::new(LiveConnections::new()),
            Arc::new(FixedClock(now)),
        );

        notifier
            .post_news("Vex defeated Ward in the Arena!", NewsCategory::Pvp)
            .await
            .expect("news");

        let news = store.recent_news(10).await.expect("news");
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].posted_at, now);
        assert_eq!(news[0].category, NewsCategory::Pvp);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_notify_error() {
        let mut messages = MockMessageStore::new();
        messages
            .expect_save_mail()
            .returning(|_| Err(RepoError::database("save_mail", "disk full")));
        let notifier = Notifier::new(
            Arc::new(messages),
            Arc::new(LiveConnections::new()),
            Arc::new(FixedClock(Utc::now())),
        );

        let mail = Mail {
            from: "Vex".into(),
            to: PlayerId::new(),
            category: MailCategory::Pvp,
            subject: "[Arena]".into(),
            body: "...".into(),
            sent_at: Utc::now(),
        };
        let err = notifier.send_mail(&mail).await.expect_err("fails");
        assert!(matches!(err, NotifyError::Store(_)));
    }

    #[tokio::test]
    async fn push_to_offline_player_succeeds_silently() {
        let notifier = Notifier::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(LiveConnections::new()),
            Arc::new(FixedClock(Utc::now())),
        );
        notifier
            .push_live(PlayerId::new(), "hello")
            .await
            .expect("no-op");
    }
}
