//! Best-effort news, mail and live pushes for PvP events.
//!
//! Notifications go out after the attack is settled. A failed delivery is
//! logged and dropped; it never turns a settled attack into an error.

use std::sync::Arc;

use skirmish_domain::PlayerId;

use crate::infrastructure::ports::{ClockPort, Mail, MailCategory, NewsCategory, NotificationSink};

pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn ClockPort>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>, clock: Arc<dyn ClockPort>) -> Self {
        Self { sink, clock }
    }

    pub async fn news(&self, message: &str, category: NewsCategory) {
        if let Err(e) = self.sink.post_news(message, category).await {
            tracing::warn!(error = %e, category = category.as_str(), "Failed to post news");
        }
    }

    /// Mail `to`, then push the same body live if they are connected.
    pub async fn mail_and_push(
        &self,
        from: &str,
        to: PlayerId,
        category: MailCategory,
        subject: &str,
        body: &str,
    ) {
        let mail = Mail {
            from: from.to_string(),
            to,
            category,
            subject: subject.to_string(),
            body: body.to_string(),
            sent_at: self.clock.now(),
        };
        if let Err(e) = self.sink.send_mail(&mail).await {
            tracing::warn!(error = %e, recipient = %to, category = category.as_str(), "Failed to send mail");
        }
        if let Err(e) = self.sink.push_live(to, body).await {
            tracing::warn!(error = %e, recipient = %to, "Failed to push live message");
        }
    }
}

// =============================================================================
// Message text
// =============================================================================

pub(crate) fn arena_victory_news(attacker: &str, defender: &str, gold: i64) -> String {
    if gold > 0 {
        format!("{attacker} defeated {defender} in the Arena and stole {gold} gold!")
    } else {
        format!("{attacker} defeated {defender} in the Arena!")
    }
}

pub(crate) fn arena_defeat_news(attacker: &str, defender: &str, gold: i64) -> String {
    if gold > 0 {
        format!("{defender}'s shadow struck down {attacker} in the Arena and took {gold} gold!")
    } else {
        format!("{defender}'s shadow struck down {attacker} in the Arena!")
    }
}

pub(crate) fn arena_victory_mail(attacker: &str, gold: i64) -> String {
    format!("[Arena] {attacker} attacked you in the Arena and won! They stole {gold} of your gold.")
}

pub(crate) fn arena_defeat_mail(attacker: &str, gold: i64) -> String {
    format!(
        "[Arena] {attacker} attacked you in the Arena but your shadow defeated them! You gained {gold} gold."
    )
}

pub(crate) fn sleep_murder_mail(attacker: &str, gold: i64, item: Option<&str>) -> String {
    match item {
        Some(item) => format!(
            "{attacker} murdered you in your sleep! They stole {gold} gold and your {item}."
        ),
        None => format!("{attacker} murdered you in your sleep! They stole {gold} gold."),
    }
}

pub(crate) fn sleep_repelled_mail(attacker: &str, guard: &str) -> String {
    format!("{attacker} tried to attack you in your sleep, but your {guard} drove them off.")
}

pub(crate) fn sleep_survived_mail(attacker: &str) -> String {
    format!("{attacker} tried to murder you in your sleep, but you fought them off!")
}

pub(crate) fn sleep_murder_news(attacker: &str, victim: &str, venue: &str) -> String {
    format!("{attacker} murdered {victim} in their sleep at the {venue}!")
}

pub(crate) fn bounty_news(poster: &str, target: &str, amount: i64, pool: i64) -> String {
    format!("{poster} placed a bounty of {amount} gold on {target}! The pool now stands at {pool} gold.")
}

pub(crate) fn bounty_claimed_news(winner: &str, target: &str, amount: i64) -> String {
    format!("{winner} collected the {amount} gold bounty on {target}!")
}

pub(crate) fn bounty_mail(poster: &str, amount: i64) -> String {
    format!("{poster} has put a price of {amount} gold on your head. Watch your back.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{MockNotificationSink, NotifyError};
    use crate::test_fixtures::fixed_now;
    use mockall::predicate::{always, eq};

    #[test]
    fn zero_gold_messages_drop_the_amount() {
        assert_eq!(
            arena_victory_news("Ash", "Birch", 0),
            "Ash defeated Birch in the Arena!"
        );
        assert_eq!(
            arena_defeat_news("Ash", "Birch", 12),
            "Birch's shadow struck down Ash in the Arena and took 12 gold!"
        );
        assert_eq!(
            sleep_murder_mail("Ash", 40, Some("Moon Dagger")),
            "Ash murdered you in your sleep! They stole 40 gold and your Moon Dagger."
        );
    }

    #[tokio::test]
    async fn mail_failure_still_pushes_live() {
        let to = PlayerId::new();
        let mut sink = MockNotificationSink::new();
        sink.expect_send_mail()
            .times(1)
            .returning(|_| Err(NotifyError::DeliveryFailed("mailbox full".into())));
        sink.expect_push_live()
            .with(eq(to), always())
            .times(1)
            .returning(|_, _| Ok(()));

        let dispatcher = NotificationDispatcher::new(Arc::new(sink), Arc::new(FixedClock(fixed_now())));
        dispatcher
            .mail_and_push("Ash", to, MailCategory::Pvp, "Arena", "hello")
            .await;
    }

    #[tokio::test]
    async fn news_failure_is_swallowed() {
        let mut sink = MockNotificationSink::new();
        sink.expect_post_news()
            .with(eq("Ash defeated Birch in the Arena!"), eq(NewsCategory::Pvp))
            .times(1)
            .returning(|_, _| Err(NotifyError::DeliveryFailed("down".into())));

        let dispatcher = NotificationDispatcher::new(Arc::new(sink), Arc::new(FixedClock(fixed_now())));
        dispatcher
            .news(&arena_victory_news("Ash", "Birch", 0), NewsCategory::Pvp)
            .await;
    }
}
