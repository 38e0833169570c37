//! Bounties: gold placed on another character's head, paid out to whoever
//! next beats them in the arena or murders them in their sleep.

use std::sync::Arc;

use skirmish_domain::PlayerId;

use super::error::{EligibilityError, PvpError};
use super::notify::{bounty_mail, bounty_news, NotificationDispatcher};
use crate::infrastructure::ports::{CharacterStore, MailCategory, NewsCategory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BountyReceipt {
    pub target_name: String,
    pub amount: i64,
    /// Pool on the target after this bounty.
    pub pool: i64,
}

pub struct PlaceBounty {
    store: Arc<dyn CharacterStore>,
    notifier: Arc<NotificationDispatcher>,
}

impl PlaceBounty {
    pub fn new(store: Arc<dyn CharacterStore>, notifier: Arc<NotificationDispatcher>) -> Self {
        Self { store, notifier }
    }

    /// Debit `amount` from the poster's gold on hand and add it to the
    /// target's bounty pool.
    pub async fn execute(
        &self,
        poster_id: PlayerId,
        target_id: PlayerId,
        amount: i64,
    ) -> Result<BountyReceipt, PvpError> {
        if amount <= 0 {
            return Err(PvpError::InvalidRequest(
                "A bounty must be at least 1 gold.".to_string(),
            ));
        }
        if poster_id == target_id {
            return Err(EligibilityError::SelfTarget.into());
        }

        let poster = self.store.read_character(poster_id).await?;
        let target = self.store.read_character(target_id).await?;
        if poster.gold() < amount {
            return Err(PvpError::InsufficientFunds {
                needed: amount,
                available: poster.gold(),
            });
        }

        // Debit first; a short debit (gold spent meanwhile) is refunded and refused.
        let debited = -self.store.adjust_gold(poster_id, -amount).await?;
        if debited < amount {
            if let Err(e) = self.store.adjust_gold(poster_id, debited).await {
                tracing::error!(poster_id = %poster_id, refund = debited, error = %e, "Failed to refund short bounty debit");
            }
            return Err(PvpError::InsufficientFunds {
                needed: amount,
                available: debited,
            });
        }

        let pool = match self.store.add_bounty(target_id, amount).await {
            Ok(pool) => pool,
            Err(e) => {
                if let Err(refund) = self.store.adjust_gold(poster_id, amount).await {
                    tracing::error!(poster_id = %poster_id, refund = amount, error = %refund, "Failed to refund bounty after pool update failed");
                }
                return Err(e.into());
            }
        };

        self.notifier
            .news(
                &bounty_news(poster.display_name(), target.display_name(), amount, pool),
                NewsCategory::Bounty,
            )
            .await;
        self.notifier
            .mail_and_push(
                poster.display_name(),
                target_id,
                MailCategory::Bounty,
                "A price on your head",
                &bounty_mail(poster.display_name(), amount),
            )
            .await;

        tracing::info!(
            poster_id = %poster_id,
            target_id = %target_id,
            amount,
            pool,
            "Bounty placed"
        );
        Ok(BountyReceipt {
            target_name: target.display_name().to_string(),
            amount,
            pool,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MessageStore;
    use crate::test_fixtures::{player_data, Harness};

    #[tokio::test]
    async fn bounty_moves_gold_into_the_pool_and_announces_it() {
        let h = Harness::new(vec![]);
        let poster = h.save(player_data("Ashe", 10, 500)).await;
        let target = h.save(player_data("Dunmore", 12, 0)).await;

        h.pvp.bounty.execute(poster.id(), target.id(), 200).await.expect("first");
        let receipt = h
            .pvp
            .bounty
            .execute(poster.id(), target.id(), 100)
            .await
            .expect("second");

        assert_eq!(receipt.pool, 300);
        assert_eq!(h.reload(poster.id()).await.gold(), 200);
        assert_eq!(h.reload(target.id()).await.bounty(), 300);

        let news = h.store.recent_news(1).await.expect("news");
        assert_eq!(news[0].category, NewsCategory::Bounty);
        assert!(news[0].message.contains("300 gold"));
        let mail = h.store.mail_for(target.id()).await.expect("mail");
        assert_eq!(mail.len(), 2);
        assert_eq!(mail[0].category, MailCategory::Bounty);
    }

    #[tokio::test]
    async fn refuses_bad_amounts_self_targets_and_overdrafts() {
        let h = Harness::new(vec![]);
        let poster = h.save(player_data("Ashe", 10, 50)).await;
        let target = h.save(player_data("Dunmore", 12, 0)).await;

        assert!(matches!(
            h.pvp.bounty.execute(poster.id(), target.id(), 0).await,
            Err(PvpError::InvalidRequest(_))
        ));
        assert!(matches!(
            h.pvp.bounty.execute(poster.id(), poster.id(), 10).await,
            Err(PvpError::Eligibility(EligibilityError::SelfTarget))
        ));
        assert!(matches!(
            h.pvp.bounty.execute(poster.id(), target.id(), 51).await,
            Err(PvpError::InsufficientFunds { needed: 51, available: 50 })
        ));
        assert!(matches!(
            h.pvp.bounty.execute(poster.id(), PlayerId::new(), 10).await,
            Err(PvpError::UnavailableTarget(_))
        ));

        assert_eq!(h.reload(poster.id()).await.gold(), 50);
        assert_eq!(h.reload(target.id()).await.bounty(), 0);
    }
}
