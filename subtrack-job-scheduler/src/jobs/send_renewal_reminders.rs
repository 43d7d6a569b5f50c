use subtrack_common::db::subscription::Dao as SubscriptionDao;
use subtrack_common::db::DbThreadPool;
use subtrack_common::email::templates::{RenewalLine, RenewalReminderMessage};
use subtrack_common::email::{EmailMessage, SendEmail};
use subtrack_common::models::subscription::Subscription;
use subtrack_common::money;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::env;
use crate::jobs::{group_by_email, Job, JobError};

/// Emails each user a single digest of their active subscriptions that renew
/// within the lookahead window.
pub struct SendRenewalRemindersJob {
    db_thread_pool: DbThreadPool,
    email_sender: Arc<Box<dyn SendEmail>>,
    lookahead: Duration,
    is_running: bool,
}

impl SendRenewalRemindersJob {
    pub fn new(
        db_thread_pool: DbThreadPool,
        email_sender: Arc<Box<dyn SendEmail>>,
        lookahead: Duration,
    ) -> Self {
        Self {
            db_thread_pool,
            email_sender,
            lookahead,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for SendRenewalRemindersJob {
    fn name(&self) -> &'static str {
        "Send Renewal Reminders"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let now = SystemTime::now();
        let range_end = now + self.lookahead;

        let mut dao = SubscriptionDao::new(&self.db_thread_pool);
        let renewals =
            tokio::task::spawn_blocking(move || dao.get_upcoming_renewals(now, range_end))
                .await??;

        let mut first_send_error = None;

        for (email, subscriptions) in group_by_email(renewals) {
            let lines = subscriptions
                .iter()
                .map(renewal_line)
                .collect::<Vec<_>>();

            let message = EmailMessage {
                body: RenewalReminderMessage::generate(&lines),
                subject: "Your subscriptions renewing soon",
                from: env::CONF.email_from_address.clone(),
                reply_to: env::CONF.email_reply_to_address.clone(),
                destination: &email,
                is_html: true,
            };

            if let Err(e) = self.email_sender.send(message).await {
                log::error!("Failed to send renewal reminder to '{}': {}", email, e);

                if first_send_error.is_none() {
                    first_send_error = Some(e);
                }
            }
        }

        self.is_running = false;

        match first_send_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

fn renewal_line(subscription: &Subscription) -> RenewalLine {
    RenewalLine {
        name: subscription.name.clone(),
        amount: money::format_with_symbol(subscription.amount_cents, &subscription.currency),
        renews_on: DateTime::<Utc>::from(subscription.renewal_timestamp)
            .format("%b %-d, %Y")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use subtrack_common::models::subscription::{BillingCycle, Category, SubscriptionStatus};

    use chrono::TimeZone;
    use uuid::Uuid;

    fn subscription(name: &str, amount_cents: i64, currency: &str) -> Subscription {
        let now = SystemTime::now();

        Subscription {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            household_id: None,
            name: String::from(name),
            category: Category::Streaming,
            amount_cents,
            currency: String::from(currency),
            billing_cycle: BillingCycle::Monthly,
            status: SubscriptionStatus::Active,
            renewal_timestamp: SystemTime::from(
                Utc.with_ymd_and_hms(2026, 9, 3, 0, 0, 0).single().unwrap(),
            ),
            trial_end_timestamp: None,
            notes: None,
            created_timestamp: now,
            modified_timestamp: now,
        }
    }

    #[test]
    fn test_group_by_email_one_digest_per_user() {
        let rows = vec![
            (String::from("a@example.com"), subscription("Netflix", 1599, "USD")),
            (String::from("a@example.com"), subscription("Spotify", 999, "USD")),
            (String::from("b@example.com"), subscription("Hulu", 799, "USD")),
        ];

        let groups = group_by_email(rows);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "a@example.com");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "b@example.com");
        assert_eq!(groups[1].1.len(), 1);
    }

    #[test]
    fn test_renewal_line_formatting() {
        let line = renewal_line(&subscription("Netflix", 1599, "USD"));

        assert_eq!(line.name, "Netflix");
        assert_eq!(line.amount, "$15.99");
        assert_eq!(line.renews_on, "Sep 3, 2026");
    }
}
