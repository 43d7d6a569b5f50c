use subtrack_common::db::subscription::Dao as SubscriptionDao;
use subtrack_common::db::DbThreadPool;
use subtrack_common::email::templates::{TrialEndingMessage, TrialLine};
use subtrack_common::email::{EmailMessage, SendEmail};
use subtrack_common::models::subscription::Subscription;
use subtrack_common::money;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::env;
use crate::jobs::{group_by_email, Job, JobError};

/// Emails each user a digest of their trials that convert to paid
/// subscriptions within the lookahead window.
pub struct SendTrialConversionRemindersJob {
    db_thread_pool: DbThreadPool,
    email_sender: Arc<Box<dyn SendEmail>>,
    lookahead: Duration,
    is_running: bool,
}

impl SendTrialConversionRemindersJob {
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
impl Job for SendTrialConversionRemindersJob {
    fn name(&self) -> &'static str {
        "Send Trial Conversion Reminders"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let now = SystemTime::now();
        let range_end = now + self.lookahead;

        let mut dao = SubscriptionDao::new(&self.db_thread_pool);
        let trials = tokio::task::spawn_blocking(move || dao.get_expiring_trials(now, range_end))
            .await??;

        let mut first_send_error = None;

        for (email, subscriptions) in group_by_email(trials) {
            let lines = subscriptions
                .iter()
                .map(|s| trial_line(s, now))
                .collect::<Vec<_>>();

            let message = EmailMessage {
                body: TrialEndingMessage::generate(&lines),
                subject: "Your free trials are ending soon",
                from: env::CONF.email_from_address.clone(),
                reply_to: env::CONF.email_reply_to_address.clone(),
                destination: &email,
                is_html: true,
            };

            if let Err(e) = self.email_sender.send(message).await {
                log::error!("Failed to send trial reminder to '{}': {}", email, e);

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

fn trial_line(subscription: &Subscription, now: SystemTime) -> TrialLine {
    TrialLine {
        name: subscription.name.clone(),
        price: format!(
            "{}/{}",
            money::format_with_symbol(subscription.amount_cents, &subscription.currency),
            subscription.billing_cycle,
        ),
        days_left: days_until(subscription.trial_end_timestamp.unwrap_or(now), now),
    }
}

// Rounds up so a trial ending within the next 24 hours reads as 1 day left
fn days_until(end: SystemTime, now: SystemTime) -> i64 {
    let remaining = end.duration_since(now).unwrap_or(Duration::ZERO);
    (remaining.as_secs().div_ceil(86400)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    use subtrack_common::models::subscription::{BillingCycle, Category, SubscriptionStatus};

    use uuid::Uuid;

    fn trial(name: &str, amount_cents: i64, ends_in: Duration, now: SystemTime) -> Subscription {
        Subscription {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            household_id: None,
            name: String::from(name),
            category: Category::Streaming,
            amount_cents,
            currency: String::from("USD"),
            billing_cycle: BillingCycle::Monthly,
            status: SubscriptionStatus::Trial,
            renewal_timestamp: now + ends_in,
            trial_end_timestamp: Some(now + ends_in),
            notes: None,
            created_timestamp: now,
            modified_timestamp: now,
        }
    }

    #[test]
    fn test_days_until_rounds_up() {
        let now = SystemTime::now();

        assert_eq!(days_until(now + Duration::from_secs(3600), now), 1);
        assert_eq!(days_until(now + Duration::from_secs(86400), now), 1);
        assert_eq!(days_until(now + Duration::from_secs(86401), now), 2);
        assert_eq!(days_until(now + Duration::from_secs(3 * 86400), now), 3);

        // Already past
        assert_eq!(days_until(now - Duration::from_secs(100), now), 0);
    }

    #[test]
    fn test_trial_line_formatting() {
        let now = SystemTime::now();
        let line = trial_line(&trial("Audible", 795, Duration::from_secs(86400), now), now);

        assert_eq!(line.name, "Audible");
        assert_eq!(line.price, "$7.95/monthly");
        assert_eq!(line.days_left, 1);
    }
}
