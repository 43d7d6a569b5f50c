mod send_renewal_reminders;
mod send_trial_conversion_reminders;

pub use send_renewal_reminders::SendRenewalRemindersJob;
pub use send_trial_conversion_reminders::SendTrialConversionRemindersJob;

use subtrack_common::db::DaoError;
use subtrack_common::email::EmailError;
use subtrack_common::models::subscription::Subscription;

use async_trait::async_trait;
use std::fmt;
use tokio::task::JoinError;

/// Collapses (email, subscription) rows into one group per user so each user
/// receives a single digest. Rows must arrive sorted by email.
fn group_by_email(rows: Vec<(String, Subscription)>) -> Vec<(String, Vec<Subscription>)> {
    let mut groups: Vec<(String, Vec<Subscription>)> = Vec::new();

    for (email, subscription) in rows {
        match groups.last_mut() {
            Some((last_email, subscriptions)) if *last_email == email => {
                subscriptions.push(subscription);
            }
            _ => groups.push((email, vec![subscription])),
        }
    }

    groups
}

#[derive(Debug)]
pub enum JobError {
    DaoFailure(Option<DaoError>),
    EmailFailure(EmailError),
    ConcurrencyError(JoinError),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::DaoFailure(e) => {
                if let Some(inner_err) = e {
                    write!(f, "JobError: {inner_err}")
                } else {
                    write!(f, "JobError: DaoFailure")
                }
            }
            JobError::EmailFailure(e) => {
                write!(f, "JobError: EmailFailure: {e}")
            }
            JobError::ConcurrencyError(e) => {
                write!(f, "JobError: ConcurrencyError: {e}")
            }
        }
    }
}

impl From<DaoError> for JobError {
    fn from(e: DaoError) -> Self {
        JobError::DaoFailure(Some(e))
    }
}

impl From<EmailError> for JobError {
    fn from(e: EmailError) -> Self {
        JobError::EmailFailure(e)
    }
}

impl From<JoinError> for JobError {
    fn from(e: JoinError) -> Self {
        JobError::ConcurrencyError(e)
    }
}

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<(), JobError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    pub struct MockJob {
        pub is_running: bool,
        pub runs: Arc<Mutex<usize>>,
    }

    impl MockJob {
        pub fn new() -> Self {
            Self {
                is_running: false,
                runs: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl Job for MockJob {
        fn name(&self) -> &'static str {
            "Mock"
        }

        fn is_ready(&self) -> bool {
            !self.is_running
        }

        async fn execute(&mut self) -> Result<(), JobError> {
            *self.runs.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_mock_job_counts_runs() {
        let mut job = MockJob::new();
        let run_count = Arc::clone(&job.runs);

        assert!(job.is_ready());
        assert_eq!(*run_count.lock().unwrap(), 0);

        job.execute().await.unwrap();
        job.execute().await.unwrap();

        assert_eq!(*run_count.lock().unwrap(), 2);
    }
}
