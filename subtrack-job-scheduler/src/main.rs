use subtrack_common::db::create_db_thread_pool;
use subtrack_common::email::senders::{MockSender, SmtpRelay};
use subtrack_common::email::SendEmail;

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use std::sync::Arc;
use zeroize::Zeroizing;

mod env;
mod jobs;
mod runner;

use jobs::{SendRenewalRemindersJob, SendTrialConversionRemindersJob};
use runner::JobRunner;

fn main() {
    let db_uri = Zeroizing::new(format!(
        "postgres://{}:{}@{}:{}/{}",
        env::CONF.db_username,
        env::CONF.db_password,
        env::CONF.db_hostname,
        env::CONF.db_port,
        env::CONF.db_name,
    ));

    let db_thread_pool = create_db_thread_pool(
        &db_uri,
        env::CONF.db_max_connections,
        env::CONF.db_idle_timeout,
    );

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(env::CONF.worker_threads)
        .max_blocking_threads(env::CONF.max_blocking_threads)
        .enable_all()
        .build()
        .expect("Failed to launch asynchronous runtime")
        .block_on(async move {
            Logger::try_with_str(&env::CONF.log_level)
                .expect(
                    "Invalid log level. Options: ERROR, WARN, INFO, DEBUG, TRACE. \
                     Example: `info, my::critical::module=trace`",
                )
                .log_to_file(FileSpec::default().directory("./logs"))
                .rotate(
                    Criterion::Age(Age::Day),
                    Naming::Timestamps,
                    Cleanup::KeepLogAndCompressedFiles(60, 365),
                )
                .cleanup_in_background_thread(true)
                .duplicate_to_stdout(Duplicate::All)
                .write_mode(WriteMode::BufferAndFlush)
                .format(|writer, now, record| {
                    write!(
                        writer,
                        "{:5} | {} | {}:{} | {}",
                        record.level(),
                        now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                        record.module_path().unwrap_or("<unknown>"),
                        record.line().unwrap_or(0),
                        record.args()
                    )
                })
                .use_utc()
                .start()
                .expect("Failed to start logger");

            let email_sender: Box<dyn SendEmail> = if env::CONF.email_enabled {
                log::info!("Connecting to SMTP relay...");

                let relay = SmtpRelay::with_credentials(
                    &env::CONF.smtp_username,
                    &env::CONF.smtp_key,
                    &env::CONF.smtp_address,
                    env::CONF.max_smtp_connections,
                    env::CONF.smtp_idle_timeout,
                )
                .expect("Failed to connect to SMTP relay");

                match relay.test_connection().await {
                    Ok(true) => (),
                    Ok(false) => panic!("Failed to connect to SMTP relay"),
                    Err(e) => panic!("Failed to connect to SMTP relay: {e}"),
                }

                log::info!("Successfully connected to SMTP relay");

                Box::new(relay)
            } else {
                log::info!("Emails are disabled. Using mock SMTP thread pool.");
                Box::new(MockSender::new())
            };

            let email_sender = Arc::new(email_sender);

            let mut job_runner = JobRunner::new(env::CONF.update_frequency, db_thread_pool.clone());

            job_runner
                .register(
                    Box::new(SendRenewalRemindersJob::new(
                        db_thread_pool.clone(),
                        Arc::clone(&email_sender),
                        env::CONF.renewal_reminder_lookahead,
                    )),
                    env::CONF.renewal_reminder_job_frequency,
                )
                .await;

            job_runner
                .register(
                    Box::new(SendTrialConversionRemindersJob::new(
                        db_thread_pool.clone(),
                        Arc::clone(&email_sender),
                        env::CONF.trial_reminder_lookahead,
                    )),
                    env::CONF.trial_reminder_job_frequency,
                )
                .await;

            job_runner.start().await;
        });

    #[allow(unreachable_code)]
    unsafe {
        env::CONF.zeroize();
    }
}
