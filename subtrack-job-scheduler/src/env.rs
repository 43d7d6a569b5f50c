use lettre::message::Mailbox;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroize;

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_USERNAME_VAR: &str = "SUBTRACK_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "SUBTRACK_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "SUBTRACK_DB_HOSTNAME";
const DB_PORT_VAR: &str = "SUBTRACK_DB_PORT";
const DB_NAME_VAR: &str = "SUBTRACK_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "SUBTRACK_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "SUBTRACK_DB_IDLE_TIMEOUT_SECS";

const EMAIL_ENABLED_VAR: &str = "SUBTRACK_EMAIL_ENABLED";
const EMAIL_FROM_ADDR_VAR: &str = "SUBTRACK_EMAIL_FROM_ADDR";
const EMAIL_REPLY_TO_ADDR_VAR: &str = "SUBTRACK_EMAIL_REPLY_TO_ADDR";
const SMTP_USERNAME_VAR: &str = "SUBTRACK_SMTP_USERNAME";
const SMTP_KEY_VAR: &str = "SUBTRACK_SMTP_KEY";
const SMTP_ADDRESS_VAR: &str = "SUBTRACK_SMTP_ADDRESS";
const MAX_SMTP_CONNECTIONS_VAR: &str = "SUBTRACK_MAX_SMTP_CONNECTIONS";
const SMTP_IDLE_TIMEOUT_SECS_VAR: &str = "SUBTRACK_SMTP_IDLE_TIMEOUT_SECS";

const UPDATE_FREQUENCY_SECS_VAR: &str = "SUBTRACK_JOB_RUNNER_UPDATE_FREQUENCY_SECS";
const WORKER_THREADS_VAR: &str = "SUBTRACK_JOB_RUNNER_WORKER_THREADS";
const MAX_BLOCKING_THREADS_VAR: &str = "SUBTRACK_JOB_RUNNER_MAX_BLOCKING_THREADS";

const RENEWAL_REMINDER_JOB_FREQUENCY_SECS_VAR: &str =
    "SUBTRACK_RENEWAL_REMINDER_JOB_FREQUENCY_SECS";
const RENEWAL_REMINDER_LOOKAHEAD_DAYS_VAR: &str = "SUBTRACK_RENEWAL_REMINDER_LOOKAHEAD_DAYS";
const TRIAL_REMINDER_JOB_FREQUENCY_SECS_VAR: &str = "SUBTRACK_TRIAL_REMINDER_JOB_FREQUENCY_SECS";
const TRIAL_REMINDER_LOOKAHEAD_DAYS_VAR: &str = "SUBTRACK_TRIAL_REMINDER_LOOKAHEAD_DAYS";

const LOG_LEVEL_VAR: &str = "SUBTRACK_LOG_LEVEL";

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,

    pub email_enabled: bool,
    #[zeroize(skip)]
    pub email_from_address: Mailbox,
    #[zeroize(skip)]
    pub email_reply_to_address: Mailbox,
    pub smtp_username: String,
    pub smtp_key: String,
    pub smtp_address: String,
    #[zeroize(skip)]
    pub max_smtp_connections: u32,
    #[zeroize(skip)]
    pub smtp_idle_timeout: Duration,

    #[zeroize(skip)]
    pub update_frequency: Duration,
    #[zeroize(skip)]
    pub worker_threads: usize,
    #[zeroize(skip)]
    pub max_blocking_threads: usize,

    #[zeroize(skip)]
    pub renewal_reminder_job_frequency: Duration,
    #[zeroize(skip)]
    pub renewal_reminder_lookahead: Duration,
    #[zeroize(skip)]
    pub trial_reminder_job_frequency: Duration,
    #[zeroize(skip)]
    pub trial_reminder_lookahead: Duration,

    #[zeroize(skip)]
    pub log_level: String,
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let email_from_address: Mailbox = env_var_or(
            EMAIL_FROM_ADDR_VAR,
            String::from("SubTrack <no-reply@subtrack.app>"),
        )
        .parse()
        .map_err(|_| ConfigError::invalid(EMAIL_FROM_ADDR_VAR))?;
        let email_reply_to_address: Mailbox = env_var_or(
            EMAIL_REPLY_TO_ADDR_VAR,
            String::from("SubTrack <no-reply@subtrack.app>"),
        )
        .parse()
        .map_err(|_| ConfigError::invalid(EMAIL_REPLY_TO_ADDR_VAR))?;

        let inner = ConfigInner {
            db_username: env_var_required(DB_USERNAME_VAR, "postgres")?,
            db_password: env_var_required(DB_PASSWORD_VAR, "password")?,
            db_hostname: env_var_required(DB_HOSTNAME_VAR, "localhost")?,
            db_port: env_var_required(DB_PORT_VAR, "5432")?,
            db_name: env_var_required(DB_NAME_VAR, "subtrack")?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 8),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            email_enabled: if cfg!(test) {
                false
            } else {
                env_var_or(EMAIL_ENABLED_VAR, false)
            },
            email_from_address,
            email_reply_to_address,
            smtp_username: env_var_or(SMTP_USERNAME_VAR, String::new()),
            smtp_key: env_var_or(SMTP_KEY_VAR, String::new()),
            smtp_address: env_var_or(SMTP_ADDRESS_VAR, String::new()),
            max_smtp_connections: env_var_or(MAX_SMTP_CONNECTIONS_VAR, 8),
            smtp_idle_timeout: Duration::from_secs(env_var_or(SMTP_IDLE_TIMEOUT_SECS_VAR, 60)),

            update_frequency: Duration::from_secs(env_var_or(UPDATE_FREQUENCY_SECS_VAR, 30)),
            worker_threads: env_var_or(WORKER_THREADS_VAR, num_cpus::get()),
            max_blocking_threads: env_var_or(MAX_BLOCKING_THREADS_VAR, 16),

            renewal_reminder_job_frequency: Duration::from_secs(env_var_or(
                RENEWAL_REMINDER_JOB_FREQUENCY_SECS_VAR,
                86400,
            )),
            renewal_reminder_lookahead: Duration::from_secs(
                env_var_or(RENEWAL_REMINDER_LOOKAHEAD_DAYS_VAR, 7) * 86400,
            ),
            trial_reminder_job_frequency: Duration::from_secs(env_var_or(
                TRIAL_REMINDER_JOB_FREQUENCY_SECS_VAR,
                86400,
            )),
            trial_reminder_lookahead: Duration::from_secs(
                env_var_or(TRIAL_REMINDER_LOOKAHEAD_DAYS_VAR, 3) * 86400,
            ),

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

// Required in deployment. Tests run without the deployment environment, so
// they fall back to a fixed default.
fn env_var_required<T: FromStr>(
    key: &'static str,
    test_default: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(var) => var.parse().map_err(|_| ConfigError::invalid(key)),
        Err(_) if cfg!(test) => test_default.parse().map_err(|_| ConfigError::invalid(key)),
        Err(_) => Err(ConfigError::missing(key)),
    }
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}
