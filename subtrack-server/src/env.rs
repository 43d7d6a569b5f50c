use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use lettre::message::Mailbox;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_USERNAME_VAR: &str = "SUBTRACK_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "SUBTRACK_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "SUBTRACK_DB_HOSTNAME";
const DB_PORT_VAR: &str = "SUBTRACK_DB_PORT";
const DB_NAME_VAR: &str = "SUBTRACK_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "SUBTRACK_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "SUBTRACK_DB_IDLE_TIMEOUT_SECS";

const HASHING_KEY_VAR: &str = "SUBTRACK_HASHING_KEY_B64";
const TOKEN_SIGNING_KEY_VAR: &str = "SUBTRACK_TOKEN_SIGNING_KEY_B64";

const HASH_LENGTH_VAR: &str = "SUBTRACK_HASH_LENGTH";
const HASH_ITERATIONS_VAR: &str = "SUBTRACK_HASH_ITERATIONS";
const HASH_MEM_COST_KIB_VAR: &str = "SUBTRACK_HASH_MEM_COST_KIB";
const HASH_THREADS_VAR: &str = "SUBTRACK_HASH_THREADS";
const HASH_SALT_LENGTH_VAR: &str = "SUBTRACK_HASH_SALT_LENGTH";

const EMAIL_ENABLED_VAR: &str = "SUBTRACK_EMAIL_ENABLED";
const EMAIL_FROM_ADDR_VAR: &str = "SUBTRACK_EMAIL_FROM_ADDR";
const EMAIL_REPLY_TO_ADDR_VAR: &str = "SUBTRACK_EMAIL_REPLY_TO_ADDR";
const SMTP_USERNAME_VAR: &str = "SUBTRACK_SMTP_USERNAME";
const SMTP_KEY_VAR: &str = "SUBTRACK_SMTP_KEY";
const SMTP_ADDRESS_VAR: &str = "SUBTRACK_SMTP_ADDRESS";
const MAX_SMTP_CONNECTIONS_VAR: &str = "SUBTRACK_MAX_SMTP_CONNECTIONS";
const SMTP_IDLE_TIMEOUT_SECS_VAR: &str = "SUBTRACK_SMTP_IDLE_TIMEOUT_SECS";

const HOUSEHOLD_ACCEPT_URL_VAR: &str = "SUBTRACK_HOUSEHOLD_ACCEPT_URL";
const EXCHANGE_RATE_PROVIDER_URL_VAR: &str = "SUBTRACK_EXCHANGE_RATE_PROVIDER_URL";
const EXCHANGE_RATE_CACHE_TTL_SECS_VAR: &str = "SUBTRACK_EXCHANGE_RATE_CACHE_TTL_SECS";

const ACCESS_TOKEN_LIFETIME_MINS_VAR: &str = "SUBTRACK_ACCESS_TOKEN_LIFETIME_MINS";
const REFRESH_TOKEN_LIFETIME_DAYS_VAR: &str = "SUBTRACK_REFRESH_TOKEN_LIFETIME_DAYS";
const HOUSEHOLD_INVITE_LIFETIME_DAYS_VAR: &str = "SUBTRACK_HOUSEHOLD_INVITE_LIFETIME_DAYS";

const ACTIX_WORKER_COUNT_VAR: &str = "SUBTRACK_ACTIX_WORKER_COUNT";
const LOG_LEVEL_VAR: &str = "SUBTRACK_LOG_LEVEL";

const HASHING_KEY_SIZE: usize = 32;
const TOKEN_SIGNING_KEY_SIZE: usize = 64;

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

    pub hashing_key: [u8; HASHING_KEY_SIZE],
    pub token_signing_key: [u8; TOKEN_SIGNING_KEY_SIZE],

    pub hash_length: u32,
    pub hash_iterations: u32,
    pub hash_mem_cost_kib: u32,
    pub hash_threads: u32,
    pub hash_salt_length: u32,

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
    pub household_accept_url: String,
    #[zeroize(skip)]
    pub exchange_rate_provider_url: String,
    #[zeroize(skip)]
    pub exchange_rate_cache_ttl: Duration,

    #[zeroize(skip)]
    pub access_token_lifetime: Duration,
    #[zeroize(skip)]
    pub refresh_token_lifetime: Duration,
    #[zeroize(skip)]
    pub household_invite_lifetime: Duration,

    #[zeroize(skip)]
    pub actix_worker_count: usize,

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
        let hashing_key = match std::env::var(HASHING_KEY_VAR) {
            Ok(var) => {
                let decoded = Zeroizing::new(
                    b64.decode(var.as_bytes())
                        .map_err(|_| ConfigError::invalid(HASHING_KEY_VAR))?,
                );

                decoded[..]
                    .try_into()
                    .map_err(|_| ConfigError::invalid(HASHING_KEY_VAR))?
            }
            // Tests run without the deployment environment
            Err(_) if cfg!(test) => [8; HASHING_KEY_SIZE],
            Err(_) => return Err(ConfigError::missing(HASHING_KEY_VAR)),
        };

        let token_signing_key = match std::env::var(TOKEN_SIGNING_KEY_VAR) {
            Ok(var) => {
                let decoded = Zeroizing::new(
                    b64.decode(var.as_bytes())
                        .map_err(|_| ConfigError::invalid(TOKEN_SIGNING_KEY_VAR))?,
                );

                decoded[..]
                    .try_into()
                    .map_err(|_| ConfigError::invalid(TOKEN_SIGNING_KEY_VAR))?
            }
            Err(_) if cfg!(test) => [4; TOKEN_SIGNING_KEY_SIZE],
            Err(_) => return Err(ConfigError::missing(TOKEN_SIGNING_KEY_VAR)),
        };

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
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            hashing_key,
            token_signing_key,

            hash_length: env_var_or(HASH_LENGTH_VAR, 32),
            hash_iterations: env_var_or(HASH_ITERATIONS_VAR, 18),
            hash_mem_cost_kib: env_var_or(HASH_MEM_COST_KIB_VAR, 62500),
            hash_threads: env_var_or(HASH_THREADS_VAR, 2),
            hash_salt_length: env_var_or(HASH_SALT_LENGTH_VAR, 16),

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
            max_smtp_connections: env_var_or(MAX_SMTP_CONNECTIONS_VAR, 24),
            smtp_idle_timeout: Duration::from_secs(env_var_or(SMTP_IDLE_TIMEOUT_SECS_VAR, 60)),

            household_accept_url: env_var_or(
                HOUSEHOLD_ACCEPT_URL_VAR,
                String::from("https://app.subtrack.app/household/accept"),
            ),
            exchange_rate_provider_url: env_var_or(
                EXCHANGE_RATE_PROVIDER_URL_VAR,
                String::from("https://api.frankfurter.app/latest?from=USD"),
            ),
            exchange_rate_cache_ttl: Duration::from_secs(env_var_or(
                EXCHANGE_RATE_CACHE_TTL_SECS_VAR,
                3600,
            )),

            access_token_lifetime: Duration::from_secs(
                env_var_or(ACCESS_TOKEN_LIFETIME_MINS_VAR, 15) * 60,
            ),
            refresh_token_lifetime: Duration::from_secs(
                env_var_or(REFRESH_TOKEN_LIFETIME_DAYS_VAR, 30) * 86400,
            ),
            household_invite_lifetime: Duration::from_secs(
                env_var_or(HOUSEHOLD_INVITE_LIFETIME_DAYS_VAR, 7) * 86400,
            ),

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),

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
fn env_var_required<T: FromStr>(key: &'static str, test_default: &'static str) -> Result<T, ConfigError> {
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
