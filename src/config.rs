//! Run configuration from environment variables.
//!
//! | Variable | Required | Default |
//! |---|---|---|
//! | `QB_USERNAME` | yes | |
//! | `QB_SECRET` | yes | |
//! | `QB_DAYS_BACK` | no | 30 |
//! | `DOWNLOAD_DIR` | yes | |
//! | `BASE_URL` | yes | |
//! | `QB_SKIP_POLICY` | no | `verify` |
//! | `QB_CONNECT_TIMEOUT_SECS` | no | 30 |
//! | `QB_READ_TIMEOUT_SECS` | no | 300 |
//!
//! Blank values count as missing.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use thiserror::Error;
use url::Url;

use crate::auth::Credential;
use crate::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::ledger::Ledger;
use crate::sweep::SkipPolicy;

/// Assertion subject.
pub const ENV_USERNAME: &str = "QB_USERNAME";
/// HS256 signing secret.
pub const ENV_SECRET: &str = "QB_SECRET";
/// Report creation window in days.
pub const ENV_DAYS_BACK: &str = "QB_DAYS_BACK";
/// Destination directory.
pub const ENV_DOWNLOAD_DIR: &str = "DOWNLOAD_DIR";
/// API root URL.
pub const ENV_BASE_URL: &str = "BASE_URL";
/// `verify` or `ledger`.
pub const ENV_SKIP_POLICY: &str = "QB_SKIP_POLICY";
/// HTTP connect timeout in seconds.
pub const ENV_CONNECT_TIMEOUT: &str = "QB_CONNECT_TIMEOUT_SECS";
/// HTTP request timeout in seconds.
pub const ENV_READ_TIMEOUT: &str = "QB_READ_TIMEOUT_SECS";

/// Default report creation window.
pub const DEFAULT_DAYS_BACK: u32 = 30;

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required setting {key}")]
    Missing {
        /// Variable name.
        key: &'static str,
    },

    /// A variable is set but unusable.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Everything one sweep needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// API credential.
    pub credential: Credential,
    /// Reports created within this many days are listed.
    pub days_back: u32,
    /// Where artifacts and the ledger live.
    pub download_dir: PathBuf,
    /// API root.
    pub base_url: Url,
    /// Which "already downloaded" check the sweep applies.
    pub skip_policy: SkipPolicy,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP request timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|_| None)
    }

    /// Loads configuration from the process environment, consulting
    /// `overrides` first for each variable (command-line flags).
    ///
    /// # Errors
    ///
    /// See [`Config::from_lookup`].
    pub fn from_env_with<F>(overrides: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| overrides(key).or_else(|| std::env::var(key).ok()))
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an absent required variable and
    /// [`ConfigError::Invalid`] for one that does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing { key });

        let username = require(ENV_USERNAME)?;
        let secret = require(ENV_SECRET)?;
        let download_dir = PathBuf::from(require(ENV_DOWNLOAD_DIR)?);
        let base_url = parse_base_url(&require(ENV_BASE_URL)?)?;

        let days_back = get(ENV_DAYS_BACK)
            .map(|value| parse_number::<u32>(ENV_DAYS_BACK, &value))
            .transpose()?
            .unwrap_or(DEFAULT_DAYS_BACK);
        let skip_policy = get(ENV_SKIP_POLICY)
            .map(|value| {
                SkipPolicy::from_str(&value).map_err(|reason| ConfigError::Invalid {
                    key: ENV_SKIP_POLICY,
                    value,
                    reason,
                })
            })
            .transpose()?
            .unwrap_or_default();
        let connect_timeout_secs = timeout(get(ENV_CONNECT_TIMEOUT), ENV_CONNECT_TIMEOUT)?
            .unwrap_or(CONNECT_TIMEOUT_SECS);
        let read_timeout_secs =
            timeout(get(ENV_READ_TIMEOUT), ENV_READ_TIMEOUT)?.unwrap_or(READ_TIMEOUT_SECS);

        Ok(Self {
            credential: Credential::new(username, secret),
            days_back,
            download_dir,
            base_url,
            skip_policy,
            connect_timeout_secs,
            read_timeout_secs,
        })
    }

    /// Returns the `created_after` lower bound: `today - days_back`.
    #[must_use]
    pub fn date_from(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.days_back)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Returns the ledger path inside the download directory.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        Ledger::path_in(&self.download_dir)
    }
}

fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: ENV_BASE_URL,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url)
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn timeout(value: Option<String>, key: &'static str) -> Result<Option<u64>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match parse_number::<u64>(key, &value)? {
        0 => Err(ConfigError::Invalid {
            key,
            value,
            reason: "must be at least 1 second".to_string(),
        }),
        secs => Ok(Some(secs)),
    }
}
