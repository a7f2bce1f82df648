// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`EngineConfig`] loaded from
//! them at startup. Values are trimmed; empty values count as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `LEDGER_API_URL` | Base URL of the ledger API | `http://localhost:8000` |
//! | `DATA_DIR` | Root directory for credentials and the signing secret | `./data` |
//! | `REQUEST_TIMEOUT_SECS` | Deadline for one API call, refresh and retry included | `15` |
//! | `POLL_INTERVAL_SECS` | Seconds between inbox sweeps | `300` |
//! | `POLL_BATCH_SIZE` | Recent messages read per sweep | `10` |
//! | `CAPTURE_ENABLED` | Start with automatic capture on | `false` |
//! | `COMMISSION_RATE_YANGO` | Yango commission as a fraction | `0.10` |
//! | `COMMISSION_RATE_BOLT` | Bolt commission as a fraction; set `0.12` for Bolt's current rate | `0.10` |
//! | `MAX_MESSAGE_AMOUNT` | Amounts at or above this are ignored as balances | `10000` |
//! | `SIGN_REQUESTS` | Add `request_hash` to ledger writes | `true` |
//! | `INBOX_PATH` | JSON inbox read by the poller | `{DATA_DIR}/inbox.json` |
//! | `LEDGER_USERNAME` | Login used when no remembered session exists | - |
//! | `LEDGER_PASSWORD` | Password for `LEDGER_USERNAME` | - |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::logging::LogFormat;
use crate::sms::commission::{CommissionRates, DEFAULT_COMMISSION_RATE};
use crate::sms::parser::DEFAULT_MAX_AMOUNT;
use crate::storage::paths::{StoragePaths, DATA_ROOT};

pub const LEDGER_API_URL_ENV: &str = "LEDGER_API_URL";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const REQUEST_TIMEOUT_SECS_ENV: &str = "REQUEST_TIMEOUT_SECS";
pub const POLL_INTERVAL_SECS_ENV: &str = "POLL_INTERVAL_SECS";
pub const POLL_BATCH_SIZE_ENV: &str = "POLL_BATCH_SIZE";
pub const CAPTURE_ENABLED_ENV: &str = "CAPTURE_ENABLED";
pub const COMMISSION_RATE_YANGO_ENV: &str = "COMMISSION_RATE_YANGO";
pub const COMMISSION_RATE_BOLT_ENV: &str = "COMMISSION_RATE_BOLT";
pub const MAX_MESSAGE_AMOUNT_ENV: &str = "MAX_MESSAGE_AMOUNT";
pub const SIGN_REQUESTS_ENV: &str = "SIGN_REQUESTS";
pub const INBOX_PATH_ENV: &str = "INBOX_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const LEDGER_USERNAME_ENV: &str = "LEDGER_USERNAME";
pub const LEDGER_PASSWORD_ENV: &str = "LEDGER_PASSWORD";

/// Local development ledger.
pub const DEFAULT_LEDGER_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_POLL_BATCH_SIZE: usize = 10;

#[derive(Debug, thiserror::Error)]
#[error("invalid {name}={value:?}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Login for unattended startup. The password never appears in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub ledger_api_url: String,
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub poll_batch_size: usize,
    pub capture_enabled: bool,
    pub commission: CommissionRates,
    pub max_message_amount: Decimal,
    pub sign_requests: bool,
    pub inbox_path: Option<PathBuf>,
    pub log_format: LogFormat,
    pub login: Option<LoginCredentials>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ledger_api_url: DEFAULT_LEDGER_API_URL.to_string(),
            data_dir: PathBuf::from(DATA_ROOT),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_batch_size: DEFAULT_POLL_BATCH_SIZE,
            capture_enabled: false,
            commission: CommissionRates::default(),
            max_message_amount: DEFAULT_MAX_AMOUNT,
            sign_requests: true,
            inbox_path: None,
            log_format: LogFormat::Pretty,
            login: None,
        }
    }
}

impl EngineConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let ledger_api_url = env.or_default(LEDGER_API_URL_ENV, DEFAULT_LEDGER_API_URL);
        url::Url::parse(&ledger_api_url).map_err(|e| ConfigError {
            name: LEDGER_API_URL_ENV,
            value: ledger_api_url.clone(),
            reason: e.to_string(),
        })?;

        let request_timeout_secs: u64 =
            env.parsed(REQUEST_TIMEOUT_SECS_ENV, DEFAULT_REQUEST_TIMEOUT_SECS)?;
        if request_timeout_secs == 0 {
            return Err(env.invalid(REQUEST_TIMEOUT_SECS_ENV, "must be at least 1"));
        }
        let poll_interval_secs: u64 =
            env.parsed(POLL_INTERVAL_SECS_ENV, DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_interval_secs == 0 {
            return Err(env.invalid(POLL_INTERVAL_SECS_ENV, "must be at least 1"));
        }
        let poll_batch_size: usize = env.parsed(POLL_BATCH_SIZE_ENV, DEFAULT_POLL_BATCH_SIZE)?;
        if poll_batch_size == 0 {
            return Err(env.invalid(POLL_BATCH_SIZE_ENV, "must be at least 1"));
        }

        let commission = CommissionRates {
            yango: env.rate(COMMISSION_RATE_YANGO_ENV)?,
            bolt: env.rate(COMMISSION_RATE_BOLT_ENV)?,
        };
        let max_message_amount: Decimal =
            env.parsed(MAX_MESSAGE_AMOUNT_ENV, DEFAULT_MAX_AMOUNT)?;
        if max_message_amount <= Decimal::ZERO {
            return Err(env.invalid(MAX_MESSAGE_AMOUNT_ENV, "must be positive"));
        }

        let log_format = match env.optional(LOG_FORMAT_ENV) {
            Some(value) => value
                .parse()
                .map_err(|reason: String| env.invalid(LOG_FORMAT_ENV, &reason))?,
            None => LogFormat::Pretty,
        };

        let login = match (
            env.optional(LEDGER_USERNAME_ENV),
            env.optional(LEDGER_PASSWORD_ENV),
        ) {
            (Some(username), Some(password)) => Some(LoginCredentials { username, password }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(env.invalid(LEDGER_PASSWORD_ENV, "required with LEDGER_USERNAME"))
            }
            (None, Some(_)) => {
                return Err(ConfigError {
                    name: LEDGER_USERNAME_ENV,
                    value: String::new(),
                    reason: "required with LEDGER_PASSWORD".to_string(),
                })
            }
        };

        Ok(Self {
            ledger_api_url,
            data_dir: PathBuf::from(env.or_default(DATA_DIR_ENV, DATA_ROOT)),
            request_timeout: Duration::from_secs(request_timeout_secs),
            poll_interval: Duration::from_secs(poll_interval_secs),
            poll_batch_size,
            capture_enabled: env.flag(CAPTURE_ENABLED_ENV, false)?,
            commission,
            max_message_amount,
            sign_requests: env.flag(SIGN_REQUESTS_ENV, true)?,
            inbox_path: env.optional(INBOX_PATH_ENV).map(PathBuf::from),
            log_format,
            login,
        })
    }

    /// Inbox read by the poller: `INBOX_PATH`, else `{DATA_DIR}/inbox.json`.
    pub fn inbox_path(&self) -> PathBuf {
        self.inbox_path
            .clone()
            .unwrap_or_else(|| StoragePaths::new(&self.data_dir).inbox())
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn invalid(&self, name: &'static str, reason: &str) -> ConfigError {
        ConfigError {
            name,
            value: self.optional(name).unwrap_or_default(),
            reason: reason.to_string(),
        }
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError {
                name,
                value,
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(name).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(_) => Err(self.invalid(name, "expected true or false")),
        }
    }

    fn rate(&self, name: &'static str) -> Result<Decimal, ConfigError> {
        let rate: Decimal = self.parsed(name, DEFAULT_COMMISSION_RATE)?;
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(self.invalid(name, "must be between 0 and 1"));
        }
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.commission.yango, Decimal::new(10, 2));
        assert!(config.sign_requests);
        assert!(!config.capture_enabled);
        assert_eq!(config.inbox_path(), PathBuf::from("./data/inbox.json"));
    }

    #[test]
    fn values_are_trimmed_and_parsed() {
        let config = load(&[
            (LEDGER_API_URL_ENV, "  https://ledger.example.com/api  "),
            (DATA_DIR_ENV, "/var/lib/momo"),
            (POLL_INTERVAL_SECS_ENV, "60"),
            (CAPTURE_ENABLED_ENV, "TRUE"),
            (COMMISSION_RATE_BOLT_ENV, "0.15"),
            (SIGN_REQUESTS_ENV, "off"),
            (INBOX_PATH_ENV, "/tmp/inbox.json"),
            (LOG_FORMAT_ENV, "json"),
        ])
        .unwrap();
        assert_eq!(config.ledger_api_url, "https://ledger.example.com/api");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/momo"));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert!(config.capture_enabled);
        assert_eq!(config.commission.bolt, Decimal::new(15, 2));
        assert_eq!(config.commission.yango, Decimal::new(10, 2));
        assert!(!config.sign_requests);
        assert_eq!(config.inbox_path(), PathBuf::from("/tmp/inbox.json"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn bolt_standard_rate_applies_to_split() {
        let config = load(&[(COMMISSION_RATE_BOLT_ENV, "0.12")]).unwrap();
        let split = config
            .commission
            .split(Decimal::new(5000, 2), crate::ledger::models::Platform::Bolt);
        assert_eq!(split.platform_debt, Decimal::new(600, 2));
        assert_eq!(split.rider_profit, Decimal::new(4400, 2));
    }

    #[test]
    fn login_needs_both_halves() {
        let config = load(&[(LEDGER_USERNAME_ENV, "rider"), (LEDGER_PASSWORD_ENV, "s3cret")])
            .unwrap();
        let login = config.login.unwrap();
        assert_eq!(login.username, "rider");
        assert!(!format!("{login:?}").contains("s3cret"));

        assert!(load(&[(LEDGER_USERNAME_ENV, "rider")]).is_err());
        assert!(load(&[(LEDGER_PASSWORD_ENV, "s3cret")]).is_err());
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = load(&[(DATA_DIR_ENV, "   "), (POLL_BATCH_SIZE_ENV, "")]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(DATA_ROOT));
        assert_eq!(config.poll_batch_size, DEFAULT_POLL_BATCH_SIZE);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = load(&[(COMMISSION_RATE_YANGO_ENV, "1.5")]).unwrap_err();
        assert_eq!(err.name, COMMISSION_RATE_YANGO_ENV);

        let err = load(&[(POLL_BATCH_SIZE_ENV, "many")]).unwrap_err();
        assert_eq!(err.name, POLL_BATCH_SIZE_ENV);
        assert_eq!(err.value, "many");

        assert!(load(&[(REQUEST_TIMEOUT_SECS_ENV, "0")]).is_err());
        assert!(load(&[(CAPTURE_ENABLED_ENV, "maybe")]).is_err());
        assert!(load(&[(LEDGER_API_URL_ENV, "not a url")]).is_err());
        assert!(load(&[(LOG_FORMAT_ENV, "xml")]).is_err());
    }
}
