//! Environment-backed runtime configuration for the smoke binary.

use std::{env, time::Duration};

use thiserror::Error;
use url::Url;

use chat_core::DEFAULT_POLL_INTERVAL_MS;

/// Runtime configuration for one smoke run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /// API base URL, for example `https://chat.example.org/api`.
    pub base_url: Url,
    /// Room to mount.
    pub room_id: String,
    /// Optional bearer token for authenticated calls.
    pub token: Option<String>,
    /// Optional viewer user ID projected into the session's auth state.
    pub user_id: Option<String>,
    /// Background refresh cadence.
    pub poll_interval: Duration,
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is missing or blank.
    #[error("missing required environment variable {key}")]
    Missing {
        /// Variable name.
        key: &'static str,
    },
    /// A variable is present but not usable.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl SmokeConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base_url_raw = required_trimmed("COVECHAT_BASE_URL", &mut lookup)?;
        let base_url = Url::parse(&base_url_raw).map_err(|err| ConfigError::InvalidValue {
            key: "COVECHAT_BASE_URL",
            value: base_url_raw.clone(),
            reason: err.to_string(),
        })?;

        let room_id = required_trimmed("COVECHAT_ROOM_ID", &mut lookup)?;
        let token = optional_trimmed("COVECHAT_TOKEN", &mut lookup);
        let user_id = optional_trimmed("COVECHAT_USER_ID", &mut lookup);

        let poll_interval_ms = match optional_trimmed("COVECHAT_POLL_INTERVAL_MS", &mut lookup) {
            None => DEFAULT_POLL_INTERVAL_MS,
            Some(raw) => {
                let parsed = raw.parse::<u64>().map_err(|err| ConfigError::InvalidValue {
                    key: "COVECHAT_POLL_INTERVAL_MS",
                    value: raw.clone(),
                    reason: err.to_string(),
                })?;
                if parsed == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "COVECHAT_POLL_INTERVAL_MS",
                        value: raw,
                        reason: "must be at least 1".to_owned(),
                    });
                }
                parsed
            }
        };

        Ok(Self {
            base_url,
            room_id,
            token,
            user_id,
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }
}

fn optional_trimmed<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required_trimmed<F>(key: &'static str, lookup: &mut F) -> Result<String, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    optional_trimmed(key, lookup).ok_or(ConfigError::Missing { key })
}
