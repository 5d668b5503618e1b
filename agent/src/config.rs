//! Configuration management for the agent.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use tether_engine::{RetryPolicy, DEFAULT_MAX_RETRIES};

/// Agent configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Local API host address
    pub host: String,
    /// Local API port
    pub port: u16,
    /// SQLite database URL
    pub database_url: String,
    /// Base URL of the remote collections API
    pub remote_base_url: String,
    /// Bearer token sent to the remote
    pub auth_token: Option<String>,
    /// Failed attempts before an operation is evicted
    pub max_retries: u32,
    /// Evict operations the remote rejects as invalid without retrying
    pub evict_terminal_failures: bool,
    /// Per-request timeout enforced by the transport
    pub request_timeout: Duration,
    /// Health URL polled for reachability; defaults to `{remote}/health`
    pub probe_url: Option<String>,
    /// Reachability probe period
    pub probe_interval: Duration,
    /// How often the scheduler checks for queued work
    pub replay_interval: Duration,
    /// How often snapshots are refreshed while online
    pub snapshot_refresh: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = parse_or(&lookup, "PORT", 3000)?;

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://tether.db".to_string());

        let remote_base_url = lookup("REMOTE_BASE_URL").ok_or(ConfigError::MissingRemoteBaseUrl)?;
        match Url::parse(&remote_base_url) {
            Ok(url) if !url.cannot_be_a_base() => {}
            _ => {
                return Err(ConfigError::Invalid {
                    key: "REMOTE_BASE_URL",
                    value: remote_base_url,
                })
            }
        }

        let auth_token = lookup("AUTH_TOKEN").filter(|token| !token.is_empty());

        Ok(Self {
            host,
            port,
            database_url,
            remote_base_url,
            auth_token,
            max_retries: parse_or(&lookup, "MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            evict_terminal_failures: parse_or(&lookup, "EVICT_TERMINAL_FAILURES", false)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?),
            probe_url: lookup("PROBE_URL"),
            probe_interval: Duration::from_secs(parse_or(&lookup, "PROBE_INTERVAL_SECS", 10)?),
            replay_interval: Duration::from_secs(parse_or(&lookup, "REPLAY_INTERVAL_SECS", 15)?),
            snapshot_refresh: Duration::from_secs(parse_or(
                &lookup,
                "SNAPSHOT_REFRESH_SECS",
                300,
            )?),
        })
    }

    /// Retry policy derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(self.max_retries)
            .with_evict_terminal(self.evict_terminal_failures)
    }

    /// URL the reachability probe polls.
    pub fn probe_url(&self) -> String {
        self.probe_url
            .clone()
            .unwrap_or_else(|| format!("{}/health", self.remote_base_url.trim_end_matches('/')))
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("REMOTE_BASE_URL environment variable is required")]
    MissingRemoteBaseUrl,

    #[error("Invalid {key} value: {value}")]
    Invalid { key: &'static str, value: String },
}
