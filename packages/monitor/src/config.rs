//! Environment configuration for the monitor daemon.
//!
//! Summarizer credentials (`OPENAI_API_KEY`, `AI_MODEL`, `AI_BASE_URL`) are
//! read by the AI crate itself; everything else lives here.

use std::{env, num::ParseIntError, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::DEFAULT_POLL_INTERVAL;

/// Default store file, in the working directory.
const DEFAULT_STORE_PATH: &str = "incident_log.json";

/// Errors that can occur while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing env var: {0}")]
    MissingEnv(String),

    /// An environment variable did not parse as an integer.
    #[error("invalid integer in env var {name}: {source}")]
    InvalidInteger {
        /// The variable name.
        name: String,
        /// The parse failure.
        source: ParseIntError,
    },
}

/// Everything the daemon needs from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// CHP communications center code (e.g. `BCCC`).
    pub com_center: String,
    /// Path of the persisted incident log.
    pub store_path: PathBuf,
    /// Delay between monitor cycles.
    pub poll_interval: Duration,
    /// Telegram bot token for publishing alerts.
    pub telegram_bot_token: String,
    /// Telegram chat to publish into.
    pub telegram_chat_id: i64,
    /// Mapbox access token for map rendering.
    pub map_access_token: String,
}

impl AppConfig {
    /// Reads the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or an
    /// integer variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let com_center = com_center_from_env();
        let store_path = store_path_from_env();
        let poll_interval = env::var("TRAFFIC_WATCH_POLL_SECONDS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map_or(DEFAULT_POLL_INTERVAL, Duration::from_secs);

        let telegram_bot_token = read_required("TRAFFIC_WATCH_TELEGRAM_BOT_TOKEN")?;
        let telegram_chat_id = read_i64("TRAFFIC_WATCH_TELEGRAM_CHAT_ID")?;
        let map_access_token = read_required("MAP_ACCESS_TOKEN")?;

        Ok(Self {
            com_center,
            store_path,
            poll_interval,
            telegram_bot_token,
            telegram_chat_id,
            map_access_token,
        })
    }
}

/// The configured communications center (`TRAFFIC_WATCH_COM_CENTER`).
///
/// Exposed separately so read-only commands (one-shot fetch) don't need the
/// publishing credentials [`AppConfig::from_env`] requires.
#[must_use]
pub fn com_center_from_env() -> String {
    env::var("TRAFFIC_WATCH_COM_CENTER")
        .unwrap_or_else(|_| traffic_watch_source::chp::DEFAULT_COM_CENTER.to_owned())
}

/// The configured store path (`TRAFFIC_WATCH_STORE_PATH`).
#[must_use]
pub fn store_path_from_env() -> PathBuf {
    PathBuf::from(
        env::var("TRAFFIC_WATCH_STORE_PATH").unwrap_or_else(|_| DEFAULT_STORE_PATH.to_owned()),
    )
}

fn read_required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_owned()))
}

fn read_i64(name: &str) -> Result<i64, ConfigError> {
    let raw = read_required(name)?;
    raw.parse::<i64>().map_err(|source| ConfigError::InvalidInteger {
        name: name.to_owned(),
        source,
    })
}
