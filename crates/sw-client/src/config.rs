use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::progress::ProgressConfig;
use crate::readiness::ReadinessConfig;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    pub request_timeout: Duration,
    pub readiness: ReadinessConfig,
    pub status_poll_interval: Duration,
    /// Live progress stream; `None` leaves status to polling alone.
    pub progress: Option<ProgressConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            readiness: ReadinessConfig::default(),
            status_poll_interval: Duration::from_millis(1500),
            progress: Some(ProgressConfig::for_backend(DEFAULT_BACKEND_URL)),
        }
    }
}

impl ClientConfig {
    /// Load from `.env` (if present) and the process environment.
    pub fn load() -> anyhow::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e).context("Failed to read .env file");
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let readiness = defaults.readiness.clone();

        let backend_url = lookup("SWEEDLE_BACKEND_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.backend_url);

        let progress = if parse_or(&lookup, "SWEEDLE_LIVE_PROGRESS", true)? {
            let mut progress = ProgressConfig::for_backend(&backend_url);
            if let Some(url) = lookup("SWEEDLE_PROGRESS_URL") {
                progress.url = url;
            }
            Some(progress)
        } else {
            None
        };

        Ok(Self {
            backend_url,
            request_timeout: parse_or(&lookup, "SWEEDLE_REQUEST_TIMEOUT_SECS", 30)
                .map(Duration::from_secs)?,
            readiness: ReadinessConfig {
                poll_interval: millis_or(&lookup, "SWEEDLE_READY_POLL_MS", readiness.poll_interval)?,
                grace_delay: millis_or(&lookup, "SWEEDLE_READY_GRACE_MS", readiness.grace_delay)?,
                backoff_base: millis_or(&lookup, "SWEEDLE_BACKOFF_BASE_MS", readiness.backoff_base)?,
                backoff_multiplier: parse_or(
                    &lookup,
                    "SWEEDLE_BACKOFF_MULTIPLIER",
                    readiness.backoff_multiplier,
                )?,
                backoff_max: millis_or(&lookup, "SWEEDLE_BACKOFF_MAX_MS", readiness.backoff_max)?,
                not_responding_after: parse_or(
                    &lookup,
                    "SWEEDLE_NOT_RESPONDING_AFTER",
                    readiness.not_responding_after,
                )?,
            },
            status_poll_interval: millis_or(
                &lookup,
                "SWEEDLE_STATUS_POLL_MS",
                defaults.status_poll_interval,
            )?,
            progress,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn millis_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    parse_or(lookup, key, default.as_millis() as u64).map(Duration::from_millis)
}
