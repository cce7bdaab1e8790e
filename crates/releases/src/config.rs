//! Configuration for the release service.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use scm::settings::DEFAULT_REQUEST_TIMEOUT;
use scm::ProviderSettings;
use tracing::warn;

use crate::error::StatusMapping;
use crate::poller::{Backoff, PollPolicy};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Format selected by `LOG_FORMAT`, read before tracing is initialised.
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Release service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Provider API locations, tokens and request timeout.
    pub providers: ProviderSettings,
    /// Mergeability polling policy.
    pub poll: PollPolicy,
    /// JSON document holding repository records. In-memory when unset.
    pub store_path: Option<PathBuf>,
    /// HTTP status per outcome kind.
    pub statuses: StatusMapping,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }
}

impl Config {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Build configuration from `lookup`, falling back to defaults for unset
    /// or unparseable values.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str, default: u64| -> u64 {
            match var(key) {
                Some(raw) => raw.parse().unwrap_or_else(|_| {
                    warn!(key, value = %raw, default, "Invalid number, using default");
                    default
                }),
                None => default,
            }
        };

        let mut providers = ProviderSettings::default();
        if let Some(url) = var("GITHUB_API_URL") {
            providers.github.api_url = url;
        }
        if let Some(url) = var("GITLAB_API_URL") {
            providers.gitlab.api_url = url;
        }
        providers.github.token = var("GITHUB_TOKEN");
        providers.gitlab.token = var("GITLAB_TOKEN");
        providers.request_timeout = Duration::from_secs(number(
            "SCM_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
        ));

        let defaults = PollPolicy::default();
        let delay = Duration::from_millis(number(
            "MERGE_POLL_DELAY_MS",
            u64::try_from(defaults.delay.as_millis()).unwrap_or(2_000),
        ));
        let backoff = match var("MERGE_POLL_BACKOFF").as_deref() {
            None | Some("fixed") => Backoff::Fixed,
            Some("exponential") => Backoff::Exponential {
                multiplier: 2.0,
                max_delay: Duration::from_millis(number("MERGE_POLL_MAX_DELAY_MS", 30_000)),
            },
            Some(other) => {
                warn!(value = other, "Unknown MERGE_POLL_BACKOFF, using fixed");
                Backoff::Fixed
            }
        };
        let poll = PollPolicy {
            max_attempts: u32::try_from(number(
                "MERGE_POLL_MAX_ATTEMPTS",
                u64::from(defaults.max_attempts),
            ))
            .unwrap_or(defaults.max_attempts),
            delay,
            backoff,
        };

        let statuses = match var("RELEASE_STATUS_OVERRIDES") {
            Some(raw) => StatusMapping::parse_overrides(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Invalid RELEASE_STATUS_OVERRIDES, using defaults");
                StatusMapping::default()
            }),
            None => StatusMapping::default(),
        };

        let log_format = LogFormat::parse(var("LOG_FORMAT").as_deref());

        Self {
            port: u16::try_from(number("RELEASES_PORT", 8080)).unwrap_or(8080),
            providers,
            poll,
            store_path: var("REPOSITORY_STORE_PATH").map(PathBuf::from),
            statuses,
            log_format,
        }
    }
}
