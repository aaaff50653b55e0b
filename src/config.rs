//! Client-side settings shared by the remote proxies.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;
use crate::remote::PollOptions;

pub const DEFAULT_APP_URL: &str = "https://app.labelbox.com";
pub const DEFAULT_PAGE_SIZE: usize = 100;

pub const ENV_APP_URL: &str = "LABELSDK_APP_URL";
pub const ENV_POLL_TIMEOUT_SECS: &str = "LABELSDK_POLL_TIMEOUT_SECS";
pub const ENV_POLL_INTERVAL_SECS: &str = "LABELSDK_POLL_INTERVAL_SECS";
pub const ENV_PAGE_SIZE: &str = "LABELSDK_PAGE_SIZE";

/// Settings a [`Client`](crate::remote::Client) exposes to the proxies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Web app base URL, used to build links.
    pub app_url: String,
    /// Defaults for waiting on remote tasks.
    pub poll: PollOptions,
    /// Items requested per page.
    pub page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_url: DEFAULT_APP_URL.to_string(),
            poll: PollOptions::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by any `LABELSDK_*` environment variables.
    pub fn from_env() -> Result<Self, SdkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SdkError> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_APP_URL) {
            config.app_url = url;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_POLL_TIMEOUT_SECS)? {
            config.poll.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_POLL_INTERVAL_SECS)? {
            config.poll.interval = Duration::from_secs(secs);
        }
        if let Some(size) = parse_var::<usize>(&lookup, ENV_PAGE_SIZE)? {
            config.page_size = size;
        }

        config.check()?;
        Ok(config)
    }

    /// Reads a JSON config file; missing fields take their defaults.
    pub fn read_json(path: &Path) -> Result<Self, SdkError> {
        let text = std::fs::read_to_string(path).map_err(|source| SdkError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| SdkError::JsonParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), SdkError> {
        if self.poll.interval.is_zero() {
            return Err(SdkError::InvalidArgument(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(SdkError::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, SdkError> {
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                SdkError::InvalidArgument(format!("{} has an invalid value {:?}", key, raw))
            })
        })
        .transpose()
}
