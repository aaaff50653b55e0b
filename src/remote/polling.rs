//! Fixed-interval polling of long-running remote tasks.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// Budget and spacing for [`poll_until`].
///
/// Serialized as `timeout_secs` and `interval_secs`, both in (possibly
/// fractional) seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollOptions {
    /// Total time allowed across all attempts (default: 60s).
    #[serde(rename = "timeout_secs", with = "secs")]
    pub timeout: Duration,
    /// Sleep between attempts (default: 5s). Must be non-zero.
    #[serde(rename = "interval_secs", with = "secs")]
    pub interval: Duration,
}

mod secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(5),
        }
    }
}

impl PollOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Same interval, different budget.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

/// Result of a single status check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// Terminal success.
    Ready(T),
    /// Not done yet; poll again.
    Pending,
}

/// Calls `status_fn` until it is ready, fails, or the budget runs out.
///
/// Each pending attempt charges one `interval` against the budget before
/// sleeping; once the remainder reaches zero the call fails with
/// [`SdkError::Timeout`]. Errors from `status_fn` (including a reported
/// task failure) are returned immediately.
pub fn poll_until<T, F>(opts: &PollOptions, mut status_fn: F) -> Result<T, SdkError>
where
    F: FnMut() -> Result<PollOutcome<T>, SdkError>,
{
    if opts.interval.is_zero() {
        return Err(SdkError::InvalidArgument(
            "poll interval must be greater than zero".to_string(),
        ));
    }

    let mut remaining = opts.timeout;
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if let PollOutcome::Ready(value) = status_fn()? {
            log::debug!("poll finished after {} attempt(s)", attempt);
            return Ok(value);
        }

        remaining = match remaining.checked_sub(opts.interval) {
            Some(left) if !left.is_zero() => left,
            _ => {
                log::debug!("poll gave up after {} attempt(s)", attempt);
                return Err(SdkError::Timeout {
                    budget: opts.timeout,
                });
            }
        };

        log::debug!(
            "poll attempt {} pending, {:?} left, sleeping {:?}",
            attempt,
            remaining,
            opts.interval
        );
        thread::sleep(opts.interval);
    }
}
