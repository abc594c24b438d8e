use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::bus::DEFAULT_CAPACITY;

/// Errors produced while parsing engine configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown submit policy: {0} (expected allow_concurrent or reject_while_pending)")]
    UnknownSubmitPolicy(String),
}

/// What happens to a submit edge while an earlier submission is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitPolicy {
    /// Every edge dispatches its own payment.
    #[default]
    AllowConcurrent,
    /// Edges are rejected until the pending payment resolves.
    RejectWhilePending,
}

impl fmt::Display for SubmitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitPolicy::AllowConcurrent => f.write_str("allow_concurrent"),
            SubmitPolicy::RejectWhilePending => f.write_str("reject_while_pending"),
        }
    }
}

impl FromStr for SubmitPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow_concurrent" => Ok(SubmitPolicy::AllowConcurrent),
            "reject_while_pending" => Ok(SubmitPolicy::RejectWhilePending),
            other => Err(ConfigError::UnknownSubmitPolicy(other.to_string())),
        }
    }
}

/// Default simulated payment round trip.
const DEFAULT_PAYMENT_DELAY_MS: u64 = 1000;

/// Default bound on how long `stop()` waits for in-flight submissions.
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Form engine configuration.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay used by the simulated payment gateway.
    pub payment_delay: Duration,
    /// Duplicate submission handling.
    pub submit_policy: SubmitPolicy,
    /// Reject submit edges while any field holds an error.
    pub block_invalid_submit: bool,
    /// Buffer size of the submission event channel.
    pub event_capacity: usize,
    /// Upper bound on `stop()` waiting for submission tasks to exit.
    pub shutdown_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payment_delay: Duration::from_millis(DEFAULT_PAYMENT_DELAY_MS),
            submit_policy: SubmitPolicy::default(),
            block_invalid_submit: true,
            event_capacity: DEFAULT_CAPACITY,
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// Values that fail to parse are logged and replaced by the default.
    ///
    /// | Env Var                          | Default            |
    /// |----------------------------------|--------------------|
    /// | `CARDFORM_PAYMENT_DELAY_MS`      | `1000`             |
    /// | `CARDFORM_SUBMIT_POLICY`         | `allow_concurrent` |
    /// | `CARDFORM_BLOCK_INVALID_SUBMIT`  | `true`             |
    /// | `CARDFORM_EVENT_CAPACITY`        | `64`               |
    /// | `CARDFORM_SHUTDOWN_TIMEOUT_SECS` | `5`                |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            payment_delay: env_parse("CARDFORM_PAYMENT_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.payment_delay),
            submit_policy: env_parse("CARDFORM_SUBMIT_POLICY").unwrap_or(defaults.submit_policy),
            block_invalid_submit: env_parse("CARDFORM_BLOCK_INVALID_SUBMIT")
                .unwrap_or(defaults.block_invalid_submit),
            event_capacity: env_parse("CARDFORM_EVENT_CAPACITY").unwrap_or(defaults.event_capacity),
            shutdown_timeout: env_parse("CARDFORM_SHUTDOWN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
        }
    }
}

/// Read and parse one variable. Unset gives `None`; unparseable gives
/// `None` plus a warning.
fn env_parse<T>(var: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(var, value = %raw, error = %e, "Ignoring unparseable config value");
            None
        }
    }
}
