//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the PodManager Controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch; all namespaces when `None`
    pub namespace: Option<String>,
    /// Maximum concurrent reconciliations (0 = unbounded)
    pub concurrency: u16,
    /// Quiet period after the last event before reconciling
    pub debounce: Duration,
    /// Deadline for a single reconciliation
    pub reconcile_timeout: Duration,
    /// First retry delay after a recoverable error
    pub backoff_min: Duration,
    /// Retry delay cap, also used for non-recoverable errors
    pub backoff_max: Duration,
    /// Bind address of the health probe server
    pub probe_addr: SocketAddr,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            concurrency: 3,
            debounce: Duration::from_secs(1),
            reconcile_timeout: Duration::from_secs(30),
            backoff_min: Duration::from_secs(1),
            backoff_max: Duration::from_secs(300),
            probe_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidConfig` if a variable is malformed.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidConfig` if a variable is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let defaults = Self::default();

        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());
        let concurrency = parse_var(&lookup, "RECONCILE_CONCURRENCY", defaults.concurrency)?;
        let debounce = parse_seconds(&lookup, "RECONCILE_DEBOUNCE_SECONDS", defaults.debounce)?;
        let reconcile_timeout = parse_seconds(&lookup, "RECONCILE_TIMEOUT_SECONDS", defaults.reconcile_timeout)?;
        let backoff_min = parse_seconds(&lookup, "BACKOFF_MIN_SECONDS", defaults.backoff_min)?;
        let backoff_max = parse_seconds(&lookup, "BACKOFF_MAX_SECONDS", defaults.backoff_max)?;
        let probe_addr = parse_var(&lookup, "PROBE_BIND_ADDRESS", defaults.probe_addr)?;

        if reconcile_timeout.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }
        if backoff_min.is_zero() || backoff_min > backoff_max {
            return Err(ControllerError::InvalidConfig(format!(
                "backoff must satisfy 0 < BACKOFF_MIN_SECONDS ({}) <= BACKOFF_MAX_SECONDS ({})",
                backoff_min.as_secs(),
                backoff_max.as_secs()
            )));
        }

        Ok(Self {
            namespace,
            concurrency,
            debounce,
            reconcile_timeout,
            backoff_min,
            backoff_max,
            probe_addr,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, ControllerError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{name}={raw:?} is not valid: {e}"))
        }),
    }
}

fn parse_seconds(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: Duration) -> Result<Duration, ControllerError> {
    parse_var(lookup, name, default.as_secs()).map(Duration::from_secs)
}
