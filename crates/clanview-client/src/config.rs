//! Client configuration.

use std::str::FromStr;
use std::time::Duration;

use clanview_analytics::{clamp_data_points, DEFAULT_DATA_POINTS};

use crate::error::{Error, Result};

/// Reconnection schedule after a lost connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Wait before the first attempt
    pub initial_delay: Duration,
    /// Wait between later attempts
    pub interval: Duration,
    /// Failed attempts before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            interval: Duration::from_secs(2),
            max_attempts: 5,
        }
    }
}

/// Gates applied before a snapshot is recorded in the time series.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestPolicy {
    /// Only every n-th snapshot is a candidate
    pub every_messages: u64,
    /// Minimum wall-clock spacing between recorded samples
    pub min_interval: Duration,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self {
            every_messages: 1,
            min_interval: Duration::from_secs(1),
        }
    }
}

/// Configuration for a clanview client session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Simulation server URL. The Socket.IO path is appended unless present.
    pub server_url: String,

    pub reconnect: ReconnectPolicy,

    /// State re-request period while connected
    pub heartbeat_interval: Duration,

    pub ingest: IngestPolicy,

    /// Bound of the time-series buffers (10-500)
    pub max_data_points: usize,

    /// Width available to the grid view, in pixels
    pub container_width: f64,

    /// Quiet period before an edited parameter set is sent
    pub parameter_debounce: Duration,

    /// Period of the background trend analysis
    pub analytics_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:5000".to_string(),
            reconnect: ReconnectPolicy::default(),
            heartbeat_interval: Duration::from_secs(3),
            ingest: IngestPolicy::default(),
            max_data_points: DEFAULT_DATA_POINTS,
            container_width: 800.0,
            parameter_debounce: Duration::from_millis(500),
            analytics_interval: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Create config from `CLANVIEW_*` environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            server_url: lookup("CLANVIEW_SERVER_URL").unwrap_or(defaults.server_url),
            reconnect: ReconnectPolicy {
                initial_delay: millis(&lookup, "CLANVIEW_RECONNECT_DELAY_MS", defaults.reconnect.initial_delay)?,
                interval: millis(&lookup, "CLANVIEW_RECONNECT_INTERVAL_MS", defaults.reconnect.interval)?,
                max_attempts: parsed(&lookup, "CLANVIEW_RECONNECT_ATTEMPTS", defaults.reconnect.max_attempts)?,
            },
            heartbeat_interval: millis(&lookup, "CLANVIEW_HEARTBEAT_MS", defaults.heartbeat_interval)?,
            ingest: IngestPolicy {
                every_messages: parsed(&lookup, "CLANVIEW_INGEST_EVERY", defaults.ingest.every_messages)?,
                min_interval: millis(&lookup, "CLANVIEW_INGEST_INTERVAL_MS", defaults.ingest.min_interval)?,
            },
            max_data_points: clamp_data_points(parsed(
                &lookup,
                "CLANVIEW_MAX_DATA_POINTS",
                defaults.max_data_points,
            )?),
            container_width: parsed(&lookup, "CLANVIEW_CONTAINER_WIDTH", defaults.container_width)?,
            parameter_debounce: millis(&lookup, "CLANVIEW_PARAM_DEBOUNCE_MS", defaults.parameter_debounce)?,
            analytics_interval: millis(&lookup, "CLANVIEW_ANALYTICS_MS", defaults.analytics_interval)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.server_url.starts_with("ws://") && !self.server_url.starts_with("wss://") {
            return Err(Error::Config(format!(
                "server url must use ws:// or wss://, got {}",
                self.server_url
            )));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(Error::Config("heartbeat interval must be positive".into()));
        }
        if self.reconnect.interval.is_zero() {
            return Err(Error::Config("reconnect interval must be positive".into()));
        }
        if self.analytics_interval.is_zero() {
            return Err(Error::Config("analytics interval must be positive".into()));
        }
        if !self.container_width.is_finite() || self.container_width <= 0.0 {
            return Err(Error::Config("container width must be a positive number".into()));
        }
        Ok(())
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {name}: {raw}"))),
        None => Ok(default),
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: Duration) -> Result<Duration> {
    let ms: u64 = parsed(lookup, name, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(3));
    }

    #[test]
    fn variables_override_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("CLANVIEW_SERVER_URL", "wss://sim.example:8443"),
            ("CLANVIEW_RECONNECT_ATTEMPTS", "8"),
            ("CLANVIEW_HEARTBEAT_MS", "1500"),
            ("CLANVIEW_MAX_DATA_POINTS", "9000"),
            ("CLANVIEW_CONTAINER_WIDTH", " 1024 "),
        ]))
        .unwrap();

        assert_eq!(config.server_url, "wss://sim.example:8443");
        assert_eq!(config.reconnect.max_attempts, 8);
        assert_eq!(config.heartbeat_interval, Duration::from_millis(1500));
        assert_eq!(config.max_data_points, 500);
        assert_eq!(config.container_width, 1024.0);
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = ClientConfig::from_lookup(lookup(&[("CLANVIEW_HEARTBEAT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("CLANVIEW_HEARTBEAT_MS")));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        assert!(ClientConfig::from_lookup(lookup(&[("CLANVIEW_HEARTBEAT_MS", "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("CLANVIEW_SERVER_URL", "http://x")])).is_err());
    }
}
