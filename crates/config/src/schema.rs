/// Config schema types (scoreboard endpoints, event feed).
use std::time::Duration;

use {
    chainball_protocol::{DEFAULT_CALL_TIMEOUT_MS, DEFAULT_EVENT_ENDPOINT, DEFAULT_REQUEST_ENDPOINT},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainballConfig {
    pub scoreboard: ScoreboardConfig,
    pub events: EventsConfig,
}

impl ChainballConfig {
    /// Reject values the gateway cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scoreboard.request_endpoint.trim().is_empty() {
            anyhow::bail!("scoreboard.request_endpoint must not be empty");
        }
        if self.scoreboard.event_endpoint.trim().is_empty() {
            anyhow::bail!("scoreboard.event_endpoint must not be empty");
        }
        if self.scoreboard.call_timeout_ms == 0 {
            anyhow::bail!("scoreboard.call_timeout_ms must be greater than zero");
        }
        if self.events.initial_backoff_ms == 0 {
            anyhow::bail!("events.initial_backoff_ms must be greater than zero");
        }
        if self.events.initial_backoff_ms > self.events.max_backoff_ms {
            anyhow::bail!(
                "events.initial_backoff_ms ({}) exceeds events.max_backoff_ms ({})",
                self.events.initial_backoff_ms,
                self.events.max_backoff_ms
            );
        }
        Ok(())
    }
}

/// Where the scoreboard server listens and how long a call may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreboardConfig {
    /// REQ/REP endpoint for calls.
    pub request_endpoint: String,

    /// PUB endpoint for unsolicited events.
    pub event_endpoint: String,

    /// Per-call reply deadline in milliseconds.
    pub call_timeout_ms: u64,
}

impl Default for ScoreboardConfig {
    fn default() -> Self {
        Self {
            request_endpoint: DEFAULT_REQUEST_ENDPOINT.into(),
            event_endpoint: DEFAULT_EVENT_ENDPOINT.into(),
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }
}

impl ScoreboardConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Event subscriber reconnect policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Reconnect after a feed fault. When false, a fault stops the subscriber.
    pub reconnect: bool,

    /// First reconnect delay; doubled after every consecutive failure.
    pub initial_backoff_ms: u64,

    /// Upper bound for the reconnect delay.
    pub max_backoff_ms: u64,

    /// How often to check that the publisher is still reachable while the
    /// feed is idle. Zero disables the check.
    pub liveness_interval_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            reconnect: true,
            initial_backoff_ms: 250,
            max_backoff_ms: 30_000,
            liveness_interval_ms: 1_000,
        }
    }
}

impl EventsConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn liveness_interval(&self) -> Option<Duration> {
        (self.liveness_interval_ms > 0).then(|| Duration::from_millis(self.liveness_interval_ms))
    }
}
