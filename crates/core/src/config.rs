//! Timing configuration.
//!
//! Every delay in Waypoint is a stand-in for real latency. They are kept in
//! one place so a host application can tune or replace them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Timing knobs for the progress and navigation indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// How long the progress counter takes to travel to 100
    pub progress_duration_ms: u64,

    /// Interpolation tick
    pub frame_interval_ms: u64,

    /// Artificial delay before a transition link navigates
    pub link_delay_ms: u64,

    /// Artificial delay of the slow demo action
    pub action_delay_ms: u64,

    /// Grace period before the loader hides after a pop
    pub loader_grace_ms: u64,

    /// Progress overlay slide-in / slide-out duration
    pub slide_duration_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            progress_duration_ms: 2_000,
            frame_interval_ms: 16,
            link_delay_ms: 3_000,
            action_delay_ms: 2_500,
            loader_grace_ms: 2_000,
            slide_duration_ms: 500,
        }
    }
}

impl Timings {
    /// Load timings from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let timings: Timings = serde_json::from_str(&content)?;
        timings.validate()?;
        Ok(timings)
    }

    /// Reject values the interpolation cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.progress_duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "progress_duration_ms must be greater than zero".to_string(),
            ));
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "frame_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Interpolation span.
    pub fn progress_duration(&self) -> Duration {
        Duration::from_millis(self.progress_duration_ms)
    }

    /// Interpolation tick.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Link navigation delay.
    pub fn link_delay(&self) -> Duration {
        Duration::from_millis(self.link_delay_ms)
    }

    /// Slow action delay.
    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }

    /// Loader grace period.
    pub fn loader_grace(&self) -> Duration {
        Duration::from_millis(self.loader_grace_ms)
    }

    /// Overlay slide duration.
    pub fn slide_duration(&self) -> Duration {
        Duration::from_millis(self.slide_duration_ms)
    }
}
