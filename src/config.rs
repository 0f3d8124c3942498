//! Link configuration parameters
//!
//! All tunable parameters for a serial session.
//! Values can be overridden by a JSON file passed on the command line.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    // --- Line ---
    /// Line speed in bits per second
    pub baud_rate: u32,

    // --- Timing ---
    /// Maximum time a single read call may block (milliseconds)
    pub read_timeout_ms: u64,
    /// Deadline for a response after the last request byte (milliseconds)
    pub response_timeout_ms: u64,
    /// Sleep between framer steps (milliseconds)
    pub poll_interval_ms: u64,
    /// Delay before switching to space parity after the marker byte (microseconds)
    pub parity_settle_us: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            // Line
            baud_rate: 28_800,

            // Timing
            read_timeout_ms: 1000,
            response_timeout_ms: 1000,
            poll_interval_ms: 100,
            parity_settle_us: 1000,
        }
    }
}

impl LinkConfig {
    /// Load a configuration file, filling missing keys with defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading link config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing link config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the link cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(Error::Config("baud_rate must be non-zero"));
        }
        if self.read_timeout_ms == 0 {
            return Err(Error::Config("read_timeout_ms must be non-zero"));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn parity_settle(&self) -> Duration {
        Duration::from_micros(self.parity_settle_us)
    }
}
