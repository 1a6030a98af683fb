//! Engine timing and defaults

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::keyer::{MAX_WPM, MIN_WPM};

/// Default keyer speed in words per minute
pub const DEFAULT_WPM: u32 = 25;

/// Default interval between meter sweeps
pub const METER_POLL_INTERVAL_MS: u64 = 100;

/// Default time allowed for a CAT reply
pub const CAT_TIMEOUT_MS: u64 = 2000;

/// Tuning steps in Hz
pub const TUNE_STEP_SLOW: i32 = 10;
pub const TUNE_STEP_NORM: i32 = 100;
pub const TUNE_STEP_FAST: i32 = 1000;
pub const TUNE_STEP_XFAST: i32 = 10_000;

/// Timing parameters for the reactor and its components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial keyer speed
    pub wpm: u32,
    /// Delay between the end of one meter sweep and the start of the next
    pub meter_poll_ms: u64,
    /// Time allowed for the oldest outstanding query to be answered
    pub cat_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wpm: DEFAULT_WPM,
            meter_poll_ms: METER_POLL_INTERVAL_MS,
            cat_timeout_ms: CAT_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(MIN_WPM..=MAX_WPM).contains(&self.wpm) {
            return Err(EngineError::Config(format!(
                "keyer speed {} WPM out of range {MIN_WPM}..={MAX_WPM}",
                self.wpm
            )));
        }
        if self.cat_timeout_ms == 0 {
            return Err(EngineError::Config("CAT timeout must be non-zero".into()));
        }
        Ok(())
    }

    pub fn meter_poll_interval(&self) -> Duration {
        Duration::from_millis(self.meter_poll_ms)
    }

    pub fn cat_timeout(&self) -> Duration {
        Duration::from_millis(self.cat_timeout_ms)
    }
}
