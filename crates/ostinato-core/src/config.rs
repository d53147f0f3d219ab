//! Engine configuration.

use crate::{Error, Result};

/// Configuration for the music engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sample rate the instrument processors render at, in Hz.
    pub sample_rate: f64,
    /// Capacity of each instrument's control-to-audio event queue.
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            queue_capacity: 4096,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(8000.0..=384000.0).contains(&self.sample_rate) {
            return Err(Error::InvalidArgument(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.queue_capacity < 2 {
            return Err(Error::InvalidArgument(format!(
                "queue_capacity {} too small (minimum 2)",
                self.queue_capacity
            )));
        }
        Ok(())
    }
}
