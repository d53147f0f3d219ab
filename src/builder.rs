//! Builder for configuring and constructing an `OstinatoEngine`.

use ostinato_core::EngineConfig;

use crate::{OstinatoEngine, Result};

/// # Example
///
/// ```ignore
/// let engine = OstinatoEngine::builder()
///     .sample_rate(44100.0)
///     .tempo(128.0)
///     .queue_capacity(8192)
///     .build()?;
/// ```
pub struct OstinatoEngineBuilder {
    sample_rate: f64,
    queue_capacity: usize,
    tempo_bpm: f64,
}

impl Default for OstinatoEngineBuilder {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            queue_capacity: 4096,
            tempo_bpm: 120.0,
        }
    }
}

impl OstinatoEngineBuilder {
    /// Sample rate the instrument processors render at. Default: 48000.
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Capacity of each instrument's event queue. Default: 4096.
    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Initial playback tempo in BPM. Default: 120.
    pub fn tempo(mut self, tempo_bpm: f64) -> Self {
        self.tempo_bpm = tempo_bpm;
        self
    }

    pub fn build(self) -> Result<OstinatoEngine> {
        let config = EngineConfig {
            sample_rate: self.sample_rate,
            queue_capacity: self.queue_capacity,
        };
        OstinatoEngine::from_config(config, self.tempo_bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_defaults() {
        let engine = OstinatoEngineBuilder::default().build().unwrap();
        assert_eq!(engine.sample_rate(), 48000.0);
        assert_eq!(engine.tempo(), 120.0);
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        assert!(OstinatoEngineBuilder::default().sample_rate(0.0).build().is_err());
        assert!(OstinatoEngineBuilder::default().tempo(f64::NAN).build().is_err());
    }
}
