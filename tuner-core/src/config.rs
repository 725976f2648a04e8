//! # Configuration Module
//!
//! Settings for the analysis node and the two plot surfaces. Every field has
//! a default, so a config file only needs to name what it overrides.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TunerError};
use crate::note::{DEFAULT_FREQ_REF, DEFAULT_N_REF};

/// Transform size of the analysis node. At 44.1 kHz this yields 8192 bins,
/// about 5.4 Hz of sample rate per bin.
pub const DEFAULT_FFT_SIZE: usize = 16384;

/// Sample rate requested from the capture device.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Analysis window length; must be a power of two between 32 and 32768.
    pub fft_size: usize,
    pub target_sample_rate: u32,
    /// Declared pixel size of both plot surfaces, read once at setup.
    pub surface_width: f32,
    pub surface_height: f32,
    /// Reference pitch used by note readouts.
    pub reference_hz: f64,
    pub reference_index: i32,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            target_sample_rate: DEFAULT_SAMPLE_RATE,
            surface_width: 1024.0,
            surface_height: 256.0,
            reference_hz: DEFAULT_FREQ_REF,
            reference_index: DEFAULT_N_REF,
        }
    }
}

impl ScopeConfig {
    /// Number of frequency bins (and sample buffer length), half the
    /// transform size.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Checks the values the analysis node relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(TunerError::Config(format!(
                "fft_size must be a power of two in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if self.target_sample_rate == 0 {
            return Err(TunerError::Config("target_sample_rate must be positive".into()));
        }
        if !(self.reference_hz.is_finite() && self.reference_hz > 0.0) {
            return Err(TunerError::Config(format!(
                "reference_hz must be a positive frequency, got {}",
                self.reference_hz
            )));
        }
        Ok(())
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TunerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        Self::from_json(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_analysis_node_setup() {
        let config = ScopeConfig::default();
        assert_eq!(config.fft_size, 16384);
        assert_eq!(config.bin_count(), 8192);
        let per_bin = config.target_sample_rate as f32 / config.bin_count() as f32;
        assert!((per_bin - 5.4).abs() < 0.05);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ScopeConfig::from_json(r#"{ "fft_size": 2048, "surface_width": 400 }"#)
            .expect("valid config");
        assert_eq!(config.fft_size, 2048);
        assert_eq!(config.surface_width, 400.0);
        assert_eq!(config.surface_height, 256.0);
        assert_eq!(config.reference_hz, 440.0);
    }

    #[test]
    fn rejects_bad_fft_size() {
        let err = ScopeConfig::from_json(r#"{ "fft_size": 1000 }"#).unwrap_err();
        assert!(matches!(err, TunerError::Config(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            ScopeConfig::from_json("{ fft_size"),
            Err(TunerError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ScopeConfig::load("/definitely/not/here/tuner.json").unwrap_err();
        assert!(matches!(err, TunerError::Io(_)));
    }
}
