//! Pipeline configuration
//!
//! An immutable configuration value constructed once and handed to
//! `start`; nothing mutates it while the pipeline runs.

use crate::error::{EmgError, EmgResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sampling rate of the source in Hz
    pub sample_rate_hz: f32,
    /// Window length in samples
    pub window_size: usize,
    /// Samples between consecutive window emissions
    pub step_size: usize,
    /// Bandpass low edge in Hz
    pub band_low_hz: f32,
    /// Bandpass high edge in Hz
    pub band_high_hz: f32,
    /// Butterworth order per band edge (even, >= 2)
    pub filter_order: usize,
    /// Capacity of the acquisition-to-processing hand-off queue
    pub queue_capacity: usize,
    /// Path to the frozen model artifact (None when an artifact is passed
    /// in directly)
    pub model_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 1000.0,
            window_size: 250,
            step_size: 125,
            band_low_hz: 20.0,
            band_high_hz: 450.0,
            filter_order: 4,
            queue_capacity: 8,
            model_path: None,
        }
    }
}

impl PipelineConfig {
    /// Validate all parameters; called by `start` before anything is spawned
    pub fn validate(&self) -> EmgResult<()> {
        if self.window_size == 0 {
            return Err(EmgError::config("window_size must be greater than 0"));
        }
        if self.step_size == 0 {
            return Err(EmgError::config("step_size must be greater than 0"));
        }
        if self.step_size > self.window_size {
            return Err(EmgError::config(format!(
                "step_size {} must not exceed window_size {}",
                self.step_size, self.window_size
            )));
        }
        if self.sample_rate_hz <= 0.0 {
            return Err(EmgError::config("sample_rate_hz must be positive"));
        }

        let nyquist = self.sample_rate_hz / 2.0;
        if self.band_low_hz <= 0.0 {
            return Err(EmgError::config("band_low_hz must be positive"));
        }
        if self.band_low_hz >= self.band_high_hz {
            return Err(EmgError::config(format!(
                "band_low_hz {} must be below band_high_hz {}",
                self.band_low_hz, self.band_high_hz
            )));
        }
        if self.band_high_hz >= nyquist {
            return Err(EmgError::config(format!(
                "band_high_hz {} must be below the Nyquist limit {}",
                self.band_high_hz, nyquist
            )));
        }

        if self.filter_order < 2 || self.filter_order % 2 != 0 {
            return Err(EmgError::config(format!(
                "filter_order {} must be an even number >= 2",
                self.filter_order
            )));
        }
        if self.queue_capacity == 0 {
            return Err(EmgError::config("queue_capacity must be at least 1"));
        }

        Ok(())
    }

    /// Seconds between consecutive samples
    pub fn sample_period_s(&self) -> f64 {
        1.0 / self.sample_rate_hz as f64
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> EmgResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> EmgResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
