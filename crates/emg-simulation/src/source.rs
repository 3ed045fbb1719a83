//! Simulated blocking sample source

use crate::patterns::ActivationPattern;
use emg_core::{EmgError, EmgResult, RawSample, SampleSource};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::time::{Duration, Instant};

/// ADC midpoint of the simulated 10-bit converter
const ADC_MID: f32 = 512.0;
const ADC_MAX: u16 = 1023;

/// Configuration of the simulated source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Sampling rate in Hz
    pub sample_rate_hz: f32,
    /// Gaussian sensor-noise standard deviation, in ADC counts
    pub noise_std: f32,
    /// Mains interference frequency, None to disable
    pub powerline_hz: Option<f32>,
    /// Seed for reproducible streams, None for a time-derived seed
    pub seed: Option<u64>,
    /// Sleep between samples to mimic hardware timing
    pub paced: bool,
    /// Close the stream after this many samples, None for unbounded
    pub sample_limit: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 1000.0,
            noise_std: 4.0,
            powerline_hz: Some(50.0),
            seed: None,
            paced: true,
            sample_limit: None,
        }
    }
}

/// Synthetic EMG source producing one interleaved channel of ADC counts.
///
/// The waveform is an activation envelope modulating a few muscle-firing
/// harmonics, plus Gaussian noise and optional mains hum, centred on the
/// converter midpoint. With a fixed seed and `paced: false` the stream is
/// fully reproducible, which the end-to-end tests rely on.
pub struct SimulatedSource {
    config: SimulationConfig,
    pattern: ActivationPattern,
    rng: rand::rngs::StdRng,
    noise: Normal<f32>,
    sample_index: u64,
    started_at: Option<Instant>,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig, pattern: ActivationPattern) -> EmgResult<Self> {
        if config.sample_rate_hz <= 0.0 {
            return Err(EmgError::config(format!(
                "simulated sample rate {} Hz must be positive",
                config.sample_rate_hz
            )));
        }
        if config.noise_std < 0.0 {
            return Err(EmgError::config("noise standard deviation must be non-negative"));
        }

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });

        let noise = Normal::new(0.0, config.noise_std.max(f32::EPSILON)).map_err(|e| {
            EmgError::source(format!("noise distribution: {}", e))
        })?;

        Ok(Self {
            config,
            pattern,
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            noise,
            sample_index: 0,
            started_at: None,
        })
    }

    /// Unpaced reproducible source, handy in tests
    pub fn seeded(pattern: ActivationPattern, seed: u64, sample_limit: u64) -> EmgResult<Self> {
        Self::new(
            SimulationConfig {
                seed: Some(seed),
                paced: false,
                sample_limit: Some(sample_limit),
                ..SimulationConfig::default()
            },
            pattern,
        )
    }

    fn synthesize(&mut self, time_s: f32) -> u16 {
        let activation = self.pattern.activation_at(time_s);

        // Muscle firing fundamental with two harmonics, scaled by activation
        let base = 80.0;
        let mut value = activation
            * 180.0
            * ((2.0 * PI * base * time_s).sin()
                + 0.3 * (2.0 * PI * base * 2.0 * time_s).sin()
                + 0.1 * (2.0 * PI * base * 3.0 * time_s).sin());

        // Fibre recruitment jitter grows with activation
        value += activation * self.rng.gen_range(-20.0f32..20.0);

        if let Some(hz) = self.config.powerline_hz {
            value += 8.0 * (2.0 * PI * hz * time_s).sin();
        }

        if self.config.noise_std > 0.0 {
            value += self.noise.sample(&mut self.rng);
        }

        (ADC_MID + value).clamp(0.0, ADC_MAX as f32) as u16
    }

    fn pace(&mut self) {
        let started = *self.started_at.get_or_insert_with(Instant::now);
        let due = started
            + Duration::from_secs_f64(self.sample_index as f64 / self.config.sample_rate_hz as f64);
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
    }
}

impl SampleSource for SimulatedSource {
    fn next_sample(&mut self) -> EmgResult<Option<RawSample>> {
        if let Some(limit) = self.config.sample_limit {
            if self.sample_index >= limit {
                return Ok(None);
            }
        }

        if self.config.paced {
            self.pace();
        }

        let timestamp_s = self.sample_index as f64 / self.config.sample_rate_hz as f64;
        let amplitude = self.synthesize(timestamp_s as f32);
        self.sample_index += 1;

        Ok(Some(RawSample { timestamp_s, amplitude }))
    }

    fn description(&self) -> String {
        format!(
            "simulated EMG ({} at {} Hz)",
            self.pattern.description(),
            self.config.sample_rate_hz
        )
    }
}
