//! Causal Butterworth bandpass filtering
//!
//! The bandpass is realised as an order-N Butterworth highpass at the low
//! edge cascaded with an order-N Butterworth lowpass at the high edge, each
//! split into second-order biquad sections for numerical stability. The
//! filter runs sample-by-sample and its delay-line state persists for the
//! lifetime of the stage, so filtering a stream in chunks is identical to
//! filtering it in one pass.
//!
//! Zero-phase (bidirectional) filtering is deliberately not offered: it
//! needs future samples and cannot run on a live stream. The phase lag of
//! the causal form is the accepted trade-off.

use emg_core::{EmgError, EmgResult, FilteredSample, RawSample};

/// Single biquad section (2nd order), direct form I
#[derive(Debug, Clone)]
struct BiquadSection {
    // Coefficients: y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    // Delay line
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

/// Which response a biquad section implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Lowpass,
    Highpass,
}

impl BiquadSection {
    /// Design one Butterworth section with the RBJ cookbook formulas.
    ///
    /// `q` is the section's Butterworth quality factor, derived from the
    /// pole angle of the analog prototype.
    fn design(kind: SectionKind, cutoff_hz: f32, sample_rate_hz: f32, q: f32) -> Self {
        let omega = 2.0 * std::f32::consts::PI * cutoff_hz / sample_rate_hz;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;

        let (b0, b1, b2) = match kind {
            SectionKind::Lowpass => {
                let b1 = 1.0 - cos_omega;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            SectionKind::Highpass => {
                let b1 = -(1.0 + cos_omega);
                (-b1 / 2.0, b1, -b1 / 2.0)
            }
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process_sample(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Quality factors of the biquad cascade for an even-order Butterworth
/// response: zeta_k = sin((2k+1) * pi / (2n)).
fn butterworth_section_qs(order: usize) -> Vec<f32> {
    let n = order as f32;
    (0..order / 2)
        .map(|k| {
            let zeta = ((2 * k + 1) as f32 * std::f32::consts::PI / (2.0 * n)).sin();
            1.0 / (2.0 * zeta)
        })
        .collect()
}

/// Causal IIR bandpass stage with persistent state.
///
/// Owned exclusively by the acquisition context; never reinitialised
/// between windows.
pub struct BandpassFilterStage {
    highpass: Vec<BiquadSection>,
    lowpass: Vec<BiquadSection>,
}

impl BandpassFilterStage {
    /// Design the cascade for the given passband.
    ///
    /// `order` is the Butterworth order of each edge (even, >= 2); the
    /// reference configuration is order 4 over 20-450 Hz at 1000 Hz.
    pub fn new(
        band_low_hz: f32,
        band_high_hz: f32,
        order: usize,
        sample_rate_hz: f32,
    ) -> EmgResult<Self> {
        if order < 2 || order % 2 != 0 {
            return Err(EmgError::config(format!(
                "filter order {} must be an even number >= 2",
                order
            )));
        }
        if band_low_hz <= 0.0 || band_low_hz >= band_high_hz {
            return Err(EmgError::config(format!(
                "invalid passband {}-{} Hz",
                band_low_hz, band_high_hz
            )));
        }
        if band_high_hz >= sample_rate_hz / 2.0 {
            return Err(EmgError::config(format!(
                "passband high edge {} Hz must be below the Nyquist limit {} Hz",
                band_high_hz,
                sample_rate_hz / 2.0
            )));
        }

        let qs = butterworth_section_qs(order);
        let highpass = qs
            .iter()
            .map(|&q| BiquadSection::design(SectionKind::Highpass, band_low_hz, sample_rate_hz, q))
            .collect();
        let lowpass = qs
            .iter()
            .map(|&q| BiquadSection::design(SectionKind::Lowpass, band_high_hz, sample_rate_hz, q))
            .collect();

        Ok(Self { highpass, lowpass })
    }

    /// Build the stage straight from a pipeline configuration
    pub fn from_config(config: &emg_core::PipelineConfig) -> EmgResult<Self> {
        Self::new(
            config.band_low_hz,
            config.band_high_hz,
            config.filter_order,
            config.sample_rate_hz,
        )
    }

    /// Filter one sample, advancing the delay line
    pub fn apply(&mut self, input: f32) -> f32 {
        let mut sample = input;
        for section in &mut self.highpass {
            sample = section.process_sample(sample);
        }
        for section in &mut self.lowpass {
            sample = section.process_sample(sample);
        }
        sample
    }

    /// Filter a raw ADC sample, carrying its timestamp through
    pub fn apply_raw(&mut self, raw: RawSample) -> FilteredSample {
        FilteredSample {
            timestamp_s: raw.timestamp_s,
            value: self.apply(raw.amplitude as f32),
        }
    }
}
