//! Time-domain feature extraction
//!
//! Pure functions; all four features are computed over one window instance
//! with no cross-window state. The output order (RMS, mean, variance, ZCR)
//! is the artifact's feature-branch contract.

use emg_core::{FeatureVector, Window};

/// Extract the feature vector for one window
pub fn extract(window: &Window) -> FeatureVector {
    extract_from_slice(&window.samples)
}

/// Extract features from a bare slice of filtered amplitudes
pub fn extract_from_slice(data: &[f32]) -> FeatureVector {
    if data.is_empty() {
        return FeatureVector { rms: 0.0, mean: 0.0, variance: 0.0, zero_crossing_rate: 0.0 };
    }

    let n = data.len() as f32;

    let sum: f32 = data.iter().sum();
    let mean = sum / n;

    let sum_sq: f32 = data.iter().map(|x| x * x).sum();
    let rms = (sum_sq / n).sqrt();

    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n;

    FeatureVector {
        rms,
        mean,
        variance,
        zero_crossing_rate: zero_crossing_rate(data, mean),
    }
}

/// Fraction of adjacent-sample sign changes of the mean-centred signal.
///
/// A sign change requires a strictly negative product, so a constant (or
/// all-zero) window scores 0 and a single-sample window has no pairs to
/// compare.
fn zero_crossing_rate(data: &[f32], mean: f32) -> f32 {
    if data.len() < 2 {
        return 0.0;
    }

    let crossings = data
        .windows(2)
        .filter(|pair| (pair[0] - mean) * (pair[1] - mean) < 0.0)
        .count();

    crossings as f32 / (data.len() - 1) as f32
}
