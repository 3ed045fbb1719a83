//! Core data model for the gesture pipeline

use crate::error::{EmgError, EmgResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One ADC reading from the sample source.
///
/// Timestamps are monotonic seconds from the source's own clock; the
/// amplitude is the raw converter value (10-bit, 0-1023 on the reference
/// hardware).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Monotonic timestamp in seconds
    pub timestamp_s: f64,
    /// Raw ADC amplitude
    pub amplitude: u16,
}

impl RawSample {
    pub fn new(timestamp_s: f64, amplitude: u16) -> Self {
        Self { timestamp_s, amplitude }
    }
}

/// A bandpass-filtered sample on the acquisition path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSample {
    /// Timestamp carried over from the raw sample
    pub timestamp_s: f64,
    /// Filtered amplitude
    pub value: f32,
}

/// A fixed-length view over the filtered stream, immutable once emitted.
///
/// Owned exclusively by the processing context after hand-off; the id ties
/// drop and skip log events back to a specific window.
#[derive(Debug, Clone)]
pub struct Window {
    /// Unique identifier for this window
    pub id: Uuid,
    /// Filtered amplitudes in arrival order, length = window_size
    pub samples: Vec<f32>,
    /// Timestamp of the first sample in the window
    pub start_timestamp_s: f64,
    /// Timestamp of the last sample in the window
    pub end_timestamp_s: f64,
}

impl Window {
    /// Create a new window, validating basic shape
    pub fn new(samples: Vec<f32>, start_timestamp_s: f64, end_timestamp_s: f64) -> EmgResult<Self> {
        if samples.is_empty() {
            return Err(EmgError::Processing {
                reason: "window must contain at least one sample".to_string(),
            });
        }
        if end_timestamp_s < start_timestamp_s {
            return Err(EmgError::Processing {
                reason: format!(
                    "window end {} precedes start {}",
                    end_timestamp_s, start_timestamp_s
                ),
            });
        }

        Ok(Window {
            id: Uuid::new_v4(),
            samples,
            start_timestamp_s,
            end_timestamp_s,
        })
    }

    /// Number of samples in the window
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when every sample is finite
    pub fn is_finite(&self) -> bool {
        self.samples.iter().all(|v| v.is_finite())
    }
}

/// Width of the feature vector, the artifact's feature-branch input
/// contract. Distinct from [`GESTURE_COUNT`] even though both are 4.
pub const FEATURE_COUNT: usize = 4;

/// Summary statistics of one window.
///
/// Field order (RMS, mean, variance, ZCR) is the model artifact's
/// feature-branch contract and must not be rearranged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Root-mean-square amplitude
    pub rms: f32,
    /// Arithmetic mean amplitude
    pub mean: f32,
    /// Population variance
    pub variance: f32,
    /// Fraction of adjacent sign changes of the mean-centred signal, in [0, 1]
    pub zero_crossing_rate: f32,
}

impl FeatureVector {
    /// Flatten into the artifact's fixed feature-branch order
    pub fn as_array(&self) -> [f32; FEATURE_COUNT] {
        [self.rms, self.mean, self.variance, self.zero_crossing_rate]
    }

    /// True when every field is finite
    pub fn is_finite(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite())
    }
}

/// Number of gesture classes
pub const GESTURE_COUNT: usize = 4;

/// Gesture classes recognised by the pipeline.
///
/// The discriminants are the artifact's class-index order, fixed by the
/// training data labelling: CLENCH=0, DOWN=1, RELAX=2, UP=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gesture {
    Clench = 0,
    Down = 1,
    Relax = 2,
    Up = 3,
}

impl Gesture {
    /// All gestures in class-index order
    pub const ALL: [Gesture; GESTURE_COUNT] =
        [Gesture::Clench, Gesture::Down, Gesture::Relax, Gesture::Up];

    /// Map a class index from the artifact's output layer
    pub fn from_index(index: usize) -> EmgResult<Self> {
        Self::ALL.get(index).copied().ok_or(EmgError::ShapeMismatch {
            expected: GESTURE_COUNT,
            actual: index + 1,
        })
    }

    /// Class index in the artifact's output layer
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Canonical upper-case label, as stored in artifact files
    pub fn label(&self) -> &'static str {
        match self {
            Gesture::Clench => "CLENCH",
            Gesture::Down => "DOWN",
            Gesture::Relax => "RELAX",
            Gesture::Up => "UP",
        }
    }

    /// Parse a canonical label
    pub fn from_label(label: &str) -> EmgResult<Self> {
        match label {
            "CLENCH" => Ok(Gesture::Clench),
            "DOWN" => Ok(Gesture::Down),
            "RELAX" => Ok(Gesture::Relax),
            "UP" => Ok(Gesture::Up),
            other => Err(EmgError::model(format!("unknown gesture label '{}'", other))),
        }
    }
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipeline output: one gesture decision per processed window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Winning gesture class
    pub gesture: Gesture,
    /// Softmax confidence per class, in class-index order, sums to ~1
    pub confidences: [f32; GESTURE_COUNT],
    /// Timestamp of the window's last sample, strictly increasing in
    /// publication order
    pub timestamp_s: f64,
}

impl ClassificationResult {
    /// Confidence of the winning class
    pub fn confidence(&self) -> f32 {
        self.confidences[self.gesture.index()]
    }
}
