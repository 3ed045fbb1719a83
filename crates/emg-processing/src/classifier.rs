//! Deterministic forward pass over the frozen artifact
//!
//! Inference only; no training, no randomness. The same window and feature
//! vector always produce bit-identical confidences.

use crate::model::ModelArtifact;
use emg_core::{
    ClassificationResult, EmgError, EmgResult, FeatureVector, Gesture, Window, GESTURE_COUNT,
};

/// Classifier over a loaded artifact.
///
/// Constructed once at pipeline start and owned by the processing context.
/// `new` fails fast when the artifact's input contract does not match the
/// configured window size, so a mismatch can never surface mid-stream.
#[derive(Debug)]
pub struct ClassifierEngine {
    artifact: ModelArtifact,
}

impl ClassifierEngine {
    pub fn new(artifact: ModelArtifact, window_size: usize) -> EmgResult<Self> {
        artifact.validate()?;
        if artifact.signal_length != window_size {
            return Err(EmgError::ShapeMismatch {
                expected: artifact.signal_length,
                actual: window_size,
            });
        }
        Ok(Self { artifact })
    }

    /// Class labels in output-index order
    pub fn labels(&self) -> &[String] {
        &self.artifact.labels
    }

    /// Classify one window with its feature vector.
    ///
    /// The result timestamp is the window's last-sample timestamp, which is
    /// what keeps published results strictly ordered downstream.
    pub fn classify(
        &self,
        window: &Window,
        features: &FeatureVector,
    ) -> EmgResult<ClassificationResult> {
        if window.len() != self.artifact.signal_length {
            return Err(EmgError::ShapeMismatch {
                expected: self.artifact.signal_length,
                actual: window.len(),
            });
        }
        // ReLU would launder NaN into 0, so non-finite inputs are rejected
        // before they reach the branches
        if !window.is_finite() {
            return Err(EmgError::NonFiniteOutput { stage: "filter" });
        }
        if !features.is_finite() {
            return Err(EmgError::NonFiniteOutput { stage: "features" });
        }

        let signal_out = self.signal_branch(&window.samples);
        let feature_out = self.dense_branch(&self.artifact.feature_branch, &features.as_array());

        let mut combined = signal_out;
        combined.extend_from_slice(&feature_out);

        let logits = self.classifier_head(&combined);
        if logits.iter().any(|v| !v.is_finite()) {
            return Err(EmgError::NonFiniteOutput { stage: "classifier" });
        }

        let confidences = softmax(&logits)?;
        let winner = argmax(&confidences);

        Ok(ClassificationResult {
            gesture: Gesture::from_index(winner)?,
            confidences,
            timestamp_s: window.end_timestamp_s,
        })
    }

    /// Conv stack with ReLU after each layer, then global average pooling
    /// per channel
    fn signal_branch(&self, samples: &[f32]) -> Vec<f32> {
        let mut activations = vec![samples.to_vec()];
        for layer in &self.artifact.signal_branch {
            activations = layer.forward(&activations);
            for channel in &mut activations {
                for value in channel.iter_mut() {
                    *value = value.max(0.0);
                }
            }
        }

        activations
            .iter()
            .map(|channel| {
                if channel.is_empty() {
                    0.0
                } else {
                    channel.iter().sum::<f32>() / channel.len() as f32
                }
            })
            .collect()
    }

    /// Dense chain with ReLU after every layer
    fn dense_branch(&self, layers: &[crate::model::LinearLayer], input: &[f32]) -> Vec<f32> {
        let mut activation = input.to_vec();
        for layer in layers {
            activation = layer.forward(&activation);
            for value in activation.iter_mut() {
                *value = value.max(0.0);
            }
        }
        activation
    }

    /// Classifier head: ReLU between layers, raw logits out of the last
    fn classifier_head(&self, input: &[f32]) -> Vec<f32> {
        let mut activation = input.to_vec();
        let last = self.artifact.classifier.len() - 1;
        for (index, layer) in self.artifact.classifier.iter().enumerate() {
            activation = layer.forward(&activation);
            if index < last {
                for value in activation.iter_mut() {
                    *value = value.max(0.0);
                }
            }
        }
        activation
    }
}

/// Numerically stable softmax over the class logits
fn softmax(logits: &[f32]) -> EmgResult<[f32; GESTURE_COUNT]> {
    if logits.len() != GESTURE_COUNT {
        return Err(EmgError::ShapeMismatch {
            expected: GESTURE_COUNT,
            actual: logits.len(),
        });
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut out = [0.0f32; GESTURE_COUNT];
    let mut sum = 0.0f32;
    for (slot, &logit) in out.iter_mut().zip(logits) {
        let e = (logit - max).exp();
        *slot = e;
        sum += e;
    }
    for slot in out.iter_mut() {
        *slot /= sum;
    }
    Ok(out)
}

/// Index of the largest confidence; ties resolve to the lowest index
fn argmax(confidences: &[f32; GESTURE_COUNT]) -> usize {
    let mut best = 0;
    for (index, &value) in confidences.iter().enumerate() {
        if value > confidences[best] {
            best = index;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::tiny_artifact;

    fn test_window() -> Window {
        Window::new(vec![0.5, -0.5, 1.0, 0.0, -1.0, 0.25, 0.75, -0.25], 0.0, 0.007).unwrap()
    }

    fn test_features() -> FeatureVector {
        FeatureVector { rms: 0.62, mean: 0.09, variance: 0.38, zero_crossing_rate: 0.71 }
    }

    #[test]
    fn test_window_size_checked_at_construction() {
        let err = ClassifierEngine::new(tiny_artifact(), 250).unwrap_err();
        assert!(matches!(err, EmgError::ShapeMismatch { expected: 8, actual: 250 }));
        assert!(ClassifierEngine::new(tiny_artifact(), 8).is_ok());
    }

    #[test]
    fn test_invalid_artifact_rejected_at_construction() {
        let mut artifact = tiny_artifact();
        artifact.labels.pop();
        assert!(ClassifierEngine::new(artifact, 8).is_err());
    }

    #[test]
    fn test_classification_is_deterministic() {
        let engine = ClassifierEngine::new(tiny_artifact(), 8).unwrap();
        let window = test_window();
        let features = test_features();

        let first = engine.classify(&window, &features).unwrap();
        let second = engine.classify(&window, &features).unwrap();

        assert_eq!(first.gesture, second.gesture);
        assert_eq!(first.confidences, second.confidences);
    }

    #[test]
    fn test_confidences_form_distribution() {
        let engine = ClassifierEngine::new(tiny_artifact(), 8).unwrap();
        let result = engine.classify(&test_window(), &test_features()).unwrap();

        let sum: f32 = result.confidences.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(result.confidences.iter().all(|&c| (0.0..=1.0).contains(&c)));
        assert!(result.confidence() >= 0.25 - 1e-6);
    }

    #[test]
    fn test_result_timestamp_is_window_end() {
        let engine = ClassifierEngine::new(tiny_artifact(), 8).unwrap();
        let result = engine.classify(&test_window(), &test_features()).unwrap();
        assert_eq!(result.timestamp_s, 0.007);
    }

    #[test]
    fn test_wrong_window_length_rejected() {
        let engine = ClassifierEngine::new(tiny_artifact(), 8).unwrap();
        let short = Window::new(vec![0.0; 7], 0.0, 0.006).unwrap();
        let err = engine.classify(&short, &test_features()).unwrap_err();
        assert!(matches!(err, EmgError::ShapeMismatch { expected: 8, actual: 7 }));
    }

    #[test]
    fn test_non_finite_window_rejected() {
        let engine = ClassifierEngine::new(tiny_artifact(), 8).unwrap();

        let window = Window::new(vec![f32::NAN; 8], 0.0, 0.007).unwrap();
        let err = engine.classify(&window, &test_features()).unwrap_err();
        assert!(matches!(err, EmgError::NonFiniteOutput { stage: "filter" }));

        let window = Window::new(
            vec![0.0, 1.0, f32::INFINITY, 0.0, 1.0, 0.0, 1.0, 0.0],
            0.0,
            0.007,
        )
        .unwrap();
        assert!(engine.classify(&window, &test_features()).is_err());
    }

    #[test]
    fn test_non_finite_features_rejected() {
        let engine = ClassifierEngine::new(tiny_artifact(), 8).unwrap();

        let features = FeatureVector { variance: f32::NAN, ..test_features() };
        let err = engine.classify(&test_window(), &features).unwrap_err();
        assert!(matches!(err, EmgError::NonFiniteOutput { stage: "features" }));
    }

    #[test]
    fn test_nan_weight_surfaces_as_non_finite() {
        let mut artifact = tiny_artifact();
        artifact.classifier[0].weight[0][0] = f32::NAN;
        let engine = ClassifierEngine::new(artifact, 8).unwrap();

        let err = engine.classify(&test_window(), &test_features()).unwrap_err();
        assert!(matches!(err, EmgError::NonFiniteOutput { stage: "classifier" }));
    }

    #[test]
    fn test_argmax_prefers_lowest_on_tie() {
        assert_eq!(argmax(&[0.25, 0.25, 0.25, 0.25]), 0);
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), 1);
    }
}
