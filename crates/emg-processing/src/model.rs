//! Frozen model artifact
//!
//! The artifact is a JSON document describing the hybrid network: a 1-D
//! convolutional signal branch ending in global average pooling, a small
//! dense feature branch, and a dense classifier head over the concatenated
//! branch outputs. Weights are exported in inference form: batch-norm is
//! folded into the convolution weights and dropout is absent.
//!
//! Everything about the artifact is validated once at load; a pipeline
//! never starts against a malformed or mismatched artifact.

use emg_core::{EmgError, EmgResult, Gesture, FEATURE_COUNT, GESTURE_COUNT};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Artifact format revision understood by this build
pub const SCHEMA_VERSION: u32 = 1;

/// One 1-D convolution layer, ReLU applied after it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv1dLayer {
    /// Weights indexed \[out_channel\]\[in_channel\]\[kernel_tap\]
    pub weight: Vec<Vec<Vec<f32>>>,
    /// One bias per output channel
    pub bias: Vec<f32>,
    /// Stride along the time axis
    pub stride: usize,
    /// Zero padding on each side
    pub padding: usize,
}

impl Conv1dLayer {
    pub fn out_channels(&self) -> usize {
        self.weight.len()
    }

    pub fn in_channels(&self) -> usize {
        self.weight.first().map(|w| w.len()).unwrap_or(0)
    }

    pub fn kernel_size(&self) -> usize {
        self.weight
            .first()
            .and_then(|w| w.first())
            .map(|k| k.len())
            .unwrap_or(0)
    }

    /// Output length for a given input length, or None when the input is
    /// too short for one kernel placement
    pub fn output_len(&self, input_len: usize) -> Option<usize> {
        let padded = input_len + 2 * self.padding;
        if padded < self.kernel_size() {
            return None;
        }
        Some((padded - self.kernel_size()) / self.stride + 1)
    }

    fn validate(&self, index: usize) -> EmgResult<()> {
        if self.weight.is_empty() {
            return Err(EmgError::model(format!("conv layer {} has no output channels", index)));
        }
        if self.stride == 0 {
            return Err(EmgError::model(format!("conv layer {} has zero stride", index)));
        }

        let in_channels = self.in_channels();
        let kernel = self.kernel_size();
        if in_channels == 0 || kernel == 0 {
            return Err(EmgError::model(format!("conv layer {} has an empty kernel", index)));
        }
        for (c, channel) in self.weight.iter().enumerate() {
            if channel.len() != in_channels {
                return Err(EmgError::model(format!(
                    "conv layer {} channel {} expects {} input channels, found {}",
                    index,
                    c,
                    in_channels,
                    channel.len()
                )));
            }
            if channel.iter().any(|taps| taps.len() != kernel) {
                return Err(EmgError::model(format!(
                    "conv layer {} channel {} has ragged kernels",
                    index, c
                )));
            }
        }
        if self.bias.len() != self.out_channels() {
            return Err(EmgError::model(format!(
                "conv layer {} has {} biases for {} output channels",
                index,
                self.bias.len(),
                self.out_channels()
            )));
        }

        Ok(())
    }

    /// Apply the convolution to \[channel\]\[time\] input
    pub fn forward(&self, input: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let input_len = input.first().map(|c| c.len()).unwrap_or(0);
        let output_len = self.output_len(input_len).unwrap_or(0);
        let kernel = self.kernel_size();

        let mut output = Vec::with_capacity(self.out_channels());
        for (channel_weights, &bias) in self.weight.iter().zip(&self.bias) {
            let mut channel_out = Vec::with_capacity(output_len);
            for t in 0..output_len {
                let base = (t * self.stride) as isize - self.padding as isize;
                let mut acc = bias;
                for (in_channel, taps) in input.iter().zip(channel_weights) {
                    for k in 0..kernel {
                        let idx = base + k as isize;
                        if idx >= 0 && (idx as usize) < in_channel.len() {
                            acc += taps[k] * in_channel[idx as usize];
                        }
                    }
                }
                channel_out.push(acc);
            }
            output.push(channel_out);
        }

        output
    }
}

/// One fully connected layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearLayer {
    /// Weights indexed \[output\]\[input\]
    pub weight: Vec<Vec<f32>>,
    /// One bias per output
    pub bias: Vec<f32>,
}

impl LinearLayer {
    pub fn out_features(&self) -> usize {
        self.weight.len()
    }

    pub fn in_features(&self) -> usize {
        self.weight.first().map(|row| row.len()).unwrap_or(0)
    }

    fn validate(&self, name: &str, index: usize) -> EmgResult<()> {
        if self.weight.is_empty() {
            return Err(EmgError::model(format!("{} layer {} has no outputs", name, index)));
        }
        let in_features = self.in_features();
        if in_features == 0 {
            return Err(EmgError::model(format!("{} layer {} has no inputs", name, index)));
        }
        if self.weight.iter().any(|row| row.len() != in_features) {
            return Err(EmgError::model(format!("{} layer {} has ragged rows", name, index)));
        }
        if self.bias.len() != self.out_features() {
            return Err(EmgError::model(format!(
                "{} layer {} has {} biases for {} outputs",
                name,
                index,
                self.bias.len(),
                self.out_features()
            )));
        }
        Ok(())
    }

    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weight
            .iter()
            .zip(&self.bias)
            .map(|(row, &bias)| {
                bias + row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>()
            })
            .collect()
    }
}

/// Frozen weights plus the input/output contract of the classifier.
///
/// Immutable after load; shared read-only by the processing context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Artifact format revision
    pub schema_version: u32,
    /// Exact window length the signal branch accepts
    pub signal_length: usize,
    /// Exact feature-vector length the feature branch accepts
    pub num_features: usize,
    /// Class labels in output-index order
    pub labels: Vec<String>,
    /// Convolutional signal branch, global average pool after the last layer
    pub signal_branch: Vec<Conv1dLayer>,
    /// Dense feature branch
    pub feature_branch: Vec<LinearLayer>,
    /// Dense classifier head over the concatenated branch outputs
    pub classifier: Vec<LinearLayer>,
}

impl ModelArtifact {
    /// Load and validate an artifact from a JSON file
    pub fn load(path: impl AsRef<Path>) -> EmgResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            EmgError::model(format!("cannot open artifact {}: {}", path.display(), e))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse and validate an artifact from any reader
    pub fn from_reader(reader: impl Read) -> EmgResult<Self> {
        let artifact: ModelArtifact = serde_json::from_reader(reader)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Parse and validate an artifact from a JSON string
    pub fn from_json(json: &str) -> EmgResult<Self> {
        let artifact: ModelArtifact = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Width of the concatenated branch outputs fed to the classifier head
    pub fn combined_width(&self) -> usize {
        let signal = self.signal_branch.last().map(|l| l.out_channels()).unwrap_or(0);
        let feature = self.feature_branch.last().map(|l| l.out_features()).unwrap_or(0);
        signal + feature
    }

    /// Structural validation of the whole artifact
    pub fn validate(&self) -> EmgResult<()> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(EmgError::model(format!(
                "unsupported artifact schema {} (expected {})",
                self.schema_version, SCHEMA_VERSION
            )));
        }
        if self.signal_length == 0 {
            return Err(EmgError::model("signal_length must be positive"));
        }
        if self.num_features != FEATURE_COUNT {
            return Err(EmgError::model(format!(
                "feature branch contract expects {} features, artifact declares {}",
                FEATURE_COUNT, self.num_features
            )));
        }

        self.validate_labels()?;
        self.validate_signal_branch()?;
        self.validate_dense_chain("feature", &self.feature_branch, self.num_features)?;
        self.validate_dense_chain("classifier", &self.classifier, self.combined_width())?;

        let head_out = self
            .classifier
            .last()
            .map(|l| l.out_features())
            .unwrap_or(0);
        if head_out != self.labels.len() {
            return Err(EmgError::model(format!(
                "classifier emits {} scores for {} labels",
                head_out,
                self.labels.len()
            )));
        }

        Ok(())
    }

    fn validate_labels(&self) -> EmgResult<()> {
        if self.labels.len() != GESTURE_COUNT {
            return Err(EmgError::model(format!(
                "artifact declares {} labels, expected {}",
                self.labels.len(),
                GESTURE_COUNT
            )));
        }
        for (index, label) in self.labels.iter().enumerate() {
            let gesture = Gesture::from_label(label)?;
            if gesture.index() != index {
                return Err(EmgError::model(format!(
                    "label '{}' at index {} conflicts with the fixed class order {:?}",
                    label,
                    index,
                    Gesture::ALL
                )));
            }
        }
        Ok(())
    }

    fn validate_signal_branch(&self) -> EmgResult<()> {
        if self.signal_branch.is_empty() {
            return Err(EmgError::model("signal branch has no layers"));
        }

        let mut in_channels = 1;
        let mut length = self.signal_length;
        for (index, layer) in self.signal_branch.iter().enumerate() {
            layer.validate(index)?;
            if layer.in_channels() != in_channels {
                return Err(EmgError::model(format!(
                    "conv layer {} expects {} input channels, previous layer provides {}",
                    index,
                    layer.in_channels(),
                    in_channels
                )));
            }
            length = layer.output_len(length).ok_or_else(|| {
                EmgError::model(format!(
                    "conv layer {} kernel does not fit its {}-sample input",
                    index, length
                ))
            })?;
            if length == 0 {
                return Err(EmgError::model(format!(
                    "conv layer {} collapses the signal to zero length",
                    index
                )));
            }
            in_channels = layer.out_channels();
        }

        Ok(())
    }

    fn validate_dense_chain(
        &self,
        name: &str,
        layers: &[LinearLayer],
        mut width: usize,
    ) -> EmgResult<()> {
        if layers.is_empty() {
            return Err(EmgError::model(format!("{} branch has no layers", name)));
        }
        for (index, layer) in layers.iter().enumerate() {
            layer.validate(name, index)?;
            if layer.in_features() != width {
                return Err(EmgError::model(format!(
                    "{} layer {} expects {} inputs, previous stage provides {}",
                    name,
                    index,
                    layer.in_features(),
                    width
                )));
            }
            width = layer.out_features();
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Small but structurally complete artifact for engine tests:
    /// signal_length 8, conv 1->2 (k=3, stride 2, pad 1), feature 4->3,
    /// head 5->4.
    pub fn tiny_artifact() -> ModelArtifact {
        ModelArtifact {
            schema_version: SCHEMA_VERSION,
            signal_length: 8,
            num_features: 4,
            labels: vec![
                "CLENCH".to_string(),
                "DOWN".to_string(),
                "RELAX".to_string(),
                "UP".to_string(),
            ],
            signal_branch: vec![Conv1dLayer {
                weight: vec![
                    vec![vec![0.5, 1.0, 0.5]],
                    vec![vec![-0.25, 0.25, -0.25]],
                ],
                bias: vec![0.1, -0.1],
                stride: 2,
                padding: 1,
            }],
            feature_branch: vec![LinearLayer {
                weight: vec![
                    vec![1.0, 0.0, 0.0, 0.0],
                    vec![0.0, 1.0, 0.0, 0.0],
                    vec![0.0, 0.0, 0.5, 0.5],
                ],
                bias: vec![0.0, 0.0, 0.0],
            }],
            classifier: vec![LinearLayer {
                weight: vec![
                    vec![1.0, 0.0, 0.0, 0.0, 0.0],
                    vec![0.0, 1.0, 0.0, 0.0, 0.0],
                    vec![0.0, 0.0, 1.0, 0.0, 0.0],
                    vec![0.0, 0.0, 0.0, 1.0, 1.0],
                ],
                bias: vec![0.0, 0.0, 0.0, 0.0],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::tiny_artifact;
    use super::*;

    #[test]
    fn test_tiny_artifact_is_valid() {
        assert!(tiny_artifact().validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let artifact = tiny_artifact();
        let json = serde_json::to_string(&artifact).unwrap();
        let restored = ModelArtifact::from_json(&json).unwrap();
        assert_eq!(restored.signal_length, 8);
        assert_eq!(restored.combined_width(), 5);
    }

    #[test]
    fn test_schema_version_checked() {
        let mut artifact = tiny_artifact();
        artifact.schema_version = 99;
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn test_feature_width_checked() {
        let mut artifact = tiny_artifact();
        artifact.num_features = 5;
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn test_label_order_enforced() {
        let mut artifact = tiny_artifact();
        artifact.labels.swap(0, 2);
        assert!(artifact.validate().is_err());

        artifact = tiny_artifact();
        artifact.labels[3] = "WAVE".to_string();
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn test_channel_chain_checked() {
        let mut artifact = tiny_artifact();
        // First conv must consume a single input channel
        artifact.signal_branch[0].weight = vec![vec![vec![1.0; 3]; 2]; 2];
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn test_head_width_checked() {
        let mut artifact = tiny_artifact();
        // Head input no longer matches signal(2) + feature(3)
        artifact.classifier[0].weight = vec![vec![1.0; 4]; 4];
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn test_ragged_kernel_rejected() {
        let mut artifact = tiny_artifact();
        artifact.signal_branch[0].weight[0][0].pop();
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn test_conv_output_len() {
        let layer = &tiny_artifact().signal_branch[0];
        // (8 + 2*1 - 3) / 2 + 1 = 4
        assert_eq!(layer.output_len(8), Some(4));
        assert_eq!(layer.output_len(1), Some(1));
    }

    #[test]
    fn test_conv_forward_known_values() {
        let layer = Conv1dLayer {
            weight: vec![vec![vec![1.0, 1.0]]],
            bias: vec![0.0],
            stride: 1,
            padding: 0,
        };
        let out = layer.forward(&[vec![1.0, 2.0, 3.0]]);
        assert_eq!(out, vec![vec![3.0, 5.0]]);
    }

    #[test]
    fn test_linear_forward_known_values() {
        let layer = LinearLayer {
            weight: vec![vec![2.0, 0.0], vec![1.0, 1.0]],
            bias: vec![1.0, 0.0],
        };
        assert_eq!(layer.forward(&[3.0, 4.0]), vec![7.0, 7.0]);
    }
}
