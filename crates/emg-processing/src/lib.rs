//! emg-processing: DSP and inference stages of the gesture pipeline
//!
//! Bandpass filtering with persistent state, sliding-window assembly,
//! feature extraction and the frozen-artifact classifier. Everything here
//! is synchronous; the realtime crate decides where each stage runs.

pub mod classifier;
pub mod features;
pub mod filter;
pub mod model;
pub mod window;

pub use classifier::ClassifierEngine;
pub use features::extract;
pub use filter::BandpassFilterStage;
pub use model::ModelArtifact;
pub use window::SlidingWindowBuffer;
