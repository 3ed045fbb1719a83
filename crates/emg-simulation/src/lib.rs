//! emg-simulation: synthetic single-channel EMG sources
//!
//! Drives the pipeline without hardware. The simulated source implements
//! the same blocking `SampleSource` contract as a serial ADC reader, with
//! optional real-time pacing.

pub mod patterns;
pub mod source;

pub use patterns::ActivationPattern;
pub use source::{SimulatedSource, SimulationConfig};
