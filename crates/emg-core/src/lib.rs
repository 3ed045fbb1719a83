//! emg-core: Foundation types for the real-time EMG gesture pipeline
//!
//! Shared data model, error type, configuration and the sample-source
//! boundary consumed by the processing and realtime crates.

pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::PipelineConfig;
pub use error::{EmgError, EmgResult};
pub use source::{SampleSource, VecSource};
pub use types::*;
