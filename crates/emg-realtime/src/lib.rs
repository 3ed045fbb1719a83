//! emg-realtime: two-context pipeline orchestration
//!
//! Wires the blocking acquisition side (sample source, filter, windowing)
//! to the async processing side (features, classification, publication)
//! through a bounded drop-oldest hand-off queue.

pub mod handoff;
pub mod orchestrator;
pub mod sink;
pub mod stats;

pub use orchestrator::{PipelineOrchestrator, PipelineState};
pub use sink::ResultSink;
pub use stats::{PipelineStats, StatsSnapshot};
