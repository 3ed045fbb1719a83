//! Pipeline lifecycle and the two execution contexts
//!
//! The acquisition context runs the blocking source loop on the blocking
//! thread pool; the processing context is an ordinary async task. They
//! share nothing but the hand-off queue, the stop flag and the counters.

use crate::handoff::{window_channel, WindowSender};
use crate::sink::ResultSink;
use crate::stats::{PipelineStats, StatsSnapshot};
use emg_core::{
    ClassificationResult, EmgError, EmgResult, PipelineConfig, SampleSource,
};
use emg_processing::{
    features, BandpassFilterStage, ClassifierEngine, ModelArtifact, SlidingWindowBuffer,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Observable pipeline lifecycle.
///
/// `Faulted` is entered when the source closes or errors while a run is
/// still wanted; a requested stop goes through `Stopping` to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Stopping,
    Stopped,
    Faulted,
}

/// Owns one pipeline run from `start` to `stop`.
///
/// Single-shot: a stopped or faulted orchestrator is not restarted, a new
/// one is built instead, so counters and result ordering never bleed
/// between runs.
pub struct PipelineOrchestrator {
    state: Arc<watch::Sender<PipelineState>>,
    stats: Arc<PipelineStats>,
    sink: Arc<ResultSink>,
    stop: Arc<AtomicBool>,
    acquisition: Option<JoinHandle<EmgResult<()>>>,
    processing: Option<JoinHandle<()>>,
}

impl PipelineOrchestrator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            state: Arc::new(state),
            stats: Arc::new(PipelineStats::new()),
            sink: Arc::new(ResultSink::new()),
            stop: Arc::new(AtomicBool::new(false)),
            acquisition: None,
            processing: None,
        }
    }

    /// Validate everything and spawn both contexts.
    ///
    /// The artifact may be passed pre-loaded; otherwise it is read from
    /// `config.model_path`. Any failure here leaves the state at `Idle`.
    pub fn start(
        &mut self,
        config: &PipelineConfig,
        source: Box<dyn SampleSource>,
        artifact: Option<ModelArtifact>,
    ) -> EmgResult<()> {
        if self.current_state() != PipelineState::Idle {
            return Err(EmgError::config(format!(
                "pipeline cannot start from state {:?}",
                self.current_state()
            )));
        }
        config.validate()?;

        let artifact = match (artifact, &config.model_path) {
            (Some(artifact), _) => {
                artifact.validate()?;
                artifact
            }
            (None, Some(path)) => ModelArtifact::load(path)?,
            (None, None) => {
                return Err(EmgError::config(
                    "no model artifact given and no model_path configured",
                ))
            }
        };

        let engine = ClassifierEngine::new(artifact, config.window_size)?;
        let filter = BandpassFilterStage::from_config(config)?;
        let buffer = SlidingWindowBuffer::new(config.window_size, config.step_size);
        let (sender, mut receiver) = window_channel(config.queue_capacity, self.stats.clone());

        info!(
            source = %source.description(),
            window_size = config.window_size,
            step_size = config.step_size,
            queue_capacity = config.queue_capacity,
            "pipeline starting"
        );
        self.state.send_replace(PipelineState::Running);

        // Acquisition context
        let stop = self.stop.clone();
        let stats = self.stats.clone();
        let state = self.state.clone();
        self.acquisition = Some(tokio::task::spawn_blocking(move || {
            let result = acquisition_loop(source, filter, buffer, sender, &stop, &stats);
            if let Err(ref e) = result {
                if !stop.load(Ordering::SeqCst) {
                    error!(error = %e, "acquisition fault");
                    state.send_replace(PipelineState::Faulted);
                }
            }
            result
        }));

        // Processing context
        let stop = self.stop.clone();
        let stats = self.stats.clone();
        let sink = self.sink.clone();
        self.processing = Some(tokio::spawn(async move {
            while let Some(window) = receiver.recv().await {
                let features = features::extract(&window);
                match engine.classify(&window, &features) {
                    Ok(result) => {
                        if sink.publish(result) {
                            stats.record_window_processed();
                        } else {
                            stats.record_window_skipped();
                        }
                    }
                    Err(e) => {
                        warn!(window_id = %window.id, error = %e, "window skipped");
                        stats.record_window_skipped();
                    }
                }
                if stop.load(Ordering::SeqCst) {
                    break;
                }
            }
            info!("processing context finished");
        }));

        Ok(())
    }

    /// Request a stop and wait for both contexts to finish.
    ///
    /// A fault that was already signalled is preserved; otherwise the
    /// pipeline lands in `Stopped`.
    pub async fn stop(&mut self) -> EmgResult<StatsSnapshot> {
        self.stop.store(true, Ordering::SeqCst);
        if self.current_state() == PipelineState::Running {
            self.state.send_replace(PipelineState::Stopping);
        }

        if let Some(handle) = self.acquisition.take() {
            match handle.await {
                Ok(Ok(())) => {}
                // Fault already logged and signalled from the task
                Ok(Err(_)) => {}
                Err(e) => {
                    error!(error = %e, "acquisition context panicked");
                    self.state.send_replace(PipelineState::Faulted);
                }
            }
        }
        if let Some(handle) = self.processing.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "processing context panicked");
                self.state.send_replace(PipelineState::Faulted);
            }
        }

        let final_state = match self.current_state() {
            PipelineState::Faulted => PipelineState::Faulted,
            _ => PipelineState::Stopped,
        };
        self.state.send_replace(final_state);

        let snapshot = self.stats.snapshot();
        info!(?final_state, ?snapshot, "pipeline stopped");
        Ok(snapshot)
    }

    pub fn current_state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Watch handle over lifecycle transitions
    pub fn watch_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Most recent published result, non-blocking
    pub fn latest_result(&self) -> Option<ClassificationResult> {
        self.sink.latest()
    }

    /// Push subscription over every published result
    pub fn subscribe_results(&self) -> broadcast::Receiver<ClassificationResult> {
        self.sink.subscribe()
    }

    /// Watch handle over the latest-result cell
    pub fn watch_results(&self) -> watch::Receiver<Option<ClassificationResult>> {
        self.sink.watch_latest()
    }
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking read-filter-window loop.
///
/// Runs until a stop is requested or the source ends. A closed source
/// while a run is still wanted is an error; the partial window in the
/// buffer is discarded with it either way.
fn acquisition_loop(
    mut source: Box<dyn SampleSource>,
    mut filter: BandpassFilterStage,
    mut buffer: SlidingWindowBuffer,
    sender: WindowSender,
    stop: &AtomicBool,
    stats: &PipelineStats,
) -> EmgResult<()> {
    info!(source = %source.description(), "acquisition context started");

    loop {
        if stop.load(Ordering::SeqCst) {
            return Ok(());
        }

        match source.next_sample()? {
            Some(raw) => {
                stats.record_sample();
                let filtered = filter.apply_raw(raw);
                if let Some(window) = buffer.push(filtered)? {
                    stats.record_window_emitted();
                    sender.send(window);
                }
            }
            None => {
                if stop.load(Ordering::SeqCst) {
                    return Ok(());
                }
                return Err(EmgError::source("sample source closed while running"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emg_core::VecSource;

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let mut pipeline = PipelineOrchestrator::new();
        let config = PipelineConfig { step_size: 0, ..PipelineConfig::default() };

        let source = Box::new(VecSource::from_amplitudes(&[512; 10], 1000.0));
        assert!(pipeline.start(&config, source, None).is_err());
        assert_eq!(pipeline.current_state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_start_requires_an_artifact() {
        let mut pipeline = PipelineOrchestrator::new();
        let config = PipelineConfig { model_path: None, ..PipelineConfig::default() };

        let source = Box::new(VecSource::from_amplitudes(&[512; 10], 1000.0));
        assert!(pipeline.start(&config, source, None).is_err());
        assert_eq!(pipeline.current_state(), PipelineState::Idle);
    }
}
