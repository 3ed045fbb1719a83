//! Demo binary: simulated EMG source into the full pipeline
//!
//! Streams a paced simulated signal through filtering, windowing, feature
//! extraction and classification, logging each gesture decision and a
//! periodic counter snapshot until Ctrl-C.

use emg_core::PipelineConfig;
use emg_processing::model::{Conv1dLayer, LinearLayer};
use emg_processing::ModelArtifact;
use emg_realtime::{PipelineOrchestrator, PipelineState};
use emg_simulation::{ActivationPattern, SimulatedSource, SimulationConfig};
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = PipelineConfig::default();

    let artifact = match std::env::args().nth(1) {
        Some(path) => {
            info!(%path, "loading model artifact");
            ModelArtifact::load(&path)?
        }
        None => {
            warn!("no artifact path given, using built-in untrained demo weights");
            demo_artifact(config.window_size)
        }
    };

    let simulation = SimulationConfig {
        sample_rate_hz: config.sample_rate_hz,
        ..SimulationConfig::default()
    };
    let pattern = ActivationPattern::Burst {
        on_duration_s: 2.0,
        off_duration_s: 1.0,
        level: 0.7,
    };
    let source = SimulatedSource::new(simulation, pattern)?;

    let mut pipeline = PipelineOrchestrator::new();
    pipeline.start(&config, Box::new(source), Some(artifact))?;

    let mut results = pipeline.subscribe_results();
    let mut state = pipeline.watch_state();
    let mut stats_tick = tokio::time::interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("stop requested");
                break;
            }
            result = results.recv() => match result {
                Ok(result) => info!(
                    gesture = %result.gesture,
                    confidence = result.confidence(),
                    timestamp_s = result.timestamp_s,
                    "gesture"
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "display fell behind the result feed");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = stats_tick.tick() => {
                info!(snapshot = ?pipeline.snapshot(), "pipeline stats");
            }
            changed = state.changed() => {
                if changed.is_err() || *state.borrow() == PipelineState::Faulted {
                    error!("pipeline faulted");
                    break;
                }
            }
        }
    }

    let snapshot = pipeline.stop().await?;
    info!(?snapshot, "final stats");
    Ok(())
}

/// Structurally valid artifact with small seeded random weights, so the
/// demo runs without a trained model file. Decisions are meaningless.
fn demo_artifact(window_size: usize) -> ModelArtifact {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x9e37_79b9_7f4a_7c15);
    let mut weights =
        |n: usize| -> Vec<f32> { (0..n).map(|_| rng.gen_range(-0.1f32..0.1)).collect() };

    let conv = Conv1dLayer {
        weight: (0..8).map(|_| vec![weights(7)]).collect(),
        bias: weights(8),
        stride: 2,
        padding: 3,
    };
    let feature = LinearLayer {
        weight: (0..8).map(|_| weights(4)).collect(),
        bias: weights(8),
    };
    let head = LinearLayer {
        weight: (0..4).map(|_| weights(16)).collect(),
        bias: weights(4),
    };

    ModelArtifact {
        schema_version: emg_processing::model::SCHEMA_VERSION,
        signal_length: window_size,
        num_features: 4,
        labels: vec![
            "CLENCH".to_string(),
            "DOWN".to_string(),
            "RELAX".to_string(),
            "UP".to_string(),
        ],
        signal_branch: vec![conv],
        feature_branch: vec![feature],
        classifier: vec![head],
    }
}
