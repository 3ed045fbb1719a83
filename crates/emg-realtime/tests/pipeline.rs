//! End-to-end pipeline behaviour over simulated and replayed sources

use emg_core::{PipelineConfig, VecSource, Window};
use emg_processing::model::{Conv1dLayer, LinearLayer, ModelArtifact, SCHEMA_VERSION};
use emg_realtime::handoff::window_channel;
use emg_realtime::{PipelineOrchestrator, PipelineState, PipelineStats};
use emg_simulation::{ActivationPattern, SimulatedSource, SimulationConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Minimal valid artifact for a given window size: conv 1->2 (k=3,
/// stride 2, pad 1), feature 4->3, head 5->4
fn test_artifact(signal_length: usize) -> ModelArtifact {
    ModelArtifact {
        schema_version: SCHEMA_VERSION,
        signal_length,
        num_features: 4,
        labels: vec![
            "CLENCH".to_string(),
            "DOWN".to_string(),
            "RELAX".to_string(),
            "UP".to_string(),
        ],
        signal_branch: vec![Conv1dLayer {
            weight: vec![vec![vec![0.4, 0.8, 0.4]], vec![vec![-0.2, 0.3, -0.2]]],
            bias: vec![0.05, -0.02],
            stride: 2,
            padding: 1,
        }],
        feature_branch: vec![LinearLayer {
            weight: vec![
                vec![1.0, 0.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0, 0.0],
                vec![0.0, 0.0, 1.0, 1.0],
            ],
            bias: vec![0.1, 0.0, -0.1],
        }],
        classifier: vec![LinearLayer {
            weight: vec![
                vec![0.5, 0.1, 0.0, 0.2, 0.0],
                vec![0.0, 0.4, 0.1, 0.0, 0.3],
                vec![0.2, 0.0, 0.5, 0.1, 0.0],
                vec![0.1, 0.3, 0.0, 0.0, 0.4],
            ],
            bias: vec![0.0, 0.05, -0.05, 0.0],
        }],
    }
}

async fn wait_for_state(
    rx: &mut tokio::sync::watch::Receiver<PipelineState>,
    wanted: PipelineState,
) {
    timeout(Duration::from_secs(5), async {
        loop {
            if *rx.borrow() == wanted {
                return;
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {:?}", wanted));
}

#[tokio::test]
async fn test_handoff_drops_oldest_and_counts() {
    let stats = Arc::new(PipelineStats::new());
    let (sender, mut receiver) = window_channel(2, stats.clone());

    // Fill well past capacity before the consumer runs
    for i in 0..5 {
        let window = Window::new(vec![i as f32], i as f64, i as f64).unwrap();
        sender.send(window);
    }

    // The two newest windows survive, in FIFO order
    let first = receiver.recv().await.unwrap();
    let second = receiver.recv().await.unwrap();
    assert_eq!(first.samples[0], 3.0);
    assert_eq!(second.samples[0], 4.0);
    assert_eq!(stats.snapshot().windows_dropped, 3);

    drop(sender);
    assert!(receiver.recv().await.is_none());
}

#[tokio::test]
async fn test_zero_stream_end_to_end() {
    let config = PipelineConfig::default();
    let source = VecSource::from_amplitudes(&[0u16; 1000], config.sample_rate_hz);

    let mut pipeline = PipelineOrchestrator::new();
    let mut results = pipeline.subscribe_results();
    pipeline
        .start(&config, Box::new(source), Some(test_artifact(config.window_size)))
        .unwrap();

    // 1000 samples at 250/125 yield exactly floor((1000-250)/125)+1 = 7 windows
    let mut collected = Vec::new();
    for _ in 0..7 {
        let result = timeout(Duration::from_secs(5), results.recv())
            .await
            .expect("timed out waiting for a result")
            .expect("result feed closed early");
        collected.push(result);
    }

    // Strictly increasing last-sample timestamps, one step apart
    assert!((collected[0].timestamp_s - 0.249).abs() < 1e-9);
    for pair in collected.windows(2) {
        assert!(pair[1].timestamp_s > pair[0].timestamp_s);
        assert!((pair[1].timestamp_s - pair[0].timestamp_s - 0.125).abs() < 1e-9);
    }

    // Identical all-zero windows classify identically
    for result in &collected {
        assert_eq!(result.gesture, collected[0].gesture);
        assert_eq!(result.confidences, collected[0].confidences);
        let sum: f32 = result.confidences.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    // The replay source closes after 1000 samples, which faults the run
    let mut state = pipeline.watch_state();
    wait_for_state(&mut state, PipelineState::Faulted).await;

    let snapshot = pipeline.stop().await.unwrap();
    assert_eq!(pipeline.current_state(), PipelineState::Faulted);
    assert_eq!(snapshot.samples_acquired, 1000);
    assert_eq!(snapshot.windows_emitted, 7);
    assert_eq!(snapshot.windows_processed, 7);
    assert_eq!(snapshot.windows_skipped, 0);
}

#[tokio::test]
async fn test_shutdown_mid_window_publishes_nothing() {
    let config = PipelineConfig::default();
    let simulation = SimulationConfig {
        sample_rate_hz: config.sample_rate_hz,
        seed: Some(1),
        ..SimulationConfig::default()
    };
    let source = SimulatedSource::new(simulation, ActivationPattern::Rest).unwrap();

    let mut pipeline = PipelineOrchestrator::new();
    pipeline
        .start(&config, Box::new(source), Some(test_artifact(config.window_size)))
        .unwrap();

    // Stop well before the first 250-sample window fills at 1 kHz
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = pipeline.stop().await.unwrap();

    assert_eq!(pipeline.current_state(), PipelineState::Stopped);
    assert_eq!(snapshot.windows_emitted, 0);
    assert!(pipeline.latest_result().is_none());
}

#[tokio::test]
async fn test_source_closed_faults_the_pipeline() {
    let config = PipelineConfig::default();
    // Closes long before one window worth of samples
    let source = VecSource::from_amplitudes(&[512u16; 100], config.sample_rate_hz);

    let mut pipeline = PipelineOrchestrator::new();
    pipeline
        .start(&config, Box::new(source), Some(test_artifact(config.window_size)))
        .unwrap();

    let mut state = pipeline.watch_state();
    wait_for_state(&mut state, PipelineState::Faulted).await;
    assert!(pipeline.latest_result().is_none());

    pipeline.stop().await.unwrap();
    assert_eq!(pipeline.current_state(), PipelineState::Faulted);
    assert_eq!(pipeline.snapshot().windows_emitted, 0);
}
