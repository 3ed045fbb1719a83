//! Sample source boundary
//!
//! The pipeline consumes an abstract timestamped-sample stream; serial
//! transport, hardware and pacing live behind this trait.

use crate::error::EmgResult;
use crate::types::RawSample;

/// A blocking source of timestamped EMG samples.
///
/// `next_sample` blocks until the next sample is available and returns
/// `Ok(None)` exactly once, when the source is closed. Implementations must
/// return within a bounded time (on the order of one sample period) so the
/// acquisition context can observe a stop request between reads.
pub trait SampleSource: Send {
    /// Block until the next sample is available, or report source-closed
    fn next_sample(&mut self) -> EmgResult<Option<RawSample>>;

    /// Human-readable source description, used in log events
    fn description(&self) -> String {
        "sample source".to_string()
    }
}

/// A source that replays a fixed set of samples without pacing, then
/// reports closed. Used by tests and offline replays.
#[derive(Debug)]
pub struct VecSource {
    samples: std::vec::IntoIter<RawSample>,
}

impl VecSource {
    pub fn new(samples: Vec<RawSample>) -> Self {
        Self { samples: samples.into_iter() }
    }

    /// Build a source from raw amplitudes at a fixed rate, timestamps
    /// starting at zero
    pub fn from_amplitudes(amplitudes: &[u16], sample_rate_hz: f32) -> Self {
        let period = 1.0 / sample_rate_hz as f64;
        let samples = amplitudes
            .iter()
            .enumerate()
            .map(|(i, &amplitude)| RawSample::new(i as f64 * period, amplitude))
            .collect();
        Self::new(samples)
    }
}

impl SampleSource for VecSource {
    fn next_sample(&mut self) -> EmgResult<Option<RawSample>> {
        Ok(self.samples.next())
    }

    fn description(&self) -> String {
        "replay source".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_source_replays_then_closes() {
        let mut source = VecSource::from_amplitudes(&[512, 513, 514], 1000.0);

        let first = source.next_sample().unwrap().unwrap();
        assert_eq!(first.amplitude, 512);
        assert_eq!(first.timestamp_s, 0.0);

        let second = source.next_sample().unwrap().unwrap();
        assert!((second.timestamp_s - 0.001).abs() < 1e-9);

        assert!(source.next_sample().unwrap().is_some());
        assert!(source.next_sample().unwrap().is_none());
    }
}
