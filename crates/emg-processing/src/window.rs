//! Sliding-window assembly over the filtered stream

use emg_core::{EmgResult, FilteredSample, Window};
use std::collections::VecDeque;

/// Accumulates filtered samples and emits fixed-size overlapping windows.
///
/// The first window is emitted on the `window_size`-th accepted sample,
/// then one window per `step_size` further samples. With the reference
/// 250/125 configuration consecutive windows share exactly half their
/// samples. A partially filled buffer at shutdown is simply dropped with
/// the stage.
pub struct SlidingWindowBuffer {
    window_size: usize,
    step_size: usize,
    buffer: VecDeque<FilteredSample>,
    samples_since_emit: usize,
    primed: bool,
}

impl SlidingWindowBuffer {
    pub fn new(window_size: usize, step_size: usize) -> Self {
        debug_assert!(window_size > 0 && step_size > 0 && step_size <= window_size);
        Self {
            window_size,
            step_size,
            buffer: VecDeque::with_capacity(window_size + 1),
            samples_since_emit: 0,
            primed: false,
        }
    }

    /// Accept one filtered sample; returns a window when one is due
    pub fn push(&mut self, sample: FilteredSample) -> EmgResult<Option<Window>> {
        self.buffer.push_back(sample);
        if self.buffer.len() > self.window_size {
            self.buffer.pop_front();
        }

        if !self.primed {
            if self.buffer.len() == self.window_size {
                self.primed = true;
                return self.emit().map(Some);
            }
            return Ok(None);
        }

        self.samples_since_emit += 1;
        if self.samples_since_emit == self.step_size {
            return self.emit().map(Some);
        }

        Ok(None)
    }

    /// Number of samples currently buffered (at most `window_size`)
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn emit(&mut self) -> EmgResult<Window> {
        self.samples_since_emit = 0;

        let samples: Vec<f32> = self.buffer.iter().map(|s| s.value).collect();
        // primed implies a non-empty buffer
        let start = self.buffer.front().map(|s| s.timestamp_s).unwrap_or_default();
        let end = self.buffer.back().map(|s| s.timestamp_s).unwrap_or_default();

        Window::new(samples, start, end)
    }
}
