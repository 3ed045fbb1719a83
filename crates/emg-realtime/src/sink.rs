//! Result publication
//!
//! Two read paths over the same stream: a latest-value cell for polling
//! consumers and a broadcast feed for push subscribers. Publication
//! enforces strictly increasing result timestamps; a regressing result is
//! refused and logged rather than re-ordering the published stream.

use emg_core::ClassificationResult;
use std::sync::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::warn;

/// Broadcast depth for push subscribers; slow subscribers lag past this
const FEED_CAPACITY: usize = 64;

pub struct ResultSink {
    latest: watch::Sender<Option<ClassificationResult>>,
    feed: broadcast::Sender<ClassificationResult>,
    last_timestamp_s: Mutex<Option<f64>>,
}

impl ResultSink {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self { latest, feed, last_timestamp_s: Mutex::new(None) }
    }

    /// Publish one result; returns false when the result is refused for
    /// violating timestamp order
    pub fn publish(&self, result: ClassificationResult) -> bool {
        {
            // Poisoning is unreachable: no panic can occur under this lock
            let mut last = match self.last_timestamp_s.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(previous) = *last {
                if result.timestamp_s <= previous {
                    warn!(
                        timestamp_s = result.timestamp_s,
                        previous_s = previous,
                        "refusing out-of-order result"
                    );
                    return false;
                }
            }
            *last = Some(result.timestamp_s);
        }

        self.latest.send_replace(Some(result));
        // No subscribers is fine
        let _ = self.feed.send(result);
        true
    }

    /// Most recent published result, non-blocking
    pub fn latest(&self) -> Option<ClassificationResult> {
        *self.latest.borrow()
    }

    /// Watch handle over the latest-result cell
    pub fn watch_latest(&self) -> watch::Receiver<Option<ClassificationResult>> {
        self.latest.subscribe()
    }

    /// Push subscription receiving every published result
    pub fn subscribe(&self) -> broadcast::Receiver<ClassificationResult> {
        self.feed.subscribe()
    }
}

impl Default for ResultSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emg_core::Gesture;

    fn result_at(timestamp_s: f64) -> ClassificationResult {
        ClassificationResult {
            gesture: Gesture::Relax,
            confidences: [0.1, 0.1, 0.7, 0.1],
            timestamp_s,
        }
    }

    #[test]
    fn test_latest_tracks_publications() {
        let sink = ResultSink::new();
        assert!(sink.latest().is_none());

        assert!(sink.publish(result_at(0.249)));
        assert!(sink.publish(result_at(0.374)));

        let latest = sink.latest().unwrap();
        assert_eq!(latest.timestamp_s, 0.374);
    }

    #[test]
    fn test_regressing_timestamp_refused() {
        let sink = ResultSink::new();
        assert!(sink.publish(result_at(0.374)));
        assert!(!sink.publish(result_at(0.374)));
        assert!(!sink.publish(result_at(0.249)));

        // Refused results never reach the latest cell
        assert_eq!(sink.latest().unwrap().timestamp_s, 0.374);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_result() {
        let sink = ResultSink::new();
        let mut feed = sink.subscribe();

        sink.publish(result_at(0.249));
        sink.publish(result_at(0.374));

        assert_eq!(feed.recv().await.unwrap().timestamp_s, 0.249);
        assert_eq!(feed.recv().await.unwrap().timestamp_s, 0.374);
    }
}
