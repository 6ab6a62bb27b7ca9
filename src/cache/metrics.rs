//! Cache Metrics Module
//!
//! Tracks hit/miss/stale accounting and a moving average of `get` latency.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Default number of response-time samples kept for the moving average.
pub const DEFAULT_RESPONSE_WINDOW: usize = 1000;

// == Metrics Snapshot ==
/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetrics {
    /// Lookups that returned data (fresh or stale)
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Hits that were served stale
    pub stale_served: u64,
    /// All lookups
    pub total_requests: u64,
    /// Entries removed by the optional size bound
    pub evictions: u64,
    /// Mean duration of the recorded lookups, in milliseconds
    pub avg_response_time_ms: f64,
}

impl CacheMetrics {
    // == Hit Ratio ==
    /// Returns hits / total_requests, or 0.0 if no requests have been made.
    pub fn hit_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64
        }
    }
}

// == Metrics Recorder ==
/// Counters owned by the cache store.
///
/// Every method takes `&self` so lookups can be recorded while the store is
/// only read-locked.
#[derive(Debug)]
pub struct MetricsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_served: AtomicU64,
    total_requests: AtomicU64,
    evictions: AtomicU64,
    /// Ring buffer of the most recent lookup durations (ms)
    response_times: Mutex<VecDeque<f64>>,
    window: usize,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_WINDOW)
    }
}

impl MetricsRecorder {
    // == Constructor ==
    /// Creates a recorder keeping at most `window` timing samples.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_served: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            response_times: Mutex::new(VecDeque::with_capacity(window)),
            window,
        }
    }

    /// Records a lookup that returned data.
    pub fn record_hit(&self, stale: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
        if stale {
            self.stale_served.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a lookup that returned nothing.
    pub fn record_miss(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Response Time ==
    /// Appends a timing sample, dropping the oldest once the window is full.
    pub fn record_response_time(&self, elapsed: Duration) {
        let mut samples = self.response_times.lock();
        if samples.len() == self.window {
            samples.pop_front();
        }
        samples.push_back(elapsed.as_secs_f64() * 1000.0);
    }

    /// Number of timing samples currently held.
    pub fn sample_count(&self) -> usize {
        self.response_times.lock().len()
    }

    fn avg_response_time_ms(&self) -> f64 {
        let samples = self.response_times.lock();
        if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        }
    }

    // == Snapshot ==
    /// Returns the current counters.
    pub fn snapshot(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            avg_response_time_ms: self.avg_response_time_ms(),
        }
    }

    /// Zeroes every counter and drops all timing samples.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.stale_served,
            &self.total_requests,
            &self.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.response_times.lock().clear();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = MetricsRecorder::default().snapshot();
        assert_eq!(metrics, CacheMetrics::default());
    }

    #[test]
    fn test_hit_ratio_no_requests() {
        assert_eq!(MetricsRecorder::default().snapshot().hit_ratio(), 0.0);
    }

    #[test]
    fn test_hit_ratio_mixed() {
        let recorder = MetricsRecorder::default();
        recorder.record_miss();
        recorder.record_hit(false);
        assert_eq!(recorder.snapshot().hit_ratio(), 0.5);
    }

    #[test]
    fn test_stale_hits_count_as_hits() {
        let recorder = MetricsRecorder::default();
        recorder.record_hit(true);
        recorder.record_hit(false);

        let metrics = recorder.snapshot();
        assert_eq!(metrics.hits, 2);
        assert_eq!(metrics.stale_served, 1);
        assert_eq!(metrics.total_requests, 2);
    }

    #[test]
    fn test_response_window_drops_oldest() {
        let recorder = MetricsRecorder::new(3);
        recorder.record_response_time(Duration::from_millis(100));
        recorder.record_response_time(Duration::from_millis(1));
        recorder.record_response_time(Duration::from_millis(2));
        recorder.record_response_time(Duration::from_millis(3));

        assert_eq!(recorder.sample_count(), 3);
        let avg = recorder.snapshot().avg_response_time_ms;
        assert!((avg - 2.0).abs() < 1e-9, "avg was {}", avg);
    }

    #[test]
    fn test_record_from_many_threads() {
        let recorder = MetricsRecorder::new(10);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        recorder.record_hit(false);
                        recorder.record_response_time(Duration::from_micros(10));
                    }
                });
            }
        });

        let metrics = recorder.snapshot();
        assert_eq!(metrics.hits, 100);
        assert_eq!(metrics.total_requests, 100);
        assert_eq!(recorder.sample_count(), 10);
    }

    #[test]
    fn test_reset_keeps_window() {
        let recorder = MetricsRecorder::new(2);
        recorder.record_hit(true);
        recorder.record_eviction();
        recorder.record_response_time(Duration::from_millis(5));
        recorder.reset();

        assert_eq!(recorder.snapshot(), CacheMetrics::default());
        assert_eq!(recorder.sample_count(), 0);
        assert_eq!(recorder.window, 2);
    }
}
