use std::sync::Mutex;

use serde::Serialize;

/// Counters shared by every worker of an ingest run.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tracks_decoded: usize,
    pub tracks_failed: usize,
    pub pulses_decoded: usize,
    pub pulses_trimmed: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_track(&self, pulses: usize, trimmed: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.tracks_decoded += 1;
            metrics.pulses_decoded += pulses;
            metrics.pulses_trimmed += trimmed;
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.tracks_failed += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|metrics| *metrics).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counters_accumulate_across_threads() {
        let recorder = Arc::new(MetricsRecorder::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let recorder = Arc::clone(&recorder);
                thread::spawn(move || {
                    recorder.record_track(100, 2);
                    recorder.record_failure();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.tracks_decoded, 4);
        assert_eq!(snapshot.tracks_failed, 4);
        assert_eq!(snapshot.pulses_decoded, 400);
        assert_eq!(snapshot.pulses_trimmed, 8);
    }
}
