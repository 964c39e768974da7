use serde::Serialize;
use std::sync::Mutex;

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineCounters {
    pub packets: u64,
    pub detections: u64,
    pub corrupt_payloads: u64,
    pub length_mismatches: u64,
    pub discarded_bytes: u64,
    pub overflow_bytes: u64,
}

/// Counters shared between the decode thread and observers.
pub struct MetricsRecorder {
    inner: Mutex<PipelineCounters>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PipelineCounters::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut PipelineCounters)) {
        if let Ok(mut counters) = self.inner.lock() {
            apply(&mut counters);
        }
    }

    pub fn record_packet(&self, detections: usize) {
        self.update(|c| {
            c.packets += 1;
            c.detections += detections as u64;
        });
    }

    pub fn record_corrupt(&self) {
        self.update(|c| c.corrupt_payloads += 1);
    }

    pub fn record_length_mismatch(&self) {
        self.update(|c| c.length_mismatches += 1);
    }

    pub fn record_discarded(&self, bytes: usize) {
        self.update(|c| c.discarded_bytes += bytes as u64);
    }

    pub fn record_overflow(&self, bytes: usize) {
        self.update(|c| c.overflow_bytes += bytes as u64);
    }

    pub fn snapshot(&self) -> PipelineCounters {
        self.inner
            .lock()
            .map(|counters| *counters)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
