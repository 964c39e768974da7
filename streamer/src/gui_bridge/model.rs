use mmwcore::telemetry::PipelineCounters;
use mmwcore::{PollOutcome, PollStatus, RadarDetection};
use serde::Serialize;

/// Latest pipeline result as served to display and tracking consumers.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DetectionSnapshot {
    pub status: Option<PollStatus>,
    pub status_code: Option<u8>,
    pub frame_number: Option<u32>,
    pub detections: Vec<RadarDetection>,
    pub counters: PipelineCounters,
    pub note: Option<String>,
}

impl DetectionSnapshot {
    /// Packet outcomes replace the detections; pending statuses only update the status.
    pub fn apply(&mut self, outcome: &PollOutcome) {
        self.status = Some(outcome.status);
        self.status_code = Some(outcome.status.code());
        if let Some(header) = &outcome.header {
            self.frame_number = Some(header.frame_number);
            self.detections = outcome.detections.clone();
        }
    }
}
