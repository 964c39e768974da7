use crate::detection::RadarDetection;
use crate::processing::synchronizer::SyncPolicy;
use crate::wire::{PacketHeader, PointFormat};
use serde::{Deserialize, Serialize};

/// Default accumulator capacity for unframed bytes.
pub const MAX_BUFFER_SIZE: usize = 1 << 16;

/// Settings shared by every pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub sensor_id: u32,
    pub snr_floor: f64,
    pub noise: [f64; 3],
    pub sync_policy: SyncPolicy,
    pub point_format: PointFormat,
    pub buffer_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            sensor_id: 0,
            snr_floor: 0.0,
            noise: [0.0; 3],
            sync_policy: SyncPolicy::BestEffort,
            point_format: PointFormat::Float,
            buffer_capacity: MAX_BUFFER_SIZE,
        }
    }
}

/// Status code handed to consumers on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PollStatus {
    ObjectsFound = 0,
    BelowSnrFloor = 1,
    Resynchronizing = 2,
    Incomplete = 3,
}

impl PollStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Result of one poll: a status plus the detections of at most one packet.
#[derive(Debug, Clone, Serialize)]
pub struct PollOutcome {
    pub status: PollStatus,
    pub detections: Vec<RadarDetection>,
    /// Header of the packet consumed by this poll, if any.
    pub header: Option<PacketHeader>,
}

impl PollOutcome {
    pub fn pending(status: PollStatus) -> Self {
        Self {
            status,
            detections: Vec::new(),
            header: None,
        }
    }

    /// True when this poll consumed a packet from the buffer.
    pub fn consumed_packet(&self) -> bool {
        self.header.is_some()
    }
}

/// Common error type for pipeline operations.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("buffer capacity exceeded: {buffered} buffered + {incoming} incoming > {capacity}")]
    CapacityExceeded {
        buffered: usize,
        incoming: usize,
        capacity: usize,
    },
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error(transparent)]
    Source(#[from] crate::source::SourceError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
