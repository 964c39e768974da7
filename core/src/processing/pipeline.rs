use crate::config::RadarConfigParams;
use crate::detection::{DetectionBuilder, FrameClock};
use crate::prelude::{PipelineResult, PipelineSettings, PollOutcome, PollStatus};
use crate::processing::byte_buffer::ByteBuffer;
use crate::processing::synchronizer::{Extraction, FrameSynchronizer};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::wire::{decode_payload, Packet, PayloadFault, PayloadLayout};
use std::sync::Arc;

/// Single-owner decode pipeline: bytes in, at most one packet's detections out per poll.
pub struct Pipeline {
    buffer: ByteBuffer,
    synchronizer: FrameSynchronizer,
    layout: PayloadLayout,
    clock: FrameClock,
    builder: DetectionBuilder,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl Pipeline {
    pub fn new(params: &RadarConfigParams, settings: &PipelineSettings) -> Self {
        Self {
            buffer: ByteBuffer::with_capacity(settings.buffer_capacity),
            synchronizer: FrameSynchronizer::new(settings.sync_policy),
            layout: PayloadLayout::new(settings.point_format, params),
            clock: FrameClock::new(params.frame_duration_seconds),
            builder: DetectionBuilder::new(settings.sensor_id, settings.snr_floor, settings.noise),
            metrics: Arc::new(MetricsRecorder::new()),
            logger: LogManager::new("mmwcore::pipeline"),
        }
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        Arc::clone(&self.metrics)
    }

    /// Queue transport bytes. On overflow the bytes are dropped and the
    /// buffered data is kept.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> PipelineResult<()> {
        self.buffer.append(bytes).map_err(|err| {
            self.metrics.record_overflow(bytes.len());
            err
        })
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn first_frame(&self) -> Option<u32> {
        self.clock.first_frame()
    }

    /// Forget buffered bytes and the latched first frame number.
    pub fn reset_session(&mut self) {
        self.buffer.clear();
        self.clock.reset();
        self.logger.record("session reset");
    }

    pub fn poll(&mut self) -> PollOutcome {
        let before = self.buffer.len();
        let extraction = self.synchronizer.try_extract_packet(&mut self.buffer);
        let packet_len = match &extraction {
            Extraction::Packet(packet) => packet.len(),
            _ => 0,
        };
        let discarded = before - self.buffer.len() - packet_len;
        if discarded > 0 {
            self.metrics.record_discarded(discarded);
        }

        match extraction {
            Extraction::Packet(packet) => self.process(&packet),
            Extraction::Resynchronizing => PollOutcome::pending(PollStatus::Resynchronizing),
            Extraction::Incomplete { .. } => PollOutcome::pending(PollStatus::Incomplete),
        }
    }

    fn process(&mut self, packet: &Packet) -> PollOutcome {
        let header = packet.header();
        let timestamp = self.clock.timestamp(header.frame_number);
        let decoded = decode_payload(packet.payload(), &header, self.layout);

        if decoded.is_corrupt() {
            if let Some(fault) = &decoded.fault {
                self.logger.warn(&format!(
                    "frame {}: dropping packet, {}",
                    header.frame_number, fault
                ));
            }
            self.metrics.record_corrupt();
            return PollOutcome {
                status: PollStatus::Resynchronizing,
                detections: Vec::new(),
                header: Some(header),
            };
        }
        if let Some(fault @ PayloadFault::LengthMismatch { .. }) = &decoded.fault {
            self.logger
                .warn(&format!("frame {}: {}", header.frame_number, fault));
            self.metrics.record_length_mismatch();
        }

        let detections = self.builder.build(&decoded.objects, timestamp);
        self.metrics.record_packet(detections.len());
        self.logger.detail(&format!(
            "frame {}: {} of {} objects above floor",
            header.frame_number,
            detections.len(),
            decoded.objects.len()
        ));

        let status = if detections.is_empty() {
            PollStatus::BelowSnrFloor
        } else {
            PollStatus::ObjectsFound
        };
        PollOutcome {
            status,
            detections,
            header: Some(header),
        }
    }
}
