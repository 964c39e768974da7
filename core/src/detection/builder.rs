use crate::detection::record::{CartesianDetection, NoiseVector, RadarDetection};
use crate::wire::RawDetectedObject;

/// Wire axes are (right, forward, up); output axes are (forward, left, up).
pub fn remap_axes(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    (y, -x, z)
}

/// Turns frame numbers into session-relative timestamps.
///
/// The first frame number seen after construction or [`FrameClock::reset`]
/// becomes time zero.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame_duration_seconds: f64,
    first_frame: Option<u32>,
}

impl FrameClock {
    pub fn new(frame_duration_seconds: f64) -> Self {
        Self {
            frame_duration_seconds,
            first_frame: None,
        }
    }

    pub fn timestamp(&mut self, frame_number: u32) -> f64 {
        let first = *self.first_frame.get_or_insert(frame_number);
        // negative when the sensor restarted its counter without a session reset
        let elapsed = i64::from(frame_number) - i64::from(first);
        self.frame_duration_seconds * elapsed as f64
    }

    pub fn first_frame(&self) -> Option<u32> {
        self.first_frame
    }

    pub fn reset(&mut self) {
        self.first_frame = None;
    }
}

/// Filters raw objects by SNR and produces Cartesian detections.
#[derive(Debug, Clone)]
pub struct DetectionBuilder {
    sensor_id: u32,
    snr_floor: f64,
    noise: NoiseVector,
}

impl DetectionBuilder {
    pub fn new(sensor_id: u32, snr_floor: f64, noise: NoiseVector) -> Self {
        Self {
            sensor_id,
            snr_floor,
            noise,
        }
    }

    /// Objects with `snr` strictly above the floor, in wire order.
    pub fn build(&self, objects: &[RawDetectedObject], timestamp: f64) -> Vec<RadarDetection> {
        objects
            .iter()
            .filter(|obj| f64::from(obj.snr) > self.snr_floor)
            .map(|obj| {
                let (x, y, z) =
                    remap_axes(f64::from(obj.x), f64::from(obj.y), f64::from(obj.z));
                RadarDetection::Cartesian(CartesianDetection {
                    source_id: self.sensor_id,
                    t: timestamp,
                    x,
                    y,
                    z,
                    radial_velocity: f64::from(obj.velocity),
                    noise: self.noise,
                    snr: Some(f64::from(obj.snr)),
                })
            })
            .collect()
    }
}
