//! Decoding core for mmWave radar UART streams.
//!
//! Raw transport bytes are accumulated, split into packets on the sensor's
//! magic word, decoded from their TLV payloads and turned into timestamped
//! detections in the body frame (x forward, y left, z up).

pub mod config;
pub mod detection;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod source;
pub mod telemetry;
pub mod wire;

pub use config::{RadarConfig, RadarConfigParams};
pub use detection::RadarDetection;
pub use prelude::{PipelineError, PipelineSettings, PollOutcome, PollStatus};
pub use processing::Pipeline;
