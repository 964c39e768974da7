pub mod builder;
pub mod record;

pub use builder::{remap_axes, DetectionBuilder, FrameClock};
pub use record::{
    CartesianDetection, CoordinateFrame, NoiseVector, RadarDetection, SphericalDetection,
    Tolerance,
};
