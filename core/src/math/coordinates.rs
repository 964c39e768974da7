use serde::{Deserialize, Serialize};

const ROUNDING_SCALE: f64 = 1e6;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionError {
    #[error("elevation is undefined at zero range")]
    ZeroRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spherical {
    pub range: f64,
    pub azimuth: f64,
    pub elevation: f64,
}

/// Round to 6 decimal digits.
pub fn round6(value: f64) -> f64 {
    (value * ROUNDING_SCALE).round() / ROUNDING_SCALE
}

pub fn cartesian_to_spherical(x: f64, y: f64, z: f64) -> Result<Spherical, ConversionError> {
    let range = x.hypot(y).hypot(z);
    if range == 0.0 {
        return Err(ConversionError::ZeroRange);
    }
    let azimuth = y.atan2(x);
    let elevation = (z / range).clamp(-1.0, 1.0).asin();
    Ok(Spherical {
        range: round6(range),
        azimuth: round6(azimuth),
        elevation: round6(elevation),
    })
}

pub fn spherical_to_cartesian(range: f64, azimuth: f64, elevation: f64) -> Cartesian {
    let (sin_az, cos_az) = azimuth.sin_cos();
    let (sin_el, cos_el) = elevation.sin_cos();
    Cartesian {
        x: round6(range * cos_az * cos_el),
        y: round6(range * sin_az * cos_el),
        z: round6(range * sin_el),
    }
}
