use crate::math::coordinates::{cartesian_to_spherical, spherical_to_cartesian, ConversionError};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Per-axis measurement noise attached to a detection.
pub type NoiseVector = [f64; 3];

/// Numeric tolerance for [`RadarDetection::close_to`]: `|a - b| <= atol + rtol * |b|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-8,
        }
    }
}

impl Tolerance {
    pub fn close(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.atol + self.rtol * b.abs()
    }

    fn all_close(&self, lhs: &[f64], rhs: &[f64]) -> bool {
        lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(&a, &b)| self.close(a, b))
    }

    fn snr_close(&self, lhs: Option<f64>, rhs: Option<f64>) -> bool {
        match (lhs, rhs) {
            (None, _) => true,
            (Some(a), Some(b)) => self.close(a, b),
            (Some(_), None) => false,
        }
    }
}

fn snr_bits(snr: Option<f64>) -> [u64; 2] {
    match snr {
        Some(value) => [1, value.to_bits()],
        None => [0, 0],
    }
}

/// Detection in the sensor body frame: x forward, y left, z up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CartesianDetection {
    pub source_id: u32,
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radial_velocity: f64,
    pub noise: NoiseVector,
    pub snr: Option<f64>,
}

/// Detection as range, azimuth and elevation (radians).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SphericalDetection {
    pub source_id: u32,
    pub t: f64,
    pub range: f64,
    pub azimuth: f64,
    pub elevation: f64,
    pub radial_velocity: f64,
    pub noise: NoiseVector,
    pub snr: Option<f64>,
}

impl CartesianDetection {
    fn identity(&self) -> [u64; 11] {
        let [snr_flag, snr] = snr_bits(self.snr);
        [
            u64::from(self.source_id),
            self.t.to_bits(),
            self.x.to_bits(),
            self.y.to_bits(),
            self.z.to_bits(),
            self.radial_velocity.to_bits(),
            self.noise[0].to_bits(),
            self.noise[1].to_bits(),
            self.noise[2].to_bits(),
            snr_flag,
            snr,
        ]
    }

    pub fn close_to(&self, other: &Self, tol: Tolerance) -> bool {
        self.source_id == other.source_id
            && tol.all_close(
                &[self.t, self.x, self.y, self.z, self.radial_velocity],
                &[other.t, other.x, other.y, other.z, other.radial_velocity],
            )
            && tol.all_close(&self.noise, &other.noise)
            && tol.snr_close(self.snr, other.snr)
    }

    pub fn to_spherical(&self, noise: NoiseVector) -> Result<SphericalDetection, ConversionError> {
        let s = cartesian_to_spherical(self.x, self.y, self.z)?;
        Ok(SphericalDetection {
            source_id: self.source_id,
            t: self.t,
            range: s.range,
            azimuth: s.azimuth,
            elevation: s.elevation,
            radial_velocity: self.radial_velocity,
            noise,
            snr: self.snr,
        })
    }
}

impl SphericalDetection {
    fn identity(&self) -> [u64; 11] {
        let [snr_flag, snr] = snr_bits(self.snr);
        [
            u64::from(self.source_id),
            self.t.to_bits(),
            self.range.to_bits(),
            self.azimuth.to_bits(),
            self.elevation.to_bits(),
            self.radial_velocity.to_bits(),
            self.noise[0].to_bits(),
            self.noise[1].to_bits(),
            self.noise[2].to_bits(),
            snr_flag,
            snr,
        ]
    }

    pub fn close_to(&self, other: &Self, tol: Tolerance) -> bool {
        self.source_id == other.source_id
            && tol.all_close(
                &[
                    self.t,
                    self.range,
                    self.azimuth,
                    self.elevation,
                    self.radial_velocity,
                ],
                &[
                    other.t,
                    other.range,
                    other.azimuth,
                    other.elevation,
                    other.radial_velocity,
                ],
            )
            && tol.all_close(&self.noise, &other.noise)
            && tol.snr_close(self.snr, other.snr)
    }

    pub fn to_cartesian(&self, noise: NoiseVector) -> CartesianDetection {
        let c = spherical_to_cartesian(self.range, self.azimuth, self.elevation);
        CartesianDetection {
            source_id: self.source_id,
            t: self.t,
            x: c.x,
            y: c.y,
            z: c.z,
            radial_velocity: self.radial_velocity,
            noise,
            snr: self.snr,
        }
    }
}

// Equality and hashing compare float fields bit for bit so that `Eq` and
// `Hash` agree.
impl PartialEq for CartesianDetection {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for CartesianDetection {}

impl Hash for CartesianDetection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialEq for SphericalDetection {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for SphericalDetection {}

impl Hash for SphericalDetection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateFrame {
    Cartesian,
    Spherical,
}

/// An immutable radar detection in one of two coordinate representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum RadarDetection {
    Cartesian(CartesianDetection),
    Spherical(SphericalDetection),
}

impl RadarDetection {
    pub fn frame(&self) -> CoordinateFrame {
        match self {
            RadarDetection::Cartesian(_) => CoordinateFrame::Cartesian,
            RadarDetection::Spherical(_) => CoordinateFrame::Spherical,
        }
    }

    pub fn source_id(&self) -> u32 {
        match self {
            RadarDetection::Cartesian(d) => d.source_id,
            RadarDetection::Spherical(d) => d.source_id,
        }
    }

    pub fn t(&self) -> f64 {
        match self {
            RadarDetection::Cartesian(d) => d.t,
            RadarDetection::Spherical(d) => d.t,
        }
    }

    pub fn snr(&self) -> Option<f64> {
        match self {
            RadarDetection::Cartesian(d) => d.snr,
            RadarDetection::Spherical(d) => d.snr,
        }
    }

    /// Close enough under `tol`; never true across representations.
    pub fn close_to(&self, other: &RadarDetection, tol: Tolerance) -> bool {
        match (self, other) {
            (RadarDetection::Cartesian(a), RadarDetection::Cartesian(b)) => a.close_to(b, tol),
            (RadarDetection::Spherical(a), RadarDetection::Spherical(b)) => a.close_to(b, tol),
            _ => false,
        }
    }

    /// Re-express this detection in `frame`, attaching `noise` for the new axes.
    pub fn convert_to(
        &self,
        frame: CoordinateFrame,
        noise: NoiseVector,
    ) -> Result<RadarDetection, ConversionError> {
        Ok(match (self, frame) {
            (RadarDetection::Cartesian(d), CoordinateFrame::Spherical) => {
                RadarDetection::Spherical(d.to_spherical(noise)?)
            }
            (RadarDetection::Spherical(d), CoordinateFrame::Cartesian) => {
                RadarDetection::Cartesian(d.to_cartesian(noise))
            }
            (RadarDetection::Cartesian(d), CoordinateFrame::Cartesian) => {
                RadarDetection::Cartesian(CartesianDetection { noise, ..*d })
            }
            (RadarDetection::Spherical(d), CoordinateFrame::Spherical) => {
                RadarDetection::Spherical(SphericalDetection { noise, ..*d })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample() -> RadarDetection {
        RadarDetection::Cartesian(CartesianDetection {
            source_id: 1,
            t: 1.0,
            x: 2.3,
            y: -2.1,
            z: 3.0,
            radial_velocity: 2.0,
            noise: [1.0, 2.0, 3.0],
            snr: Some(22.0),
        })
    }

    #[test]
    fn cartesian_survives_spherical_round_trip() {
        let original = sample();
        let razel = original
            .convert_to(CoordinateFrame::Spherical, [1.0, 1e-2, 2e-2])
            .unwrap();
        assert_eq!(razel.frame(), CoordinateFrame::Spherical);
        assert_eq!(razel.snr(), Some(22.0));

        let back = razel
            .convert_to(CoordinateFrame::Cartesian, [1.0, 2.0, 3.0])
            .unwrap();
        assert!(original.close_to(&back, Tolerance::default()));
    }

    #[test]
    fn zero_range_conversion_fails_alone() {
        let at_origin = RadarDetection::Cartesian(CartesianDetection {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            ..match sample() {
                RadarDetection::Cartesian(d) => d,
                RadarDetection::Spherical(_) => unreachable!(),
            }
        });
        let batch = [sample(), at_origin, sample()];
        let converted: Vec<_> = batch
            .iter()
            .map(|d| d.convert_to(CoordinateFrame::Spherical, [0.0; 3]))
            .collect();
        assert!(converted[0].is_ok());
        assert_eq!(converted[1], Err(ConversionError::ZeroRange));
        assert!(converted[2].is_ok());
    }

    #[test]
    fn identity_covers_every_field() {
        let base = sample();
        let mut set = HashSet::new();
        set.insert(base);
        set.insert(base);
        assert_eq!(set.len(), 1);

        let RadarDetection::Cartesian(inner) = base else {
            unreachable!()
        };
        let variants = [
            CartesianDetection { source_id: 2, ..inner },
            CartesianDetection { t: 1.5, ..inner },
            CartesianDetection { x: 2.4, ..inner },
            CartesianDetection { radial_velocity: 0.0, ..inner },
            CartesianDetection { noise: [1.0, 2.0, 4.0], ..inner },
            CartesianDetection { snr: None, ..inner },
        ];
        for variant in variants {
            assert_ne!(RadarDetection::Cartesian(variant), base);
        }
    }

    #[test]
    fn close_to_tolerates_small_drift_only() {
        let RadarDetection::Cartesian(inner) = sample() else {
            unreachable!()
        };
        let drifted = RadarDetection::Cartesian(CartesianDetection {
            x: inner.x + 1e-7,
            ..inner
        });
        let moved = RadarDetection::Cartesian(CartesianDetection {
            x: inner.x + 1e-2,
            ..inner
        });
        assert_ne!(drifted, sample());
        assert!(sample().close_to(&drifted, Tolerance::default()));
        assert!(!sample().close_to(&moved, Tolerance::default()));
    }

    #[test]
    fn missing_snr_is_ignored_on_the_left_only() {
        let RadarDetection::Cartesian(inner) = sample() else {
            unreachable!()
        };
        let without = RadarDetection::Cartesian(CartesianDetection { snr: None, ..inner });
        assert!(without.close_to(&sample(), Tolerance::default()));
        assert!(!sample().close_to(&without, Tolerance::default()));
    }

    #[test]
    fn representations_are_never_close() {
        let razel = sample()
            .convert_to(CoordinateFrame::Spherical, [1.0, 2.0, 3.0])
            .unwrap();
        assert!(!sample().close_to(&razel, Tolerance::default()));
        assert_ne!(sample(), razel);
    }

    #[test]
    fn serializes_with_frame_tag() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["frame"], "cartesian");
        assert_eq!(json["x"], 2.3);
        let back: RadarDetection = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }
}
