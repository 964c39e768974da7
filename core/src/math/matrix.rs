use crate::detection::RadarDetection;
use crate::math::coordinates::spherical_to_cartesian;
use ndarray::Array2;

/// One `[x, y, z, radial_velocity]` row per detection, spherical rows converted.
pub fn xyz_velocity_matrix(detections: &[RadarDetection]) -> Array2<f64> {
    let mut matrix = Array2::zeros((detections.len(), 4));
    for (mut row, detection) in matrix.outer_iter_mut().zip(detections) {
        let (position, velocity) = match detection {
            RadarDetection::Cartesian(d) => ([d.x, d.y, d.z], d.radial_velocity),
            RadarDetection::Spherical(d) => {
                let c = spherical_to_cartesian(d.range, d.azimuth, d.elevation);
                ([c.x, c.y, c.z], d.radial_velocity)
            }
        };
        row[0] = position[0];
        row[1] = position[1];
        row[2] = position[2];
        row[3] = velocity;
    }
    matrix
}
