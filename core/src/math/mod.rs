pub mod coordinates;
pub mod matrix;

pub use coordinates::{
    cartesian_to_spherical, spherical_to_cartesian, Cartesian, ConversionError, Spherical,
};
pub use matrix::xyz_velocity_matrix;
