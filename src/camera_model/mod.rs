pub mod generic;
pub mod opencv;

pub use generic::{CameraModel, init_undistort_map, remap};
pub use opencv::{DistortionCoefficients, PinholeCamera, distort_normalized};
