pub mod board;
pub mod camera_model;
pub mod data_loader;
pub mod detected_points;
pub mod detection;
pub mod error;
pub mod image_buffer;
pub mod io;
pub mod optimization;
pub mod synthetic;
pub mod types;
pub mod undistort;
pub mod util;
pub mod visualization;

pub use error::{CalibError, Result};
pub use util::calibrate_camera;
