pub mod factors;
pub mod homography;
pub mod linear;

pub use homography::*;
pub use linear::*;
