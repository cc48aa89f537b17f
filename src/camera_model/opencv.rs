use nalgebra as na;

use super::generic::CameraModel;
use crate::error::{CalibError, Result};

const UNDISTORT_ITERATIONS: usize = 20;

/// Applies radial-tangential distortion to normalized image coordinates.
///
/// `coeffs` is `[k1, k2, p1, p2, k3]`, optionally followed by the rational
/// denominator terms `[k4, k5, k6]`.
pub fn distort_normalized<T: na::RealField>(x: T, y: T, coeffs: &[T]) -> (T, T) {
    let r2 = x.clone() * x.clone() + y.clone() * y.clone();
    let r4 = r2.clone() * r2.clone();
    let r6 = r4.clone() * r2.clone();
    let k1 = coeffs[0].clone();
    let k2 = coeffs[1].clone();
    let p1 = coeffs[2].clone();
    let p2 = coeffs[3].clone();
    let k3 = coeffs[4].clone();

    let mut radial = T::one() + k1 * r2.clone() + k2 * r4.clone() + k3 * r6.clone();
    if coeffs.len() >= 8 {
        radial = radial
            / (T::one()
            + coeffs[5].clone() * r2.clone()
            + coeffs[6].clone() * r4
            + coeffs[7].clone() * r6);
    }

    let two = T::one() + T::one();
    let xy = x.clone() * y.clone();
    let x_tan = two.clone() * p1.clone() * xy.clone()
        + p2.clone() * (r2.clone() + two.clone() * x.clone() * x.clone());
    let y_tan = p1 * (r2 + two.clone() * y.clone() * y.clone()) + two * p2 * xy;
    (x * radial.clone() + x_tan, y * radial + y_tan)
}

/// OpenCV-ordered distortion vector, stored padded to 8 entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistortionCoefficients {
    coeffs: [f64; 8],
    len: usize,
}

impl DistortionCoefficients {
    pub fn zeros() -> DistortionCoefficients {
        DistortionCoefficients {
            coeffs: [0.0; 8],
            len: 5,
        }
    }

    /// Accepts 4 (`k1 k2 p1 p2`), 5 (`+ k3`) or 8 (`+ k4 k5 k6`) coefficients.
    pub fn from_slice(values: &[f64]) -> Result<DistortionCoefficients> {
        if !matches!(values.len(), 4 | 5 | 8) {
            return Err(CalibError::InvalidDistortion(values.len()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CalibError::InvalidDistortion(values.len()));
        }
        let mut coeffs = [0.0; 8];
        coeffs[..values.len()].copy_from_slice(values);
        Ok(DistortionCoefficients {
            coeffs,
            len: values.len(),
        })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.coeffs[..self.len]
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0.0)
    }

    fn is_rational(&self) -> bool {
        self.len == 8
    }

    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let used = if self.is_rational() { 8 } else { 5 };
        distort_normalized(x, y, &self.coeffs[..used])
    }

    /// Fixed-point inversion of [`Self::distort`].
    pub fn undistort(&self, xd: f64, yd: f64) -> (f64, f64) {
        let [k1, k2, p1, p2, k3, k4, k5, k6] = self.coeffs;
        let (mut x, mut y) = (xd, yd);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let icdist = (1.0 + ((k6 * r2 + k5) * r2 + k4) * r2)
                / (1.0 + ((k3 * r2 + k2) * r2 + k1) * r2);
            if !icdist.is_finite() || icdist < 0.0 {
                return (xd, yd);
            }
            let delta_x = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
            let delta_y = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
            x = (xd - delta_x) * icdist;
            y = (yd - delta_y) * icdist;
        }
        (x, y)
    }
}

/// Pinhole intrinsics with radial-tangential distortion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub distortion: DistortionCoefficients,
    pub width: u32,
    pub height: u32,
}

impl PinholeCamera {
    pub fn new(
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        distortion: DistortionCoefficients,
        width: u32,
        height: u32,
    ) -> PinholeCamera {
        PinholeCamera {
            fx,
            fy,
            cx,
            cy,
            distortion,
            width,
            height,
        }
    }

    pub fn from_matrix(
        camera_matrix: &na::Matrix3<f64>,
        distortion: DistortionCoefficients,
        w_h: (u32, u32),
    ) -> Result<PinholeCamera> {
        if camera_matrix.iter().any(|v| !v.is_finite()) {
            return Err(CalibError::InvalidCameraMatrix(
                "non-finite entries".to_string(),
            ));
        }
        let fx = camera_matrix[(0, 0)];
        let fy = camera_matrix[(1, 1)];
        if fx <= 0.0 || fy <= 0.0 {
            return Err(CalibError::InvalidCameraMatrix(format!(
                "focal lengths must be positive, got fx={} fy={}",
                fx, fy
            )));
        }
        Ok(PinholeCamera::new(
            fx,
            fy,
            camera_matrix[(0, 2)],
            camera_matrix[(1, 2)],
            distortion,
            w_h.0,
            w_h.1,
        ))
    }

    pub fn camera_matrix(&self) -> na::Matrix3<f64> {
        na::Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Undistorted normalized coordinates of a distorted pixel.
    pub fn pixel_to_normalized(&self, u: f64, v: f64) -> (f64, f64) {
        let xd = (u - self.cx) / self.fx;
        let yd = (v - self.cy) / self.fy;
        self.distortion.undistort(xd, yd)
    }
}

impl CameraModel<f64> for PinholeCamera {
    fn params(&self) -> na::DVector<f64> {
        let mut params = vec![self.fx, self.fy, self.cx, self.cy];
        params.extend_from_slice(self.distortion.as_slice());
        na::DVector::from_vec(params)
    }
    fn width(&self) -> f64 {
        self.width as f64
    }
    fn height(&self) -> f64 {
        self.height as f64
    }
    fn project_one(&self, pt: &na::Vector3<f64>) -> na::Vector2<f64> {
        let (xd, yd) = self.distortion.distort(pt.x / pt.z, pt.y / pt.z);
        na::Vector2::new(self.fx * xd + self.cx, self.fy * yd + self.cy)
    }
}
