use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Board-to-camera pose as an axis-angle rotation and a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RvecTvec {
    pub rvec: na::Vector3<f64>,
    pub tvec: na::Vector3<f64>,
}

impl RvecTvec {
    pub fn new(rvec: na::Vector3<f64>, tvec: na::Vector3<f64>) -> RvecTvec {
        RvecTvec { rvec, tvec }
    }
    pub fn to_na_isometry3(&self) -> na::Isometry3<f64> {
        na::Isometry3::new(self.tvec, self.rvec)
    }
}

pub trait ToRvecTvec {
    fn to_rvec_tvec(&self) -> RvecTvec;
}

impl ToRvecTvec for na::Isometry3<f64> {
    fn to_rvec_tvec(&self) -> RvecTvec {
        RvecTvec::new(self.rotation.scaled_axis(), self.translation.vector)
    }
}

/// Output of a calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub camera_matrix: na::Matrix3<f64>,
    /// `[k1, k2, p1, p2, k3]`
    pub dist_coeffs: na::DVector<f64>,
    /// One pose per accepted image, in input order.
    pub extrinsics: Vec<RvecTvec>,
    /// `(height, width)` of the calibration images.
    pub image_h_w: (u32, u32),
    /// Root mean square reprojection error in pixels.
    pub rms_error: f64,
}

impl CalibrationResult {
    pub fn rvecs(&self) -> Vec<na::Vector3<f64>> {
        self.extrinsics.iter().map(|e| e.rvec).collect()
    }
    pub fn tvecs(&self) -> Vec<na::Vector3<f64>> {
        self.extrinsics.iter().map(|e| e.tvec).collect()
    }
}

fn format_row(values: impl Iterator<Item = f64>) -> String {
    let items: Vec<String> = values.map(|v| format!("{:.8e}", v)).collect();
    format!("[{}]", items.join(", "))
}

/// Renders a matrix as nested bracketed rows.
pub fn matrix_to_text(mat: &na::Matrix3<f64>) -> String {
    let rows: Vec<String> = mat
        .row_iter()
        .map(|row| format_row(row.iter().copied()))
        .collect();
    format!("[{}]", rows.join(",\n "))
}

/// Renders distortion coefficients as a single bracketed row.
pub fn dist_coef_to_text(coeffs: &na::DVector<f64>) -> String {
    format!("[{}]", format_row(coeffs.iter().copied()))
}

impl std::fmt::Display for CalibrationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "camera matrix:\n{}", matrix_to_text(&self.camera_matrix))?;
        writeln!(f, "distortion:\n{}", dist_coef_to_text(&self.dist_coeffs))?;
        writeln!(f, "views: {}", self.extrinsics.len())?;
        writeln!(
            f,
            "image height x width: {} x {}",
            self.image_h_w.0, self.image_h_w.1
        )?;
        write!(f, "rms reprojection error: {:.5} px", self.rms_error)
    }
}
