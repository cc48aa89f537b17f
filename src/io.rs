use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;
use crate::types::{CalibrationResult, dist_coef_to_text, matrix_to_text};

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(j.as_bytes())?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Writes a text report with the calibration and per-image reprojection
/// error statistics `(image name, average, median)`.
pub fn write_report(
    output_path: &Path,
    result: &CalibrationResult,
    per_image: &[(String, f64, f64)],
) -> Result<()> {
    let mut s = String::new();
    s += format!("camera matrix:\n{}\n\n", matrix_to_text(&result.camera_matrix)).as_str();
    s += format!("distortion:\n{}\n\n", dist_coef_to_text(&result.dist_coeffs)).as_str();
    s += format!(
        "image height x width: {} x {}\n",
        result.image_h_w.0, result.image_h_w.1
    )
    .as_str();
    s += format!("rms reprojection error: {:.5} px\n\n", result.rms_error).as_str();
    for (name, avg_rep, med_rep) in per_image {
        s += format!("{}:\n", name).as_str();
        s += format!("    average reprojection error: {:.5} px\n", avg_rep).as_str();
        s += format!("    median  reprojection error: {:.5} px\n\n", med_rep).as_str();
    }
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(s.as_bytes())?;
    Ok(())
}
