pub mod grid;
pub mod response;
pub mod subpix;

pub use subpix::{SubPixParams, corner_sub_pix};

use glam::Vec2;
use image::GrayImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Gaussian pre-blur; `0.0` disables it.
    pub blur_sigma: f32,
    /// Fraction of the strongest response a candidate must exceed.
    pub threshold_rel: f32,
    pub nms_radius: u32,
    /// Search radius around a predicted lattice position, relative to the local step.
    pub grid_tolerance: f32,
    pub max_seeds: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            threshold_rel: 0.1,
            nms_radius: 7,
            grid_tolerance: 0.35,
            max_seeds: 8,
        }
    }
}

/// Finds the `w x h` interior corners of a checkerboard.
///
/// Returns pixel-accurate corners ordered row by row (`w` per row), starting
/// at the corner nearest the image's top-left, or `None` if the full pattern
/// is not visible.
pub fn find_chessboard_corners(
    gray: &GrayImage,
    pattern_size: (usize, usize),
    params: &DetectorParams,
) -> Option<Vec<Vec2>> {
    let (w, h) = pattern_size;
    if w < 2 || h < 2 {
        return None;
    }
    let response = if params.blur_sigma > 0.0 {
        response::chess_response(&image::imageops::blur(gray, params.blur_sigma))
    } else {
        response::chess_response(gray)
    };
    let peaks = response::detect_peaks(&response, params.threshold_rel, params.nms_radius);
    log::trace!("{} corner candidates", peaks.len());
    if peaks.len() < w * h {
        return None;
    }
    let points: Vec<Vec2> = peaks.iter().map(|p| p.position).collect();
    grid::assemble_grid(&points, pattern_size, params.grid_tolerance, params.max_seeds)
}
