use std::path::{Path, PathBuf};

use glob::glob;
use image::{DynamicImage, ImageReader};
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

use crate::board::{Board, BoardConfig};
use crate::detected_points::{CorrespondenceSet, FrameFeature};
use crate::detection::{DetectorParams, SubPixParams, corner_sub_pix, find_chessboard_corners};
use crate::error::{CalibError, Result};
use crate::types::CalibrationResult;
use crate::util::{CalibrationOptions, calibrate_camera};

const IMAGE_SUFFIXES: [&str; 3] = [".jpeg", ".jpg", ".png"];

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    let p = rp.ok()?;
    if !p.is_file() {
        return None;
    }
    let name = p.as_os_str().to_string_lossy();
    if IMAGE_SUFFIXES.iter().any(|ext| name.ends_with(ext)) {
        Some(p)
    } else {
        None
    }
}

/// Sorted image files directly inside `dir`. Suffix matching is case-sensitive.
pub fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CalibError::DirectoryNotFound(dir.display().to_string()));
    }
    let pattern = format!(
        "{}/*",
        glob::Pattern::escape(&dir.as_os_str().to_string_lossy())
    );
    let mut sorted_path: Vec<PathBuf> = glob(&pattern)?.filter_map(img_filter).collect();
    sorted_path.sort();
    Ok(sorted_path)
}

/// Detects and refines the board corners of one decoded image.
pub fn detect_frame(
    img: &DynamicImage,
    board: &Board,
    detector_params: &DetectorParams,
    subpix_params: &SubPixParams,
) -> Option<FrameFeature> {
    let gray = img.to_luma8();
    let corners = find_chessboard_corners(&gray, board.pattern_size(), detector_params)?;
    let corners = corner_sub_pix(&gray, &corners, subpix_params);
    Some(FrameFeature {
        img_w_h: (img.width(), img.height()),
        corners,
    })
}

/// Decodes and detects every path in parallel; results keep the input order.
/// Undecodable files and images without a full board map to `None`.
pub fn load_frame_features(
    paths: &[PathBuf],
    board: &Board,
    detector_params: &DetectorParams,
    subpix_params: &SubPixParams,
) -> Vec<Option<FrameFeature>> {
    paths
        .par_iter()
        .progress_count(paths.len() as u64)
        .map(|path| {
            let img = match ImageReader::open(path).map_err(CalibError::from).and_then(|r| {
                r.with_guessed_format()
                    .map_err(CalibError::from)?
                    .decode()
                    .map_err(CalibError::from)
            }) {
                Ok(img) => img,
                Err(e) => {
                    log::warn!("skipping {}: {}", path.display(), e);
                    return None;
                }
            };
            let frame = detect_frame(&img, board, detector_params, subpix_params);
            if frame.is_none() {
                log::debug!("no checkerboard in {}", path.display());
            }
            frame
        })
        .collect()
}

/// Everything produced by calibrating a directory of board images.
#[derive(Debug, Clone)]
pub struct DirectoryCalibration {
    pub result: CalibrationResult,
    pub correspondences: CorrespondenceSet,
    pub image_paths: Vec<PathBuf>,
    /// Detection outcome per listed image, aligned with `image_paths`.
    pub detected: Vec<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryOptions {
    pub detector: DetectorParams,
    pub subpix: SubPixParams,
    pub calibration: CalibrationOptions,
}

/// Collects correspondences from the detected frames. The resolution of the
/// last accepted frame is the calibration resolution; every frame must match it.
pub fn accumulate(board: &Board, frames: Vec<Option<FrameFeature>>) -> Result<CorrespondenceSet> {
    let mut correspondences = CorrespondenceSet::new();
    if let Some(last) = frames.iter().rev().flatten().next() {
        correspondences.image_w_h = Some(last.img_w_h);
    }
    for frame in frames {
        match frame {
            Some(frame) => correspondences.push(&board.points_3d, frame)?,
            None => correspondences.skip(),
        }
    }
    Ok(correspondences)
}

/// Lists, detects, accumulates and calibrates.
pub fn calibrate_directory(
    dir: &Path,
    rows: usize,
    cols: usize,
    options: &DirectoryOptions,
) -> Result<DirectoryCalibration> {
    let board = Board::from_config(&BoardConfig::new(rows, cols)?)?;
    let image_paths = list_image_files(dir)?;
    log::info!("found {} images in {}", image_paths.len(), dir.display());

    let frames = load_frame_features(&image_paths, &board, &options.detector, &options.subpix);
    let detected: Vec<bool> = frames.iter().map(|f| f.is_some()).collect();
    let correspondences = accumulate(&board, frames)?;
    log::info!(
        "board detected in {} images, {} skipped",
        correspondences.len(),
        correspondences.skipped
    );
    let img_w_h = correspondences.image_w_h.ok_or(CalibError::NoDetections)?;

    let result = calibrate_camera(
        &correspondences.object_points,
        &correspondences.image_points,
        img_w_h,
        &options.calibration,
    )?;
    Ok(DirectoryCalibration {
        result,
        correspondences,
        image_paths,
        detected,
    })
}
