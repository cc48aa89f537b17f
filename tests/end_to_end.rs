use std::fs;
use std::path::Path;

use checkerboard_calibration::CalibError;
use checkerboard_calibration::board::BoardConfig;
use checkerboard_calibration::camera_model::{DistortionCoefficients, PinholeCamera};
use checkerboard_calibration::data_loader::{DirectoryOptions, calibrate_directory, list_image_files};
use checkerboard_calibration::synthetic::{centered_pose, render_checkerboard};
use nalgebra as na;

const VIEWS: [[f64; 3]; 5] = [
    [0.25, 0.1, 0.0],
    [-0.2, 0.25, 0.1],
    [0.1, -0.3, -0.1],
    [-0.3, -0.15, 0.05],
    [0.15, 0.3, -0.2],
];

fn write_dataset(dir: &Path, config: &BoardConfig) {
    let camera = PinholeCamera::new(600.0, 600.0, 319.5, 239.5, DistortionCoefficients::zeros(), 640, 480);
    for (i, rvec) in VIEWS.iter().enumerate() {
        let pose = centered_pose(config, na::Vector3::from_row_slice(rvec), 14.0);
        let img = render_checkerboard(config, &camera, &pose, (640, 480));
        img.save(dir.join(format!("view_{:02}.png", i))).unwrap();
    }
}

#[test]
fn test_calibrate_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = BoardConfig::new(7, 9).unwrap();
    write_dataset(dir.path(), &config);
    fs::write(dir.path().join("bad.png"), b"not an image").unwrap();
    fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::copy(dir.path().join("view_00.png"), dir.path().join("nested/view.png")).unwrap();
    fs::copy(dir.path().join("view_00.png"), dir.path().join("board.PNG")).unwrap();

    let listed = list_image_files(dir.path()).unwrap();
    assert_eq!(listed.len(), 6);
    assert!(listed.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(listed[0].file_name().unwrap(), "bad.png");

    let out = calibrate_directory(dir.path(), 7, 9, &DirectoryOptions::default()).unwrap();
    assert_eq!(out.image_paths, listed);
    assert_eq!(out.detected, vec![false, true, true, true, true, true]);
    assert_eq!(out.correspondences.len(), 5);
    assert_eq!(out.correspondences.skipped, 1);
    assert_eq!(out.correspondences.image_w_h, Some((640, 480)));
    for (obj, img) in out
        .correspondences
        .object_points
        .iter()
        .zip(&out.correspondences.image_points)
    {
        assert_eq!(obj.len(), 48);
        assert_eq!(img.len(), 48);
    }

    let result = &out.result;
    assert_eq!(result.rvecs().len(), 5);
    assert_eq!(result.tvecs().len(), 5);
    assert_eq!(result.image_h_w, (480, 640));
    assert!((result.camera_matrix[(0, 0)] - 600.0).abs() < 30.0);
    assert!((result.camera_matrix[(1, 1)] - 600.0).abs() < 30.0);
    assert!(result.rms_error < 0.5, "rms {}", result.rms_error);
}

#[test]
fn test_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does_not_exist");
    let err = calibrate_directory(&missing, 7, 9, &DirectoryOptions::default()).unwrap_err();
    assert!(matches!(err, CalibError::DirectoryNotFound(_)));
}

#[test]
fn test_board_validated_before_listing() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does_not_exist");
    let err = calibrate_directory(&missing, 2, 9, &DirectoryOptions::default()).unwrap_err();
    assert!(matches!(err, CalibError::InvalidBoardDimension { .. }));
}

#[test]
fn test_directory_without_boards() {
    let dir = tempfile::tempdir().unwrap();
    let err = calibrate_directory(dir.path(), 7, 9, &DirectoryOptions::default()).unwrap_err();
    assert!(matches!(err, CalibError::NoDetections));

    image::GrayImage::from_pixel(320, 240, image::Luma([128]))
        .save(dir.path().join("blank.png"))
        .unwrap();
    let err = calibrate_directory(dir.path(), 7, 9, &DirectoryOptions::default()).unwrap_err();
    assert!(matches!(err, CalibError::NoDetections));
}
