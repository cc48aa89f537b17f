use checkerboard_calibration::board::{Board, BoardConfig};
use checkerboard_calibration::camera_model::{DistortionCoefficients, PinholeCamera};
use checkerboard_calibration::detection::{
    DetectorParams, SubPixParams, corner_sub_pix, find_chessboard_corners,
};
use checkerboard_calibration::synthetic::{WHITE, centered_pose, render_checkerboard};
use checkerboard_calibration::util::project_points;
use glam::Vec2;
use nalgebra as na;

const W: u32 = 640;
const H: u32 = 480;

fn camera() -> PinholeCamera {
    PinholeCamera::new(600.0, 600.0, 319.5, 239.5, DistortionCoefficients::zeros(), W, H)
}

fn render(config: &BoardConfig, rvec: na::Vector3<f64>) -> (image::GrayImage, Vec<Vec2>) {
    let cam = camera();
    let pose = centered_pose(config, rvec, 14.0);
    let img = render_checkerboard(config, &cam, &pose, (W, H));
    let board = Board::from_config(config).unwrap();
    let truth = project_points(&cam, &pose, &board.points_3d);
    (img, truth)
}

fn max_error(a: &[Vec2], b: &[Vec2]) -> f32 {
    a.iter().zip(b).map(|(p, q)| p.distance(*q)).fold(0.0, f32::max)
}

#[test]
fn test_detect_synthetic_board() {
    let config = BoardConfig::new(7, 9).unwrap();
    let (img, truth) = render(&config, na::Vector3::new(0.2, -0.15, 0.05));

    let corners =
        find_chessboard_corners(&img, config.pattern_size(), &DetectorParams::default()).unwrap();
    assert_eq!(corners.len(), 48);
    assert!(max_error(&corners, &truth) < 1.5);

    let refined = corner_sub_pix(&img, &corners, &SubPixParams::default());
    assert_eq!(refined.len(), 48);
    assert!(max_error(&refined, &truth) < 0.25);
}

#[test]
fn test_detect_tilted_views() {
    let config = BoardConfig::new(7, 9).unwrap();
    for rvec in [
        na::Vector3::new(0.3, 0.1, -0.1),
        na::Vector3::new(-0.25, 0.3, 0.15),
        na::Vector3::new(0.05, -0.3, 0.3),
    ] {
        let (img, truth) = render(&config, rvec);
        let corners =
            find_chessboard_corners(&img, config.pattern_size(), &DetectorParams::default())
                .unwrap();
        let refined = corner_sub_pix(&img, &corners, &SubPixParams::default());
        assert!(max_error(&refined, &truth) < 0.25, "rvec {:?}", rvec);
    }
}

#[test]
fn test_upside_down_board_starts_top_left() {
    let config = BoardConfig::new(7, 9).unwrap();
    let (img, truth) = render(&config, na::Vector3::new(0.0, 0.1, std::f64::consts::PI));
    let corners =
        find_chessboard_corners(&img, config.pattern_size(), &DetectorParams::default()).unwrap();
    let reversed: Vec<Vec2> = truth.iter().rev().copied().collect();
    assert!(max_error(&corners, &reversed) < 1.5);
    let first = corners[0];
    assert!(corners.iter().all(|c| first.x + first.y <= c.x + c.y + 1e-3));
}

#[test]
fn test_square_board_rows_follow_image_x() {
    let config = BoardConfig::new(7, 7).unwrap();
    let (img, _) = render(&config, na::Vector3::new(0.1, 0.2, 0.2));
    let corners =
        find_chessboard_corners(&img, config.pattern_size(), &DetectorParams::default()).unwrap();
    assert_eq!(corners.len(), 36);
    let along_row = corners[5] - corners[0];
    let along_col = corners[30] - corners[0];
    assert!(along_row.x.abs() > along_col.x.abs());
    assert!(along_row.x > 0.0);
    assert!(along_col.y > 0.0);
}

#[test]
fn test_subpix_is_stable() {
    let config = BoardConfig::new(7, 9).unwrap();
    let (img, _) = render(&config, na::Vector3::new(0.15, 0.2, -0.05));
    let params = SubPixParams::default();
    let corners =
        find_chessboard_corners(&img, config.pattern_size(), &DetectorParams::default()).unwrap();
    let once = corner_sub_pix(&img, &corners, &params);
    let twice = corner_sub_pix(&img, &once, &params);
    for (a, b) in once.iter().zip(&twice) {
        assert!(a.distance(*b) <= 1e-3, "{:?} moved to {:?}", a, b);
    }
}

#[test]
fn test_subpix_keeps_point_in_flat_region() {
    let img = image::GrayImage::from_pixel(64, 64, image::Luma([WHITE]));
    let p = Vec2::new(30.3, 31.7);
    let refined = corner_sub_pix(&img, &[p], &SubPixParams::default());
    assert_eq!(refined, vec![p]);
}

#[test]
fn test_no_board() {
    let img = image::GrayImage::from_pixel(W, H, image::Luma([128]));
    assert!(find_chessboard_corners(&img, (8, 6), &DetectorParams::default()).is_none());
}

#[test]
fn test_wrong_pattern_size() {
    let config = BoardConfig::new(7, 9).unwrap();
    let (img, _) = render(&config, na::Vector3::new(0.1, 0.1, 0.0));
    assert!(find_chessboard_corners(&img, (9, 7), &DetectorParams::default()).is_none());
    assert!(find_chessboard_corners(&img, (10, 6), &DetectorParams::default()).is_none());
}
