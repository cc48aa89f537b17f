use checkerboard_calibration::board::{Board, BoardConfig};
use checkerboard_calibration::camera_model::{DistortionCoefficients, PinholeCamera};
use checkerboard_calibration::detection::response::chess_response;
use checkerboard_calibration::detection::{DetectorParams, find_chessboard_corners};
use checkerboard_calibration::optimization::factors::ReprojectionFactor;
use checkerboard_calibration::synthetic::{centered_pose, render_checkerboard};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::Vec2;
use nalgebra as na;
use tiny_solver::factors::Factor;

fn board_image() -> (BoardConfig, image::GrayImage) {
    let config = BoardConfig::new(7, 9).unwrap();
    let camera = PinholeCamera::new(600.0, 600.0, 319.5, 239.5, DistortionCoefficients::zeros(), 640, 480);
    let pose = centered_pose(&config, na::Vector3::new(0.2, -0.1, 0.05), 14.0);
    let img = render_checkerboard(&config, &camera, &pose, (640, 480));
    (config, img)
}

fn bench_chess_response(c: &mut Criterion) {
    let (_, img) = board_image();
    c.bench_function("chess_response", |b| b.iter(|| chess_response(black_box(&img))));
}

fn bench_find_corners(c: &mut Criterion) {
    let (config, img) = board_image();
    let params = DetectorParams::default();
    c.bench_function("find_chessboard_corners", |b| {
        b.iter(|| find_chessboard_corners(black_box(&img), config.pattern_size(), &params))
    });
}

fn bench_reprojection_residual(c: &mut Criterion) {
    let board = Board::from_config(&BoardConfig::new(7, 9).unwrap()).unwrap();
    let factor = ReprojectionFactor::new(&board.points_3d[10], &Vec2::new(320.0, 240.0));

    let intrinsics = na::dvector![600.0, 600.0, 319.5, 239.5];
    let distortion = na::dvector![-0.1, 0.01, 0.0, 0.0, 0.0];
    let rvec = na::dvector![0.1, 0.2, 0.0];
    let tvec = na::dvector![-3.5, -2.5, 14.0];
    let all_params = vec![intrinsics, distortion, rvec, tvec];

    c.bench_function("reprojection_residual", |b| {
        b.iter(|| factor.residual_func(black_box(&all_params)))
    });
}

criterion_group!(
    benches,
    bench_chess_response,
    bench_find_corners,
    bench_reprojection_residual
);
criterion_main!(benches);
