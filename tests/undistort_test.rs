use checkerboard_calibration::CalibError;
use checkerboard_calibration::camera_model::{DistortionCoefficients, PinholeCamera};
use checkerboard_calibration::image_buffer::NormalizedImage;
use checkerboard_calibration::undistort::{get_optimal_new_camera_matrix, undistort};
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn random_image(height: usize, width: usize, channels: usize, seed: u64) -> NormalizedImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = (0..height * width * channels)
        .map(|_| rng.random_range(0..=255u32) as f32 / 255.0)
        .collect();
    NormalizedImage::new(height, width, channels, data).unwrap()
}

fn camera_matrix(fx: f64, fy: f64, cx: f64, cy: f64) -> na::DMatrix<f64> {
    na::DMatrix::from_row_slice(3, 3, &[fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0])
}

#[test]
fn test_zero_distortion_is_identity() {
    let image = random_image(48, 64, 3, 1);
    let k = camera_matrix(80.0, 82.0, 31.5, 23.5);
    let out = undistort(&image, &k, &na::DVector::zeros(5)).unwrap();
    assert_eq!(out.shape(), image.shape());
    assert_eq!(out.data, image.data);
}

#[test]
fn test_zero_distortion_gray_and_off_center() {
    let image = random_image(30, 50, 1, 2);
    let k = camera_matrix(120.0, 120.0, 20.0, 17.0);
    for len in [4, 5, 8] {
        let out = undistort(&image, &k, &na::DVector::zeros(len)).unwrap();
        assert_eq!(out, image);
    }
}

#[test]
fn test_full_hd_output_fits_input() {
    let image = NormalizedImage::new(1080, 1920, 3, vec![0.5; 1080 * 1920 * 3]).unwrap();
    let k = camera_matrix(1000.0, 1000.0, 959.5, 539.5);
    let dist = na::dvector![-0.2, 0.05, 0.001, -0.001, 0.0];
    let out = undistort(&image, &k, &dist).unwrap();
    assert!(out.height > 0 && out.width > 0);
    assert!(out.height <= 1080 && out.width <= 1920);
    assert_eq!(out.channels, 3);
    let gray = 128.0 / 255.0;
    let kept = out.data.iter().filter(|&&v| v == gray).count();
    assert!(kept as f64 > 0.99 * out.data.len() as f64);
    let center = ((out.height / 2) * out.width + out.width / 2) * 3;
    assert_eq!(out.data[center], gray);
}

#[test]
fn test_alpha_trades_focal_for_coverage() {
    let distortion = DistortionCoefficients::from_slice(&[-0.25, 0.0, 0.0, 0.0]).unwrap();
    let camera = PinholeCamera::new(500.0, 500.0, 319.5, 239.5, distortion, 640, 480);
    let (k0, roi0) = get_optimal_new_camera_matrix(&camera, (640, 480), 0.0).unwrap();
    let (k1, roi1) = get_optimal_new_camera_matrix(&camera, (640, 480), 1.0).unwrap();
    assert!(k1[(0, 0)] < k0[(0, 0)]);
    assert!(roi1.width * roi1.height <= roi0.width * roi0.height);
    assert!(roi0.x + roi0.width <= 640 && roi0.y + roi0.height <= 480);
    assert!(get_optimal_new_camera_matrix(&camera, (640, 480), 1.5).is_err());
}

#[test]
fn test_undistort_inverts_distort() {
    let distortion = DistortionCoefficients::from_slice(&[-0.2, 0.03, 0.001, -0.002, 0.0]).unwrap();
    for (x, y) in [(0.0, 0.0), (0.3, -0.2), (-0.4, 0.25), (0.1, 0.45)] {
        let (xd, yd) = distortion.distort(x, y);
        let (xu, yu) = distortion.undistort(xd, yd);
        assert!((xu - x).abs() < 1e-6 && (yu - y).abs() < 1e-6);
    }
}

#[test]
fn test_malformed_inputs() {
    let image = random_image(16, 16, 3, 3);
    let good_k = camera_matrix(20.0, 20.0, 7.5, 7.5);

    let err = undistort(&image, &na::DMatrix::zeros(2, 3), &na::DVector::zeros(5)).unwrap_err();
    assert!(matches!(err, CalibError::InvalidCameraMatrix(_)));

    let err = undistort(&image, &camera_matrix(-20.0, 20.0, 7.5, 7.5), &na::DVector::zeros(5))
        .unwrap_err();
    assert!(matches!(err, CalibError::InvalidCameraMatrix(_)));

    let err = undistort(&image, &camera_matrix(f64::NAN, 20.0, 7.5, 7.5), &na::DVector::zeros(5))
        .unwrap_err();
    assert!(matches!(err, CalibError::InvalidCameraMatrix(_)));

    for len in [0, 3, 6, 14] {
        let err = undistort(&image, &good_k, &na::DVector::zeros(len)).unwrap_err();
        assert!(matches!(err, CalibError::InvalidDistortion(n) if n == len));
    }

    assert!(NormalizedImage::new(4, 4, 2, vec![0.0; 32]).is_err());
    assert!(NormalizedImage::new(4, 4, 3, vec![0.0; 47]).is_err());
    assert!(NormalizedImage::from_batch([2, 4, 4, 3], vec![0.0; 96]).is_err());
    assert!(NormalizedImage::from_batch([1, 4, 4, 3], vec![0.0; 48]).is_ok());

    let broken = NormalizedImage {
        height: 4,
        width: 4,
        channels: 3,
        data: vec![0.0; 10],
    };
    let err = undistort(&broken, &good_k, &na::DVector::zeros(5)).unwrap_err();
    assert!(matches!(err, CalibError::InvalidImage(_)));
}
