use checkerboard_calibration::types::{
    CalibrationResult, RvecTvec, ToRvecTvec, dist_coef_to_text, matrix_to_text,
};
use nalgebra as na;

#[test]
fn test_rvec_tvec_conversion() {
    let rvec_in = na::Vector3::new(0.1, 0.2, 0.3);
    let tvec_in = na::Vector3::new(1.0, 2.0, 3.0);

    let rt = RvecTvec::new(rvec_in, tvec_in);
    let iso = rt.to_na_isometry3();
    let rt_back = iso.to_rvec_tvec();

    assert!((rt_back.rvec - rvec_in).norm() < 1e-9);
    assert!((rt_back.tvec - tvec_in).norm() < 1e-9);

    let p = iso * na::Point3::new(1.0, 0.0, 0.0);
    let expected = na::Rotation3::new(rvec_in) * na::Vector3::x() + tvec_in;
    assert!((p.coords - expected).norm() < 1e-9);
}

#[test]
fn test_matrix_text() {
    let k = na::Matrix3::new(600.0, 0.0, 320.0, 0.0, 610.0, 240.0, 0.0, 0.0, 1.0);
    let text = matrix_to_text(&k);
    assert_eq!(text.lines().count(), 3);
    assert!(text.starts_with("[[6.00000000e2"));
    assert!(text.ends_with("1.00000000e0]]"));

    let d = na::dvector![-0.1, 0.01, 0.0, 0.0, 0.0];
    let text = dist_coef_to_text(&d);
    assert!(text.starts_with("[[-1.00000000e-1"));
    assert_eq!(text.matches(',').count(), 4);
}

#[test]
fn test_result_display_and_accessors() {
    let result = CalibrationResult {
        camera_matrix: na::Matrix3::identity(),
        dist_coeffs: na::DVector::zeros(5),
        extrinsics: vec![
            RvecTvec::new(na::Vector3::new(0.1, 0.0, 0.0), na::Vector3::new(0.0, 0.0, 10.0)),
            RvecTvec::new(na::Vector3::new(0.0, 0.2, 0.0), na::Vector3::new(1.0, 0.0, 12.0)),
        ],
        image_h_w: (480, 640),
        rms_error: 0.123456,
    };
    assert_eq!(result.rvecs()[1], na::Vector3::new(0.0, 0.2, 0.0));
    assert_eq!(result.tvecs()[0].z, 10.0);

    let text = result.to_string();
    assert!(text.contains("views: 2"));
    assert!(text.contains("480 x 640"));
    assert!(text.contains("0.12346 px"));

    let json = serde_json::to_string(&result).unwrap();
    let back: CalibrationResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.extrinsics, result.extrinsics);
    assert_eq!(back.image_h_w, result.image_h_w);
}
