use std::collections::HashMap;

use nalgebra as na;
use serde::{Deserialize, Serialize};
use tiny_solver::Optimizer;

use crate::camera_model::{CameraModel, DistortionCoefficients, PinholeCamera};
use crate::error::{CalibError, Result};
use crate::optimization::factors::ReprojectionFactor;
use crate::optimization::{find_homography, init_intrinsics, pose_from_homography};
use crate::types::{CalibrationResult, RvecTvec};

const MIN_POINTS_PER_VIEW: usize = 4;
const DISTORTION_LEN: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationOptions {
    /// Levenberg-Marquardt iteration cap.
    pub max_iterations: usize,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self { max_iterations: 50 }
    }
}

fn validate_views(
    object_points: &[Vec<glam::Vec3>],
    image_points: &[Vec<glam::Vec2>],
) -> Result<()> {
    if object_points.len() != image_points.len() {
        return Err(CalibError::ViewCountMismatch {
            object: object_points.len(),
            image: image_points.len(),
        });
    }
    if object_points.is_empty() {
        return Err(CalibError::NoDetections);
    }
    for (view, (obj, img)) in object_points.iter().zip(image_points).enumerate() {
        if obj.len() != img.len() {
            return Err(CalibError::CorrespondenceMismatch {
                view,
                object: obj.len(),
                image: img.len(),
            });
        }
        if obj.len() < MIN_POINTS_PER_VIEW {
            return Err(CalibError::Degenerate(format!(
                "view {} has {} points, need at least {}",
                view,
                obj.len(),
                MIN_POINTS_PER_VIEW
            )));
        }
        if obj.iter().any(|p| p.z != 0.0) {
            return Err(CalibError::Degenerate(format!(
                "view {} board points are not on the z = 0 plane",
                view
            )));
        }
    }
    Ok(())
}

/// Estimates intrinsics, distortion and per-view poses from planar board
/// correspondences.
///
/// Linear initialisation from per-view homographies is refined jointly with
/// Levenberg-Marquardt over one shared intrinsics block, one shared
/// distortion block and a rotation/translation pair per view.
pub fn calibrate_camera(
    object_points: &[Vec<glam::Vec3>],
    image_points: &[Vec<glam::Vec2>],
    img_w_h: (u32, u32),
    options: &CalibrationOptions,
) -> Result<CalibrationResult> {
    validate_views(object_points, image_points)?;

    let homographies = object_points
        .iter()
        .zip(image_points)
        .enumerate()
        .map(|(view, (obj, img))| {
            let src: Vec<_> = obj
                .iter()
                .map(|p| na::Vector2::new(p.x as f64, p.y as f64))
                .collect();
            let dst: Vec<_> = img
                .iter()
                .map(|p| na::Vector2::new(p.x as f64, p.y as f64))
                .collect();
            find_homography(&src, &dst).ok_or_else(|| {
                CalibError::Degenerate(format!("no homography for view {}", view))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let [fx, fy, cx, cy] = init_intrinsics(&homographies, img_w_h);
    log::debug!("initial intrinsics fx {:.3} fy {:.3} cx {:.3} cy {:.3}", fx, fy, cx, cy);
    let init_k = na::Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0);
    let init_poses = homographies
        .iter()
        .enumerate()
        .map(|(view, h)| {
            pose_from_homography(&init_k, h).ok_or_else(|| {
                CalibError::Degenerate(format!("no initial pose for view {}", view))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut problem = tiny_solver::Problem::new();
    let mut initial_values = HashMap::<String, na::DVector<f64>>::from([
        ("intrinsics".to_string(), na::dvector![fx, fy, cx, cy]),
        (
            "distortion".to_string(),
            na::DVector::zeros(DISTORTION_LEN),
        ),
    ]);
    for (view, ((obj, img), pose)) in object_points
        .iter()
        .zip(image_points)
        .zip(&init_poses)
        .enumerate()
    {
        let rvec_name = format!("rvec{}", view);
        let tvec_name = format!("tvec{}", view);
        for (p3d, p2d) in obj.iter().zip(img) {
            let cost = ReprojectionFactor::new(p3d, p2d);
            problem.add_residual_block(
                2,
                &["intrinsics", "distortion", rvec_name.as_str(), tvec_name.as_str()],
                Box::new(cost),
                None,
            );
        }
        initial_values.insert(rvec_name, na::DVector::from_column_slice(pose.rvec.as_slice()));
        initial_values.insert(tvec_name, na::DVector::from_column_slice(pose.tvec.as_slice()));
    }

    let optimizer = tiny_solver::LevenbergMarquardtOptimizer::default();
    let solver_options = tiny_solver::OptimizerOptions {
        max_iteration: options.max_iterations,
        verbosity_level: 0,
        ..Default::default()
    };
    let result = optimizer
        .optimize(&problem, &initial_values, Some(solver_options))
        .ok_or_else(|| CalibError::SolverFailed("optimizer returned no solution".to_string()))?;

    let block = |name: &str| {
        result
            .get(name)
            .cloned()
            .ok_or_else(|| CalibError::SolverFailed(format!("missing block {}", name)))
    };
    let intrinsics = block("intrinsics")?;
    let dist_coeffs = block("distortion")?;
    if intrinsics.iter().chain(dist_coeffs.iter()).any(|v| !v.is_finite())
        || intrinsics[0] <= 0.0
        || intrinsics[1] <= 0.0
    {
        return Err(CalibError::SolverFailed(format!(
            "invalid intrinsics {:?}",
            intrinsics.as_slice()
        )));
    }
    let extrinsics = (0..object_points.len())
        .map(|view| {
            let rvec = block(&format!("rvec{}", view))?;
            let tvec = block(&format!("tvec{}", view))?;
            Ok(RvecTvec::new(
                na::Vector3::new(rvec[0], rvec[1], rvec[2]),
                na::Vector3::new(tvec[0], tvec[1], tvec[2]),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let camera_matrix = na::Matrix3::new(
        intrinsics[0],
        0.0,
        intrinsics[2],
        0.0,
        intrinsics[1],
        intrinsics[3],
        0.0,
        0.0,
        1.0,
    );
    let camera = PinholeCamera::from_matrix(
        &camera_matrix,
        DistortionCoefficients::from_slice(dist_coeffs.as_slice())?,
        img_w_h,
    )?;
    let rms_error = rms_reprojection_error(&camera, object_points, image_points, &extrinsics);
    log::info!(
        "calibrated {} views, rms reprojection error {:.5} px",
        extrinsics.len(),
        rms_error
    );

    Ok(CalibrationResult {
        camera_matrix,
        dist_coeffs,
        extrinsics,
        image_h_w: (img_w_h.1, img_w_h.0),
        rms_error,
    })
}

/// Projects board points through a pose and camera, like `projectPoints`.
pub fn project_points(
    camera: &PinholeCamera,
    pose: &RvecTvec,
    points: &[glam::Vec3],
) -> Vec<glam::Vec2> {
    let transform = pose.to_na_isometry3();
    points
        .iter()
        .map(|p| {
            let p_cam = transform * na::Point3::new(p.x as f64, p.y as f64, p.z as f64);
            let uv = camera.project_one(&p_cam.coords);
            glam::Vec2::new(uv.x as f32, uv.y as f32)
        })
        .collect()
}

/// Per-point pixel distances between observed and reprojected corners.
pub fn reprojection_errors(
    camera: &PinholeCamera,
    pose: &RvecTvec,
    object_points: &[glam::Vec3],
    image_points: &[glam::Vec2],
) -> Vec<f64> {
    project_points(camera, pose, object_points)
        .iter()
        .zip(image_points)
        .map(|(p, q)| p.distance(*q) as f64)
        .collect()
}

pub fn rms_reprojection_error(
    camera: &PinholeCamera,
    object_points: &[Vec<glam::Vec3>],
    image_points: &[Vec<glam::Vec2>],
    extrinsics: &[RvecTvec],
) -> f64 {
    let (sum_sq, count) = object_points
        .iter()
        .zip(image_points)
        .zip(extrinsics)
        .flat_map(|((obj, img), pose)| reprojection_errors(camera, pose, obj, img))
        .fold((0.0, 0usize), |(s, n), e| (s + e * e, n + 1));
    if count == 0 {
        0.0
    } else {
        (sum_sq / count as f64).sqrt()
    }
}

/// Average and median of a set of reprojection errors.
pub fn error_statistics(errors: &[f64]) -> (f64, f64) {
    if errors.is_empty() {
        return (0.0, 0.0);
    }
    let avg = errors.iter().sum::<f64>() / errors.len() as f64;
    let mut sorted = errors.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    (avg, sorted[sorted.len() / 2])
}
