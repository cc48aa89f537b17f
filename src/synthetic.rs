//! Renders checkerboard images seen through a distorted pinhole camera.

use image::GrayImage;
use nalgebra as na;
use rand::prelude::*;

use crate::board::BoardConfig;
use crate::camera_model::PinholeCamera;
use crate::types::RvecTvec;

pub const BLACK: u8 = 30;
pub const WHITE: u8 = 220;

const SUPERSAMPLE_OFFSETS: [f64; 2] = [-0.25, 0.25];

/// Board squares span `[-1, cols - 1] x [-1, rows - 1]` in square units so the
/// interior corners sit on integer coordinates starting at the origin.
/// Everything off the board is white.
pub fn render_checkerboard(
    config: &BoardConfig,
    camera: &PinholeCamera,
    pose: &RvecTvec,
    img_w_h: (u32, u32),
) -> GrayImage {
    let rot = na::Rotation3::new(pose.rvec);
    let plane_to_ray = na::Matrix3::from_columns(&[
        rot.matrix().column(0).into_owned(),
        rot.matrix().column(1).into_owned(),
        pose.tvec,
    ]);
    let Some(ray_to_plane) = plane_to_ray.try_inverse() else {
        return GrayImage::from_pixel(img_w_h.0, img_w_h.1, image::Luma([WHITE]));
    };
    let (cols, rows) = (config.cols as f64, config.rows as f64);

    let shade = |u: f64, v: f64| -> f64 {
        let (x, y) = camera.pixel_to_normalized(u, v);
        let q = ray_to_plane * na::Vector3::new(x, y, 1.0);
        if q.z <= 0.0 {
            return WHITE as f64;
        }
        let bx = q.x / q.z + 1.0;
        let by = q.y / q.z + 1.0;
        if bx < 0.0 || by < 0.0 || bx >= cols || by >= rows {
            return WHITE as f64;
        }
        if (bx.floor() as i64 + by.floor() as i64) % 2 == 0 {
            BLACK as f64
        } else {
            WHITE as f64
        }
    };

    GrayImage::from_par_fn(img_w_h.0, img_w_h.1, |px, py| {
        let mut acc = 0.0;
        for dy in SUPERSAMPLE_OFFSETS {
            for dx in SUPERSAMPLE_OFFSETS {
                acc += shade(px as f64 + dx, py as f64 + dy);
            }
        }
        image::Luma([(acc / 4.0).round() as u8])
    })
}

/// Pose that puts the board centre on the optical axis at `distance`,
/// tilted by `rvec`.
pub fn centered_pose(config: &BoardConfig, rvec: na::Vector3<f64>, distance: f64) -> RvecTvec {
    let (w, h) = config.pattern_size();
    let center = na::Vector3::new((w as f64 - 1.0) * 0.5, (h as f64 - 1.0) * 0.5, 0.0);
    let rot = na::Rotation3::new(rvec);
    RvecTvec::new(rvec, na::Vector3::new(0.0, 0.0, distance) - rot * center)
}

/// Random board poses with tilts up to `max_tilt` radians, distances in
/// `distance_range` and a small lateral offset.
pub fn random_poses<R: Rng>(
    rng: &mut R,
    config: &BoardConfig,
    count: usize,
    max_tilt: f64,
    distance_range: (f64, f64),
) -> Vec<RvecTvec> {
    (0..count)
        .map(|_| {
            let rvec = na::Vector3::new(
                rng.random_range(-max_tilt..max_tilt),
                rng.random_range(-max_tilt..max_tilt),
                rng.random_range(-max_tilt..max_tilt),
            );
            let distance = rng.random_range(distance_range.0..distance_range.1);
            let mut pose = centered_pose(config, rvec, distance);
            pose.tvec.x += rng.random_range(-0.5..0.5);
            pose.tvec.y += rng.random_range(-0.5..0.5);
            pose
        })
        .collect()
}
