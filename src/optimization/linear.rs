use faer::linalg::solvers::SolveLstsqCore;
use log::debug;
use nalgebra as na;

use crate::types::RvecTvec;

/// Closed-form pinhole intrinsics from board-to-image homographies.
///
/// The principal point is fixed at the image centre; `1/fx^2` and `1/fy^2`
/// follow from the orthogonality and equal-norm constraints on the first two
/// rotation columns. Returns `[fx, fy, cx, cy]`.
pub fn init_intrinsics(homographies: &[na::Matrix3<f64>], img_w_h: (u32, u32)) -> [f64; 4] {
    let cx = (img_w_h.0 as f64 - 1.0) * 0.5;
    let cy = (img_w_h.1 as f64 - 1.0) * 0.5;
    let fallback = img_w_h.0.max(img_w_h.1) as f64;

    let rows = 2 * homographies.len();
    let mut a: faer::Mat<f64> = faer::Mat::zeros(rows, 2);
    let mut b: faer::Mat<f64> = faer::Mat::zeros(rows, 1);
    for (i, h_mat) in homographies.iter().enumerate() {
        let mut h = *h_mat;
        for c in 0..3 {
            h[(0, c)] -= h[(2, c)] * cx;
            h[(1, c)] -= h[(2, c)] * cy;
        }
        let h1 = h.column(0).normalize();
        let h2 = h.column(1).normalize();
        let d1 = ((h.column(0) + h.column(1)) * 0.5).normalize();
        let d2 = ((h.column(0) - h.column(1)) * 0.5).normalize();

        *a.get_mut(2 * i, 0) = h1[0] * h2[0];
        *a.get_mut(2 * i, 1) = h1[1] * h2[1];
        *b.get_mut(2 * i, 0) = -h1[2] * h2[2];
        *a.get_mut(2 * i + 1, 0) = d1[0] * d2[0];
        *a.get_mut(2 * i + 1, 1) = d1[1] * d2[1];
        *b.get_mut(2 * i + 1, 0) = -d1[2] * d2[2];
    }

    let mut x = b;
    a.qr()
        .solve_lstsq_in_place_with_conj(faer::Conj::No, x.as_mut());
    let to_focal = |inv_sq: f64| {
        let f = (1.0 / inv_sq).sqrt();
        if inv_sq > 0.0 && f.is_finite() && f > 0.0 {
            f
        } else {
            debug!("focal estimate degenerate, falling back to {}", fallback);
            fallback
        }
    };
    let fx = to_focal(*x.get(0, 0));
    let fy = to_focal(*x.get(1, 0));
    [fx, fy, cx, cy]
}

/// Board pose from a homography and intrinsics, with the board in front of
/// the camera.
pub fn pose_from_homography(
    camera_matrix: &na::Matrix3<f64>,
    h_mat: &na::Matrix3<f64>,
) -> Option<RvecTvec> {
    let k_inv = camera_matrix.try_inverse()?;
    let k_inv_h1 = k_inv * h_mat.column(0);
    let k_inv_h2 = k_inv * h_mat.column(1);
    let norm = (k_inv_h1.norm() + k_inv_h2.norm()) * 0.5;
    if norm <= f64::EPSILON {
        return None;
    }
    let mut lambda = 1.0 / norm;
    let mut tvec = k_inv * h_mat.column(2) * lambda;
    if tvec.z < 0.0 {
        lambda = -lambda;
        tvec = -tvec;
    }
    let r1 = k_inv_h1 * lambda;
    let r2 = k_inv_h2 * lambda;
    let r3 = r1.cross(&r2);
    let r_mat = na::Matrix3::from_columns(&[r1, r2, r3]);

    let svd = r_mat.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }
    let rotation = na::Rotation3::from_matrix_unchecked(r_orth);
    Some(RvecTvec::new(rotation.scaled_axis(), tvec))
}
