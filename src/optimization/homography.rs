use nalgebra as na;

/// Similarity that moves the points' centroid to the origin and scales their
/// mean distance to sqrt(2).
fn normalization_transform(points: &[na::Vector2<f64>]) -> Option<na::Matrix3<f64>> {
    let n = points.len() as f64;
    let centroid = points.iter().fold(na::Vector2::zeros(), |acc, p| acc + p) / n;
    let mean_dist = points.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n;
    if mean_dist <= f64::EPSILON {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(na::Matrix3::new(
        s,
        0.0,
        -s * centroid.x,
        0.0,
        s,
        -s * centroid.y,
        0.0,
        0.0,
        1.0,
    ))
}

fn apply(t: &na::Matrix3<f64>, p: &na::Vector2<f64>) -> na::Vector2<f64> {
    let q = t * na::Vector3::new(p.x, p.y, 1.0);
    na::Vector2::new(q.x / q.z, q.y / q.z)
}

/// Normalized DLT estimate of `H` with `dst ~ H * src`, scaled so `H[2,2] == 1`.
pub fn find_homography(
    src: &[na::Vector2<f64>],
    dst: &[na::Vector2<f64>],
) -> Option<na::Matrix3<f64>> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return None;
    }
    let t_src = normalization_transform(src)?;
    let t_dst = normalization_transform(dst)?;

    let rows = (2 * n).max(9);
    let mut a = na::DMatrix::<f64>::zeros(rows, 9);
    for (i, (ps, pd)) in src.iter().zip(dst).enumerate() {
        let s = apply(&t_src, ps);
        let d = apply(&t_dst, pd);
        let (r0, r1) = (2 * i, 2 * i + 1);
        a[(r0, 0)] = -s.x;
        a[(r0, 1)] = -s.y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = d.x * s.x;
        a[(r0, 7)] = d.x * s.y;
        a[(r0, 8)] = d.x;
        a[(r1, 3)] = -s.x;
        a[(r1, 4)] = -s.y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = d.y * s.x;
        a[(r1, 7)] = d.y * s.y;
        a[(r1, 8)] = d.y;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = v_t.row(min_idx);
    let h_norm = na::Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    let mut h_mat = t_dst.try_inverse()? * h_norm * t_src;
    let scale = h_mat[(2, 2)];
    if scale.abs() > f64::EPSILON {
        h_mat /= scale;
    }
    if h_mat.iter().all(|v| v.is_finite()) {
        Some(h_mat)
    } else {
        None
    }
}

/// Maps a plane point through `h_mat`.
pub fn transform_point(h_mat: &na::Matrix3<f64>, p: &na::Vector2<f64>) -> na::Vector2<f64> {
    apply(h_mat, p)
}
