//! Gradient-orthogonality corner refinement.

use glam::Vec2;
use image::GrayImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubPixParams {
    /// Search window is `(2 * half_window + 1)` pixels square.
    pub half_window: usize,
    pub max_iterations: usize,
    /// Stop once a step moves the corner less than this many pixels.
    pub epsilon: f64,
}

impl Default for SubPixParams {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iterations: 30,
            epsilon: 0.001,
        }
    }
}

/// Refines each corner so the image gradient in its window is orthogonal to
/// the vector from the corner. Points that diverge keep their input value.
pub fn corner_sub_pix(gray: &GrayImage, corners: &[Vec2], params: &SubPixParams) -> Vec<Vec2> {
    let mask = gaussian_mask(params.half_window);
    corners
        .par_iter()
        .map(|&corner| refine_one(gray, corner, &mask, params))
        .collect()
}

fn gaussian_mask(half: usize) -> Vec<f64> {
    let size = 2 * half + 1;
    let scale = 1.0 / half.max(1) as f64;
    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let x = (i as f64 - half as f64) * scale;
            (-x * x).exp()
        })
        .collect();
    weights
        .iter()
        .flat_map(|wy| weights.iter().map(move |wx| wy * wx))
        .collect()
}

fn refine_one(gray: &GrayImage, start: Vec2, mask: &[f64], params: &SubPixParams) -> Vec2 {
    let half = params.half_window as i64;
    let size = (2 * half + 1) as usize;
    let patch_size = size + 2;
    let (width, height) = (gray.width() as f64, gray.height() as f64);
    let eps_sq = params.epsilon * params.epsilon;

    let (x0, y0) = (start.x as f64, start.y as f64);
    let (mut cx, mut cy) = (x0, y0);
    let mut patch = vec![0.0f64; patch_size * patch_size];

    for _ in 0..params.max_iterations {
        sample_patch(gray, cx, cy, patch_size, &mut patch);
        let mut a = 0.0;
        let mut b = 0.0;
        let mut c = 0.0;
        let mut bb1 = 0.0;
        let mut bb2 = 0.0;
        for i in 0..size {
            let py = i as f64 - half as f64;
            for j in 0..size {
                let px = j as f64 - half as f64;
                let m = mask[i * size + j];
                let tgx = patch[(i + 1) * patch_size + j + 2] - patch[(i + 1) * patch_size + j];
                let tgy = patch[(i + 2) * patch_size + j + 1] - patch[i * patch_size + j + 1];
                let gxx = tgx * tgx * m;
                let gxy = tgx * tgy * m;
                let gyy = tgy * tgy * m;
                a += gxx;
                b += gxy;
                c += gyy;
                bb1 += gxx * px + gxy * py;
                bb2 += gxy * px + gyy * py;
            }
        }
        let det = a * c - b * b;
        if det.abs() <= f64::EPSILON * f64::EPSILON {
            break;
        }
        let scale = 1.0 / det;
        let nx = cx + c * scale * bb1 - b * scale * bb2;
        let ny = cy - b * scale * bb1 + a * scale * bb2;
        let err = (nx - cx).powi(2) + (ny - cy).powi(2);
        cx = nx;
        cy = ny;
        if cx < 0.0 || cx >= width || cy < 0.0 || cy >= height || err <= eps_sq {
            break;
        }
    }

    if (cx - x0).abs() > half as f64 || (cy - y0).abs() > half as f64 || !cx.is_finite() || !cy.is_finite() {
        log::trace!("corner at ({:.2}, {:.2}) diverged", x0, y0);
        return start;
    }
    Vec2::new(cx as f32, cy as f32)
}

/// Bilinear patch centred on `(cx, cy)` with replicated borders.
fn sample_patch(gray: &GrayImage, cx: f64, cy: f64, patch_size: usize, out: &mut [f64]) {
    let offset = (patch_size as f64 - 1.0) * 0.5;
    for i in 0..patch_size {
        let y = cy + i as f64 - offset;
        for j in 0..patch_size {
            let x = cx + j as f64 - offset;
            out[i * patch_size + j] = bilinear(gray, x, y);
        }
    }
}

pub(crate) fn bilinear(gray: &GrayImage, x: f64, y: f64) -> f64 {
    let max_x = gray.width() as f64 - 1.0;
    let max_y = gray.height() as f64 - 1.0;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let x0 = x0 as u32;
    let y0 = y0 as u32;
    let x1 = (x0 + 1).min(max_x as u32);
    let y1 = (y0 + 1).min(max_y as u32);
    let p = |px: u32, py: u32| gray.get_pixel(px, py).0[0] as f64;
    (1.0 - fy) * ((1.0 - fx) * p(x0, y0) + fx * p(x1, y0)) + fy * ((1.0 - fx) * p(x0, y1) + fx * p(x1, y1))
}
