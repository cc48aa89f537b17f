//! Dense ChESS X-junction response and peak extraction.

use glam::Vec2;
use image::GrayImage;
use rayon::prelude::*;

pub const RING_RADIUS: usize = 5;

/// 16 samples on a radius 5 circle, clockwise from 12 o'clock.
const RING: [(i32, i32); 16] = [
    (0, -5),
    (2, -5),
    (3, -3),
    (5, -2),
    (5, 0),
    (5, 2),
    (3, 3),
    (2, 5),
    (0, 5),
    (-2, 5),
    (-3, 3),
    (-5, 2),
    (-5, 0),
    (-5, -2),
    (-3, -3),
    (-2, -5),
];

/// Dense response map in row-major layout.
#[derive(Clone, Debug)]
pub struct ResponseMap {
    pub w: usize,
    pub h: usize,
    pub data: Vec<f32>,
}

impl ResponseMap {
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Peak {
    pub position: Vec2,
    pub strength: f32,
}

/// `R = SR - DR - 16 * MR`. Pixels closer than the ring radius to the border stay at zero.
pub fn chess_response(img: &GrayImage) -> ResponseMap {
    let w = img.width() as usize;
    let h = img.height() as usize;
    let r = RING_RADIUS;
    let raw = img.as_raw();
    let mut data = vec![0.0f32; w * h];
    if w <= 2 * r || h <= 2 * r {
        return ResponseMap { w, h, data };
    }

    data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        if y < r || y + r >= h {
            return;
        }
        for (x, out) in row.iter_mut().enumerate().take(w - r).skip(r) {
            let s: [f32; 16] = std::array::from_fn(|k| {
                let (dx, dy) = RING[k];
                let sx = (x as i32 + dx) as usize;
                let sy = (y as i32 + dy) as usize;
                raw[sy * w + sx] as f32
            });
            let sum_response: f32 = (0..4)
                .map(|n| ((s[n] + s[n + 8]) - (s[n + 4] + s[n + 12])).abs())
                .sum();
            let diff_response: f32 = (0..8).map(|n| (s[n] - s[n + 8]).abs()).sum();
            let ring_mean = s.iter().sum::<f32>() / 16.0;
            let center = y * w + x;
            let local_mean = (raw[center] as f32
                + raw[center - 1] as f32
                + raw[center + 1] as f32
                + raw[center - w] as f32
                + raw[center + w] as f32)
                / 5.0;
            let mean_response = (local_mean - ring_mean).abs();
            *out = sum_response - diff_response - 16.0 * mean_response;
        }
    });
    ResponseMap { w, h, data }
}

/// Thresholds relative to the strongest response, keeps local maxima within
/// `nms_radius` and refines each by a 5x5 centre of mass. Sorted strongest first.
pub fn detect_peaks(response: &ResponseMap, threshold_rel: f32, nms_radius: u32) -> Vec<Peak> {
    let max_response = response.data.iter().cloned().fold(0.0f32, f32::max);
    if max_response <= 0.0 {
        return Vec::new();
    }
    let threshold = max_response * threshold_rel;
    let nms = nms_radius as usize;
    let border = RING_RADIUS + nms.max(2);
    if response.w <= 2 * border || response.h <= 2 * border {
        return Vec::new();
    }

    let mut peaks: Vec<Peak> = (border..response.h - border)
        .into_par_iter()
        .flat_map_iter(|y| {
            (border..response.w - border).filter_map(move |x| {
                let v = response.at(x, y);
                if v <= threshold || !is_local_max(response, x, y, nms) {
                    return None;
                }
                Some(Peak {
                    position: center_of_mass(response, x, y),
                    strength: v,
                })
            })
        })
        .collect();
    peaks.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    peaks
}

/// Ties are broken in raster order so a plateau yields one peak.
fn is_local_max(response: &ResponseMap, x: usize, y: usize, radius: usize) -> bool {
    let v = response.at(x, y);
    for ny in y - radius..=y + radius {
        for nx in x - radius..=x + radius {
            if nx == x && ny == y {
                continue;
            }
            let n = response.at(nx, ny);
            let before = (ny, nx) < (y, x);
            if n > v || (before && n == v) {
                return false;
            }
        }
    }
    true
}

fn center_of_mass(response: &ResponseMap, x: usize, y: usize) -> Vec2 {
    let mut sum = 0.0f32;
    let mut sx = 0.0f32;
    let mut sy = 0.0f32;
    for ny in y - 2..=y + 2 {
        for nx in x - 2..=x + 2 {
            let v = response.at(nx, ny).max(0.0);
            sum += v;
            sx += v * nx as f32;
            sy += v * ny as f32;
        }
    }
    if sum > 0.0 {
        Vec2::new(sx / sum, sy / sum)
    } else {
        Vec2::new(x as f32, y as f32)
    }
}
