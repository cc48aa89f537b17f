use image::DynamicImage;
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::camera_model::{DistortionCoefficients, PinholeCamera, init_undistort_map, remap};
use crate::error::{CalibError, Result};
use crate::image_buffer::NormalizedImage;

const GRID_SAMPLES: usize = 9;
const ROI_EPS: f64 = 1e-6;

/// Integer pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Rect {
    fn width(&self) -> f64 {
        self.x1 - self.x0
    }
    fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Inner (every point valid) and outer (every source pixel kept) rectangles
/// of an undistorted sample grid, in normalized coordinates or, when
/// `new_k` is given, in its pixel coordinates.
fn undistorted_rectangles(
    camera: &PinholeCamera,
    img_w_h: (u32, u32),
    new_k: Option<&na::Matrix3<f64>>,
) -> (Rect, Rect) {
    let n = GRID_SAMPLES;
    let (w, h) = (img_w_h.0 as f64, img_w_h.1 as f64);
    let mut inner = Rect {
        x0: f64::MIN,
        y0: f64::MIN,
        x1: f64::MAX,
        y1: f64::MAX,
    };
    let mut outer = Rect {
        x0: f64::MAX,
        y0: f64::MAX,
        x1: f64::MIN,
        y1: f64::MIN,
    };
    for yi in 0..n {
        for xi in 0..n {
            let u = xi as f64 * (w - 1.0) / (n - 1) as f64;
            let v = yi as f64 * (h - 1.0) / (n - 1) as f64;
            let (mut x, mut y) = camera.pixel_to_normalized(u, v);
            if let Some(k) = new_k {
                x = k[(0, 0)] * x + k[(0, 2)];
                y = k[(1, 1)] * y + k[(1, 2)];
            }
            outer.x0 = outer.x0.min(x);
            outer.y0 = outer.y0.min(y);
            outer.x1 = outer.x1.max(x);
            outer.y1 = outer.y1.max(y);
            if xi == 0 {
                inner.x0 = inner.x0.max(x);
            }
            if xi == n - 1 {
                inner.x1 = inner.x1.min(x);
            }
            if yi == 0 {
                inner.y0 = inner.y0.max(y);
            }
            if yi == n - 1 {
                inner.y1 = inner.y1.min(y);
            }
        }
    }
    (inner, outer)
}

/// New camera matrix for undistorted images and the rectangle of valid pixels.
///
/// `alpha = 0` keeps only valid pixels, `alpha = 1` keeps every source pixel.
pub fn get_optimal_new_camera_matrix(
    camera: &PinholeCamera,
    img_w_h: (u32, u32),
    alpha: f64,
) -> Result<(na::Matrix3<f64>, Roi)> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(CalibError::Degenerate(format!("alpha {} outside [0, 1]", alpha)));
    }
    let (w, h) = (img_w_h.0 as f64, img_w_h.1 as f64);
    let (inner, outer) = undistorted_rectangles(camera, img_w_h, None);
    if inner.width() <= 0.0 || inner.height() <= 0.0 {
        return Err(CalibError::Degenerate(
            "distortion leaves no valid undistorted region".to_string(),
        ));
    }

    let fx0 = (w - 1.0) / inner.width();
    let fy0 = (h - 1.0) / inner.height();
    let cx0 = -fx0 * inner.x0;
    let cy0 = -fy0 * inner.y0;
    let fx1 = (w - 1.0) / outer.width();
    let fy1 = (h - 1.0) / outer.height();
    let cx1 = -fx1 * outer.x0;
    let cy1 = -fy1 * outer.y0;

    let fx = fx0 * (1.0 - alpha) + fx1 * alpha;
    let fy = fy0 * (1.0 - alpha) + fy1 * alpha;
    let cx = cx0 * (1.0 - alpha) + cx1 * alpha;
    let cy = cy0 * (1.0 - alpha) + cy1 * alpha;
    let new_k = na::Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0);

    let (pixel_inner, _) = undistorted_rectangles(camera, img_w_h, Some(&new_k));
    let x0 = (pixel_inner.x0 - ROI_EPS).ceil().max(0.0);
    let y0 = (pixel_inner.y0 - ROI_EPS).ceil().max(0.0);
    let x1 = (pixel_inner.x1 + ROI_EPS).floor().min(w - 1.0);
    let y1 = (pixel_inner.y1 + ROI_EPS).floor().min(h - 1.0);
    let roi = if x1 >= x0 && y1 >= y0 {
        Roi {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32 + 1,
            height: (y1 - y0) as u32 + 1,
        }
    } else {
        Roi {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        }
    };
    log::debug!("new camera matrix {:?}, roi {:?}", new_k, roi);
    Ok((new_k, roi))
}

/// Remaps `src` into the `new_k` camera and crops to `roi`.
pub fn undistort_image(
    src: &DynamicImage,
    camera: &PinholeCamera,
    new_k: &na::Matrix3<f64>,
    roi: &Roi,
) -> Result<DynamicImage> {
    let (xmap, ymap) = init_undistort_map(camera, new_k, (src.width(), src.height()));
    let remapped = remap(src, &xmap, &ymap)?;
    if roi.is_empty() {
        return Err(CalibError::Degenerate("empty valid pixel region".to_string()));
    }
    Ok(remapped.crop_imm(roi.x, roi.y, roi.width, roi.height))
}

/// Removes lens distortion from a `[0, 1]` image and crops to the valid region.
///
/// `camera_matrix` must be 3x3 with positive focal lengths and
/// `dist_coeffs` must hold 4, 5 or 8 coefficients.
pub fn undistort(
    image: &NormalizedImage,
    camera_matrix: &na::DMatrix<f64>,
    dist_coeffs: &na::DVector<f64>,
) -> Result<NormalizedImage> {
    image.validate()?;
    if camera_matrix.shape() != (3, 3) {
        return Err(CalibError::InvalidCameraMatrix(format!(
            "expected 3x3, got {:?}",
            camera_matrix.shape()
        )));
    }
    let k = na::Matrix3::from_iterator(camera_matrix.iter().copied());
    let distortion = DistortionCoefficients::from_slice(dist_coeffs.as_slice())?;
    let img_w_h = (image.width as u32, image.height as u32);
    let camera = PinholeCamera::from_matrix(&k, distortion, img_w_h)?;

    let src = image.to_dynamic_image()?;
    let (new_k, roi) = get_optimal_new_camera_matrix(&camera, img_w_h, 0.0)?;
    let out = undistort_image(&src, &camera, &new_k, &roi)?;
    NormalizedImage::from_dynamic_image(&out)
}
