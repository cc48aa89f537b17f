use image::{DynamicImage, ImageBuffer, Pixel};
use nalgebra as na;
use rayon::prelude::*;

use crate::error::{CalibError, Result};

/// Sub-pixel resolution of remap coordinates, in bits.
const INTER_BITS: u32 = 5;
const INTER_TAB_SIZE: i64 = 1 << INTER_BITS;

pub trait CameraModel<T: na::RealField + Clone>
where
    Self: Sync,
{
    fn params(&self) -> na::DVector<T>;
    fn width(&self) -> T;
    fn height(&self) -> T;
    fn project_one(&self, pt: &na::Vector3<T>) -> na::Vector2<T>;
    /// Projects every point, `None` for points landing outside the image.
    fn project(&self, p3d: &[na::Vector3<T>]) -> Vec<Option<na::Vector2<T>>> {
        p3d.par_iter()
            .map(|pt| {
                let p2d = self.project_one(pt);
                if p2d[0] < T::zero()
                    || p2d[0] > self.width() - T::one()
                    || p2d[1] < T::zero()
                    || p2d[1] > self.height() - T::one()
                {
                    None
                } else {
                    Some(p2d)
                }
            })
            .collect()
    }
}

/// Source pixel coordinates for every pixel of a `new_w_h` image rendered
/// with `projection_mat`. Maps are indexed `(row, col)`.
pub fn init_undistort_map(
    camera_model: &dyn CameraModel<f64>,
    projection_mat: &na::Matrix3<f64>,
    new_w_h: (u32, u32),
) -> (na::DMatrix<f32>, na::DMatrix<f32>) {
    let fx = projection_mat[(0, 0)];
    let fy = projection_mat[(1, 1)];
    let cx = projection_mat[(0, 2)];
    let cy = projection_mat[(1, 2)];
    let (w, h) = (new_w_h.0 as usize, new_w_h.1 as usize);
    let (xvec, yvec): (Vec<f32>, Vec<f32>) = (0..h)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..w).map(move |x| {
                let ray = na::Vector3::new((x as f64 - cx) / fx, (y as f64 - cy) / fy, 1.0);
                let p2d = camera_model.project_one(&ray);
                (p2d[0] as f32, p2d[1] as f32)
            })
        })
        .unzip();
    let xmap = na::DMatrix::from_row_slice(h, w, &xvec);
    let ymap = na::DMatrix::from_row_slice(h, w, &yvec);
    (xmap, ymap)
}

/// Bilinear remap with a constant black border.
///
/// Coordinates are quantised to 1/32 pixel before interpolation.
pub fn remap(
    src: &DynamicImage,
    map0: &na::DMatrix<f32>,
    map1: &na::DMatrix<f32>,
) -> Result<DynamicImage> {
    if map0.shape() != map1.shape() {
        return Err(CalibError::InvalidImage(format!(
            "remap maps differ in shape: {:?} vs {:?}",
            map0.shape(),
            map1.shape()
        )));
    }
    match src {
        DynamicImage::ImageLuma8(img) => Ok(DynamicImage::ImageLuma8(remap_buffer(img, map0, map1)?)),
        DynamicImage::ImageRgb8(img) => Ok(DynamicImage::ImageRgb8(remap_buffer(img, map0, map1)?)),
        other => Err(CalibError::InvalidImage(format!(
            "remap only supports gray8 and rgb8, got {:?}",
            other.color()
        ))),
    }
}

fn remap_buffer<P>(
    img: &ImageBuffer<P, Vec<u8>>,
    map0: &na::DMatrix<f32>,
    map1: &na::DMatrix<f32>,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    let channels = P::CHANNEL_COUNT as usize;
    let (src_w, src_h) = (img.width() as i64, img.height() as i64);
    let raw = img.as_raw();
    let (rows, cols) = map0.shape();
    let mut out = vec![0u8; rows * cols * channels];
    if cols > 0 {
        out.par_chunks_mut(cols * channels)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..cols {
                    let (mx, my) = (map0[(y, x)], map1[(y, x)]);
                    if !mx.is_finite() || !my.is_finite() {
                        continue;
                    }
                    let qx = (mx as f64 * INTER_TAB_SIZE as f64).round() as i64;
                    let qy = (my as f64 * INTER_TAB_SIZE as f64).round() as i64;
                    let x0 = qx.div_euclid(INTER_TAB_SIZE);
                    let y0 = qy.div_euclid(INTER_TAB_SIZE);
                    let fx = qx.rem_euclid(INTER_TAB_SIZE) as f32 / INTER_TAB_SIZE as f32;
                    let fy = qy.rem_euclid(INTER_TAB_SIZE) as f32 / INTER_TAB_SIZE as f32;
                    let taps = [
                        (x0, y0, (1.0 - fx) * (1.0 - fy)),
                        (x0 + 1, y0, fx * (1.0 - fy)),
                        (x0, y0 + 1, (1.0 - fx) * fy),
                        (x0 + 1, y0 + 1, fx * fy),
                    ];
                    let dst = &mut row[x * channels..(x + 1) * channels];
                    for (ch, value) in dst.iter_mut().enumerate() {
                        let mut acc = 0.0f32;
                        for &(tx, ty, weight) in &taps {
                            if weight == 0.0 || tx < 0 || ty < 0 || tx >= src_w || ty >= src_h {
                                continue;
                            }
                            let idx = (ty * src_w + tx) as usize * channels + ch;
                            acc += weight * raw[idx] as f32;
                        }
                        *value = acc.round().clamp(0.0, 255.0) as u8;
                    }
                }
            });
    }
    ImageBuffer::from_raw(cols as u32, rows as u32, out)
        .ok_or_else(|| CalibError::InvalidImage("remap output buffer size mismatch".to_string()))
}
