use image::{DynamicImage, Rgb, RgbImage};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::detected_points::FrameFeature;

pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

fn draw_cross(canvas: &mut RgbImage, x: f32, y: f32, radius: i32, color: Rgb<u8>) {
    let (cx, cy) = (x.round() as i32, y.round() as i32);
    for d in -radius..=radius {
        for (px, py) in [(cx + d, cy), (cx, cy + d)] {
            if px >= 0 && py >= 0 && (px as u32) < canvas.width() && (py as u32) < canvas.height() {
                canvas.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Corners drawn as crosses, coloured by their index in detection order.
pub fn draw_corners(img: &DynamicImage, frame: &FrameFeature) -> RgbImage {
    let mut canvas = img.to_rgb8();
    for (id, p) in frame.corners.iter().enumerate() {
        let (r, g, b, _) = id_to_color(id);
        draw_cross(&mut canvas, p.x, p.y, 4, Rgb([r, g, b]));
    }
    canvas
}
