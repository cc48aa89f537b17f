use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::{CalibError, Result};

/// Single `height x width x channels` image with samples in `[0, 1]`.
///
/// Samples are interleaved, row-major. Three-channel data is RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl NormalizedImage {
    pub fn new(height: usize, width: usize, channels: usize, data: Vec<f32>) -> Result<NormalizedImage> {
        let image = NormalizedImage {
            height,
            width,
            channels,
            data,
        };
        image.validate()?;
        Ok(image)
    }

    /// Accepts a `[batch, height, width, channels]` tensor holding exactly one image.
    pub fn from_batch(shape: [usize; 4], data: Vec<f32>) -> Result<NormalizedImage> {
        let [batch, height, width, channels] = shape;
        if batch != 1 {
            return Err(CalibError::InvalidImage(format!(
                "expected a batch of one image, got {}",
                batch
            )));
        }
        NormalizedImage::new(height, width, channels, data)
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.channels, 1 | 3) {
            return Err(CalibError::InvalidImage(format!(
                "expected 1 or 3 channels, got {}",
                self.channels
            )));
        }
        if self.height == 0 || self.width == 0 {
            return Err(CalibError::InvalidImage("empty image".to_string()));
        }
        let expected = self.height * self.width * self.channels;
        if self.data.len() != expected {
            return Err(CalibError::InvalidImage(format!(
                "expected {} samples, got {}",
                expected,
                self.data.len()
            )));
        }
        Ok(())
    }

    pub fn shape(&self) -> [usize; 4] {
        [1, self.height, self.width, self.channels]
    }

    pub fn to_dynamic_image(&self) -> Result<DynamicImage> {
        self.validate()?;
        let bytes: Vec<u8> = self.data.iter().map(|&v| to_u8(v)).collect();
        let (w, h) = (self.width as u32, self.height as u32);
        let img = match self.channels {
            1 => GrayImage::from_raw(w, h, bytes).map(DynamicImage::ImageLuma8),
            _ => RgbImage::from_raw(w, h, bytes).map(DynamicImage::ImageRgb8),
        };
        img.ok_or_else(|| CalibError::InvalidImage("buffer size mismatch".to_string()))
    }

    pub fn from_dynamic_image(img: &DynamicImage) -> Result<NormalizedImage> {
        let (channels, bytes) = match img {
            DynamicImage::ImageLuma8(gray) => (1, gray.as_raw().clone()),
            DynamicImage::ImageRgb8(rgb) => (3, rgb.as_raw().clone()),
            other => {
                return Err(CalibError::InvalidImage(format!(
                    "unsupported pixel format {:?}",
                    other.color()
                )));
            }
        };
        NormalizedImage::new(
            img.height() as usize,
            img.width() as usize,
            channels,
            bytes.iter().map(|&b| b as f32 / 255.0).collect(),
        )
    }
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
