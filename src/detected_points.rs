use crate::error::{CalibError, Result};

/// Refined corners of one successfully detected image.
#[derive(Debug, Clone)]
pub struct FrameFeature {
    pub img_w_h: (u32, u32),
    pub corners: Vec<glam::Vec2>,
}

/// Parallel board point / image point sets, one entry per accepted image.
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceSet {
    pub object_points: Vec<Vec<glam::Vec3>>,
    pub image_points: Vec<Vec<glam::Vec2>>,
    /// Resolution shared by every accepted image, `(width, height)`.
    pub image_w_h: Option<(u32, u32)>,
    /// Images that were listed but produced no correspondence.
    pub skipped: usize,
}

impl CorrespondenceSet {
    pub fn new() -> CorrespondenceSet {
        Self::default()
    }

    pub fn push(&mut self, board_points: &[glam::Vec3], frame: FrameFeature) -> Result<()> {
        if frame.corners.len() != board_points.len() {
            return Err(CalibError::CorrespondenceMismatch {
                view: self.len(),
                object: board_points.len(),
                image: frame.corners.len(),
            });
        }
        if let Some(expected) = self.image_w_h {
            if expected != frame.img_w_h {
                return Err(CalibError::InconsistentResolution {
                    expected,
                    found: frame.img_w_h,
                });
            }
        }
        self.image_w_h = Some(frame.img_w_h);
        self.object_points.push(board_points.to_vec());
        self.image_points.push(frame.corners);
        Ok(())
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn len(&self) -> usize {
        self.image_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_points.is_empty()
    }
}
