use serde::{Deserialize, Serialize};

use crate::error::{CalibError, Result};

pub const MIN_SQUARES: usize = 3;
pub const MAX_SQUARES: usize = 20;

/// Number of squares along each side of the printed checkerboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub rows: usize,
    pub cols: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { rows: 3, cols: 3 }
    }
}

impl BoardConfig {
    pub fn new(rows: usize, cols: usize) -> Result<BoardConfig> {
        let config = BoardConfig { rows, cols };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("rows", self.rows), ("cols", self.cols)] {
            if !(MIN_SQUARES..=MAX_SQUARES).contains(&value) {
                return Err(CalibError::InvalidBoardDimension {
                    name,
                    value,
                    min: MIN_SQUARES,
                    max: MAX_SQUARES,
                });
            }
        }
        Ok(())
    }

    /// Interior corner grid as `(w, h)`: corners per row, corners per column.
    pub fn pattern_size(&self) -> (usize, usize) {
        (self.cols - 1, self.rows - 1)
    }

    pub fn interior_corner_count(&self) -> usize {
        (self.rows - 1) * (self.cols - 1)
    }
}

/// Board points in square units on the z = 0 plane, row-major with x fastest.
#[derive(Debug, Clone)]
pub struct Board {
    pub config: BoardConfig,
    pub points_3d: Vec<glam::Vec3>,
}

impl Board {
    pub fn from_config(board_config: &BoardConfig) -> Result<Board> {
        board_config.validate()?;
        let (w, h) = board_config.pattern_size();
        let points_3d = (0..h)
            .flat_map(|j| (0..w).map(move |i| glam::Vec3::new(i as f32, j as f32, 0.0)))
            .collect();
        Ok(Board {
            config: *board_config,
            points_3d,
        })
    }

    pub fn pattern_size(&self) -> (usize, usize) {
        self.config.pattern_size()
    }
}
