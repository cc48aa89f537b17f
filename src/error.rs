use thiserror::Error;

/// Errors returned by the calibration pipeline.
#[derive(Error, Debug)]
pub enum CalibError {
    #[error("board dimension {name}={value} out of range [{min}, {max}]")]
    InvalidBoardDimension {
        name: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("no checkerboard detected in any image")]
    NoDetections,
    #[error("view {view}: {object} board points but {image} image points")]
    CorrespondenceMismatch {
        view: usize,
        object: usize,
        image: usize,
    },
    #[error("{object} object point sets but {image} image point sets")]
    ViewCountMismatch { object: usize, image: usize },
    #[error("image resolution {found:?} differs from {expected:?}")]
    InconsistentResolution {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("degenerate input: {0}")]
    Degenerate(String),
    #[error("calibration solver failed: {0}")]
    SolverFailed(String),
    #[error("invalid camera matrix: {0}")]
    InvalidCameraMatrix(String),
    #[error("distortion vector must have 4, 5 or 8 coefficients, got {0}")]
    InvalidDistortion(usize),
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, CalibError>;
