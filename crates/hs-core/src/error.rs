use std::path::PathBuf;

use crate::SensorFormat;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("out of bounds")]
    OutOfBounds,

    #[error("invalid stride")]
    InvalidStride,

    #[error("image has a zero dimension ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    #[error("format mismatch: {expected} vs {actual}")]
    FormatMismatch {
        expected: SensorFormat,
        actual: SensorFormat,
    },

    #[error("alignment data has already been released")]
    AlignDataReleased,

    #[error("failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },
}

impl Error {
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }
}
