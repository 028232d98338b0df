use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid image dimensions: {width}x{height} (must be > 0)")]
    InvalidImageSize { width: usize, height: usize },
    #[error("image data length mismatch: expected {expected_len}, got {actual_len}")]
    InvalidImageData { expected_len: usize, actual_len: usize },
    #[error("sample {value} at index {index} exceeds {max}, the maximum of the declared bit depth")]
    SampleOutOfRange { index: usize, value: u16, max: u16 },
    #[error(
        "region {height}x{width} at (row {top}, col {left}) does not fit a {image_width}x{image_height} image"
    )]
    RegionOutOfBounds {
        top: usize,
        left: usize,
        height: usize,
        width: usize,
        image_width: usize,
        image_height: usize,
    },
    #[error("invalid configuration value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl CoreError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        CoreError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
