//! Image error types

use std::path::PathBuf;
use thiserror::Error;

/// Image loading errors
#[derive(Error, Debug)]
pub enum ImageError {
    /// File could not be read
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bytes were not a decodable image
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Format is recognised but has no decoder at this layer
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(&'static str),

    /// Pixel buffer length does not match the dimensions
    #[error("pixel buffer of {actual} bytes does not hold a {width}x{height} RGBA image")]
    BufferSize {
        width: u32,
        height: u32,
        actual: usize,
    },

    /// Padded dimensions exceed the allowed bound
    #[error("padded image {width}x{height} exceeds the {max} pixel limit")]
    TooLarge { width: u32, height: u32, max: u32 },
}

pub type Result<T> = std::result::Result<T, ImageError>;
