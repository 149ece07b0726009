//! Image source types

use std::path::{Path, PathBuf};

/// Source of an image
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Load from a file path
    File(PathBuf),

    /// Encoded bytes (PNG)
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Create a file source
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Create a bytes source
    pub fn bytes(data: Vec<u8>) -> Self {
        Self::Bytes(data)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

/// Image format hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Bmp,
}

impl ImageFormat {
    /// Detect format from file extension. Anything that is not BMP is read as PNG.
    pub fn from_extension(ext: &str) -> Self {
        if ext.eq_ignore_ascii_case("bmp") {
            Self::Bmp
        } else {
            Self::Png
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Png)
    }
}
