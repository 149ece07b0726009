//! Canvas error types

use thiserror::Error;

/// Failures of canvas resource operations
///
/// Drawing calls never fail; they log and skip. Errors are reserved for
/// resource management where the caller has to react.
#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("canvas is not ready")]
    NotReady,

    #[error("unmanaged image list is full ({capacity} entries)")]
    UnmanagedListFull { capacity: usize },

    #[error("image atlas has no room for a {width}x{height} image")]
    AtlasFull { width: u32, height: u32 },

    #[error("image has no pixel data to upload")]
    MissingPixels,

    #[error("image restore failed: {0}")]
    RestoreFailed(String),

    #[error("framebuffer is incomplete")]
    IncompleteFramebuffer,

    #[error("unknown image handle")]
    UnknownImage,

    #[error(transparent)]
    Image(#[from] wayfarer_image::ImageError),

    #[error(transparent)]
    Text(#[from] wayfarer_text::TextError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CanvasError>;
