//! Wayfarer Image
//!
//! CPU side image handling for the canvas.
//!
//! # Features
//!
//! - Decode PNG files and byte buffers into tightly packed RGBA
//! - Pad images to power-of-two dimensions with zeroed borders
//! - Strip padding back off for read-back
//!
//! BMP files are recognised but never decoded.
//!
//! # Example
//!
//! ```ignore
//! use wayfarer_image::{ImageData, ImageSource};
//!
//! let data = ImageData::load(&ImageSource::file("icons/fuel.png"))?;
//! let padded = data.pad_to_pot(1024)?;
//! ```

mod error;
mod loader;
mod source;

pub use error::{ImageError, Result};
pub use loader::{next_pot, ImageData, PaddedImage};
pub use source::{ImageFormat, ImageSource};
