//! Image decoding and power-of-two padding

use crate::error::{ImageError, Result};
use crate::source::{ImageFormat, ImageSource};

/// Smallest power of two that is at least `value` (1 for 0).
pub fn next_pot(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}

/// Decoded, tightly packed RGBA image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageData {
    /// Wrap an RGBA buffer, checking it matches the dimensions.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = rgba_len(width, height);
        if expected != Some(pixels.len()) {
            return Err(ImageError::BufferSize {
                width,
                height,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Fully transparent image
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Load and decode an image
    pub fn load(source: &ImageSource) -> Result<Self> {
        match source {
            ImageSource::File(path) => {
                if ImageFormat::from_path(path) == ImageFormat::Bmp {
                    tracing::error!("cannot load bmp image {}", path.display());
                    return Err(ImageError::UnsupportedFormat("bmp"));
                }
                let bytes = std::fs::read(path).map_err(|source| ImageError::Io {
                    path: path.clone(),
                    source,
                })?;
                let data = Self::decode_png(&bytes)?;
                tracing::info!(
                    "loaded image {} ({}x{})",
                    path.display(),
                    data.width,
                    data.height
                );
                Ok(data)
            }
            ImageSource::Bytes(bytes) => Self::decode_png(bytes),
        }
    }

    /// Decode PNG bytes into RGBA
    pub fn decode_png(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy into a buffer padded to power-of-two dimensions.
    ///
    /// Padding texels are zeroed. Fails when either padded side exceeds
    /// `max_dimension`.
    pub fn pad_to_pot(&self, max_dimension: u32) -> Result<PaddedImage> {
        let pot_width = next_pot(self.width);
        let pot_height = next_pot(self.height);

        if pot_width > max_dimension || pot_height > max_dimension {
            tracing::error!(
                "padding {}x{} to {}x{} exceeds {}",
                self.width,
                self.height,
                pot_width,
                pot_height,
                max_dimension
            );
            return Err(ImageError::TooLarge {
                width: pot_width,
                height: pot_height,
                max: max_dimension,
            });
        }

        let src_row = self.width as usize * 4;
        let dst_row = pot_width as usize * 4;
        let mut pixels = vec![0u8; dst_row * pot_height as usize];

        for (dst, src) in pixels
            .chunks_exact_mut(dst_row)
            .zip(self.pixels.chunks_exact(src_row))
        {
            dst[..src_row].copy_from_slice(src);
        }

        Ok(PaddedImage {
            width: self.width,
            height: self.height,
            pot_width,
            pot_height,
            pixels,
        })
    }
}

/// RGBA image stored in a power-of-two buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedImage {
    width: u32,
    height: u32,
    pot_width: u32,
    pot_height: u32,
    pixels: Vec<u8>,
}

impl PaddedImage {
    /// Visible image width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Visible image height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Buffer dimensions
    pub fn pot_dimensions(&self) -> (u32, u32) {
        (self.pot_width, self.pot_height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy the visible region back into a tight buffer.
    pub fn unpad(&self) -> ImageData {
        let src_row = self.pot_width as usize * 4;
        let dst_row = self.width as usize * 4;
        let mut pixels = Vec::with_capacity(dst_row * self.height as usize);

        for row in self.pixels.chunks_exact(src_row).take(self.height as usize) {
            pixels.extend_from_slice(&row[..dst_row]);
        }

        ImageData {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
}
