//! `ab_glyph` backed glyph rasterizer

use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};

use crate::glyph::{Bitmap, FontMetrics, GlyphKey, GlyphRaster};
use crate::source::GlyphSource;
use crate::{Result, TextError};

/// Rasterizes glyphs from one TrueType/OpenType face.
///
/// Bold is synthesized by widening strokes one pixel; outlines are the fill
/// dilated by one pixel on every side.
pub struct AbGlyphSource {
    font: FontVec,
}

impl AbGlyphSource {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let font =
            FontVec::try_from_vec(data).map_err(|e| TextError::FontParseError(e.to_string()))?;
        Ok(Self { font })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| TextError::FontLoadError(format!("{}: {}", path.display(), e)))?;
        tracing::info!("loaded font {}", path.display());
        Self::from_bytes(data)
    }
}

impl GlyphSource for AbGlyphSource {
    fn rasterize(&mut self, key: GlyphKey) -> Option<GlyphRaster> {
        let scale = PxScale::from(key.size as f32);
        let scaled = self.font.as_scaled(scale);
        let glyph_id = scaled.glyph_id(key.codepoint);

        if glyph_id.0 == 0 && key.codepoint != ' ' {
            tracing::debug!("font has no glyph for U+{:04X}", key.codepoint as u32);
            return None;
        }

        let mut raster = GlyphRaster {
            advance_x: scaled.h_advance(glyph_id),
            left: 0.0,
            top: 0.0,
            fill: None,
            outline: None,
        };

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(0.0, 0.0));
        let Some(outlined) = scaled.outline_glyph(glyph) else {
            return Some(raster);
        };

        let bounds = outlined.px_bounds();
        let width = bounds.width().ceil() as u32;
        let height = bounds.height().ceil() as u32;
        if width == 0 || height == 0 {
            return Some(raster);
        }

        let mut data = vec![0u8; (width * height) as usize];
        outlined.draw(|x, y, coverage| {
            if x < width && y < height {
                data[(y * width + x) as usize] = (coverage.clamp(0.0, 1.0) * 255.0) as u8;
            }
        });

        let mut fill = Bitmap::new(width, height, data);
        if key.bold {
            fill = embolden(&fill);
            raster.advance_x += 1.0;
        }

        raster.left = bounds.min.x;
        raster.top = -bounds.min.y;
        raster.outline = Some(dilate(&fill));
        raster.fill = Some(fill);

        Some(raster)
    }

    fn font_metrics(&mut self, size: u32, _bold: bool) -> FontMetrics {
        let scaled = self.font.as_scaled(PxScale::from(size as f32));
        FontMetrics {
            ascent: scaled.ascent().round() as i32,
            descent: (-scaled.descent()).round() as i32,
        }
    }
}

/// Widen every stroke one pixel to the right.
fn embolden(src: &Bitmap) -> Bitmap {
    let width = src.width + 1;
    let mut data = vec![0u8; (width * src.height) as usize];
    for y in 0..src.height {
        for x in 0..width {
            let here = if x < src.width {
                src.data[(y * src.width + x) as usize]
            } else {
                0
            };
            let left = if x > 0 {
                src.data[(y * src.width + x - 1) as usize]
            } else {
                0
            };
            data[(y * width + x) as usize] = here.max(left);
        }
    }
    Bitmap::new(width, src.height, data)
}

/// Grow coverage by one pixel in every direction.
fn dilate(src: &Bitmap) -> Bitmap {
    let width = src.width + 2;
    let height = src.height + 2;
    let mut data = vec![0u8; (width * height) as usize];

    for y in 0..src.height {
        for x in 0..src.width {
            let value = src.data[(y * src.width + x) as usize];
            if value == 0 {
                continue;
            }
            // (x + 1, y + 1) in the destination is the source pixel itself
            for dy in 0..3 {
                for dx in 0..3 {
                    let index = ((y + dy) * width + x + dx) as usize;
                    data[index] = data[index].max(value);
                }
            }
        }
    }

    Bitmap::new(width, height, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embolden_widens_by_one() {
        let src = Bitmap::new(2, 1, vec![255, 0]);
        let bold = embolden(&src);
        assert_eq!(bold.width, 3);
        assert_eq!(bold.data, vec![255, 255, 0]);
    }

    #[test]
    fn test_dilate_grows_each_side() {
        let src = Bitmap::new(1, 1, vec![200]);
        let grown = dilate(&src);
        assert_eq!((grown.width, grown.height), (3, 3));
        assert!(grown.data.iter().all(|&v| v == 200));
    }

    #[test]
    fn test_dilate_keeps_empty_pixels_far_away() {
        let src = Bitmap::new(4, 1, vec![255, 0, 0, 0]);
        let grown = dilate(&src);
        assert_eq!(grown.width, 6);
        // row 1 is the source row
        assert_eq!(&grown.data[6..12], &[255, 255, 255, 0, 0, 0]);
    }

    #[test]
    fn test_garbage_font_is_parse_error() {
        let result = AbGlyphSource::from_bytes(vec![0, 1, 2, 3]);
        assert!(matches!(result, Err(TextError::FontParseError(_))));
    }

    #[test]
    fn test_missing_font_file_is_load_error() {
        let result = AbGlyphSource::from_file("/no/such/font.ttf");
        assert!(matches!(result, Err(TextError::FontLoadError(_))));
    }
}
