//! Glyph data passed between the rasterizer, the atlas and layout

use wayfarer_paint::{TextureId, Vertex};

/// Cache key of a rasterized glyph
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub codepoint: char,
    /// Pixel size after the font factor is applied
    pub size: u32,
    pub bold: bool,
}

impl GlyphKey {
    pub const fn new(codepoint: char, size: u32, bold: bool) -> Self {
        Self {
            codepoint,
            size,
            bold,
        }
    }
}

/// Single channel coverage bitmap
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// `width * height` alpha values, row-major
    pub data: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Output of a [`GlyphSource`](crate::GlyphSource) for one key
#[derive(Clone, Debug)]
pub struct GlyphRaster {
    /// Horizontal advance to next glyph position
    pub advance_x: f32,
    /// Offset from pen position to the bitmap's left edge
    pub left: f32,
    /// Distance from the baseline up to the bitmap's top edge
    pub top: f32,
    /// Glyph coverage, `None` for blank glyphs such as space
    pub fill: Option<Bitmap>,
    /// Enlarged coverage used for outlined labels
    pub outline: Option<Bitmap>,
}

/// Rectangle inside an atlas texture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasRegion {
    pub texture: TextureId,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A glyph whose bitmaps live in an atlas
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    pub advance_x: f32,
    pub left: f32,
    pub top: f32,
    pub fill: Option<AtlasRegion>,
    pub outline: Option<AtlasRegion>,
}

/// Font-wide vertical metrics in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FontMetrics {
    pub ascent: i32,
    pub descent: i32,
}

/// Two triangles covering one glyph, bound to one atlas texture
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphQuad {
    pub texture: TextureId,
    pub vertices: [Vertex; 6],
}
