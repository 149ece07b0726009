//! Text layout for the Wayfarer canvas
//!
//! This crate provides:
//! - Glyph keys, bitmaps and atlas placements
//! - The [`GlyphSource`] rasterizer seam and an `ab_glyph` implementation
//! - Bidirectional reordering into visual order
//! - Text measurement and glyph quad layout with corner anchoring

pub mod bidi;
pub mod font;
pub mod glyph;
pub mod layout;
pub mod source;

pub use bidi::{truncate_chars, visual_order, MAX_BIDI_CHARS};
pub use font::AbGlyphSource;
pub use glyph::{AtlasRegion, Bitmap, FontMetrics, GlyphKey, GlyphQuad, GlyphRaster, PlacedGlyph};
pub use layout::{anchor_origin, TextExtents, TextLayout, TextLayoutEngine, DEFAULT_FONT_SIZE};
pub use source::{GlyphProvider, GlyphSource};

use thiserror::Error;

/// Text rendering errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Failed to load font: {0}")]
    FontLoadError(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Text of {0} characters is too long to reorder")]
    TextTooLong(usize),
}

pub type Result<T> = std::result::Result<T, TextError>;
