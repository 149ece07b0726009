//! Seams between layout, rasterization and the glyph atlas

use crate::glyph::{FontMetrics, GlyphKey, GlyphRaster, PlacedGlyph};

/// Rasterizes glyphs on demand.
///
/// Implementations own the font data; the canvas packs the resulting bitmaps
/// into its atlas.
pub trait GlyphSource {
    /// Rasterize the fill (and outline) bitmaps for `key`.
    ///
    /// Returns `None` when the font has no glyph for the codepoint.
    fn rasterize(&mut self, key: GlyphKey) -> Option<GlyphRaster>;

    /// Ascent and descent at `size` pixels
    fn font_metrics(&mut self, size: u32, bold: bool) -> FontMetrics;

    /// Size the source actually rasterizes at when asked for `size`.
    ///
    /// Layout scales advances by `size / actual_size(size)`.
    fn actual_size(&self, size: u32) -> f32 {
        size as f32
    }
}

/// Glyphs already placed in an atlas, as seen by the layout engine
pub trait GlyphProvider {
    fn glyph(&mut self, key: GlyphKey) -> Option<PlacedGlyph>;

    fn font_metrics(&mut self, size: u32, bold: bool) -> FontMetrics;

    fn actual_size(&self, size: u32) -> f32;

    /// Side length of the atlas textures, used to normalize texcoords
    fn atlas_size(&self) -> u32;
}
