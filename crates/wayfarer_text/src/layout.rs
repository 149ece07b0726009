//! Text measurement and glyph quad layout
//!
//! Layout works in label-local coordinates: the pen starts at (0, 0) on the
//! baseline and advances to the right. The canvas translates and rotates the
//! result into place.

use wayfarer_paint::{Corner, Point, Vertex};

use crate::bidi::{truncate_chars, visual_order};
use crate::glyph::{AtlasRegion, GlyphKey, GlyphQuad, PlacedGlyph};
use crate::source::GlyphProvider;
use crate::Result;

/// Size used when a caller passes a non-positive size
pub const DEFAULT_FONT_SIZE: i32 = 14;

/// Measured label dimensions in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextExtents {
    pub width: i32,
    pub ascent: i32,
    pub descent: i32,
    /// Whether the label may be drawn rotated
    pub can_tilt: bool,
}

impl TextExtents {
    pub fn height(&self) -> i32 {
        self.ascent + self.descent
    }
}

/// Glyph quads of one label, grouped by pass
#[derive(Clone, Debug, Default)]
pub struct TextLayout {
    /// Background-colored outline quads, drawn first
    pub outline: Vec<GlyphQuad>,
    /// Foreground glyph quads
    pub fill: Vec<GlyphQuad>,
    /// Pen position after the last glyph
    pub advance: f32,
}

/// Converts strings into measured extents and glyph quads
#[derive(Clone, Debug)]
pub struct TextLayoutEngine {
    font_factor: f32,
    default_size: i32,
    max_chars: usize,
    bidi: bool,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self {
            font_factor: 1.0,
            default_size: DEFAULT_FONT_SIZE,
            max_chars: 255,
            bidi: true,
        }
    }
}

impl TextLayoutEngine {
    pub fn new(font_factor: f32) -> Self {
        Self {
            font_factor,
            ..Self::default()
        }
    }

    pub fn with_default_size(mut self, size: i32) -> Self {
        self.default_size = size;
        self
    }

    /// Longest label handled; longer input is cut.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_bidi(mut self, bidi: bool) -> Self {
        self.bidi = bidi;
        self
    }

    pub fn font_factor(&self) -> f32 {
        self.font_factor
    }

    pub fn set_font_factor(&mut self, font_factor: f32) {
        self.font_factor = font_factor;
    }

    /// Pixel size for a requested size, applying the default and font factor.
    pub fn pixel_size(&self, size: i32) -> u32 {
        let size = if size <= 0 { self.default_size } else { size };
        (size as f32 * self.font_factor).floor().max(0.0) as u32
    }

    fn scale_factor(provider: &dyn GlyphProvider, size: u32) -> f32 {
        let actual = provider.actual_size(size);
        if actual > 0.0 {
            size as f32 / actual
        } else {
            1.0
        }
    }

    /// Measure `text` without drawing it.
    pub fn measure(
        &self,
        provider: &mut dyn GlyphProvider,
        text: &str,
        size: i32,
        bold: bool,
    ) -> TextExtents {
        let mut extents = TextExtents {
            can_tilt: true,
            ..TextExtents::default()
        };

        let text = truncate_chars(text, self.max_chars);
        if text.is_empty() {
            return extents;
        }

        let size = self.pixel_size(size);
        let s_factor = Self::scale_factor(provider, size);
        let metrics = provider.font_metrics(size, bold);
        extents.ascent = metrics.ascent;
        extents.descent = metrics.descent;

        let advance: f32 = text
            .chars()
            .filter_map(|c| provider.glyph(GlyphKey::new(c, size, bold)))
            .map(|glyph| glyph.advance_x * s_factor)
            .sum();
        extents.width = advance.ceil() as i32;

        extents
    }

    /// Lay out `text` into glyph quads.
    ///
    /// With `outline`, an enlarged quad from each glyph's outline image is
    /// produced for the background pass.
    pub fn layout(
        &self,
        provider: &mut dyn GlyphProvider,
        text: &str,
        size: i32,
        bold: bool,
        outline: bool,
    ) -> Result<TextLayout> {
        let mut layout = TextLayout::default();

        let text = truncate_chars(text, self.max_chars);
        if text.is_empty() {
            return Ok(layout);
        }

        let visual = if self.bidi {
            visual_order(text)?
        } else {
            text.to_owned()
        };

        let size = self.pixel_size(size);
        let s_factor = Self::scale_factor(provider, size);
        let atlas_size = provider.atlas_size().max(1) as f32;

        let glyphs: Vec<(char, Option<PlacedGlyph>)> = visual
            .chars()
            .map(|c| (c, provider.glyph(GlyphKey::new(c, size, bold))))
            .collect();

        if outline {
            let mut x = 0.0;
            for (c, glyph) in &glyphs {
                let Some(glyph) = glyph else {
                    log_missing(*c);
                    continue;
                };
                match (glyph.fill, glyph.outline) {
                    (Some(fill), Some(edge)) => {
                        let dx = (edge.width as f32 - fill.width as f32) * s_factor * 0.5;
                        let dy = (edge.height as f32 - fill.height as f32) * s_factor * 0.5;
                        let translate_x = glyph.left * s_factor - dx;
                        let translate_y = -glyph.top * s_factor - dy;
                        layout.outline.push(glyph_quad(
                            x + translate_x,
                            translate_y,
                            &edge,
                            s_factor,
                            atlas_size,
                        ));
                    }
                    (None, _) => log_missing(*c),
                    (Some(_), None) => {}
                }
                x += glyph.advance_x * s_factor;
            }
        }

        let mut x = 0.0;
        for (c, glyph) in &glyphs {
            let Some(glyph) = glyph else {
                log_missing(*c);
                continue;
            };
            match glyph.fill {
                Some(fill) => {
                    let translate_x = glyph.left * s_factor;
                    let translate_y = -glyph.top * s_factor;
                    layout.fill.push(glyph_quad(
                        x + translate_x,
                        translate_y,
                        &fill,
                        s_factor,
                        atlas_size,
                    ));
                }
                None => log_missing(*c),
            }
            x += glyph.advance_x * s_factor;
        }
        layout.advance = x;

        Ok(layout)
    }
}

fn log_missing(c: char) {
    if c != ' ' {
        tracing::debug!("no glyph image for character U+{:04X}", c as u32);
    }
}

/// Quad for `region` with its top-left at (`x`, `y`).
///
/// Positions grow by half a pixel on each side and texcoords are pushed out
/// by half a texel to match.
fn glyph_quad(x: f32, y: f32, region: &AtlasRegion, s_factor: f32, atlas_size: f32) -> GlyphQuad {
    let shift = -1.0 / (2.0 * atlas_size);

    let width = region.width as f32 * s_factor;
    let height = region.height as f32 * s_factor;

    let u0 = region.x as f32 / atlas_size;
    let v0 = region.y as f32 / atlas_size;
    let u1 = u0 + region.width as f32 / atlas_size;
    let v1 = v0 + region.height as f32 / atlas_size;

    let left = x - 0.5;
    let right = x + width + 0.5;
    let top = y - 0.5;
    let bottom = y + height + 0.5;

    let top_left = Vertex::new(left, top, u0 + shift, v0 + shift);
    let top_right = Vertex::new(right, top, u1 - shift, v0 + shift);
    let bottom_left = Vertex::new(left, bottom, u0 + shift, v1 - shift);
    let bottom_right = Vertex::new(right, bottom, u1 - shift, v1 - shift);

    GlyphQuad {
        texture: region.texture,
        vertices: [
            top_left,
            top_right,
            bottom_left,
            top_right,
            bottom_left,
            bottom_right,
        ],
    }
}

/// Baseline start of a label anchored at `position` by `corner`.
pub fn anchor_origin(corner: Corner, position: Point, extents: &TextExtents) -> Point {
    let width = extents.width;
    let height = extents.height();
    let center_y = position.y - extents.ascent / 2 - extents.descent;

    let (x, y) = match corner {
        Corner::TopLeft => (position.x, position.y),
        Corner::TopRight => (position.x - width, position.y),
        Corner::BottomRight => (position.x - width, position.y - height),
        Corner::BottomLeft => (position.x, position.y - height),
        Corner::TopMiddle => (position.x - width / 2, position.y),
        Corner::BottomMiddle => (position.x - width / 2, position.y - height),
        Corner::CenterMiddle => (position.x - width / 2, center_y),
        Corner::CenterRight => (position.x - width, center_y),
        Corner::CenterLeft => (position.x, center_y),
    };

    Point::new(x, y + height)
}
