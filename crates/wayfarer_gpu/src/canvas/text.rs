//! Label drawing

use wayfarer_paint::{Corner, Point, TextureId};
use wayfarer_text::{anchor_origin, GlyphQuad, TextExtents};

use crate::backend::{GraphicsBackend, Primitive};
use crate::glyphs::AtlasProvider;

use super::Canvas;

/// Font flags of a label
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextStyle {
    pub bold: bool,
    /// Draw a background-colored halo behind the glyphs
    pub outline: bool,
}

impl TextStyle {
    pub const PLAIN: TextStyle = TextStyle {
        bold: false,
        outline: false,
    };
    pub const BOLD: TextStyle = TextStyle {
        bold: true,
        outline: false,
    };
    pub const OUTLINED: TextStyle = TextStyle {
        bold: true,
        outline: true,
    };
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::BOLD
    }
}

impl<B: GraphicsBackend> Canvas<B> {
    /// Extents of bold `text` at `size` (-1 for the default size).
    pub fn text_extents(&mut self, text: &str, size: i32) -> TextExtents {
        self.formatted_text_extents(text, size, TextStyle::default())
    }

    /// Extents of `text` in `style`. All zero when the canvas is not ready.
    pub fn formatted_text_extents(&mut self, text: &str, size: i32, style: TextStyle) -> TextExtents {
        if !self.state.is_ready() {
            return TextExtents::default();
        }
        let mut provider = AtlasProvider {
            glyphs: &mut self.glyphs,
            backend: &mut self.backend,
            state: &mut self.state,
        };
        self.text.measure(&mut provider, text, size, style.bold)
    }

    pub fn draw_string(&mut self, position: Point, corner: Corner, text: &str) {
        self.draw_string_size(position, corner, -1, text);
    }

    pub fn draw_string_size(&mut self, position: Point, corner: Corner, size: i32, text: &str) {
        self.draw_formatted_string_size(position, corner, size, TextStyle::default(), text);
    }

    /// Draw `text` with `corner` of its box at `position`.
    pub fn draw_formatted_string_size(
        &mut self,
        position: Point,
        corner: Corner,
        size: i32,
        style: TextStyle,
        text: &str,
    ) {
        let extents = self.formatted_text_extents(text, size, style);
        let start = anchor_origin(corner, position, &extents);
        self.draw_formatted_string_angle(start, 0.0, size, style, text);
    }

    /// Draw bold `text` from baseline start `position`, rotated by `angle`
    /// degrees around it.
    pub fn draw_string_angle(&mut self, position: Point, angle: f32, size: i32, text: &str) {
        self.draw_formatted_string_angle(position, angle, size, TextStyle::default(), text);
    }

    pub fn draw_formatted_string_angle(
        &mut self,
        position: Point,
        angle: f32,
        size: i32,
        style: TextStyle,
        text: &str,
    ) {
        if text.is_empty() || !self.state.is_ready() {
            return;
        }

        let mut provider = AtlasProvider {
            glyphs: &mut self.glyphs,
            backend: &mut self.backend,
            state: &mut self.state,
        };
        let layout = match self
            .text
            .layout(&mut provider, text, size, style.bold, style.outline)
        {
            Ok(layout) => layout,
            Err(e) => {
                tracing::error!("cannot lay out label: {}", e);
                return;
            }
        };

        self.backend.push_matrix();
        self.backend.translate(position.x as f32, position.y as f32);
        self.backend.rotate(angle);

        if style.outline {
            self.select_background_color();
            self.draw_glyph_quads(&layout.outline);
        }

        self.reselect_pen();
        self.draw_glyph_quads(&layout.fill);

        self.backend.pop_matrix();
    }

    /// Batch quads per atlas page, drawing whenever the page changes.
    fn draw_glyph_quads(&mut self, quads: &[GlyphQuad]) {
        self.scratch.clear();
        let mut bound: Option<TextureId> = None;

        for quad in quads {
            if bound != Some(quad.texture) || self.scratch.needs_flush(quad.vertices.len()) {
                self.flush_glyphs(bound);
                bound = Some(quad.texture);
            }
            self.scratch.extend_from_slice(&quad.vertices);
        }
        self.flush_glyphs(bound);
    }

    fn flush_glyphs(&mut self, texture: Option<TextureId>) {
        let Some(texture) = texture else {
            return;
        };
        if self.scratch.is_empty() {
            return;
        }
        if self.state.bind(&mut self.backend, texture) {
            self.scratch.flush(&mut self.backend, Primitive::Triangles);
        } else {
            self.scratch.clear();
        }
    }
}
