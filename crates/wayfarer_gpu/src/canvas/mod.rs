//! The render context
//!
//! [`Canvas`] owns the backend and every piece of state the drawing calls
//! share: pens, the color caches, the GL state machine, anti-alias
//! textures, images, glyphs and the scratch vertex buffer. Drawing calls
//! never fail. Before [`Canvas::configure`] and after
//! [`Canvas::shutdown`] they log and return without touching the backend.

mod images;
mod lines;
mod polygons;
mod text;

pub use text::TextStyle;

use wayfarer_paint::{Color, Pen, PenId, PenRegistry, Point, Rect, Vertex};
use wayfarer_text::{GlyphSource, TextLayoutEngine};

use crate::aa::AaTextures;
use crate::backend::{GraphicsBackend, Primitive};
use crate::config::CanvasConfig;
use crate::glyphs::GlyphAtlas;
use crate::image::ImageStore;
use crate::scratch::VertexBuffer;
use crate::state::{GlState, StateCache};

/// Glyphs measured during configuration so digits never stall a frame
const PRELOAD_GLYPHS: &str = "0123456789";

/// Immediate-mode map canvas over a [`GraphicsBackend`]
pub struct Canvas<B: GraphicsBackend> {
    backend: B,
    config: CanvasConfig,
    state: StateCache,
    pens: PenRegistry,
    current_pen: Option<PenId>,
    /// Last color sent to the backend, `None` when unknown
    color: Option<Color>,
    /// Last clear color sent to the backend
    erase_color: Option<Color>,
    global_alpha: f32,
    aa: AaTextures,
    aa_factor: f32,
    min_thickness: f32,
    configured: bool,
    text: TextLayoutEngine,
    glyphs: GlyphAtlas,
    images: ImageStore,
    scratch: VertexBuffer,
    screen: (u32, u32),
}

impl<B: GraphicsBackend> Canvas<B> {
    pub fn new(backend: B, config: CanvasConfig, glyph_source: Box<dyn GlyphSource>) -> Self {
        let config = config.sanitized();
        config.log();

        let text = TextLayoutEngine::new(1.0)
            .with_default_size(config.default_font_size)
            .with_max_chars(config.max_text_chars)
            .with_bidi(config.bidi);
        let glyphs = GlyphAtlas::new(glyph_source, config.glyph_cache_capacity, config.atlas_size);
        let images = ImageStore::new(
            config.atlas_size,
            config.unmanaged_capacity,
            config.max_padded_dimension,
            config.texture_deletion,
        );

        Self {
            backend,
            state: StateCache::new(config.max_texture_units),
            pens: PenRegistry::new(),
            current_pen: None,
            color: None,
            erase_color: None,
            global_alpha: 1.0,
            aa: AaTextures::default(),
            aa_factor: 0.0,
            min_thickness: config.min_thickness,
            configured: false,
            text,
            glyphs,
            images,
            scratch: VertexBuffer::new(config.scratch_vertices),
            screen: (0, 0),
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn state(&self) -> GlState {
        self.state.state()
    }

    pub fn state_cache(&self) -> &StateCache {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn glyphs(&self) -> &GlyphAtlas {
        &self.glyphs
    }

    pub fn aa_textures(&self) -> &AaTextures {
        &self.aa
    }

    pub fn min_thickness(&self) -> f32 {
        self.min_thickness
    }

    /// Screen size set by the last [`Canvas::resize`]
    pub fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    /// Cap the texture units used once configured (at most 8).
    pub fn set_max_texture_units(&mut self, units: usize) {
        self.state.set_max_texture_units(units);
    }

    /// Attach to a live context.
    ///
    /// The factors and unit table are only set on the first call; later
    /// calls (after a context loss) just mark the canvas ready again.
    pub fn configure(&mut self, aa_factor: f32, font_factor: f32, thickness_factor: f32) {
        self.state.assume(GlState::ForceGeometry);

        if self.configured {
            tracing::debug!("canvas reconfigured");
            return;
        }

        self.text.set_font_factor(font_factor);
        self.min_thickness = thickness_factor;
        self.state.configure_units(self.backend.max_texture_units());

        let extents = self.formatted_text_extents(PRELOAD_GLYPHS, -1, TextStyle::default());
        tracing::debug!("preloaded digit glyphs, width {}", extents.width);

        self.aa_factor = aa_factor;
        self.configured = true;
        tracing::info!(
            "canvas configured: aa_factor={}, font_factor={}, thickness_factor={}",
            aa_factor,
            font_factor,
            thickness_factor
        );
    }

    /// Drop every GPU handle after the context is lost.
    pub fn shutdown(&mut self) {
        self.state.shutdown();
        self.aa.reset();
        self.glyphs.shutdown();
        self.images.shutdown();
        self.color = None;
        self.erase_color = None;
        self.scratch.clear();
        tracing::info!("canvas shut down");
    }

    /// Set the screen projection to `width` x `height` pixels.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.screen = (width, height);
        if !self.state.is_ready() {
            return;
        }
        self.backend.set_projection(width, height);
    }

    // -- pens and colors --

    pub fn pens(&self) -> &PenRegistry {
        &self.pens
    }

    pub fn current_pen(&self) -> Option<PenId> {
        self.current_pen
    }

    pub fn pen(&self, id: PenId) -> Option<&Pen> {
        self.pens.get(id)
    }

    /// Intern the pen called `name` and select it.
    pub fn create_pen(&mut self, name: &str) -> PenId {
        let id = self.pens.create(name);
        self.select_pen(id);
        id
    }

    /// Make `pen` current, returning the previous pen.
    pub fn select_pen(&mut self, pen: PenId) -> Option<PenId> {
        let previous = self.current_pen.replace(pen);
        if !self.state.is_ready() {
            tracing::info!("canvas not ready, pen selection not applied");
            return previous;
        }
        self.apply_pen_color();
        previous
    }

    fn reselect_pen(&mut self) {
        if let Some(pen) = self.current_pen {
            self.select_pen(pen);
        }
    }

    fn apply_pen_color(&mut self) {
        let color = self
            .current_pen
            .and_then(|id| self.pens.get(id))
            .map(|pen| pen.stroke.scale_alpha(self.global_alpha));
        if let Some(color) = color {
            self.apply_color(color);
        }
    }

    /// Switch to the current pen's background color.
    fn select_background_color(&mut self) {
        if !self.state.is_ready() {
            tracing::info!("canvas not ready, background color not applied");
            return;
        }
        let color = self
            .current_pen
            .and_then(|id| self.pens.get(id))
            .map(|pen| pen.background.scale_alpha(self.global_alpha));
        if let Some(color) = color {
            self.apply_color(color);
        }
    }

    /// Send `color` unless it is already in effect.
    fn apply_color(&mut self, color: Color) {
        if self.color == Some(color) {
            return;
        }
        self.color = Some(color);
        self.backend.set_color(color);
    }

    fn with_current_pen(&mut self, update: impl FnOnce(&mut Pen, f32)) {
        let min_thickness = self.min_thickness;
        let Some(pen) = self.current_pen.and_then(|id| self.pens.get_mut(id)) else {
            tracing::warn!("no pen selected");
            return;
        };
        update(pen, min_thickness);
        self.reselect_pen();
    }

    /// Parse `color` into the current pen's stroke.
    pub fn set_foreground(&mut self, color: &str) {
        let color = Color::parse(color);
        self.with_current_pen(|pen, _| pen.stroke = color);
    }

    /// Parse `color` into the current pen's background.
    pub fn set_background(&mut self, color: &str) {
        let color = Color::parse(color);
        self.with_current_pen(|pen, _| pen.background = color);
    }

    pub fn set_thickness(&mut self, thickness: i32) {
        self.with_current_pen(|pen, min| pen.set_thickness(thickness as f32, min));
    }

    /// Stroke opacity of the current pen, 0-255.
    pub fn set_opacity(&mut self, opacity: i32) {
        self.with_current_pen(|pen, _| pen.set_opacity(opacity));
    }

    /// Opacity multiplied into every selected pen color, 0-255.
    pub fn set_global_opacity(&mut self, opacity: i32) {
        self.global_alpha = opacity as f32 / 255.0;
    }

    /// Line styles are not supported; every line is solid.
    pub fn set_linestyle(&mut self, style: &str) {
        tracing::debug!("line style '{}' ignored", style);
    }

    fn line_width(&self) -> f32 {
        self.current_pen
            .and_then(|id| self.pens.get(id))
            .map_or(1.0, |pen| pen.line_width)
    }

    fn set_line_width(&mut self, width: f32) {
        if let Some(pen) = self.current_pen.and_then(|id| self.pens.get_mut(id)) {
            pen.line_width = width;
        }
    }

    // -- erase and points --

    /// Clear the canvas with the current stroke color.
    pub fn erase(&mut self) {
        if !self.state.set_state(&mut self.backend, GlState::ForceGeometry) {
            return;
        }

        let stroke = self
            .current_pen
            .and_then(|id| self.pens.get(id))
            .map_or(Color::BLACK, |pen| pen.stroke);
        if self.erase_color != Some(stroke) {
            self.erase_color = Some(stroke);
            self.backend.set_clear_color(stroke);
        }
        self.backend.clear();
    }

    /// Fill `rect` with the current color, max edges inclusive.
    pub fn erase_area(&mut self, rect: Rect) {
        if !self.state.set_state(&mut self.backend, GlState::Geometry) {
            return;
        }

        let (min_x, min_y) = (rect.min_x as f32, rect.min_y as f32);
        let (max_x, max_y) = ((rect.max_x + 1) as f32, (rect.max_y + 1) as f32);
        let quad = [
            Vertex::at(min_x, min_y),
            Vertex::at(max_x, min_y),
            Vertex::at(max_x, max_y),
            Vertex::at(min_x, max_y),
        ];
        self.backend.draw_arrays(Primitive::TriangleFan, &quad);
    }

    pub fn draw_multiple_points(&mut self, points: &[Point]) {
        if !self.state.set_state(&mut self.backend, GlState::Geometry) {
            return;
        }

        for batch in points.chunks(self.config.point_batch) {
            let vertices: Vec<Vertex> = batch
                .iter()
                .map(|p| Vertex::at(p.x as f32, p.y as f32))
                .collect();
            self.backend.draw_arrays(Primitive::Points, &vertices);
        }
    }
}

/// Split `points` into consecutive objects of `counts[i]` points each.
///
/// Stops at the first object that runs past the end of `points`.
fn split_objects<'p>(points: &'p [Point], counts: &[usize]) -> Vec<&'p [Point]> {
    let mut objects = Vec::with_capacity(counts.len());
    let mut rest = points;
    for &count in counts {
        if count > rest.len() {
            tracing::warn!(
                "object of {} points overruns the {} remaining",
                count,
                rest.len()
            );
            break;
        }
        let (object, tail) = rest.split_at(count);
        objects.push(object);
        rest = tail;
    }
    objects
}
