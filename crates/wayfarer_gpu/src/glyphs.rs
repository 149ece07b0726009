//! Glyph cache backed by an alpha atlas

use std::num::NonZeroUsize;

use lru::LruCache;
use wayfarer_text::{AtlasRegion, Bitmap, FontMetrics, GlyphKey, GlyphProvider, GlyphSource, PlacedGlyph};

use crate::atlas::TextureAtlas;
use crate::backend::{GraphicsBackend, PixelFormat, TextureParams};
use crate::state::StateCache;

/// Rasterized glyphs placed in atlas pages, keyed by codepoint, size and
/// weight
pub struct GlyphAtlas {
    source: Box<dyn GlyphSource>,
    /// `None` entries remember codepoints the font has no glyph for
    cache: LruCache<GlyphKey, Option<PlacedGlyph>>,
    atlas: TextureAtlas,
}

impl GlyphAtlas {
    pub fn new(source: Box<dyn GlyphSource>, capacity: usize, atlas_size: u32) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            cache: LruCache::new(capacity),
            atlas: TextureAtlas::new(atlas_size, PixelFormat::Alpha, TextureParams::linear()),
        }
    }

    pub fn atlas(&self) -> &TextureAtlas {
        &self.atlas
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Look up or rasterize the glyph for `key`.
    ///
    /// Upload failures are logged and not cached so the glyph is retried on
    /// the next frame.
    pub fn glyph<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        state: &mut StateCache,
        key: GlyphKey,
    ) -> Option<PlacedGlyph> {
        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        self.make_room();

        let Some(raster) = self.source.rasterize(key) else {
            self.cache.put(key, None);
            return None;
        };

        let fill = match self.place(backend, state, raster.fill.as_ref()) {
            Ok(region) => region,
            Err(e) => {
                tracing::error!("cannot place glyph U+{:04X}: {}", key.codepoint as u32, e);
                return None;
            }
        };
        let outline = match self.place(backend, state, raster.outline.as_ref()) {
            Ok(region) => region,
            Err(e) => {
                tracing::error!(
                    "cannot place outline of glyph U+{:04X}: {}",
                    key.codepoint as u32,
                    e
                );
                return None;
            }
        };

        let placed = PlacedGlyph {
            advance_x: raster.advance_x,
            left: raster.left,
            top: raster.top,
            fill,
            outline,
        };
        self.cache.put(key, Some(placed));
        Some(placed)
    }

    /// Evict the least recently used glyph when the cache is full and give
    /// its atlas space back.
    fn make_room(&mut self) {
        if self.cache.len() < self.cache.cap().get() {
            return;
        }
        let Some((evicted, placed)) = self.cache.pop_lru() else {
            return;
        };
        if let Some(placed) = placed {
            for region in [placed.fill, placed.outline].into_iter().flatten() {
                self.atlas.release(region);
            }
        }
        tracing::trace!("glyph U+{:04X} evicted", evicted.codepoint as u32);
    }

    fn place<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        state: &mut StateCache,
        bitmap: Option<&Bitmap>,
    ) -> crate::Result<Option<AtlasRegion>> {
        match bitmap {
            Some(bitmap) if !bitmap.is_empty() => self
                .atlas
                .insert(backend, state, bitmap.width, bitmap.height, &bitmap.data)
                .map(Some),
            _ => Ok(None),
        }
    }

    pub fn font_metrics(&mut self, size: u32, bold: bool) -> FontMetrics {
        self.source.font_metrics(size, bold)
    }

    pub fn actual_size(&self, size: u32) -> f32 {
        self.source.actual_size(size)
    }

    /// Forget every glyph and page after context loss.
    pub fn shutdown(&mut self) {
        self.cache.clear();
        self.atlas.clean();
    }
}

/// [`GlyphProvider`] view of a [`GlyphAtlas`] bound to a backend for the
/// duration of one layout
pub struct AtlasProvider<'a, B: GraphicsBackend + ?Sized> {
    pub glyphs: &'a mut GlyphAtlas,
    pub backend: &'a mut B,
    pub state: &'a mut StateCache,
}

impl<B: GraphicsBackend + ?Sized> GlyphProvider for AtlasProvider<'_, B> {
    fn glyph(&mut self, key: GlyphKey) -> Option<PlacedGlyph> {
        self.glyphs.glyph(self.backend, self.state, key)
    }

    fn font_metrics(&mut self, size: u32, bold: bool) -> FontMetrics {
        self.glyphs.font_metrics(size, bold)
    }

    fn actual_size(&self, size: u32) -> f32 {
        self.glyphs.actual_size(size)
    }

    fn atlas_size(&self) -> u32 {
        self.glyphs.atlas.size()
    }
}
