//! Shelf-packed texture atlas
//!
//! Small images and glyph bitmaps share large textures. Each page is packed
//! with horizontal shelves; a new page is created when none has room.

use wayfarer_paint::TextureId;
use wayfarer_text::AtlasRegion;

use crate::backend::{GraphicsBackend, PixelFormat, TextureParams};
use crate::error::{CanvasError, Result};
use crate::state::StateCache;

#[derive(Clone, Copy, Debug)]
struct Shelf {
    y: u32,
    height: u32,
    x: u32,
}

/// Shelf allocator for one square page
#[derive(Clone, Debug)]
pub struct ShelfPacker {
    width: u32,
    height: u32,
    shelves: Vec<Shelf>,
    next_y: u32,
}

impl ShelfPacker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            shelves: Vec::new(),
            next_y: 0,
        }
    }

    /// Reserve a `w` x `h` rectangle, returning its top-left corner.
    pub fn pack(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w > self.width || h > self.height {
            return None;
        }

        for shelf in &mut self.shelves {
            if h <= shelf.height && shelf.x + w <= self.width {
                let pos = (shelf.x, shelf.y);
                shelf.x += w;
                return Some(pos);
            }
        }

        if self.next_y + h <= self.height {
            let y = self.next_y;
            self.shelves.push(Shelf { y, height: h, x: w });
            self.next_y += h;
            return Some((0, y));
        }

        None
    }

    pub fn clear(&mut self) {
        self.shelves.clear();
        self.next_y = 0;
    }
}

#[derive(Clone, Debug)]
struct AtlasPage {
    texture: TextureId,
    packer: ShelfPacker,
}

/// Growable set of atlas pages of one pixel format
#[derive(Clone, Debug)]
pub struct TextureAtlas {
    size: u32,
    format: PixelFormat,
    params: TextureParams,
    pages: Vec<AtlasPage>,
    /// Released regions, reused before packing new space
    free: Vec<AtlasRegion>,
}

impl TextureAtlas {
    pub fn new(size: u32, format: PixelFormat, params: TextureParams) -> Self {
        Self {
            size: size.max(1),
            format,
            params,
            pages: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Side length of every page
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Regions waiting to be reused
    pub fn free_regions(&self) -> usize {
        self.free.len()
    }

    /// Hand `region` back for reuse by a later [`TextureAtlas::insert`].
    pub fn release(&mut self, region: AtlasRegion) {
        if self.owns(region.texture) {
            self.free.push(region);
        }
    }

    /// Smallest released region that holds `width` x `height`
    fn take_free(&mut self, width: u32, height: u32) -> Option<(TextureId, (u32, u32))> {
        let index = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, r)| r.width >= width && r.height >= height)
            .min_by_key(|(_, r)| r.width * r.height)
            .map(|(i, _)| i)?;
        let region = self.free.swap_remove(index);
        Some((region.texture, (region.x, region.y)))
    }

    /// Whether a `width` x `height` item can ever be placed
    pub fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.size && height <= self.size
    }

    /// Whether `texture` is one of this atlas' pages
    pub fn owns(&self, texture: TextureId) -> bool {
        self.pages.iter().any(|page| page.texture == texture)
    }

    /// Pack and upload `data`, creating a page when the existing ones are
    /// full.
    pub fn insert<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        state: &mut StateCache,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<AtlasRegion> {
        if !self.fits(width, height) {
            return Err(CanvasError::AtlasFull { width, height });
        }
        if !state.is_ready() {
            return Err(CanvasError::NotReady);
        }

        let placed = self.take_free(width, height).or_else(|| {
            self.pages
                .iter_mut()
                .find_map(|page| page.packer.pack(width, height).map(|pos| (page.texture, pos)))
        });

        let (texture, (x, y)) = match placed {
            Some(placed) => placed,
            None => {
                let page = self.new_page(backend, state);
                let pos = page
                    .packer
                    .pack(width, height)
                    .ok_or(CanvasError::AtlasFull { width, height })?;
                (page.texture, pos)
            }
        };

        state.bind(backend, texture);
        backend.tex_sub_image(x, y, width, height, self.format, data);

        Ok(AtlasRegion {
            texture,
            x,
            y,
            width,
            height,
        })
    }

    fn new_page<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        state: &mut StateCache,
    ) -> &mut AtlasPage {
        let texture = backend.gen_texture();
        state.bind(backend, texture);
        backend.set_texture_params(self.params);

        let len = (self.size * self.size) as usize * self.format.bytes_per_pixel();
        backend.tex_image(0, self.size, self.size, self.format, &vec![0u8; len]);

        tracing::debug!(
            "atlas page {} created ({:?}, {}x{})",
            self.pages.len(),
            self.format,
            self.size,
            self.size
        );

        let index = self.pages.len();
        self.pages.push(AtlasPage {
            texture,
            packer: ShelfPacker::new(self.size, self.size),
        });
        &mut self.pages[index]
    }

    /// Drop every page. The textures are assumed gone with the context.
    pub fn clean(&mut self) {
        self.pages.clear();
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Filter, Wrap};
    use crate::recording::{GlCommand, RecordingBackend};
    use crate::state::GlState;

    fn ready_state() -> StateCache {
        let mut state = StateCache::default();
        state.configure_units(8);
        state.assume(GlState::ForceGeometry);
        state
    }

    #[test]
    fn test_shelf_packing() {
        let mut packer = ShelfPacker::new(16, 16);
        assert_eq!(packer.pack(8, 4), Some((0, 0)));
        assert_eq!(packer.pack(8, 4), Some((8, 0)));
        assert_eq!(packer.pack(8, 4), Some((0, 4)));
        assert_eq!(packer.pack(4, 8), Some((0, 8)));
        assert_eq!(packer.pack(16, 16), None);
        assert_eq!(packer.pack(17, 1), None);

        packer.clear();
        assert_eq!(packer.pack(16, 16), Some((0, 0)));
    }

    #[test]
    fn test_insert_grows_pages() {
        let mut backend = RecordingBackend::default();
        let mut state = ready_state();
        let params = TextureParams::new(Wrap::ClampToEdge, Filter::Linear, Filter::Nearest);
        let mut atlas = TextureAtlas::new(8, PixelFormat::Rgba, params);

        let data = vec![255u8; 8 * 8 * 4];
        let first = atlas.insert(&mut backend, &mut state, 8, 8, &data).unwrap();
        let second = atlas.insert(&mut backend, &mut state, 8, 8, &data).unwrap();

        assert_ne!(first.texture, second.texture);
        assert_eq!(atlas.page_count(), 2);
        assert!(atlas.owns(first.texture));
        assert_eq!(
            backend.count(|c| matches!(c, GlCommand::TexSubImage { .. })),
            2
        );
    }

    #[test]
    fn test_released_region_is_reused() {
        let mut backend = RecordingBackend::default();
        let mut state = ready_state();
        let mut atlas = TextureAtlas::new(8, PixelFormat::Alpha, TextureParams::linear());

        let big = atlas.insert(&mut backend, &mut state, 8, 6, &[0; 48]).unwrap();
        let small = atlas.insert(&mut backend, &mut state, 4, 2, &[0; 8]).unwrap();
        atlas.release(big);
        atlas.release(small);
        assert_eq!(atlas.free_regions(), 2);

        // best fit picks the small slot, the big one stays free
        let reused = atlas.insert(&mut backend, &mut state, 3, 2, &[0; 6]).unwrap();
        assert_eq!((reused.x, reused.y), (small.x, small.y));
        let reused = atlas.insert(&mut backend, &mut state, 8, 6, &[0; 48]).unwrap();
        assert_eq!((reused.x, reused.y), (0, 0));
        assert_eq!(atlas.page_count(), 1);
        assert_eq!(atlas.free_regions(), 0);

        // regions of other textures are ignored
        atlas.release(AtlasRegion {
            texture: TextureId(999),
            ..big
        });
        assert_eq!(atlas.free_regions(), 0);
    }

    #[test]
    fn test_insert_rejects_oversized() {
        let mut backend = RecordingBackend::default();
        let mut state = ready_state();
        let mut atlas = TextureAtlas::new(8, PixelFormat::Alpha, TextureParams::linear());
        let result = atlas.insert(&mut backend, &mut state, 9, 1, &[0; 9]);
        assert!(matches!(result, Err(CanvasError::AtlasFull { .. })));
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn test_insert_not_ready() {
        let mut backend = RecordingBackend::default();
        let mut state = StateCache::default();
        let mut atlas = TextureAtlas::new(8, PixelFormat::Alpha, TextureParams::linear());
        let result = atlas.insert(&mut backend, &mut state, 2, 2, &[0; 4]);
        assert!(matches!(result, Err(CanvasError::NotReady)));
    }
}
