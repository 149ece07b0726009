//! Image resources
//!
//! Images either share a page of the RGBA atlas or own a power-of-two
//! texture. After context loss every image is invalid and is restored
//! through [`Restore`] the next time it is drawn.

use std::path::{Path, PathBuf};

use slotmap::SlotMap;
use wayfarer_image::{next_pot, ImageData, ImageError, ImageSource, PaddedImage};
use wayfarer_paint::TextureId;

use crate::atlas::TextureAtlas;
use crate::backend::{Filter, FramebufferId, GraphicsBackend, PixelFormat, TextureParams, Wrap};
use crate::config::TextureDeletion;
use crate::error::{CanvasError, Result};
use crate::state::StateCache;

slotmap::new_key_type! {
    /// Handle of an image in an [`ImageStore`]
    pub struct ImageId;
}

/// Where an image's pixels come from, and so how it is restored
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageKind {
    File { path: PathBuf },
    /// Tiling image for textured lines; never packed into the atlas
    Pattern { path: PathBuf },
    /// Caller supplied pixels, retained for restore
    FromBuffer,
    /// Zeroed render target
    Blank,
}

impl ImageKind {
    fn atlas_allowed(&self) -> bool {
        matches!(self, ImageKind::File { .. } | ImageKind::FromBuffer)
    }
}

/// Blending behavior of an image draw
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageMode {
    #[default]
    Normal,
    /// Drawn fully opaque regardless of the requested opacity
    Selected,
    /// Drawn with blending disabled
    NoBlend,
}

/// CPU copy of an image's pixels
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PixelBuffer {
    /// Exact size, bound for the atlas
    Tight(ImageData),
    /// Padded to power-of-two dimensions for a dedicated texture
    Padded(PaddedImage),
}

impl PixelBuffer {
    fn unpadded(&self) -> ImageData {
        match self {
            PixelBuffer::Tight(data) => data.clone(),
            PixelBuffer::Padded(padded) => padded.unpad(),
        }
    }
}

/// A GPU-backed image
#[derive(Clone, Debug)]
pub struct Image {
    width: u32,
    height: u32,
    kind: ImageKind,
    pixels: Option<PixelBuffer>,
    texture: Option<TextureId>,
    atlas_offset: Option<(u32, u32)>,
    valid: bool,
    framebuffer: Option<FramebufferId>,
    unmanaged_slot: Option<usize>,
}

impl Image {
    fn new(kind: ImageKind, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            kind,
            pixels: None,
            texture: None,
            atlas_offset: None,
            valid: false,
            framebuffer: None,
            unmanaged_slot: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn kind(&self) -> &ImageKind {
        &self.kind
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    /// Top-left texel inside the atlas page, `None` for dedicated textures
    pub fn atlas_offset(&self) -> Option<(u32, u32)> {
        self.atlas_offset
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn has_pixels(&self) -> bool {
        self.pixels.is_some()
    }

    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    pub fn unmanaged_slot(&self) -> Option<usize> {
        self.unmanaged_slot
    }

    /// Whether the image is eligible for an atlas with pages `atlas_size`
    /// wide.
    pub fn fits_atlas(&self, atlas_size: u32) -> bool {
        self.kind.atlas_allowed() && self.width <= atlas_size && self.height <= atlas_size
    }

    /// Size of the texture the image samples from
    pub fn texture_size(&self, atlas_size: u32) -> (f32, f32) {
        if self.atlas_offset.is_some() {
            (atlas_size as f32, atlas_size as f32)
        } else {
            (next_pot(self.width) as f32, next_pot(self.height) as f32)
        }
    }

    /// Mark the texture as lost, keeping CPU data.
    pub fn invalidate(&mut self) {
        self.texture = None;
        self.atlas_offset = None;
        self.framebuffer = None;
        self.valid = false;
    }

    /// Upload the CPU pixels to an atlas page or a dedicated texture.
    pub fn upload(&mut self, ctx: &mut UploadContext<'_>) -> Result<()> {
        let atlas_size = ctx.atlas.size();
        let fits_atlas = self.fits_atlas(atlas_size);

        let Some(pixels) = self.pixels.as_ref() else {
            tracing::warn!("image {}x{} has no pixels to upload", self.width, self.height);
            return Err(CanvasError::MissingPixels);
        };
        if !ctx.state.is_ready() {
            self.valid = false;
            return Err(CanvasError::NotReady);
        }

        match pixels {
            PixelBuffer::Tight(data) if fits_atlas => {
                let region =
                    ctx.atlas
                        .insert(ctx.backend, ctx.state, data.width(), data.height(), data.pixels())?;
                self.texture = Some(region.texture);
                self.atlas_offset = Some((region.x, region.y));
            }
            PixelBuffer::Tight(data) => {
                let padded = data.pad_to_pot(ctx.max_padded_dimension)?;
                self.texture = Some(upload_dedicated(ctx, &padded));
                self.atlas_offset = None;
            }
            PixelBuffer::Padded(padded) => {
                self.texture = Some(upload_dedicated(ctx, padded));
                self.atlas_offset = None;
            }
        }

        self.framebuffer = None;
        self.valid = true;
        Ok(())
    }
}

fn upload_dedicated(ctx: &mut UploadContext<'_>, padded: &PaddedImage) -> TextureId {
    let (pot_width, pot_height) = padded.pot_dimensions();
    let texture = ctx.backend.gen_texture();
    ctx.state.bind(ctx.backend, texture);
    ctx.backend.set_texture_params(TextureParams::linear());
    ctx.backend
        .tex_image(0, pot_width, pot_height, PixelFormat::Rgba, padded.pixels());
    texture
}

/// Pixels ready for upload: tight for atlas candidates, padded otherwise.
fn prepare_pixels(data: ImageData, fits_atlas: bool, max_padded: u32) -> Result<PixelBuffer> {
    if fits_atlas {
        Ok(PixelBuffer::Tight(data))
    } else {
        Ok(PixelBuffer::Padded(data.pad_to_pot(max_padded)?))
    }
}

/// Everything an upload touches
pub struct UploadContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub state: &'a mut StateCache,
    pub atlas: &'a mut TextureAtlas,
    pub max_padded_dimension: u32,
}

/// GPU resources that can rebuild themselves after context loss
pub trait Restore {
    fn restore(&mut self, ctx: &mut UploadContext<'_>) -> Result<()>;
}

impl Restore for Image {
    fn restore(&mut self, ctx: &mut UploadContext<'_>) -> Result<()> {
        match self.kind.clone() {
            ImageKind::File { path } | ImageKind::Pattern { path } => {
                let data = ImageData::load(&ImageSource::file(&path))?;
                self.width = data.width();
                self.height = data.height();
                let fits = self.fits_atlas(ctx.atlas.size());
                self.pixels = Some(prepare_pixels(data, fits, ctx.max_padded_dimension)?);
                let result = self.upload(ctx);
                self.pixels = None;
                result
            }
            ImageKind::FromBuffer => self.upload(ctx),
            ImageKind::Blank => {
                self.pixels = Some(blank_pixels(
                    self.width,
                    self.height,
                    ctx.max_padded_dimension,
                )?);
                let result = self.upload(ctx);
                self.pixels = None;
                result
            }
        }
    }
}

fn blank_pixels(width: u32, height: u32, max_padded: u32) -> Result<PixelBuffer> {
    let (pot_width, pot_height) = (next_pot(width), next_pot(height));
    if pot_width > max_padded || pot_height > max_padded {
        return Err(ImageError::TooLarge {
            width: pot_width,
            height: pot_height,
            max: max_padded,
        }
        .into());
    }
    Ok(PixelBuffer::Padded(
        ImageData::blank(width, height).pad_to_pot(max_padded)?,
    ))
}

/// Images tracked for bulk invalidation on context loss
#[derive(Clone, Debug)]
pub struct UnmanagedList {
    slots: Vec<Option<ImageId>>,
}

impl UnmanagedList {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Track `id` in the first free slot.
    pub fn add(&mut self, id: ImageId) -> Result<usize> {
        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            tracing::error!("unmanaged image list is full ({} entries)", self.capacity());
            return Err(CanvasError::UnmanagedListFull {
                capacity: self.capacity(),
            });
        };
        self.slots[slot] = Some(id);
        Ok(slot)
    }

    pub fn remove(&mut self, slot: usize) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = None;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.slots.iter().flatten().copied()
    }
}

/// Owner of every image of a canvas
pub struct ImageStore {
    images: SlotMap<ImageId, Image>,
    unmanaged: UnmanagedList,
    atlas: TextureAtlas,
    max_padded_dimension: u32,
    deletion: TextureDeletion,
}

impl ImageStore {
    pub fn new(
        atlas_size: u32,
        unmanaged_capacity: usize,
        max_padded_dimension: u32,
        deletion: TextureDeletion,
    ) -> Self {
        let params = TextureParams::new(Wrap::ClampToEdge, Filter::Linear, Filter::Nearest);
        Self {
            images: SlotMap::with_key(),
            unmanaged: UnmanagedList::new(unmanaged_capacity),
            atlas: TextureAtlas::new(atlas_size, PixelFormat::Rgba, params),
            max_padded_dimension,
            deletion,
        }
    }

    pub fn get(&self, id: ImageId) -> Option<&Image> {
        self.images.get(id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn atlas(&self) -> &TextureAtlas {
        &self.atlas
    }

    pub fn unmanaged(&self) -> &UnmanagedList {
        &self.unmanaged
    }

    /// Decode a PNG file into a new image.
    ///
    /// Loading before the context exists keeps the image invalid; it is
    /// uploaded on first draw.
    pub fn load(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        state: &mut StateCache,
        path: &Path,
    ) -> Result<ImageId> {
        self.load_kind(
            backend,
            state,
            ImageKind::File {
                path: path.to_path_buf(),
            },
        )
    }

    /// Decode a PNG file into a tiling pattern image.
    pub fn load_pattern(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        state: &mut StateCache,
        path: &Path,
    ) -> Result<ImageId> {
        self.load_kind(
            backend,
            state,
            ImageKind::Pattern {
                path: path.to_path_buf(),
            },
        )
    }

    fn load_kind(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        state: &mut StateCache,
        kind: ImageKind,
    ) -> Result<ImageId> {
        let mut image = Image::new(kind, 0, 0);
        let mut ctx = UploadContext {
            backend,
            state,
            atlas: &mut self.atlas,
            max_padded_dimension: self.max_padded_dimension,
        };
        match image.restore(&mut ctx) {
            Ok(()) | Err(CanvasError::NotReady) => {}
            Err(e) => return Err(e),
        }
        let id = self.images.insert(image);
        tracing::debug!("image {:?} loaded", id);
        Ok(id)
    }

    /// Wrap caller supplied RGBA pixels.
    ///
    /// The image is tracked as unmanaged and keeps its pixels so it can be
    /// restored after context loss.
    pub fn from_buffer(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        state: &mut StateCache,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    ) -> Result<ImageId> {
        let data = ImageData::from_rgba(width, height, rgba)?;
        let mut image = Image::new(ImageKind::FromBuffer, width, height);
        let fits = image.fits_atlas(self.atlas.size());
        image.pixels = Some(prepare_pixels(data, fits, self.max_padded_dimension)?);

        let id = self.images.insert(image);
        match self.unmanaged.add(id) {
            Ok(slot) => {
                if let Some(image) = self.images.get_mut(id) {
                    image.unmanaged_slot = Some(slot);
                }
            }
            Err(e) => {
                self.images.remove(id);
                return Err(e);
            }
        }

        if state.is_ready() {
            if let Err(e) = self.upload(backend, state, id) {
                tracing::error!("cannot upload image {:?}: {}", id, e);
            }
        }
        Ok(id)
    }

    /// Allocate a zeroed render target.
    pub fn new_blank(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        state: &mut StateCache,
        width: u32,
        height: u32,
    ) -> Result<ImageId> {
        let image = Image::new(ImageKind::Blank, width, height);
        let id = self.images.insert(image);
        match self.unmanaged.add(id) {
            Ok(slot) => {
                if let Some(image) = self.images.get_mut(id) {
                    image.unmanaged_slot = Some(slot);
                }
            }
            Err(e) => {
                self.images.remove(id);
                return Err(e);
            }
        }

        if state.is_ready() {
            let mut ctx = UploadContext {
                backend,
                state,
                atlas: &mut self.atlas,
                max_padded_dimension: self.max_padded_dimension,
            };
            if let Some(image) = self.images.get_mut(id) {
                if let Err(e) = image.restore(&mut ctx) {
                    tracing::error!("cannot allocate render target {:?}: {}", id, e);
                }
            }
        }
        Ok(id)
    }

    /// Upload the retained pixels of `id`.
    pub fn upload(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        state: &mut StateCache,
        id: ImageId,
    ) -> Result<()> {
        let image = self.images.get_mut(id).ok_or(CanvasError::UnknownImage)?;
        let mut ctx = UploadContext {
            backend,
            state,
            atlas: &mut self.atlas,
            max_padded_dimension: self.max_padded_dimension,
        };
        image.upload(&mut ctx)
    }

    /// Restore `id` when it lost its texture. Returns whether it is drawable.
    pub fn ensure_valid(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        state: &mut StateCache,
        id: ImageId,
    ) -> bool {
        let Some(image) = self.images.get_mut(id) else {
            tracing::warn!("unknown image {:?}", id);
            return false;
        };
        if image.valid {
            return true;
        }

        let mut ctx = UploadContext {
            backend,
            state,
            atlas: &mut self.atlas,
            max_padded_dimension: self.max_padded_dimension,
        };
        match image.restore(&mut ctx) {
            Ok(()) => {
                tracing::debug!("image {:?} restored", id);
                true
            }
            Err(e) => {
                tracing::error!("cannot restore image {:?}: {}", id, e);
                false
            }
        }
    }

    /// RGBA copy of the retained pixels without padding.
    pub fn buffer_from(&self, id: ImageId) -> Option<ImageData> {
        self.images.get(id)?.pixels.as_ref().map(PixelBuffer::unpadded)
    }

    /// Track a file image for bulk invalidation.
    pub fn track_unmanaged(&mut self, id: ImageId) -> Result<usize> {
        let image = self.images.get(id).ok_or(CanvasError::UnknownImage)?;
        if let Some(slot) = image.unmanaged_slot {
            return Ok(slot);
        }
        let slot = self.unmanaged.add(id)?;
        if let Some(image) = self.images.get_mut(id) {
            image.unmanaged_slot = Some(slot);
        }
        Ok(slot)
    }

    /// Release an image and apply the texture deletion policy.
    pub fn free(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        state: &mut StateCache,
        id: ImageId,
    ) -> Result<()> {
        let image = self.images.remove(id).ok_or(CanvasError::UnknownImage)?;
        if let Some(slot) = image.unmanaged_slot {
            self.unmanaged.remove(slot);
        }

        if state.is_ready() {
            if let Some(texture) = image.texture {
                let dedicated = !self.atlas.owns(texture);
                let delete = match self.deletion {
                    TextureDeletion::Never => false,
                    TextureDeletion::BlankOnly => dedicated && image.kind == ImageKind::Blank,
                    TextureDeletion::Always => dedicated,
                };
                if delete {
                    backend.delete_texture(texture);
                    state.forget_texture(texture);
                }
            }
            if image.kind == ImageKind::Blank {
                if let Some(framebuffer) = image.framebuffer {
                    backend.delete_framebuffer(framebuffer);
                }
            }
        }

        tracing::info!("freed {}x{} image {:?}", image.width, image.height, id);
        Ok(())
    }

    pub fn invalidate(&mut self, id: ImageId) {
        if let Some(image) = self.images.get_mut(id) {
            image.invalidate();
        }
    }

    /// Invalidate every unmanaged image, returning how many were tracked.
    pub fn invalidate_all(&mut self) -> usize {
        let mut count = 0;
        for id in self.unmanaged.iter() {
            if let Some(image) = self.images.get_mut(id) {
                image.invalidate();
                count += 1;
            }
        }
        tracing::info!("invalidated {} unmanaged images", count);
        count
    }

    /// Forget the atlas and every texture after context loss.
    pub fn shutdown(&mut self) {
        self.invalidate_all();
        // atlas pages die with the context, so untracked images are stale too
        for image in self.images.values_mut() {
            image.invalidate();
        }
        self.atlas.clean();
    }

    /// Framebuffer rendering into `id`, created on first use.
    pub fn framebuffer(&mut self, backend: &mut dyn GraphicsBackend, id: ImageId) -> Result<FramebufferId> {
        let image = self.images.get_mut(id).ok_or(CanvasError::UnknownImage)?;
        if let Some(framebuffer) = image.framebuffer {
            return Ok(framebuffer);
        }
        let texture = image.texture.ok_or(CanvasError::NotReady)?;

        let framebuffer = backend.gen_framebuffer();
        if !backend.attach_texture(framebuffer, texture) {
            backend.delete_framebuffer(framebuffer);
            tracing::error!("framebuffer for image {:?} is incomplete", id);
            return Err(CanvasError::IncompleteFramebuffer);
        }
        image.framebuffer = Some(framebuffer);
        Ok(framebuffer)
    }
}
