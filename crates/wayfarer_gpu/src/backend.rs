//! Graphics backend seam
//!
//! The canvas talks to the GPU through an immediate-mode, fixed-function
//! style interface. Texture parameter and upload calls apply to the texture
//! bound on the active unit, as in OpenGL ES 1.x.

use wayfarer_paint::{Color, TextureId, Vertex};

/// Primitive assembly mode of a draw call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Texel layout of an upload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One coverage byte per texel
    Alpha,
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Alpha => 1,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Texture sampling filter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    LinearMipmapLinear,
}

impl Filter {
    pub fn uses_mipmaps(self) -> bool {
        matches!(
            self,
            Filter::NearestMipmapNearest | Filter::LinearMipmapNearest | Filter::LinearMipmapLinear
        )
    }
}

/// Texture addressing mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Wrap {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Sampling parameters of a texture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureParams {
    pub wrap: Wrap,
    pub min_filter: Filter,
    pub mag_filter: Filter,
}

impl TextureParams {
    pub const fn new(wrap: Wrap, min_filter: Filter, mag_filter: Filter) -> Self {
        Self {
            wrap,
            min_filter,
            mag_filter,
        }
    }

    pub const fn linear() -> Self {
        Self::new(Wrap::ClampToEdge, Filter::Linear, Filter::Linear)
    }
}

impl Default for TextureParams {
    fn default() -> Self {
        Self::linear()
    }
}

/// Opaque handle of a framebuffer object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// Immediate-mode graphics device
pub trait GraphicsBackend {
    /// Texture units the device exposes
    fn max_texture_units(&self) -> usize;

    fn gen_texture(&mut self) -> TextureId;

    fn delete_texture(&mut self, texture: TextureId);

    /// Select the unit later texture calls apply to.
    fn active_texture(&mut self, unit: usize);

    fn bind_texture(&mut self, texture: TextureId);

    /// Toggle texturing and texture coordinate arrays together.
    fn set_texturing(&mut self, enabled: bool);

    fn set_texture_params(&mut self, params: TextureParams);

    /// Upload a full mip level of the bound texture.
    fn tex_image(&mut self, level: u32, width: u32, height: u32, format: PixelFormat, data: &[u8]);

    /// Update a rectangle of mip level 0 of the bound texture.
    fn tex_sub_image(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: &[u8],
    );

    /// Color multiplied into every following vertex
    fn set_color(&mut self, color: Color);

    fn set_clear_color(&mut self, color: Color);

    fn clear(&mut self);

    fn draw_arrays(&mut self, primitive: Primitive, vertices: &[Vertex]);

    fn set_blend(&mut self, enabled: bool);

    fn push_matrix(&mut self);

    fn pop_matrix(&mut self);

    fn translate(&mut self, x: f32, y: f32);

    /// Rotate around the z axis by `degrees`.
    fn rotate(&mut self, degrees: f32);

    fn gen_framebuffer(&mut self) -> FramebufferId;

    /// Attach `texture` as the color target of `framebuffer`.
    ///
    /// Returns whether the framebuffer is complete.
    fn attach_texture(&mut self, framebuffer: FramebufferId, texture: TextureId) -> bool;

    /// Bind a framebuffer, `None` for the screen.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Reset the matrix stack to an orthographic projection of
    /// `width` x `height` pixels and set the viewport to match.
    fn set_projection(&mut self, width: u32, height: u32);
}
