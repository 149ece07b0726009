//! Command-recording backend for testing
//!
//! Provides a [`GraphicsBackend`] that performs no rendering and records
//! every call, so state-cache and geometry behavior can be asserted without
//! a GPU.

use wayfarer_paint::{Color, TextureId, Vertex};

use crate::backend::{FramebufferId, GraphicsBackend, PixelFormat, Primitive, TextureParams};

/// One recorded backend call
#[derive(Clone, Debug, PartialEq)]
pub enum GlCommand {
    GenTexture(TextureId),
    DeleteTexture(TextureId),
    ActiveTexture(usize),
    BindTexture(TextureId),
    SetTexturing(bool),
    TextureParams(TextureParams),
    TexImage {
        level: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        len: usize,
    },
    TexSubImage {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
    },
    SetColor(Color),
    SetClearColor(Color),
    Clear,
    Draw {
        primitive: Primitive,
        vertices: Vec<Vertex>,
    },
    SetBlend(bool),
    PushMatrix,
    PopMatrix,
    Translate(f32, f32),
    Rotate(f32),
    GenFramebuffer(FramebufferId),
    AttachTexture(FramebufferId, TextureId),
    BindFramebuffer(Option<FramebufferId>),
    DeleteFramebuffer(FramebufferId),
    SetProjection(u32, u32),
}

/// Backend that records instead of rendering
#[derive(Debug)]
pub struct RecordingBackend {
    commands: Vec<GlCommand>,
    max_units: usize,
    next_texture: u32,
    next_framebuffer: u32,
    framebuffers_complete: bool,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(8)
    }
}

impl RecordingBackend {
    /// Create a backend reporting `max_units` texture units.
    pub fn new(max_units: usize) -> Self {
        Self {
            commands: Vec::new(),
            max_units,
            next_texture: 1,
            next_framebuffer: 1,
            framebuffers_complete: true,
        }
    }

    /// Make every framebuffer attachment report incomplete.
    pub fn with_incomplete_framebuffers(mut self) -> Self {
        self.framebuffers_complete = false;
        self
    }

    pub fn commands(&self) -> &[GlCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<GlCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of recorded commands matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&GlCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }

    /// Recorded draw calls as (primitive, vertices) pairs.
    pub fn draws(&self) -> Vec<(Primitive, &[Vertex])> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                GlCommand::Draw {
                    primitive,
                    vertices,
                } => Some((*primitive, vertices.as_slice())),
                _ => None,
            })
            .collect()
    }

    /// Textures generated so far
    pub fn generated_textures(&self) -> usize {
        self.count(|c| matches!(c, GlCommand::GenTexture(_)))
    }
}

impl GraphicsBackend for RecordingBackend {
    fn max_texture_units(&self) -> usize {
        self.max_units
    }

    fn gen_texture(&mut self) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.commands.push(GlCommand::GenTexture(id));
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.commands.push(GlCommand::DeleteTexture(texture));
    }

    fn active_texture(&mut self, unit: usize) {
        self.commands.push(GlCommand::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.commands.push(GlCommand::BindTexture(texture));
    }

    fn set_texturing(&mut self, enabled: bool) {
        self.commands.push(GlCommand::SetTexturing(enabled));
    }

    fn set_texture_params(&mut self, params: TextureParams) {
        self.commands.push(GlCommand::TextureParams(params));
    }

    fn tex_image(&mut self, level: u32, width: u32, height: u32, format: PixelFormat, data: &[u8]) {
        self.commands.push(GlCommand::TexImage {
            level,
            width,
            height,
            format,
            len: data.len(),
        });
    }

    fn tex_sub_image(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        _data: &[u8],
    ) {
        self.commands.push(GlCommand::TexSubImage {
            x,
            y,
            width,
            height,
            format,
        });
    }

    fn set_color(&mut self, color: Color) {
        self.commands.push(GlCommand::SetColor(color));
    }

    fn set_clear_color(&mut self, color: Color) {
        self.commands.push(GlCommand::SetClearColor(color));
    }

    fn clear(&mut self) {
        self.commands.push(GlCommand::Clear);
    }

    fn draw_arrays(&mut self, primitive: Primitive, vertices: &[Vertex]) {
        self.commands.push(GlCommand::Draw {
            primitive,
            vertices: vertices.to_vec(),
        });
    }

    fn set_blend(&mut self, enabled: bool) {
        self.commands.push(GlCommand::SetBlend(enabled));
    }

    fn push_matrix(&mut self) {
        self.commands.push(GlCommand::PushMatrix);
    }

    fn pop_matrix(&mut self) {
        self.commands.push(GlCommand::PopMatrix);
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.commands.push(GlCommand::Translate(x, y));
    }

    fn rotate(&mut self, degrees: f32) {
        self.commands.push(GlCommand::Rotate(degrees));
    }

    fn gen_framebuffer(&mut self) -> FramebufferId {
        let id = FramebufferId(self.next_framebuffer);
        self.next_framebuffer += 1;
        self.commands.push(GlCommand::GenFramebuffer(id));
        id
    }

    fn attach_texture(&mut self, framebuffer: FramebufferId, texture: TextureId) -> bool {
        self.commands
            .push(GlCommand::AttachTexture(framebuffer, texture));
        self.framebuffers_complete
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.commands.push(GlCommand::BindFramebuffer(framebuffer));
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.commands.push(GlCommand::DeleteFramebuffer(framebuffer));
    }

    fn set_projection(&mut self, width: u32, height: u32) {
        self.commands.push(GlCommand::SetProjection(width, height));
    }
}
