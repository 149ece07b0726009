//! [`GraphicsBackend`] on wgpu
//!
//! Calls are recorded into a frame list and played back as render passes
//! by [`WgpuBackend::finish_frame`]. Textures keep a CPU copy of each mip
//! level so they can be (re)created lazily once they are first sampled.
//!
//! Sub-image updates to a resident texture go straight to the queue, so
//! they become visible to every draw of the frame being recorded.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use wayfarer_gpu::{
    Filter, FramebufferId, GraphicsBackend, PixelFormat, Primitive, TextureParams, Wrap,
    MAX_TEXTURE_UNITS,
};
use wayfarer_paint::{Color, TextureId, Vertex};

use crate::error::{BackendError, Result};
use crate::geometry::{assemble, expand_to_rgba, to_gpu, GpuVertex};
use crate::matrix::MatrixStack;
use crate::shader::CANVAS_SHADER;

/// Format of every canvas texture
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct Level {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

struct GpuTexture {
    texture: wgpu::Texture,
    /// Level 0 only, for use as a render target
    target: wgpu::TextureView,
    sampled: wgpu::TextureView,
    bind_group: Option<(TextureParams, Arc<wgpu::BindGroup>)>,
}

#[derive(Default)]
struct TextureSlot {
    levels: Vec<Option<Level>>,
    params: TextureParams,
    gpu: Option<GpuTexture>,
    dirty: bool,
    /// Sampled by a draw recorded since the GPU copy was made
    in_flight: bool,
}

impl TextureSlot {
    fn size(&self) -> Option<(u32, u32)> {
        self.levels
            .first()
            .and_then(Option::as_ref)
            .map(|level| (level.width, level.height))
    }

    /// Levels usable as one mip chain, counted from level 0
    fn mip_count(&self) -> u32 {
        let Some((width, height)) = self.size() else {
            return 0;
        };
        let mut count = 0;
        for (i, level) in self.levels.iter().enumerate() {
            let expected = ((width >> i).max(1), (height >> i).max(1));
            match level {
                Some(level) if (level.width, level.height) == expected => count += 1,
                _ => break,
            }
        }
        count
    }
}

/// Render target of a recorded operation, `None` for the screen
type Target = Option<TextureId>;

enum Op {
    Clear {
        target: Target,
        color: Color,
    },
    Draw {
        target: Target,
        blend: bool,
        viewport: (u32, u32),
        bind_group: Arc<wgpu::BindGroup>,
        start: u32,
        count: u32,
    },
}

struct PassPlan {
    target: Target,
    clear: Option<Color>,
    draws: Vec<usize>,
}

/// wgpu device wrapped as a fixed-function canvas backend
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    screen_format: wgpu::TextureFormat,
    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: FxHashMap<(wgpu::TextureFormat, bool), wgpu::RenderPipeline>,
    samplers: FxHashMap<TextureParams, wgpu::Sampler>,
    white: Arc<wgpu::BindGroup>,

    textures: FxHashMap<TextureId, TextureSlot>,
    next_texture: u32,
    framebuffers: FxHashMap<FramebufferId, Option<TextureId>>,
    next_framebuffer: u32,

    units: [Option<TextureId>; MAX_TEXTURE_UNITS],
    active_unit: usize,
    texturing: bool,
    blend: bool,
    color: Color,
    clear_color: Color,
    matrices: MatrixStack,
    projection: (u32, u32),
    target: Target,

    ops: Vec<Op>,
    vertices: Vec<GpuVertex>,
    vertex_buffer: Option<wgpu::Buffer>,
}

impl WgpuBackend {
    /// Create a backend on a headless device.
    pub async fn new_headless() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(BackendError::AdapterNotFound)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Wayfarer Canvas Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;

        tracing::info!("canvas adapter: {:?}", adapter.get_info().name);
        Ok(Self::from_device(
            Arc::new(device),
            Arc::new(queue),
            TEXTURE_FORMAT,
        ))
    }

    /// Blocking wrapper around [`WgpuBackend::new_headless`]
    pub fn new_headless_blocking() -> Result<Self> {
        pollster::block_on(Self::new_headless())
    }

    /// Wrap a device the host already owns, drawing to `screen_format`.
    pub fn from_device(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        screen_format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Canvas Shader"),
            source: wgpu::ShaderSource::Wgsl(CANVAS_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Canvas Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Canvas Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mut backend = Self {
            white: Arc::new(Self::create_white(&device, &queue, &bind_group_layout)),
            device,
            queue,
            screen_format,
            shader,
            bind_group_layout,
            pipeline_layout,
            pipelines: FxHashMap::default(),
            samplers: FxHashMap::default(),
            textures: FxHashMap::default(),
            next_texture: 1,
            framebuffers: FxHashMap::default(),
            next_framebuffer: 1,
            units: [None; MAX_TEXTURE_UNITS],
            active_unit: 0,
            texturing: false,
            blend: true,
            color: Color::WHITE,
            clear_color: Color::default(),
            matrices: MatrixStack::default(),
            projection: (1, 1),
            target: None,
            ops: Vec::new(),
            vertices: Vec::new(),
            vertex_buffer: None,
        };
        backend.sampler(TextureParams::default());
        backend
    }

    fn create_white(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Canvas White Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255u8, 255, 255, 255],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Canvas White Sampler"),
            ..Default::default()
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Canvas White Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        })
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// GPU texture behind `texture`, once it has been created
    pub fn gpu_texture(&self, texture: TextureId) -> Option<&wgpu::Texture> {
        self.textures
            .get(&texture)
            .and_then(|slot| slot.gpu.as_ref())
            .map(|gpu| &gpu.texture)
    }

    /// Operations recorded since the last frame
    pub fn pending_ops(&self) -> usize {
        self.ops.len()
    }

    fn bound_texture(&self) -> Option<TextureId> {
        self.units.get(self.active_unit).copied().flatten()
    }

    fn sampler(&mut self, params: TextureParams) -> &wgpu::Sampler {
        let device = &self.device;
        self.samplers.entry(params).or_insert_with(|| {
            let address = match params.wrap {
                Wrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
                Wrap::Repeat => wgpu::AddressMode::Repeat,
            };
            let filter = |filter: Filter| match filter {
                Filter::Nearest | Filter::NearestMipmapNearest => wgpu::FilterMode::Nearest,
                _ => wgpu::FilterMode::Linear,
            };
            let mipmap_filter = match params.min_filter {
                Filter::LinearMipmapLinear => wgpu::FilterMode::Linear,
                _ => wgpu::FilterMode::Nearest,
            };
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("Canvas Sampler"),
                address_mode_u: address,
                address_mode_v: address,
                address_mode_w: address,
                mag_filter: filter(params.mag_filter),
                min_filter: filter(params.min_filter),
                mipmap_filter,
                lod_max_clamp: if params.min_filter.uses_mipmaps() {
                    32.0
                } else {
                    0.0
                },
                ..Default::default()
            })
        })
    }

    /// Create or refresh the GPU copy of `texture`.
    ///
    /// Returns false when it has no level 0 yet.
    fn materialize(&mut self, texture: TextureId) -> bool {
        let Some(slot) = self.textures.get_mut(&texture) else {
            return false;
        };
        if slot.gpu.is_some() && !slot.dirty {
            return true;
        }
        let Some((width, height)) = slot.size() else {
            return false;
        };

        let mip_level_count = slot.mip_count();
        let gpu = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Canvas Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        for (mip, level) in slot.levels.iter().take(mip_level_count as usize).enumerate() {
            let Some(level) = level else { break };
            self.queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &gpu,
                    mip_level: mip as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &level.rgba,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level.width),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let sampled = gpu.create_view(&wgpu::TextureViewDescriptor::default());
        let target = gpu.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Canvas Render Target"),
            base_mip_level: 0,
            mip_level_count: Some(1),
            ..Default::default()
        });
        tracing::debug!(
            "texture {:?} created: {}x{}, {} mip levels",
            texture,
            width,
            height,
            mip_level_count
        );
        slot.gpu = Some(GpuTexture {
            texture: gpu,
            target,
            sampled,
            bind_group: None,
        });
        slot.dirty = false;
        slot.in_flight = false;
        true
    }

    /// Bind group sampling `texture` with its current parameters
    fn texture_bind_group(&mut self, texture: TextureId) -> Option<Arc<wgpu::BindGroup>> {
        if !self.materialize(texture) {
            return None;
        }
        let params = self.textures.get(&texture)?.params;
        self.sampler(params);
        let sampler = self.samplers.get(&params)?;

        let gpu = self.textures.get_mut(&texture)?.gpu.as_mut()?;
        if let Some((cached, group)) = &gpu.bind_group {
            if *cached == params {
                return Some(group.clone());
            }
        }
        let group = Arc::new(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Canvas Texture Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gpu.sampled),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        }));
        gpu.bind_group = Some((params, group.clone()));
        Some(group)
    }

    fn pipeline(&mut self, format: wgpu::TextureFormat, blend: bool) {
        if self.pipelines.contains_key(&(format, blend)) {
            return;
        }
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Canvas Pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    buffers: &[GpuVertex::layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: blend.then_some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        self.pipelines.insert((format, blend), pipeline);
    }

    fn target_format(&self, target: Target) -> wgpu::TextureFormat {
        match target {
            None => self.screen_format,
            Some(_) => TEXTURE_FORMAT,
        }
    }

    fn plan_passes(&self) -> Vec<PassPlan> {
        let mut passes: Vec<PassPlan> = Vec::new();
        for (index, op) in self.ops.iter().enumerate() {
            match op {
                Op::Clear { target, color } => passes.push(PassPlan {
                    target: *target,
                    clear: Some(*color),
                    draws: Vec::new(),
                }),
                Op::Draw { target, .. } => {
                    match passes.last_mut() {
                        Some(pass) if pass.target == *target => pass.draws.push(index),
                        _ => passes.push(PassPlan {
                            target: *target,
                            clear: None,
                            draws: vec![index],
                        }),
                    }
                }
            }
        }
        passes
    }

    fn upload_vertices(&mut self) {
        let bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        let needed = bytes.len() as wgpu::BufferAddress;
        let fits = self
            .vertex_buffer
            .as_ref()
            .is_some_and(|buffer| buffer.size() >= needed);
        if !fits {
            let size = needed.next_power_of_two().max(4096);
            tracing::debug!("canvas vertex buffer grown to {} bytes", size);
            self.vertex_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Canvas Vertex Buffer"),
                size,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        if let Some(buffer) = &self.vertex_buffer {
            self.queue.write_buffer(buffer, 0, bytes);
        }
    }

    /// Play the recorded frame back, drawing screen operations into
    /// `screen` of `screen_size` pixels.
    pub fn finish_frame(&mut self, screen: &wgpu::TextureView, screen_size: (u32, u32)) {
        if self.ops.is_empty() {
            return;
        }

        let passes = self.plan_passes();
        for pass in &passes {
            let format = self.target_format(pass.target);
            for &index in &pass.draws {
                let blend = match &self.ops[index] {
                    Op::Draw { blend, .. } => *blend,
                    Op::Clear { .. } => continue,
                };
                self.pipeline(format, blend);
            }
        }
        if !self.vertices.is_empty() {
            self.upload_vertices();
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Canvas Frame Encoder"),
            });

        for pass in &passes {
            let (view, size) = match pass.target {
                None => (screen, screen_size),
                Some(texture) => {
                    let slot = self.textures.get(&texture);
                    match slot.and_then(|s| s.gpu.as_ref().zip(s.size())) {
                        Some((gpu, size)) => (&gpu.target, size),
                        None => {
                            tracing::warn!("render target {:?} missing, pass skipped", texture);
                            continue;
                        }
                    }
                }
            };
            let load = match pass.clear {
                Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: c.r as f64,
                    g: c.g as f64,
                    b: c.b as f64,
                    a: c.a as f64,
                }),
                None => wgpu::LoadOp::Load,
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Canvas Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let Some(buffer) = &self.vertex_buffer else {
                continue;
            };
            render_pass.set_vertex_buffer(0, buffer.slice(..));
            let format = self.target_format(pass.target);

            for &index in &pass.draws {
                let Op::Draw {
                    blend,
                    viewport,
                    bind_group,
                    start,
                    count,
                    ..
                } = &self.ops[index]
                else {
                    continue;
                };
                let width = viewport.0.min(size.0);
                let height = viewport.1.min(size.1);
                if width == 0 || height == 0 {
                    continue;
                }
                let Some(pipeline) = self.pipelines.get(&(format, *blend)) else {
                    continue;
                };
                render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &**bind_group, &[]);
                render_pass.draw(*start..*start + *count, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        tracing::trace!(
            "canvas frame: {} passes, {} vertices",
            passes.len(),
            self.vertices.len()
        );
        self.ops.clear();
        self.vertices.clear();
        for slot in self.textures.values_mut() {
            slot.in_flight = false;
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    fn max_texture_units(&self) -> usize {
        MAX_TEXTURE_UNITS
    }

    fn gen_texture(&mut self) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id, TextureSlot::default());
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            tracing::warn!("delete of unknown texture {:?}", texture);
        }
        for unit in self.units.iter_mut().filter(|t| **t == Some(texture)) {
            *unit = None;
        }
    }

    fn active_texture(&mut self, unit: usize) {
        self.active_unit = unit.min(MAX_TEXTURE_UNITS - 1);
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.units[self.active_unit] = Some(texture);
    }

    fn set_texturing(&mut self, enabled: bool) {
        self.texturing = enabled;
    }

    fn set_texture_params(&mut self, params: TextureParams) {
        let Some(texture) = self.bound_texture() else {
            return;
        };
        if let Some(slot) = self.textures.get_mut(&texture) {
            slot.params = params;
        }
    }

    fn tex_image(&mut self, level: u32, width: u32, height: u32, format: PixelFormat, data: &[u8]) {
        let Some(slot) = self.bound_texture().and_then(|t| self.textures.get_mut(&t)) else {
            tracing::warn!("tex_image with no texture bound");
            return;
        };
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        let mut rgba = expand_to_rgba(format, &data[..expected.min(data.len())]);
        rgba.resize(width as usize * height as usize * 4, 0);

        let level = level as usize;
        if slot.levels.len() <= level {
            slot.levels.resize_with(level + 1, || None);
        }
        slot.levels[level] = Some(Level {
            width,
            height,
            rgba,
        });
        slot.dirty = true;
    }

    fn tex_sub_image(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: &[u8],
    ) {
        let Some(texture) = self.bound_texture() else {
            tracing::warn!("tex_sub_image with no texture bound");
            return;
        };
        let attached = self.framebuffers.values().any(|t| *t == Some(texture));
        let Some(slot) = self.textures.get_mut(&texture) else {
            tracing::warn!("tex_sub_image with no texture bound");
            return;
        };
        if width == 0 || height == 0 {
            return;
        }
        let Some(base) = slot.levels.first_mut().and_then(Option::as_mut) else {
            tracing::warn!("tex_sub_image on texture without storage");
            return;
        };
        if x + width > base.width || y + height > base.height {
            tracing::warn!(
                "tex_sub_image {}x{} at ({}, {}) outside {}x{}",
                width,
                height,
                x,
                y,
                base.width,
                base.height
            );
            return;
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() < expected {
            tracing::warn!("tex_sub_image short data: {} < {}", data.len(), expected);
            return;
        }

        let rgba = expand_to_rgba(format, &data[..expected]);
        let row = width as usize * 4;
        for (r, src) in rgba.chunks_exact(row).enumerate() {
            let offset = ((y as usize + r) * base.width as usize + x as usize) * 4;
            base.rgba[offset..offset + row].copy_from_slice(src);
        }

        // draws already recorded keep the old copy; the next draw gets a new one
        if slot.in_flight && !attached {
            slot.dirty = true;
        }
        let resident = if slot.dirty { None } else { slot.gpu.as_ref() };
        if let Some(gpu) = resident {
            self.queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &gpu.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x, y, z: 0 },
                    aspect: wgpu::TextureAspect::All,
                },
                &rgba,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    fn clear(&mut self) {
        self.ops.push(Op::Clear {
            target: self.target,
            color: self.clear_color,
        });
    }

    fn draw_arrays(&mut self, primitive: Primitive, vertices: &[Vertex]) {
        let triangles = assemble(primitive, vertices);
        if triangles.is_empty() {
            return;
        }

        let bind_group = if self.texturing {
            match self.bound_texture() {
                Some(texture) => {
                    let group = self.texture_bind_group(texture);
                    if let Some(slot) = self.textures.get_mut(&texture) {
                        slot.in_flight |= group.is_some();
                    }
                    group
                }
                None => None,
            }
        } else {
            Some(self.white.clone())
        };
        let Some(bind_group) = bind_group else {
            tracing::warn!("textured draw without a usable texture skipped");
            return;
        };

        let start = self.vertices.len() as u32;
        self.vertices.extend(to_gpu(
            &triangles,
            self.matrices.current(),
            self.color,
            self.projection,
        ));
        self.ops.push(Op::Draw {
            target: self.target,
            blend: self.blend,
            viewport: self.projection,
            bind_group,
            start,
            count: triangles.len() as u32,
        });
    }

    fn set_blend(&mut self, enabled: bool) {
        self.blend = enabled;
    }

    fn push_matrix(&mut self) {
        self.matrices.push();
    }

    fn pop_matrix(&mut self) {
        self.matrices.pop();
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.matrices.translate(x, y);
    }

    fn rotate(&mut self, degrees: f32) {
        self.matrices.rotate(degrees);
    }

    fn gen_framebuffer(&mut self) -> FramebufferId {
        let id = FramebufferId(self.next_framebuffer);
        self.next_framebuffer += 1;
        self.framebuffers.insert(id, None);
        id
    }

    fn attach_texture(&mut self, framebuffer: FramebufferId, texture: TextureId) -> bool {
        let Some(attachment) = self.framebuffers.get_mut(&framebuffer) else {
            return false;
        };
        *attachment = Some(texture);
        self.materialize(texture)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.target = framebuffer.and_then(|fb| self.framebuffers.get(&fb).copied().flatten());
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffers.remove(&framebuffer);
    }

    fn set_projection(&mut self, width: u32, height: u32) {
        self.matrices.reset();
        self.projection = (width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> Option<WgpuBackend> {
        match WgpuBackend::new_headless_blocking() {
            Ok(backend) => Some(backend),
            Err(e) => {
                eprintln!("skipping, no GPU: {}", e);
                None
            }
        }
    }

    #[test]
    fn test_mip_chain_stops_at_gap() {
        let level = |w: u32, h: u32| Some(Level {
            width: w,
            height: h,
            rgba: vec![0; (w * h * 4) as usize],
        });
        let slot = TextureSlot {
            levels: vec![level(8, 4), level(4, 2), None, level(1, 1)],
            ..TextureSlot::default()
        };
        assert_eq!(slot.mip_count(), 2);
        assert_eq!(slot.size(), Some((8, 4)));
        assert_eq!(TextureSlot::default().mip_count(), 0);
    }

    #[test]
    fn test_textured_draw_needs_storage() {
        let Some(mut backend) = backend() else { return };
        let texture = backend.gen_texture();
        backend.bind_texture(texture);
        backend.set_texturing(true);
        backend.set_projection(16, 16);

        let quad = [
            Vertex::new(0.0, 0.0, 0.0, 0.0),
            Vertex::new(4.0, 0.0, 1.0, 0.0),
            Vertex::new(4.0, 4.0, 1.0, 1.0),
        ];
        backend.draw_arrays(Primitive::Triangles, &quad);
        assert_eq!(backend.pending_ops(), 0);

        backend.tex_image(0, 2, 2, PixelFormat::Alpha, &[255; 4]);
        backend.draw_arrays(Primitive::Triangles, &quad);
        assert_eq!(backend.pending_ops(), 1);
        assert!(backend.gpu_texture(texture).is_some());
    }

    #[test]
    fn test_sub_image_after_draw_copies_texture() {
        let Some(mut backend) = backend() else { return };
        let texture = backend.gen_texture();
        backend.bind_texture(texture);
        backend.set_texturing(true);
        backend.set_projection(16, 16);
        backend.tex_image(0, 4, 4, PixelFormat::Alpha, &[0; 16]);

        // nothing drawn yet, so the resident copy is updated in place
        assert!(backend.materialize(texture));
        backend.tex_sub_image(0, 0, 2, 2, PixelFormat::Alpha, &[255; 4]);
        assert!(!backend.textures[&texture].dirty);

        let quad = [
            Vertex::new(0.0, 0.0, 0.0, 0.0),
            Vertex::new(4.0, 0.0, 1.0, 0.0),
            Vertex::new(4.0, 4.0, 1.0, 1.0),
        ];
        backend.draw_arrays(Primitive::Triangles, &quad);
        backend.tex_sub_image(2, 2, 2, 2, PixelFormat::Alpha, &[255; 4]);
        assert!(backend.textures[&texture].dirty);

        backend.draw_arrays(Primitive::Triangles, &quad);
        assert!(!backend.textures[&texture].dirty);
        assert_eq!(backend.pending_ops(), 2);
    }

    #[test]
    fn test_render_to_texture_frame() {
        let Some(mut backend) = backend() else { return };
        let texture = backend.gen_texture();
        backend.bind_texture(texture);
        backend.tex_image(0, 8, 8, PixelFormat::Rgba, &[0; 256]);

        let framebuffer = backend.gen_framebuffer();
        assert!(backend.attach_texture(framebuffer, texture));
        backend.bind_framebuffer(Some(framebuffer));
        backend.set_projection(8, 8);
        backend.set_clear_color(Color::WHITE);
        backend.clear();
        backend.set_texturing(false);
        backend.draw_arrays(Primitive::Points, &[Vertex::at(2.0, 2.0)]);
        backend.bind_framebuffer(None);

        let screen = backend.device().create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width: 8,
                height: 8,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = screen.create_view(&wgpu::TextureViewDescriptor::default());
        assert_eq!(backend.pending_ops(), 2);
        backend.finish_frame(&view, (8, 8));
        assert_eq!(backend.pending_ops(), 0);
    }
}
