//! Primitive assembly on the CPU
//!
//! wgpu pipelines fix their topology, so every canvas primitive is turned
//! into a plain triangle list before it is queued.

use bytemuck::{Pod, Zeroable};
use wayfarer_gpu::Primitive;
use wayfarer_paint::{Color, Vertex};

use crate::matrix::{to_clip, Affine};

/// Vertex as laid out in the GPU buffer
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl GpuVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Half the side of the quad standing in for a point or a hairline
const HAIRLINE: f32 = 0.5;

/// Expand `vertices` drawn as `primitive` into a triangle list.
pub fn assemble(primitive: Primitive, vertices: &[Vertex]) -> Vec<Vertex> {
    match primitive {
        Primitive::Triangles => {
            let whole = vertices.len() - vertices.len() % 3;
            vertices[..whole].to_vec()
        }
        Primitive::TriangleStrip => {
            let mut out = Vec::with_capacity(vertices.len().saturating_sub(2) * 3);
            for (i, w) in vertices.windows(3).enumerate() {
                // keep winding consistent on odd triangles
                if i % 2 == 0 {
                    out.extend_from_slice(&[w[0], w[1], w[2]]);
                } else {
                    out.extend_from_slice(&[w[1], w[0], w[2]]);
                }
            }
            out
        }
        Primitive::TriangleFan => {
            let Some((&first, rest)) = vertices.split_first() else {
                return Vec::new();
            };
            let mut out = Vec::with_capacity(rest.len().saturating_sub(1) * 3);
            for w in rest.windows(2) {
                out.extend_from_slice(&[first, w[0], w[1]]);
            }
            out
        }
        Primitive::Points => {
            let mut out = Vec::with_capacity(vertices.len() * 6);
            for v in vertices {
                let [x, y] = v.position;
                push_quad(
                    &mut out,
                    [x - HAIRLINE, y - HAIRLINE],
                    [x + HAIRLINE, y + HAIRLINE],
                    v.tex_coords,
                );
            }
            out
        }
        Primitive::Lines => {
            let mut out = Vec::new();
            for pair in vertices.chunks_exact(2) {
                push_hairline(&mut out, &pair[0], &pair[1]);
            }
            out
        }
        Primitive::LineStrip => {
            let mut out = Vec::new();
            for pair in vertices.windows(2) {
                push_hairline(&mut out, &pair[0], &pair[1]);
            }
            out
        }
    }
}

fn push_quad(out: &mut Vec<Vertex>, min: [f32; 2], max: [f32; 2], uv: [f32; 2]) {
    let [u, v] = uv;
    let a = Vertex::new(min[0], min[1], u, v);
    let b = Vertex::new(max[0], min[1], u, v);
    let c = Vertex::new(max[0], max[1], u, v);
    let d = Vertex::new(min[0], max[1], u, v);
    out.extend_from_slice(&[a, b, c, a, c, d]);
}

fn push_hairline(out: &mut Vec<Vertex>, from: &Vertex, to: &Vertex) {
    let dx = to.position[0] - from.position[0];
    let dy = to.position[1] - from.position[1];
    let length = (dx * dx + dy * dy).sqrt();
    if length <= f32::EPSILON {
        return;
    }
    let nx = -dy / length * HAIRLINE;
    let ny = dx / length * HAIRLINE;

    let corner = |v: &Vertex, sign: f32| {
        Vertex::new(
            v.position[0] + nx * sign,
            v.position[1] + ny * sign,
            v.tex_coords[0],
            v.tex_coords[1],
        )
    };
    let (a, b) = (corner(from, 1.0), corner(from, -1.0));
    let (c, d) = (corner(to, 1.0), corner(to, -1.0));
    out.extend_from_slice(&[a, b, c, c, b, d]);
}

/// Transform and color a triangle list for upload.
pub fn to_gpu<'a>(
    vertices: &'a [Vertex],
    transform: &Affine,
    color: Color,
    projection: (u32, u32),
) -> impl Iterator<Item = GpuVertex> + 'a {
    let transform = *transform;
    let color = color.to_array();
    vertices.iter().map(move |v| {
        let world = transform.apply(v.position[0], v.position[1]);
        GpuVertex {
            position: to_clip(world, projection.0, projection.1),
            uv: v.tex_coords,
            color,
        }
    })
}

/// Widen `format` texels to RGBA.
///
/// Coverage-only texels become white with that alpha, so the vertex color
/// tints them.
pub fn expand_to_rgba(format: wayfarer_gpu::PixelFormat, data: &[u8]) -> Vec<u8> {
    match format {
        wayfarer_gpu::PixelFormat::Rgba => data.to_vec(),
        wayfarer_gpu::PixelFormat::Alpha => {
            data.iter().flat_map(|&a| [255, 255, 255, a]).collect()
        }
    }
}
