//! wgpu backend for the Wayfarer canvas
//!
//! [`WgpuBackend`] implements [`wayfarer_gpu::GraphicsBackend`] by
//! recording canvas calls and replaying them as render passes once per
//! frame. Matrix and primitive handling happen on the CPU.

pub mod backend;
pub mod error;
pub mod geometry;
pub mod matrix;
pub mod shader;

pub use backend::WgpuBackend;
pub use error::{BackendError, Result};
pub use geometry::GpuVertex;
pub use matrix::{Affine, MatrixStack};
