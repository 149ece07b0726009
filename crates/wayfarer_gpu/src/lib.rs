//! Wayfarer canvas rendering core
//!
//! This crate provides:
//! - The [`GraphicsBackend`] seam and a command-recording backend
//! - A texture-unit cache and the GL state machine
//! - Anti-alias falloff textures for lines and circles
//! - Polygon triangulation and sweep tessellation
//! - Image management with restore after context loss
//! - Shelf-packed image and glyph atlases
//! - The [`Canvas`] render context tying them together

pub mod aa;
pub mod atlas;
pub mod backend;
pub mod canvas;
pub mod config;
pub mod error;
pub mod glyphs;
pub mod image;
pub mod lines;
pub mod recording;
pub mod scratch;
pub mod state;
pub mod tessellate;
pub mod triangulate;

pub use aa::AaTextures;
pub use atlas::{ShelfPacker, TextureAtlas};
pub use backend::{
    Filter, FramebufferId, GraphicsBackend, PixelFormat, Primitive, TextureParams, Wrap,
};
pub use canvas::{Canvas, TextStyle};
pub use config::{CanvasConfig, TessellatorKind, TextureDeletion, MAX_TEXTURE_UNITS};
pub use error::{CanvasError, Result};
pub use glyphs::GlyphAtlas;
pub use image::{Image, ImageId, ImageKind, ImageMode, ImageStore, Restore, UnmanagedList};
pub use recording::{GlCommand, RecordingBackend};
pub use state::{GlState, StateCache, TextureUnits};

pub use wayfarer_paint::{Color, Corner, Pen, PenId, Point, Rect, TextureId, Vertex};
pub use wayfarer_text::{GlyphSource, TextExtents};
