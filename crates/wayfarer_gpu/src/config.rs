//! Canvas configuration
//!
//! Capacities that used to be compile-time constants are runtime fields so
//! tests can run with small pools. Values come from [`Default`], a TOML file,
//! or `WAYFARER_*` environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, Result};

/// Hard upper bound of tracked texture units
pub const MAX_TEXTURE_UNITS: usize = 8;

/// Polygon fill strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TessellatorKind {
    /// Sweep-line tessellation (handles self-intersections), with ear
    /// clipping as fallback
    #[default]
    Sweep,
    /// Ear clipping only
    EarClip,
}

/// Which GPU textures are deleted when an image is freed
///
/// Some drivers corrupt state when textures are deleted around a context
/// resume, so the default leaks handles until context teardown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureDeletion {
    #[default]
    Never,
    /// Only render-target images created with `new_blank`
    BlankOnly,
    Always,
}

/// Canvas configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Cap on texture units tracked by the state cache (at most 8)
    pub max_texture_units: usize,
    /// Capacity of the shared scratch vertex buffer
    pub scratch_vertices: usize,
    /// Points submitted per draw call
    pub point_batch: usize,
    /// Capacity of the unmanaged image list
    pub unmanaged_capacity: usize,
    /// Side length of image and glyph atlas pages
    pub atlas_size: u32,
    /// Number of glyphs kept in the glyph cache
    pub glyph_cache_capacity: usize,
    pub default_font_size: i32,
    pub max_text_chars: usize,
    /// Pen width floor before `configure` supplies a thickness factor
    pub min_thickness: f32,
    /// Reorder right-to-left runs before layout
    pub bidi: bool,
    /// Bezier-smooth every polyline
    pub smooth_lines: bool,
    pub tessellator: TessellatorKind,
    pub texture_deletion: TextureDeletion,
    /// Largest size a padded image may have per side
    pub max_padded_dimension: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            max_texture_units: MAX_TEXTURE_UNITS,
            scratch_vertices: 12_288,
            point_batch: 512,
            unmanaged_capacity: 200,
            atlas_size: 512,
            glyph_cache_capacity: 1024,
            default_font_size: 14,
            max_text_chars: 255,
            min_thickness: 2.0,
            bidi: true,
            smooth_lines: false,
            tessellator: TessellatorKind::Sweep,
            texture_deletion: TextureDeletion::Never,
            max_padded_dimension: 1024,
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
}

impl CanvasConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|e| CanvasError::Config(e.to_string()))?;
        Ok(config.sanitized())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| CanvasError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Apply `WAYFARER_*` environment overrides.
    ///
    /// Env:
    /// - WAYFARER_MAX_TEXTURE_UNITS=4
    /// - WAYFARER_SCRATCH_VERTICES=12288
    /// - WAYFARER_UNMANAGED_CAPACITY=200
    /// - WAYFARER_ATLAS_SIZE=512
    /// - WAYFARER_GLYPH_CACHE=1024
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(v) = env_usize("WAYFARER_MAX_TEXTURE_UNITS") {
            self.max_texture_units = v;
        }
        if let Some(v) = env_usize("WAYFARER_SCRATCH_VERTICES") {
            self.scratch_vertices = v;
        }
        if let Some(v) = env_usize("WAYFARER_UNMANAGED_CAPACITY") {
            self.unmanaged_capacity = v;
        }
        if let Some(v) = env_usize("WAYFARER_ATLAS_SIZE") {
            match u32::try_from(v) {
                Ok(size) => self.atlas_size = size,
                Err(_) => tracing::warn!("WAYFARER_ATLAS_SIZE={} out of range, ignored", v),
            }
        }
        if let Some(v) = env_usize("WAYFARER_GLYPH_CACHE") {
            self.glyph_cache_capacity = v;
        }
        self.sanitized()
    }

    /// Clamp fields into ranges the canvas can work with.
    pub fn sanitized(mut self) -> Self {
        self.max_texture_units = self.max_texture_units.clamp(1, MAX_TEXTURE_UNITS);
        // one thick-line segment plus the flush headroom
        self.scratch_vertices = self.scratch_vertices.max(32);
        self.point_batch = self.point_batch.max(1);
        self.atlas_size = self.atlas_size.max(1);
        self.glyph_cache_capacity = self.glyph_cache_capacity.max(1);
        if self.default_font_size <= 0 {
            self.default_font_size = 14;
        }
        self
    }

    pub(crate) fn log(&self) {
        tracing::info!(
            "canvas config: texture_units={}, scratch_vertices={}, unmanaged_capacity={}, atlas_size={}, glyph_cache={}, tessellator={:?}, texture_deletion={:?}",
            self.max_texture_units,
            self.scratch_vertices,
            self.unmanaged_capacity,
            self.atlas_size,
            self.glyph_cache_capacity,
            self.tessellator,
            self.texture_deletion
        );
    }
}
