//! Anti-alias falloff textures
//!
//! Thick lines and circles are drawn as quads sampling a precomputed disc
//! (filled) or ring (outline) instead of relying on multisampling. Both are
//! 128x128 alpha textures with a hand-built mip chain down to 1x1.

use wayfarer_paint::TextureId;

use crate::backend::{Filter, GraphicsBackend, PixelFormat, TextureParams, Wrap};
use crate::state::StateCache;

/// Half size of the disc at mip level 0, in texels
pub const MAX_AA_SIZE: u32 = 32;

/// Side length of mip level 0
pub const AA_TEXTURE_SIZE: u32 = MAX_AA_SIZE * 4;

/// Falloff exponent: 0 gives a solid disc with blended edges
const FALLOFF_EXPONENT: f32 = 0.0;

/// Approximate `1 / sqrt(x)` for positive `x`.
///
/// Bit-level initial guess refined with one Newton-Raphson step. The
/// relative error stays below 2e-3.
#[inline]
pub fn fast_inverse_sqrt(x: f32) -> f32 {
    let half = 0.5 * x;
    let guess = f32::from_bits(0x5f37_59d5_u32.wrapping_sub(x.to_bits() >> 1));
    guess * (1.5 - half * guess * guess)
}

/// Which falloff texture to build
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AaShape {
    Filled,
    Ring,
}

/// One level of a mip chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MipLevel {
    pub size: u32,
    pub data: Vec<u8>,
}

/// Intensity at (`x`, `sqrt(ys)`) for a disc of half size `half`.
fn falloff(x: f32, ys: f32, exponent: f32, half: f32) -> f32 {
    let s = x * x + ys;
    let length = if s > 0.0 {
        fast_inverse_sqrt(s) * s
    } else {
        0.0
    };
    let fade = if exponent > 0.0 {
        (length / half).powf(exponent)
    } else {
        0.0
    };
    1.0 - fade
}

/// Write `intensity` to the 8 octant mirrors of (`x`, `y`).
fn put_octants(texture: &mut [u8], x: i32, y: i32, intensity: f32) {
    let dim = AA_TEXTURE_SIZE as i32;
    let center = (MAX_AA_SIZE * 3) as i32;
    let value = ((intensity * 255.0) as i32 & 0xFF) as u8;

    let mirrors = [
        (center + x, center + y),
        (center - 1 - x, center + y),
        (center + x, center - 1 - y),
        (center - 1 - x, center - 1 - y),
        (center + y, center + x),
        (center - 1 - y, center + x),
        (center + y, center - 1 - x),
        (center - 1 - y, center - 1 - x),
    ];
    for (px, py) in mirrors {
        if (0..dim).contains(&px) && (0..dim).contains(&py) {
            texture[(px + py * dim) as usize] = value;
        }
    }
}

/// Mip level 0: one octant marched with sub-texel edge blending, mirrored.
fn base_level(shape: AaShape) -> Vec<u8> {
    let half = MAX_AA_SIZE as i32;
    let mut texture = vec![0u8; (AA_TEXTURE_SIZE * AA_TEXTURE_SIZE) as usize];

    let radius_sq = ((half - 1) * (half - 1)) as f32;
    let mut x = half - 1;
    let mut y = 0;
    let mut previous = 0.0f32;

    while x > y {
        let ys = (y * y) as f32;
        let length = (radius_sq - ys).sqrt();
        let edge = length.ceil() - length;
        if edge < previous {
            x -= 1;
        }

        let start = match shape {
            AaShape::Filled => y,
            AaShape::Ring => x - 1,
        };
        for ax in start..x {
            let intensity = falloff(ax as f32, ys, FALLOFF_EXPONENT, half as f32);
            put_octants(&mut texture, ax, y, intensity);
        }

        let intensity = (1.0 - edge) * falloff(x as f32, ys, FALLOFF_EXPONENT, half as f32);
        put_octants(&mut texture, x, y, intensity);

        previous = edge;
        y += 1;
    }

    texture
}

/// Halve a square level with a rounded 2x2 box filter.
fn downsample(level: &MipLevel) -> MipLevel {
    let size = level.size / 2;
    let src = level.size as usize;
    let dst = size as usize;
    let mut data = vec![0u8; dst * dst];

    for row in 0..dst {
        for col in 0..dst {
            let i = 2 * row * src + 2 * col;
            let sum = level.data[i] as u32
                + level.data[i + 1] as u32
                + level.data[i + src] as u32
                + level.data[i + src + 1] as u32;
            data[row * dst + col] = ((sum + 2) / 4) as u8;
        }
    }

    MipLevel { size, data }
}

/// Full mip chain for `shape`: 128 down to 1, eight levels.
///
/// Levels down to 4x4 are box filtered. The 2x2 level averages the four
/// 2x2 blocks of the 4x4 level and the 1x1 level averages the 2x2 one.
pub fn build_mip_chain(shape: AaShape) -> Vec<MipLevel> {
    let mut levels = vec![MipLevel {
        size: AA_TEXTURE_SIZE,
        data: base_level(shape),
    }];

    while let Some(last) = levels.last() {
        if last.size <= 4 {
            break;
        }
        let next = downsample(last);
        levels.push(next);
    }

    let quad = match levels.last() {
        Some(level) => {
            let t = &level.data;
            let block = |a: usize| {
                ((t[a] as u32 + t[a + 1] as u32 + t[a + 4] as u32 + t[a + 5] as u32) / 4) as u8
            };
            vec![block(0), block(2), block(8), block(10)]
        }
        None => vec![0; 4],
    };
    let single = (quad.iter().map(|&v| v as u32).sum::<u32>() / 4) as u8;

    levels.push(MipLevel {
        size: 2,
        data: quad,
    });
    levels.push(MipLevel {
        size: 1,
        data: vec![single],
    });
    levels
}

/// Sampling parameters for an anti-alias factor in [0, 1].
///
/// High factors sample nearest (crisp), low factors trilinear (soft).
pub fn aa_texture_params(aa_factor: f32) -> TextureParams {
    let (min_filter, mag_filter) = if aa_factor > 0.66 {
        (Filter::Nearest, Filter::Nearest)
    } else if aa_factor > 0.33 {
        (Filter::LinearMipmapNearest, Filter::Linear)
    } else {
        (Filter::LinearMipmapLinear, Filter::Linear)
    };
    TextureParams::new(Wrap::Repeat, min_filter, mag_filter)
}

/// Lazily created falloff textures of one context
#[derive(Clone, Debug, Default)]
pub struct AaTextures {
    filled: Option<TextureId>,
    ring: Option<TextureId>,
}

impl AaTextures {
    pub fn filled(&self) -> Option<TextureId> {
        self.filled
    }

    pub fn ring(&self) -> Option<TextureId> {
        self.ring
    }

    /// Create and upload any missing texture.
    ///
    /// Does nothing for textures that already exist or when the canvas is
    /// not ready.
    pub fn ensure<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        state: &mut StateCache,
        aa_factor: f32,
    ) {
        if self.filled.is_none() {
            self.filled = Self::create(backend, state, AaShape::Filled, aa_factor);
        }
        if self.ring.is_none() {
            self.ring = Self::create(backend, state, AaShape::Ring, aa_factor);
        }
    }

    fn create<B: GraphicsBackend + ?Sized>(
        backend: &mut B,
        state: &mut StateCache,
        shape: AaShape,
        aa_factor: f32,
    ) -> Option<TextureId> {
        if !state.is_ready() {
            return None;
        }

        let texture = backend.gen_texture();
        state.bind(backend, texture);
        backend.set_texture_params(aa_texture_params(aa_factor));

        for (level, mip) in build_mip_chain(shape).iter().enumerate() {
            backend.tex_image(level as u32, mip.size, mip.size, PixelFormat::Alpha, &mip.data);
        }

        tracing::debug!("created {:?} anti-alias texture {:?}", shape, texture);
        Some(texture)
    }

    /// Forget both textures after context loss.
    pub fn reset(&mut self) {
        self.filled = None;
        self.ring = None;
    }
}
