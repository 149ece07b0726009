//! Logical GL state and the texture-unit cache
//!
//! Every draw asks for the state it needs. The cache only programs the
//! backend when the request differs from what is already in effect.

use smallvec::{smallvec, SmallVec};
use wayfarer_paint::TextureId;

use crate::backend::GraphicsBackend;
use crate::config::MAX_TEXTURE_UNITS;

/// Logical pipeline state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GlState {
    /// No live context; every request is refused
    #[default]
    NotReady,
    /// Untextured geometry
    Geometry,
    /// Textured geometry with a texture bound on the active unit
    Image,
    /// Untextured geometry, disabling texturing unconditionally
    ForceGeometry,
}

/// Which texture each hardware unit holds
#[derive(Clone, Debug, Default)]
pub struct TextureUnits {
    units: SmallVec<[Option<TextureId>; MAX_TEXTURE_UNITS]>,
    current: usize,
}

impl TextureUnits {
    pub fn new(count: usize) -> Self {
        Self {
            units: smallvec![None; count],
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn get(&self, unit: usize) -> Option<TextureId> {
        self.units.get(unit).copied().flatten()
    }

    /// Whether the active unit holds `texture`
    pub fn current_holds(&self, texture: TextureId) -> bool {
        self.get(self.current) == Some(texture)
    }

    /// Unit to use for `texture`: the one already holding it, else the
    /// first free one, else the unit after the current one.
    pub fn select(&self, texture: TextureId) -> usize {
        if self.units.is_empty() {
            return 0;
        }
        if let Some(unit) = self.units.iter().position(|&t| t == Some(texture)) {
            return unit;
        }
        if let Some(unit) = self.units.iter().position(Option::is_none) {
            return unit;
        }
        (self.current + 1) % self.units.len()
    }

    pub fn set_current(&mut self, unit: usize) {
        self.current = unit;
    }

    pub fn assign(&mut self, unit: usize, texture: TextureId) {
        if let Some(slot) = self.units.get_mut(unit) {
            *slot = Some(texture);
        }
    }

    /// Drop `texture` from every unit holding it.
    pub fn forget(&mut self, texture: TextureId) {
        for slot in self.units.iter_mut().filter(|t| **t == Some(texture)) {
            *slot = None;
        }
    }

    pub fn clear(&mut self) {
        self.units.iter_mut().for_each(|slot| *slot = None);
        self.current = 0;
    }
}

/// State machine over [`GlState`] and [`TextureUnits`]
#[derive(Clone, Debug)]
pub struct StateCache {
    state: GlState,
    units: TextureUnits,
    texturing: bool,
    unit_cap: usize,
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new(MAX_TEXTURE_UNITS)
    }
}

impl StateCache {
    pub fn new(unit_cap: usize) -> Self {
        Self {
            state: GlState::NotReady,
            units: TextureUnits::default(),
            texturing: false,
            unit_cap: unit_cap.min(MAX_TEXTURE_UNITS),
        }
    }

    pub fn state(&self) -> GlState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state != GlState::NotReady
    }

    pub fn units(&self) -> &TextureUnits {
        &self.units
    }

    pub fn texturing(&self) -> bool {
        self.texturing
    }

    /// Cap the tracked units, clamped to [`MAX_TEXTURE_UNITS`].
    ///
    /// Takes effect at the next [`StateCache::configure_units`].
    pub fn set_max_texture_units(&mut self, units: usize) {
        self.unit_cap = units.min(MAX_TEXTURE_UNITS);
    }

    /// Size the unit table from what the backend reports.
    pub fn configure_units(&mut self, backend_units: usize) {
        let count = backend_units.min(self.unit_cap).max(1);
        tracing::info!(
            "texture units: backend={}, cap={}, using={}",
            backend_units,
            self.unit_cap,
            count
        );
        self.units = TextureUnits::new(count);
    }

    /// Record `state` as current without programming the backend.
    pub fn assume(&mut self, state: GlState) {
        self.state = state;
    }

    /// Forget cached bindings and mark the context lost.
    pub fn shutdown(&mut self) {
        self.state = GlState::NotReady;
        self.texturing = false;
        self.units.clear();
    }

    /// Drop `texture` from the unit table after deletion.
    pub fn forget_texture(&mut self, texture: TextureId) {
        self.units.forget(texture);
    }

    /// Request an untextured state.
    ///
    /// Returns false when the canvas is not ready.
    pub fn set_state<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B, state: GlState) -> bool {
        self.transition(backend, state, None)
    }

    /// Request the textured state with `texture` bound on the active unit.
    pub fn bind<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B, texture: TextureId) -> bool {
        self.transition(backend, GlState::Image, Some(texture))
    }

    fn transition<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        requested: GlState,
        texture: Option<TextureId>,
    ) -> bool {
        if !self.is_ready() {
            tracing::warn!("canvas not ready, state request {:?} ignored", requested);
            return false;
        }

        if self.state == requested
            && (requested != GlState::Image
                || texture.is_some_and(|t| self.units.current_holds(t)))
        {
            return true;
        }

        match requested {
            GlState::NotReady => {
                tracing::warn!("NotReady is not a requestable state");
                return false;
            }
            GlState::ForceGeometry => {
                backend.set_texturing(false);
                self.texturing = false;
            }
            GlState::Geometry => {
                if self.texturing {
                    backend.set_texturing(false);
                    self.texturing = false;
                }
            }
            GlState::Image => {
                let Some(texture) = texture else {
                    tracing::warn!("textured state requested without a texture");
                    return false;
                };
                if !self.units.current_holds(texture) {
                    if self.texturing {
                        backend.set_texturing(false);
                    }
                    let unit = self.units.select(texture);
                    self.units.set_current(unit);
                    backend.active_texture(unit);
                    backend.set_texturing(true);
                    self.texturing = true;

                    if !self.units.current_holds(texture) {
                        self.units.assign(unit, texture);
                        backend.bind_texture(texture);
                    }
                } else if !self.texturing {
                    backend.set_texturing(true);
                    self.texturing = true;
                }
            }
        }

        self.state = requested;
        true
    }
}
