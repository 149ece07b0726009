//! Named pens
//!
//! A pen is the stroke/background style applied to subsequent draw calls.
//! Pens are interned by name and live as long as their registry; callers hold
//! [`PenId`] handles, so a mutation through one handle is seen through all of
//! them.

use rustc_hash::FxHashMap;

use crate::color::Color;

/// Handle of a pen inside a [`PenRegistry`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PenId(u32);

impl PenId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stroke and background style
#[derive(Clone, Debug, PartialEq)]
pub struct Pen {
    name: String,
    pub stroke: Color,
    pub background: Color,
    pub line_width: f32,
}

impl Pen {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            stroke: Color::BLACK,
            background: Color::BLACK,
            line_width: 1.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the line width, never thinner than `min_thickness`.
    pub fn set_thickness(&mut self, thickness: f32, min_thickness: f32) {
        let thickness = if thickness < 0.0 {
            tracing::warn!("pen '{}': negative thickness set to 0", self.name);
            0.0
        } else {
            thickness
        };

        self.line_width = thickness.max(min_thickness);
    }

    /// Set stroke opacity from a 0-255 value. Out of range values mean opaque.
    pub fn set_opacity(&mut self, opacity: i32) {
        let opacity = if opacity <= 0 || opacity >= 255 {
            255
        } else {
            opacity
        };
        self.stroke.a = opacity as f32 / 255.0;
    }
}

/// Registry interning pens by name
#[derive(Debug, Default)]
pub struct PenRegistry {
    pens: Vec<Pen>,
    by_name: FxHashMap<String, PenId>,
}

impl PenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pen called `name`, creating it with default style first.
    pub fn create(&mut self, name: &str) -> PenId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }

        let id = PenId(self.pens.len() as u32);
        self.pens.push(Pen::new(name));
        self.by_name.insert(name.to_owned(), id);
        tracing::debug!("created pen '{}'", name);
        id
    }

    pub fn find(&self, name: &str) -> Option<PenId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: PenId) -> Option<&Pen> {
        self.pens.get(id.index())
    }

    pub fn get_mut(&mut self, id: PenId) -> Option<&mut Pen> {
        self.pens.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.pens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pen_defaults() {
        let mut pens = PenRegistry::new();
        let id = pens.create("roads");
        let pen = pens.get(id).unwrap();
        assert_eq!(pen.name(), "roads");
        assert_eq!(pen.stroke, Color::BLACK);
        assert_eq!(pen.background, Color::BLACK);
        assert_eq!(pen.line_width, 1.0);
    }

    #[test]
    fn test_thickness_clamps_to_minimum() {
        let mut pen = Pen::new("p");
        pen.set_thickness(-4.0, 2.0);
        assert_eq!(pen.line_width, 2.0);
        pen.set_thickness(1.0, 2.0);
        assert_eq!(pen.line_width, 2.0);
        pen.set_thickness(6.0, 2.0);
        assert_eq!(pen.line_width, 6.0);
    }

    #[test]
    fn test_opacity_out_of_range_is_opaque() {
        let mut pen = Pen::new("p");
        pen.set_opacity(0);
        assert_eq!(pen.stroke.a, 1.0);
        pen.set_opacity(300);
        assert_eq!(pen.stroke.a, 1.0);
        pen.set_opacity(51);
        assert!((pen.stroke.a - 0.2).abs() < 1e-6);
    }
}
