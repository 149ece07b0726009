//! Wayfarer Paint
//!
//! Leaf types shared by the canvas crates.
//!
//! # Features
//!
//! - RGBA colors parsed from `#RRGGBB[AA]` strings or a named color table
//! - Named pens interned in a registry
//! - Integer screen points, rectangles and textured vertices

pub mod color;
pub mod names;
pub mod pen;
pub mod primitives;

pub use color::Color;
pub use pen::{Pen, PenId, PenRegistry};
pub use primitives::*;
