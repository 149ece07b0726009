//! Color types and parsing

use crate::names;

/// RGBA color with f32 components (0.0 to 1.0)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create from u8 components (0-255)
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Create from a packed 0xRRGGBB value, fully opaque
    pub const fn from_rgb_u32(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as f32 / 255.0,
            g: ((rgb >> 8) & 0xFF) as f32 / 255.0,
            b: (rgb & 0xFF) as f32 / 255.0,
            a: 1.0,
        }
    }

    /// Parse a color description.
    ///
    /// Accepts `#RRGGBB`, `#RRGGBBAA` or a color name from the built-in
    /// table. Anything else resolves to opaque black.
    pub fn parse(description: &str) -> Self {
        let description = description.trim();

        if let Some(hex) = description.strip_prefix('#') {
            return match parse_hex(hex) {
                Some(color) => color,
                None => {
                    tracing::warn!("invalid hex color '{}', using black", description);
                    Self::BLACK
                }
            };
        }

        match names::lookup(description) {
            Some(color) => color,
            None => {
                tracing::debug!("unknown color name '{}', using black", description);
                Self::BLACK
            }
        }
    }

    /// Multiply alpha and return new color
    pub fn scale_alpha(self, factor: f32) -> Self {
        Self {
            a: self.a * factor,
            ..self
        }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Read leading hex pairs; three pairs give an opaque color, four carry alpha.
fn parse_hex(hex: &str) -> Option<Color> {
    let mut channels = [0u8; 4];
    let mut count = 0;

    for (slot, chunk) in channels.iter_mut().zip(hex.as_bytes().chunks(2)) {
        if chunk.len() != 2 {
            break;
        }
        let Ok(pair) = std::str::from_utf8(chunk) else {
            break;
        };
        let Ok(value) = u8::from_str_radix(pair, 16) else {
            break;
        };
        *slot = value;
        count += 1;
    }

    match count {
        3 => Some(Color::from_rgba8(channels[0], channels[1], channels[2], 255)),
        4 => Some(Color::from_rgba8(
            channels[0],
            channels[1],
            channels[2],
            channels[3],
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_parse_hex_with_alpha() {
        let c = Color::parse("#FF000080");
        assert!(close(c.r, 1.0));
        assert!(close(c.g, 0.0));
        assert!(close(c.b, 0.0));
        assert!(close(c.a, 0.502));
    }

    #[test]
    fn test_parse_hex_without_alpha_is_opaque() {
        let c = Color::parse("#336699");
        assert!(close(c.r, 0.2));
        assert!(close(c.g, 0.4));
        assert!(close(c.b, 0.6));
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_parse_hex_stops_at_garbage() {
        let c = Color::parse("#00FF00zz");
        assert_eq!(c, Color::rgb(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_parse_short_hex_is_black() {
        assert_eq!(Color::parse("#FFF"), Color::BLACK);
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(Color::parse("white"), Color::WHITE);
        assert_eq!(Color::parse("red"), Color::rgb(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_parse_unknown_name_is_opaque_black() {
        assert_eq!(Color::parse("not-a-color"), Color::BLACK);
    }

    #[test]
    fn test_scale_alpha() {
        let c = Color::new(0.1, 0.2, 0.3, 0.5).scale_alpha(0.5);
        assert_eq!(c.a, 0.25);
        assert_eq!(c.r, 0.1);
    }
}
