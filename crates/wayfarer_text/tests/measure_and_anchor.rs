use std::collections::HashMap;

use wayfarer_paint::{Corner, Point, TextureId};
use wayfarer_text::{
    anchor_origin, AtlasRegion, FontMetrics, GlyphKey, GlyphProvider, PlacedGlyph,
    TextLayoutEngine,
};

/// Digits with fixed advances, rasterized at twice the requested size.
struct DigitProvider {
    advances: HashMap<char, f32>,
    requests: Vec<GlyphKey>,
}

impl DigitProvider {
    fn new() -> Self {
        let advances = [('1', 7.0), ('2', 8.0), ('3', 9.0)].into_iter().collect();
        Self {
            advances,
            requests: Vec::new(),
        }
    }
}

impl GlyphProvider for DigitProvider {
    fn glyph(&mut self, key: GlyphKey) -> Option<PlacedGlyph> {
        self.requests.push(key);
        let advance_x = *self.advances.get(&key.codepoint)?;
        let edge = AtlasRegion {
            texture: TextureId(2),
            x: 0,
            y: 0,
            width: 8,
            height: 12,
        };
        let fill = AtlasRegion {
            texture: TextureId(1),
            x: 0,
            y: 0,
            width: 6,
            height: 10,
        };
        Some(PlacedGlyph {
            advance_x,
            left: 0.0,
            top: 10.0,
            fill: Some(fill),
            outline: Some(edge),
        })
    }

    fn font_metrics(&mut self, _size: u32, _bold: bool) -> FontMetrics {
        FontMetrics {
            ascent: 11,
            descent: 3,
        }
    }

    fn actual_size(&self, size: u32) -> f32 {
        size as f32 * 2.0
    }

    fn atlas_size(&self) -> u32 {
        512
    }
}

#[test]
fn digits_measure_with_scale_factor() {
    let engine = TextLayoutEngine::default();
    let mut provider = DigitProvider::new();

    let extents = engine.measure(&mut provider, "123", 14, true);
    // (7 + 8 + 9) * 14 / 28
    assert_eq!(extents.width, 12);
    assert_eq!(extents.height(), 14);
    assert!(provider.requests.iter().all(|key| key.bold && key.size == 14));
}

#[test]
fn default_size_applies_to_negative_sizes() {
    let engine = TextLayoutEngine::new(2.0);
    let mut provider = DigitProvider::new();

    engine.measure(&mut provider, "1", -1, false);
    assert_eq!(provider.requests[0].size, 28);
}

#[test]
fn empty_label_has_zero_extents() {
    let engine = TextLayoutEngine::default();
    let mut provider = DigitProvider::new();

    let extents = engine.measure(&mut provider, "", 14, false);
    assert_eq!(extents.width, 0);
    assert_eq!(extents.height(), 0);
    assert!(provider.requests.is_empty());
}

#[test]
fn unknown_glyphs_are_skipped_without_advance() {
    let engine = TextLayoutEngine::default();
    let mut provider = DigitProvider::new();

    let layout = engine.layout(&mut provider, "1x2", 14, false, false).unwrap();
    assert_eq!(layout.fill.len(), 2);
    assert_eq!(layout.advance, 7.5);
}

#[test]
fn outline_pass_centers_enlarged_quads() {
    let engine = TextLayoutEngine::default();
    let mut provider = DigitProvider::new();

    let layout = engine.layout(&mut provider, "1", 14, false, true).unwrap();
    assert_eq!(layout.outline.len(), 1);
    assert_eq!(layout.fill.len(), 1);

    let outline = layout.outline[0];
    let fill = layout.fill[0];
    assert_eq!(outline.texture, TextureId(2));
    assert_eq!(fill.texture, TextureId(1));

    // outline is 2x2 px larger at scale 0.5, centered over the fill
    assert_eq!(fill.vertices[0].position, [-0.5, -5.5]);
    assert_eq!(outline.vertices[0].position, [-1.0, -6.0]);
}

#[test]
fn long_labels_are_truncated() {
    let engine = TextLayoutEngine::default().with_max_chars(2);
    let mut provider = DigitProvider::new();

    let layout = engine.layout(&mut provider, "123", 14, false, false).unwrap();
    assert_eq!(layout.fill.len(), 2);
}

#[test]
fn every_corner_anchors_relative_to_extents() {
    let engine = TextLayoutEngine::default();
    let mut provider = DigitProvider::new();
    let extents = engine.measure(&mut provider, "123", 14, false);
    let at = Point::new(50, 50);

    let cases = [
        (Corner::TopLeft, Point::new(50, 64)),
        (Corner::TopRight, Point::new(38, 64)),
        (Corner::BottomRight, Point::new(38, 50)),
        (Corner::BottomLeft, Point::new(50, 50)),
        (Corner::TopMiddle, Point::new(44, 64)),
        (Corner::BottomMiddle, Point::new(44, 50)),
        (Corner::CenterMiddle, Point::new(44, 56)),
        (Corner::CenterRight, Point::new(38, 56)),
        (Corner::CenterLeft, Point::new(50, 56)),
    ];
    for (corner, expected) in cases {
        assert_eq!(anchor_origin(corner, at, &extents), expected, "{:?}", corner);
    }
}
