use wayfarer_gpu::{
    Canvas, CanvasConfig, Color, Corner, GlCommand, GlState, ImageMode, Point, Primitive,
    RecordingBackend, TextStyle,
};
use wayfarer_text::{Bitmap, FontMetrics, GlyphKey, GlyphRaster, GlyphSource};

/// Digits advance by their value plus one pixel
struct DigitFont;

impl GlyphSource for DigitFont {
    fn rasterize(&mut self, key: GlyphKey) -> Option<GlyphRaster> {
        let digit = key.codepoint.to_digit(10)?;
        Some(GlyphRaster {
            advance_x: digit as f32 + 1.0,
            left: 0.0,
            top: 4.0,
            fill: Some(Bitmap::new(2, 4, vec![255; 8])),
            outline: None,
        })
    }

    fn font_metrics(&mut self, _size: u32, _bold: bool) -> FontMetrics {
        FontMetrics {
            ascent: 4,
            descent: 1,
        }
    }
}

fn canvas(config: CanvasConfig) -> Canvas<RecordingBackend> {
    let mut canvas = Canvas::new(RecordingBackend::default(), config, Box::new(DigitFont));
    canvas.configure(1.0, 1.0, 1.0);
    canvas.create_pen("default");
    canvas
}

fn pts(coords: &[(i32, i32)]) -> Vec<Point> {
    coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

#[test]
fn configure_preloads_digit_glyphs() {
    let canvas = canvas(CanvasConfig::default());
    assert_eq!(canvas.glyphs().cached(), 10);
    assert_eq!(canvas.glyphs().atlas().page_count(), 1);
}

#[test]
fn measured_width_is_sum_of_advances() {
    let mut canvas = canvas(CanvasConfig::default());
    let extents = canvas.text_extents("123", -1);
    assert_eq!(extents.width, 2 + 3 + 4);
    assert_eq!(extents.height(), 5);

    let plain = canvas.formatted_text_extents("123", -1, TextStyle::PLAIN);
    assert_eq!(plain.width, extents.width);
}

#[test]
fn preloaded_label_draws_without_uploads() {
    let mut canvas = canvas(CanvasConfig::default());
    canvas.backend_mut().clear();
    canvas.draw_string(Point::new(50, 50), Corner::CenterMiddle, "2024");

    let backend = canvas.backend();
    assert_eq!(
        backend.count(|c| matches!(c, GlCommand::TexSubImage { .. })),
        0
    );
    let draws = backend.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].1.len(), 4 * 6);
}

#[test]
fn repeated_image_draws_bind_once() {
    let mut canvas = canvas(CanvasConfig::default());
    let image = canvas.image_from_buffer(4, 4, vec![255; 64]).unwrap();
    canvas.erase_area(wayfarer_gpu::Rect::new(0, 0, 4, 4));
    canvas.backend_mut().clear();

    for x in 0..3 {
        canvas.draw_image(image, Point::new(x * 10, 0), 255, ImageMode::Normal);
    }

    let backend = canvas.backend();
    assert_eq!(backend.draws().len(), 3);
    assert_eq!(backend.count(|c| matches!(c, GlCommand::BindTexture(_))), 0);
    assert_eq!(
        backend.count(|c| matches!(c, GlCommand::SetTexturing(true))),
        1
    );
    assert_eq!(canvas.state(), GlState::Image);
}

#[test]
fn geometry_after_image_disables_texturing_once() {
    let mut canvas = canvas(CanvasConfig::default());
    let image = canvas.image_from_buffer(4, 4, vec![255; 64]).unwrap();
    canvas.draw_image(image, Point::new(0, 0), 255, ImageMode::Normal);
    canvas.backend_mut().clear();

    canvas.draw_multiple_points(&pts(&[(1, 1)]));
    canvas.draw_multiple_points(&pts(&[(2, 2)]));
    assert_eq!(
        canvas
            .backend()
            .count(|c| matches!(c, GlCommand::SetTexturing(false))),
        1
    );
}

#[test]
fn pen_edits_visible_through_every_handle() {
    let mut canvas = canvas(CanvasConfig::default());
    let road = canvas.create_pen("road");
    canvas.create_pen("water");
    let again = canvas.create_pen("road");
    assert_eq!(road, again);

    canvas.set_foreground("#FF000080");
    canvas.set_thickness(7);

    let pen = canvas.pen(road).unwrap();
    assert_eq!(pen.line_width, 7.0);
    assert_eq!((pen.stroke.r, pen.stroke.g, pen.stroke.b), (1.0, 0.0, 0.0));
    assert!((pen.stroke.a - 128.0 / 255.0).abs() < 1e-6);
    assert_eq!(canvas.pens().len(), 3);
}

#[test]
fn selected_color_is_sent_once() {
    let mut canvas = canvas(CanvasConfig::default());
    let red = canvas.create_pen("red");
    canvas.set_foreground("red");
    let blue = canvas.create_pen("blue");
    canvas.set_foreground("blue");
    canvas.backend_mut().clear();

    canvas.select_pen(red);
    canvas.select_pen(red);
    canvas.select_pen(blue);
    let colors: Vec<&GlCommand> = canvas
        .backend()
        .commands()
        .iter()
        .filter(|c| matches!(c, GlCommand::SetColor(_)))
        .collect();
    assert_eq!(colors.len(), 2);
    assert_eq!(*colors[0], GlCommand::SetColor(Color::parse("red")));
}

#[test]
fn lines_share_batches_across_objects() {
    let mut canvas = canvas(CanvasConfig {
        scratch_vertices: 32,
        ..CanvasConfig::default()
    });
    canvas.backend_mut().clear();
    let points = pts(&[
        (0, 0),
        (10, 0),
        (10, 10),
        (50, 50),
        (60, 50),
        (60, 70),
        (80, 90),
    ]);
    canvas.draw_multiple_lines(&[3, 4], &points, false);

    let sizes: Vec<usize> = canvas
        .backend()
        .draws()
        .iter()
        .map(|(primitive, v)| {
            assert_eq!(*primitive, Primitive::TriangleStrip);
            v.len()
        })
        .collect();
    assert_eq!(sizes, vec![30, 20]);
}

#[test]
fn polygons_stop_at_short_point_list() {
    let mut canvas = canvas(CanvasConfig::default());
    canvas.backend_mut().clear();
    let points = pts(&[(0, 0), (10, 0), (10, 10), (0, 10), (20, 20)]);
    canvas.draw_multiple_polygons(&[4, 3], &points, true, true);
    assert_eq!(canvas.backend().draws().len(), 1);
}

#[test]
fn config_loads_from_toml() {
    let config = CanvasConfig::from_toml_str(
        r#"
        scratch_vertices = 8
        smooth_lines = true
        "#,
    )
    .unwrap();
    assert_eq!(config.scratch_vertices, 32);
    assert!(config.smooth_lines);
    assert_eq!(config.point_batch, 512);
}

/// Every lowercase letter is a solid 8x8 block
struct LetterFont;

impl GlyphSource for LetterFont {
    fn rasterize(&mut self, key: GlyphKey) -> Option<GlyphRaster> {
        if !key.codepoint.is_ascii_lowercase() {
            return None;
        }
        Some(GlyphRaster {
            advance_x: 9.0,
            left: 0.0,
            top: 8.0,
            fill: Some(Bitmap::new(8, 8, vec![255; 64])),
            outline: None,
        })
    }

    fn font_metrics(&mut self, _size: u32, _bold: bool) -> FontMetrics {
        FontMetrics {
            ascent: 8,
            descent: 2,
        }
    }
}

#[test]
fn glyph_churn_keeps_atlas_bounded() {
    let config = CanvasConfig {
        glyph_cache_capacity: 16,
        atlas_size: 64,
        ..CanvasConfig::default()
    };
    let mut canvas = Canvas::new(RecordingBackend::default(), config, Box::new(LetterFont));
    canvas.configure(1.0, 1.0, 1.0);
    canvas.create_pen("default");

    for _ in 0..50 {
        let extents = canvas.text_extents("abcdefghijklmnopqrstuvwxyz", -1);
        assert_eq!(extents.width, 26 * 9);
    }
    assert_eq!(canvas.glyphs().cached(), 16);
    assert_eq!(canvas.glyphs().atlas().page_count(), 1);
}
