use std::io::Cursor;

use wayfarer_gpu::{
    Canvas, CanvasConfig, CanvasError, Corner, GlCommand, ImageMode, Point, RecordingBackend,
    Rect, TextureDeletion,
};
use wayfarer_text::{FontMetrics, GlyphKey, GlyphRaster, GlyphSource};

struct NoGlyphs;

impl GlyphSource for NoGlyphs {
    fn rasterize(&mut self, _key: GlyphKey) -> Option<GlyphRaster> {
        None
    }

    fn font_metrics(&mut self, _size: u32, _bold: bool) -> FontMetrics {
        FontMetrics::default()
    }
}

fn canvas(config: CanvasConfig) -> Canvas<RecordingBackend> {
    let mut canvas = Canvas::new(RecordingBackend::default(), config, Box::new(NoGlyphs));
    canvas.configure(1.0, 1.0, 1.0);
    canvas.create_pen("default");
    canvas
}

fn write_png(name: &str, width: u32, height: u32) -> std::path::PathBuf {
    let pixels = vec![128u8; (width * height * 4) as usize];
    let buffer = image::RgbaImage::from_raw(width, height, pixels).unwrap();
    let mut bytes = Vec::new();
    buffer
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();

    let dir = std::env::temp_dir().join("wayfarer_gpu_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn drawing_after_shutdown_issues_no_commands() {
    let mut canvas = canvas(CanvasConfig::default());
    let image = canvas.image_from_buffer(4, 4, vec![0; 64]).unwrap();
    canvas.shutdown();
    canvas.backend_mut().clear();

    let line = [Point::new(0, 0), Point::new(20, 20), Point::new(40, 0)];
    canvas.erase();
    canvas.erase_area(Rect::new(0, 0, 10, 10));
    canvas.draw_multiple_points(&line);
    canvas.draw_multiple_lines(&[3], &line, false);
    canvas.draw_multiple_polygons(&[3], &line, true, false);
    canvas.draw_multiple_circles(&[Point::new(5, 5)], &[3], true, false);
    canvas.draw_multiple_tex_lines(&[3], &line, false, image, false, 0);
    canvas.draw_string(Point::new(0, 0), Corner::TopLeft, "closed");
    canvas.draw_image(image, Point::new(0, 0), 255, ImageMode::Normal);
    canvas.set_foreground("red");

    assert!(canvas.backend().commands().is_empty());
    assert!(matches!(
        canvas.begin_draw_to_image(image),
        Err(CanvasError::NotReady)
    ));
}

#[test]
fn unmanaged_image_restored_after_resume() {
    let mut canvas = canvas(CanvasConfig::default());
    let image = canvas.image_from_buffer(8, 8, vec![255; 256]).unwrap();

    canvas.shutdown();
    assert!(!canvas.images().get(image).unwrap().is_valid());
    assert_eq!(canvas.images().atlas().page_count(), 0);

    canvas.configure(1.0, 1.0, 1.0);
    canvas.backend_mut().clear();
    canvas.draw_image(image, Point::new(0, 0), 255, ImageMode::Normal);

    let backend = canvas.backend();
    assert!(canvas.images().get(image).unwrap().is_valid());
    assert_eq!(backend.generated_textures(), 1);
    assert_eq!(
        backend.count(|c| matches!(c, GlCommand::TexSubImage { .. })),
        1
    );
    assert_eq!(backend.draws().len(), 1);
}

#[test]
fn file_image_reloaded_after_resume() {
    let path = write_png("marker.png", 6, 3);
    let mut canvas = canvas(CanvasConfig::default());
    let image = canvas.load_image(&path).unwrap();
    assert_eq!(canvas.images().get(image).unwrap().width(), 6);

    canvas.shutdown();
    canvas.configure(1.0, 1.0, 1.0);
    canvas.draw_image(image, Point::new(0, 0), 255, ImageMode::Normal);

    let restored = canvas.images().get(image).unwrap();
    assert!(restored.is_valid());
    assert!(!restored.has_pixels());
}

#[test]
fn image_loaded_before_configure_uploads_on_first_draw() {
    let path = write_png("early.png", 2, 2);
    let mut canvas = Canvas::new(
        RecordingBackend::default(),
        CanvasConfig::default(),
        Box::new(NoGlyphs),
    );
    let image = canvas.load_image(&path).unwrap();
    assert!(!canvas.images().get(image).unwrap().is_valid());
    assert!(canvas.backend().commands().is_empty());

    canvas.configure(1.0, 1.0, 1.0);
    canvas.draw_image(image, Point::new(0, 0), 255, ImageMode::Normal);
    assert!(canvas.images().get(image).unwrap().is_valid());
    assert_eq!(canvas.backend().draws().len(), 1);
}

#[test]
fn unmanaged_list_capacity_is_enforced() {
    let mut canvas = canvas(CanvasConfig {
        unmanaged_capacity: 2,
        ..CanvasConfig::default()
    });
    let first = canvas.image_from_buffer(1, 1, vec![0; 4]).unwrap();
    canvas.image_from_buffer(1, 1, vec![0; 4]).unwrap();

    let full = canvas.image_from_buffer(1, 1, vec![0; 4]);
    assert!(matches!(
        full,
        Err(CanvasError::UnmanagedListFull { capacity: 2 })
    ));
    assert_eq!(canvas.images().len(), 2);

    canvas.free_image(first).unwrap();
    assert!(canvas.image_from_buffer(1, 1, vec![0; 4]).is_ok());
    assert_eq!(canvas.invalidate_all_images(), 2);
}

#[test]
fn deletion_policy_controls_freed_textures() {
    let config = CanvasConfig {
        atlas_size: 8,
        ..CanvasConfig::default()
    };

    let mut keeping = canvas(config.clone());
    let image = keeping.image_from_buffer(16, 16, vec![0; 1024]).unwrap();
    keeping.free_image(image).unwrap();
    assert_eq!(
        keeping
            .backend()
            .count(|c| matches!(c, GlCommand::DeleteTexture(_))),
        0
    );

    let mut deleting = canvas(CanvasConfig {
        texture_deletion: TextureDeletion::Always,
        ..config
    });
    let image = deleting.image_from_buffer(16, 16, vec![0; 1024]).unwrap();
    let texture = deleting.images().get(image).unwrap().texture().unwrap();
    deleting.free_image(image).unwrap();
    assert!(deleting
        .backend()
        .commands()
        .contains(&GlCommand::DeleteTexture(texture)));
    assert!(matches!(
        deleting.free_image(image),
        Err(CanvasError::UnknownImage)
    ));
}

#[test]
fn buffer_copy_drops_padding() {
    let mut canvas = canvas(CanvasConfig {
        atlas_size: 4,
        ..CanvasConfig::default()
    });
    let pixels: Vec<u8> = (0..5 * 3 * 4).map(|i| i as u8).collect();
    let image = canvas.image_from_buffer(5, 3, pixels.clone()).unwrap();

    let copy = canvas.buffer_from_image(image).unwrap();
    assert_eq!(copy.dimensions(), (5, 3));
    assert_eq!(copy.pixels(), pixels.as_slice());
}
