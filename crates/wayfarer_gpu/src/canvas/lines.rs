//! Thick and textured polylines

use wayfarer_paint::Point;

use crate::backend::{Filter, GraphicsBackend, Primitive, TextureParams, Wrap};
use crate::image::ImageId;
use crate::lines::{
    polyline_segments, ribbon_segment, ribbon_tex_coords, TexLineBuilder, RIBBON_VERTICES,
    TEX_LINE_VERTICES,
};

use super::{split_objects, Canvas};

impl<B: GraphicsBackend> Canvas<B> {
    /// Draw polylines of `counts[i]` points each with the current pen.
    ///
    /// Lines are anti-aliased ribbons regardless of `fast_draw`.
    pub fn draw_multiple_lines(&mut self, counts: &[usize], points: &[Point], fast_draw: bool) {
        let smooth = self.config.smooth_lines;
        self.draw_lines(counts, points, fast_draw, smooth);
    }

    /// Like [`Canvas::draw_multiple_lines`] with Bezier smoothing.
    pub fn draw_multiple_lines_smooth(
        &mut self,
        counts: &[usize],
        points: &[Point],
        fast_draw: bool,
    ) {
        self.draw_lines(counts, points, fast_draw, true);
    }

    fn draw_lines(&mut self, counts: &[usize], points: &[Point], _fast_draw: bool, smooth: bool) {
        if !self.state.is_ready() {
            tracing::warn!("canvas not ready, lines skipped");
            return;
        }

        let line_width = self.line_width();
        if line_width <= 0.0 {
            tracing::debug!("zero width pen, lines skipped");
            return;
        }

        self.aa.ensure(&mut self.backend, &mut self.state, self.aa_factor);
        let Some(texture) = self.aa.filled() else {
            return;
        };
        self.state.bind(&mut self.backend, texture);

        let tex_coords = ribbon_tex_coords(line_width);
        self.scratch.clear();

        for line in split_objects(points, counts) {
            for segment in polyline_segments(line, smooth) {
                let vertices = ribbon_segment(&segment, line_width, &tex_coords);
                self.scratch.extend_from_slice(&vertices);
                if self.scratch.needs_flush(RIBBON_VERTICES) {
                    self.scratch
                        .flush(&mut self.backend, Primitive::TriangleStrip);
                    tracing::debug!("line batch reached scratch capacity");
                }
            }
        }

        self.scratch
            .flush(&mut self.backend, Primitive::TriangleStrip);
    }

    /// Draw polylines repeating `image` along their length.
    ///
    /// `offset` shifts the pattern by hundredths of the image height;
    /// `opposite` mirrors it across the line.
    pub fn draw_multiple_tex_lines(
        &mut self,
        counts: &[usize],
        points: &[Point],
        _fast_draw: bool,
        image: ImageId,
        opposite: bool,
        offset: i32,
    ) {
        if !self.state.is_ready() {
            tracing::warn!("canvas not ready, textured lines skipped");
            return;
        }
        if !self.images.ensure_valid(&mut self.backend, &mut self.state, image) {
            return;
        }
        let Some((texture, width, height)) = self
            .images
            .get(image)
            .and_then(|img| img.texture().map(|t| (t, img.width(), img.height())))
        else {
            return;
        };

        self.state.bind(&mut self.backend, texture);
        self.backend
            .set_texture_params(TextureParams::new(Wrap::Repeat, Filter::Linear, Filter::Linear));

        let smooth = self.config.smooth_lines;
        let mut builder = TexLineBuilder::new(width, height, self.line_width(), opposite);
        self.scratch.clear();

        for line in split_objects(points, counts) {
            builder.begin_line(offset, line.len());
            for segment in polyline_segments(line, smooth) {
                let Some(quad) = builder.push(&segment) else {
                    continue;
                };
                self.scratch.extend_from_slice(&quad);
                if self.scratch.needs_flush(TEX_LINE_VERTICES) {
                    self.scratch.flush(&mut self.backend, Primitive::Triangles);
                    tracing::debug!("textured line batch reached scratch capacity");
                }
            }
        }

        self.scratch.flush(&mut self.backend, Primitive::Triangles);
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::Primitive;
    use crate::config::CanvasConfig;
    use crate::recording::{GlCommand, RecordingBackend};
    use crate::state::GlState;
    use crate::Canvas;
    use wayfarer_paint::Point;
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
        canvas.configure(1.0, 1.0, 2.0);
        canvas.create_pen("line");
        canvas
    }

    #[test]
    fn test_ten_vertices_per_segment() {
        let mut canvas = canvas(CanvasConfig::default());
        let points = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 0), Point::new(10, 10)];
        canvas.draw_multiple_lines(&[4], &points, false);

        let draws = canvas.backend().draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].0, Primitive::TriangleStrip);
        assert_eq!(draws[0].1.len(), 20);
        assert_eq!(canvas.state(), GlState::Image);
    }

    #[test]
    fn test_flush_at_capacity() {
        let config = CanvasConfig {
            scratch_vertices: 32,
            ..CanvasConfig::default()
        };
        let mut canvas = canvas(config);
        let points: Vec<Point> = (0..6).map(|i| Point::new(i * 10, (i % 2) * 10)).collect();
        canvas.draw_multiple_lines(&[6], &points, false);

        let sizes: Vec<usize> = canvas
            .backend()
            .draws()
            .iter()
            .map(|(_, v)| v.len())
            .collect();
        assert_eq!(sizes, vec![30, 20]);
    }

    #[test]
    fn test_aa_textures_created_once() {
        let mut canvas = canvas(CanvasConfig::default());
        let points = [Point::new(0, 0), Point::new(10, 0)];
        canvas.draw_multiple_lines(&[2], &points, false);
        canvas.draw_multiple_lines(&[2], &points, false);
        assert_eq!(canvas.backend().generated_textures(), 2);
        assert_eq!(
            canvas
                .backend()
                .count(|c| matches!(c, GlCommand::BindTexture(_))),
            2
        );
    }

    #[test]
    fn test_tex_lines_repeat_image() {
        let mut canvas = canvas(CanvasConfig::default());
        let image = canvas.new_blank_image(4, 8).unwrap();
        canvas.backend_mut().clear();

        let points = [Point::new(0, 0), Point::new(0, 40)];
        canvas.draw_multiple_tex_lines(&[2], &points, false, image, false, 0);

        let draws = canvas.backend().draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].0, Primitive::Triangles);
        assert_eq!(draws[0].1.len(), 6);
        assert!((draws[0].1[2].tex_coords[1] - 5.0).abs() < 0.02);
    }
}
