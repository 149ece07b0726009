//! Polygon fills and anti-aliased circles

use wayfarer_paint::{Point, Vertex};

use crate::aa::MAX_AA_SIZE;
use crate::backend::{GraphicsBackend, Primitive};
use crate::config::TessellatorKind;
use crate::state::GlState;
use crate::tessellate::tessellate_ring;
use crate::triangulate::triangulate;

use super::{split_objects, Canvas};

/// Width of the anti-aliasing outline drawn around polygons
const POLYGON_OUTLINE_WIDTH: f32 = 2.0;

/// Whether the first corner is axis aligned, which makes an outline pass
/// pointless.
fn starts_axis_aligned(polygon: &[Point]) -> bool {
    let [p0, p1, p2, ..] = polygon else {
        return false;
    };
    (p0.x == p1.x || p1.x == p2.x) && (p0.y == p1.y || p1.y == p2.y)
}

/// `polygon` with its first point appended unless already closed.
fn closed_ring(polygon: &[Point]) -> Vec<Point> {
    let mut ring = polygon.to_vec();
    if let (Some(&first), Some(&last)) = (polygon.first(), polygon.last()) {
        if first != last {
            ring.push(first);
        }
    }
    ring
}

fn to_vertex(p: &Point) -> Vertex {
    Vertex::at(p.x as f32, p.y as f32)
}

impl<B: GraphicsBackend> Canvas<B> {
    /// Draw polygons of `counts[i]` points each.
    ///
    /// Filled polygons get a thin anti-aliased outline unless `fast_draw` is
    /// set or they start with an axis aligned corner.
    pub fn draw_multiple_polygons(
        &mut self,
        counts: &[usize],
        points: &[Point],
        filled: bool,
        fast_draw: bool,
    ) {
        if !self.state.set_state(&mut self.backend, GlState::Geometry) {
            return;
        }

        for polygon in split_objects(points, counts) {
            let should_aa = !fast_draw && !starts_axis_aligned(polygon);

            if !filled || should_aa {
                let ring = closed_ring(polygon);
                let saved = self.line_width();
                self.set_line_width(POLYGON_OUTLINE_WIDTH);
                self.draw_multiple_lines(&[ring.len()], &ring, fast_draw);
                self.state.set_state(&mut self.backend, GlState::Geometry);
                self.set_line_width(saved);
            }

            if filled {
                let triangles = self.fill_triangles(polygon);
                if triangles.is_empty() {
                    tracing::debug!("polygon of {} points not triangulated", polygon.len());
                    continue;
                }
                self.backend.draw_arrays(Primitive::Triangles, &triangles);
            }
        }
    }

    fn fill_triangles(&self, polygon: &[Point]) -> Vec<Vertex> {
        let ear_clip = || -> Vec<Vertex> {
            triangulate(polygon)
                .iter()
                .flat_map(|triangle| triangle.iter().map(to_vertex))
                .collect()
        };

        match self.config.tessellator {
            TessellatorKind::Sweep => tessellate_ring(polygon)
                .filter(|vertices| !vertices.is_empty())
                .unwrap_or_else(ear_clip),
            TessellatorKind::EarClip => ear_clip(),
        }
    }

    /// Draw circles as quads textured with the anti-alias falloff, filled or
    /// as rings.
    pub fn draw_multiple_circles(
        &mut self,
        centers: &[Point],
        radii: &[i32],
        filled: bool,
        _fast_draw: bool,
    ) {
        if !self.state.is_ready() {
            return;
        }
        if centers.len() != radii.len() {
            tracing::warn!(
                "{} circle centers but {} radii",
                centers.len(),
                radii.len()
            );
        }

        self.aa.ensure(&mut self.backend, &mut self.state, self.aa_factor);
        let texture = if filled { self.aa.filled() } else { self.aa.ring() };
        let Some(texture) = texture else {
            return;
        };
        if !self.state.bind(&mut self.backend, texture) {
            return;
        }

        let half = (MAX_AA_SIZE * 2) as f32;
        let double = (MAX_AA_SIZE * 4) as f32;

        for (center, &radius) in centers.iter().zip(radii) {
            let r = radius.saturating_mul(2);
            if r <= 0 {
                continue;
            }
            let border = (MAX_AA_SIZE as i32 / r) as f32;
            let size = r as f32 + 1.0;
            let x = center.x as f32 - size * 0.5;
            let y = center.y as f32 - size * 0.5;

            let near = (half - border) / double;
            let far = (double + border) / double;

            let quad = [
                Vertex::new(x, y, near, near),
                Vertex::new(x + size, y, far, near),
                Vertex::new(x + size, y + size, far, far),
                Vertex::new(x, y + size, near, far),
            ];
            self.backend.draw_arrays(Primitive::TriangleFan, &quad);
        }

        self.state.set_state(&mut self.backend, GlState::Geometry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;
    use crate::recording::RecordingBackend;
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
        canvas.create_pen("area");
        canvas
    }

    fn pts(coords: &[(i32, i32)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_axis_aligned_corner() {
        assert!(starts_axis_aligned(&pts(&[(0, 0), (10, 0), (10, 10)])));
        assert!(!starts_axis_aligned(&pts(&[(0, 0), (10, 5), (3, 10)])));
        assert!(!starts_axis_aligned(&pts(&[(0, 0), (0, 0)])));
    }

    #[test]
    fn test_closed_ring() {
        assert_eq!(closed_ring(&pts(&[(0, 0), (1, 0), (1, 1)])).len(), 4);
        assert_eq!(closed_ring(&pts(&[(0, 0), (1, 0), (0, 0)])).len(), 3);
    }

    #[test]
    fn test_rectangle_filled_without_outline() {
        let mut canvas = canvas(CanvasConfig::default());
        canvas.backend_mut().clear();
        let square = pts(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        canvas.draw_multiple_polygons(&[4], &square, true, false);

        let draws = canvas.backend().draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].0, Primitive::Triangles);
        assert_eq!(draws[0].1.len(), 6);
    }

    #[test]
    fn test_slanted_polygon_gets_outline() {
        let mut canvas = canvas(CanvasConfig::default());
        let pen = canvas.current_pen().unwrap();
        canvas.set_thickness(5);
        let triangle = pts(&[(0, 0), (20, 5), (5, 20)]);
        canvas.draw_multiple_polygons(&[3], &triangle, true, false);

        let draws = canvas.backend().draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].0, Primitive::TriangleStrip);
        // three edges of the closed ring
        assert_eq!(draws[0].1.len(), 30);
        assert_eq!(draws[1].0, Primitive::Triangles);
        assert_eq!(draws[1].1.len(), 3);
        assert_eq!(canvas.state(), GlState::Geometry);
        assert_eq!(canvas.pen(pen).unwrap().line_width, 5.0);
    }

    #[test]
    fn test_fast_draw_skips_outline() {
        let mut canvas = canvas(CanvasConfig {
            tessellator: TessellatorKind::EarClip,
            ..CanvasConfig::default()
        });
        canvas.backend_mut().clear();
        let triangle = pts(&[(0, 0), (20, 5), (5, 20)]);
        canvas.draw_multiple_polygons(&[3], &triangle, true, true);
        let draws = canvas.backend().draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].0, Primitive::Triangles);
    }

    #[test]
    fn test_degenerate_polygon_skipped() {
        let mut canvas = canvas(CanvasConfig {
            tessellator: TessellatorKind::EarClip,
            ..CanvasConfig::default()
        });
        canvas.backend_mut().clear();
        let line = pts(&[(0, 0), (10, 0), (20, 0)]);
        canvas.draw_multiple_polygons(&[3], &line, true, true);
        assert!(canvas.backend().draws().is_empty());
    }

    #[test]
    fn test_circle_quads() {
        let mut canvas = canvas(CanvasConfig::default());
        canvas.backend_mut().clear();
        let centers = pts(&[(50, 50), (10, 10)]);
        canvas.draw_multiple_circles(&centers, &[4, 0], true, false);

        let draws = canvas.backend().draws();
        assert_eq!(draws.len(), 1);
        let (primitive, quad) = draws[0];
        assert_eq!(primitive, Primitive::TriangleFan);
        assert_eq!(quad[0].position, [45.5, 45.5]);
        assert_eq!(quad[2].position, [54.5, 54.5]);
        // border = 32 / 8
        assert_eq!(quad[0].tex_coords, [60.0 / 128.0, 60.0 / 128.0]);
        assert_eq!(quad[2].tex_coords, [132.0 / 128.0, 132.0 / 128.0]);
        assert_eq!(canvas.state(), GlState::Geometry);
    }

    #[test]
    fn test_huge_radius_saturates() {
        let mut canvas = canvas(CanvasConfig::default());
        canvas.backend_mut().clear();
        let centers = pts(&[(0, 0)]);
        canvas.draw_multiple_circles(&centers, &[i32::MAX / 2 + 1], true, false);

        let draws = canvas.backend().draws();
        assert_eq!(draws.len(), 1);
        let (_, quad) = draws[0];
        // no antialiasing border left at this size
        assert_eq!(quad[0].tex_coords, [64.0 / 128.0, 64.0 / 128.0]);
    }
}
