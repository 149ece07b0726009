//! Polyline geometry
//!
//! Pure vertex generation for anti-aliased ribbons and textured route
//! lines. The canvas feeds the results into its scratch buffer.

use wayfarer_image::next_pot;
use wayfarer_paint::{Point, Vertex};

use crate::aa::{fast_inverse_sqrt, AA_TEXTURE_SIZE, MAX_AA_SIZE};

/// Longest a smoothing tangent may be, as a fraction of its edge
pub const LENGTH_FACTOR: f32 = 0.2;

/// Weight of the mirrored neighbour in a smoothing tangent
pub const SMOOTH_FACTOR: f32 = 1.0;

/// Extra samples between two input points of a smoothed line
const BEZIER_RESOLUTION: u32 = 4;

const BEZIER_STEP: f32 = 1.0 / (BEZIER_RESOLUTION + 2) as f32;

/// Vertices emitted per ribbon segment
pub const RIBBON_VERTICES: usize = 10;

/// Vertices emitted per textured segment
pub const TEX_LINE_VERTICES: usize = 6;

/// Straight piece of a polyline in pixel coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: [f32; 2],
    pub to: [f32; 2],
}

impl Segment {
    pub fn new(from: [f32; 2], to: [f32; 2]) -> Self {
        Self { from, to }
    }
}

/// Cubic control pair of one polyline edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BezierControl {
    pub p1: Point,
    pub p2: Point,
}

fn to_f32(p: Point) -> [f32; 2] {
    [p.x as f32, p.y as f32]
}

fn dist_sq(a: Point, b: Point) -> f32 {
    let dx = (a.x - b.x) as f32;
    let dy = (a.y - b.y) as f32;
    dx * dx + dy * dy
}

/// One third of the way from `a` to `b`
fn third(a: Point, b: Point) -> Point {
    let component = |a: i32, b: i32| (a as f64 + (b - a) as f64 * 0.33) as i32;
    Point::new(component(a.x, b.x), component(a.y, b.y))
}

/// Control point leaving `at` along the edge to `toward`, with the tangent
/// estimated from the mirrored `behind` neighbour and clamped to
/// [`LENGTH_FACTOR`] of the edge.
fn tangent_control(at: Point, toward: Point, behind: Point) -> Point {
    let component = |a: i32, t: i32, b: i32| {
        let mirrored = a as f32 - (b - a) as f32 * SMOOTH_FACTOR;
        ((((a + t) / 2) as f32 + (mirrored + a as f32) / 2.0) / 2.0) as i32
    };

    let mut control = Point::new(
        component(at.x, toward.x, behind.x),
        component(at.y, toward.y, behind.y),
    );

    let factor = dist_sq(at, control) / dist_sq(at, toward);
    if factor > LENGTH_FACTOR {
        let clamp = |a: i32, c: i32| (a as f32 - (a - c) as f32 * LENGTH_FACTOR / factor) as i32;
        control = Point::new(clamp(at.x, control.x), clamp(at.y, control.y));
    }
    control
}

/// Control pair for edge `edge` (from `points[edge]` to `points[edge + 1]`).
///
/// Needs at least three points; the first and last edges take their outer
/// control point at one third of the edge.
pub fn bezier_control(points: &[Point], edge: usize) -> Option<BezierControl> {
    let n = points.len();
    if n < 3 || edge + 1 >= n {
        return None;
    }

    let p1 = if edge == 0 {
        third(points[0], points[1])
    } else {
        tangent_control(points[edge], points[edge + 1], points[edge - 1])
    };

    let p2 = if edge + 2 == n {
        third(points[edge + 1], points[edge])
    } else {
        tangent_control(points[edge + 1], points[edge], points[edge + 2])
    };

    Some(BezierControl { p1, p2 })
}

/// Floored point of the cubic at `t`
fn cubic_at(t: f32, start: Point, control: &BezierControl, end: Point) -> [f32; 2] {
    let t = t as f64;
    let tm1 = 1.0 - t;
    let tm13 = tm1 * tm1 * tm1;
    let t3 = t * t * t;
    let eval = |p0: i32, p1: i32, p2: i32, p3: i32| {
        (tm13 * p0 as f64
            + 3.0 * t * tm1 * tm1 * p1 as f64
            + 3.0 * t * t * tm1 * p2 as f64
            + t3 * p3 as f64)
            .floor() as f32
    };
    [
        eval(start.x, control.p1.x, control.p2.x, end.x),
        eval(start.y, control.p1.y, control.p2.y, end.y),
    ]
}

/// Split a polyline into drawable segments.
///
/// Zero-length edges produce nothing. With `smooth` and three or more
/// points every edge is replaced by samples of its cubic, each sample one
/// floored pixel apart from the previous.
pub fn polyline_segments(points: &[Point], smooth: bool) -> Vec<Segment> {
    let smooth = smooth && points.len() > 2;
    let mut segments = Vec::with_capacity(points.len());

    for (edge, pair) in points.windows(2).enumerate() {
        let (start, end) = (pair[0], pair[1]);
        if start == end {
            continue;
        }

        let control = if smooth {
            bezier_control(points, edge)
        } else {
            None
        };
        let Some(control) = control else {
            segments.push(Segment::new(to_f32(start), to_f32(end)));
            continue;
        };

        let target = to_f32(end);
        let mut current = to_f32(start);
        let mut t = 0.0f32;
        while current != target {
            let previous = current;
            while current == previous && t < 1.0 {
                t = (t + BEZIER_STEP).min(1.0);
                current = cubic_at(t, start, &control, end);
            }
            segments.push(Segment::new(previous, current));
            if t >= 1.0 {
                break;
            }
        }
    }

    segments
}

/// Texture coordinates of the ribbon strip for a pen `line_width` wide.
///
/// They select the falloff texture's disc quadrant so the long edges fade
/// out; the first and last vertex only stitch consecutive segments.
pub fn ribbon_tex_coords(line_width: f32) -> [[f32; 2]; RIBBON_VERTICES] {
    let half = (MAX_AA_SIZE * 2) as f32;
    let dim = AA_TEXTURE_SIZE as f32;
    let center = (MAX_AA_SIZE * 3) as f32;
    let border = MAX_AA_SIZE as f32 / line_width;

    let inner = (half - border) / dim;
    let outer = (dim + border) / dim;
    let mid = center / dim;
    let mid_next = (center + 0.0001) / dim;

    [
        [0.0, 0.0],
        [outer, inner],
        [inner, inner],
        [outer, mid],
        [inner, mid],
        [outer, mid_next],
        [inner, mid_next],
        [outer, inner],
        [inner, inner],
        [0.0, 0.0],
    ]
}

/// Ribbon strip of one segment.
///
/// The start is pulled back half a pixel along the segment and both ends
/// get a cap extended along the direction of travel.
pub fn ribbon_segment(
    segment: &Segment,
    line_width: f32,
    tex_coords: &[[f32; 2]; RIBBON_VERTICES],
) -> [Vertex; RIBBON_VERTICES] {
    let [mut x1, mut y1] = segment.from;
    let [x, y] = segment.to;

    let mut perp_y = x1 - x;
    let mut perp_x = y - y1;
    let factor = perp_y * perp_y + perp_x * perp_x;
    if factor != 0.0 {
        let perpd = fast_inverse_sqrt(factor);
        perp_y *= perpd;
        perp_x *= perpd;
        x1 -= perp_y * 0.5;
        y1 += perp_x * 0.5;
    } else {
        perp_y = 0.0;
        perp_x = 1.0;
    }

    let width = (line_width + 1.0) * 0.5;
    perp_y *= width;
    perp_x *= width;
    let parl_x = -perp_y;
    let parl_y = perp_x;

    let positions = [
        [x1 - perp_x - parl_x, y1 - perp_y - parl_y],
        [x1 - perp_x - parl_x, y1 - perp_y - parl_y],
        [x1 + perp_x - parl_x, y1 + perp_y - parl_y],
        [x1 - perp_x, y1 - perp_y],
        [x1 + perp_x, y1 + perp_y],
        [x - perp_x, y - perp_y],
        [x + perp_x, y + perp_y],
        [x - perp_x + parl_x, y - perp_y + parl_y],
        [x + perp_x + parl_x, y + perp_y + parl_y],
        [x + perp_x + parl_x, y + perp_y + parl_y],
    ];

    let mut vertices = [Vertex::default(); RIBBON_VERTICES];
    for ((vertex, position), tex) in vertices.iter_mut().zip(positions).zip(tex_coords) {
        *vertex = Vertex::new(position[0], position[1], tex[0], tex[1]);
    }
    vertices
}

/// Builds textured route-line quads, repeating an image along the path
#[derive(Clone, Debug)]
pub struct TexLineBuilder {
    half_width: f32,
    image_height: f32,
    u_edge: f32,
    opposite: bool,
    tex_y: f32,
    prev_perp: Option<[f32; 2]>,
    anchor: Option<[f32; 2]>,
    two_point: bool,
}

impl TexLineBuilder {
    /// `image_width` maps across the line, `image_height` along it.
    pub fn new(image_width: u32, image_height: u32, line_width: f32, opposite: bool) -> Self {
        Self {
            half_width: line_width * 0.5,
            image_height: image_height.max(1) as f32,
            u_edge: image_width as f32 / next_pot(image_width) as f32,
            opposite,
            tex_y: 0.0,
            prev_perp: None,
            anchor: None,
            two_point: false,
        }
    }

    /// Start a new polyline of `point_count` points whose pattern is
    /// shifted by `offset` hundredths of the image height.
    pub fn begin_line(&mut self, offset: i32, point_count: usize) {
        self.tex_y = -(offset as f32) / 100.0;
        self.prev_perp = None;
        self.anchor = None;
        self.two_point = point_count == 2;
    }

    /// Two triangles for `segment`, or `None` when it is too short and gets
    /// merged into the next one.
    pub fn push(&mut self, segment: &Segment) -> Option<[Vertex; TEX_LINE_VERTICES]> {
        let start = self.anchor.unwrap_or(segment.from);
        let [x1, y1] = start;
        let [x, y] = segment.to;

        let mut perp_y = x1 - x;
        let mut perp_x = y - y1;
        let factor = perp_y * perp_y + perp_x * perp_x;
        let distance = if factor != 0.0 {
            let perpd = fast_inverse_sqrt(factor);
            perp_y *= perpd;
            perp_x *= perpd;
            1.0 / perpd
        } else {
            perp_y = 0.0;
            perp_x = 1.0;
            0.0
        };
        perp_y *= self.half_width;
        perp_x *= self.half_width;

        if distance < 1.0 || (self.two_point && distance < self.image_height) {
            self.anchor = Some(start);
            return None;
        }
        self.anchor = None;

        let [prev_x, prev_y] = self.prev_perp.unwrap_or([perp_x, perp_y]);
        self.prev_perp = Some([perp_x, perp_y]);

        let coord_y = distance / self.image_height;
        let (near, far) = if self.opposite {
            (self.tex_y + coord_y, self.tex_y)
        } else {
            (self.tex_y, self.tex_y + coord_y)
        };
        self.tex_y += coord_y;

        let (u_minus, u_plus) = if self.opposite {
            (0.0, self.u_edge)
        } else {
            (self.u_edge, 0.0)
        };

        let v0 = Vertex::new(x1 - prev_x, y1 - prev_y, u_minus, near);
        let v1 = Vertex::new(x1 + prev_x, y1 + prev_y, u_plus, near);
        let v2 = Vertex::new(x - perp_x, y - perp_y, u_minus, far);
        let v3 = Vertex::new(x + perp_x, y + perp_y, u_plus, far);

        Some([v0, v1, v2, v1, v2, v3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(i32, i32)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 0.02 && (a[1] - b[1]).abs() < 0.02
    }

    #[test]
    fn test_duplicate_points_skipped() {
        let segments = polyline_segments(&pts(&[(0, 0), (0, 0), (10, 0), (10, 0)]), false);
        assert_eq!(segments, vec![Segment::new([0.0, 0.0], [10.0, 0.0])]);
    }

    #[test]
    fn test_smooth_segments_are_connected() {
        let points = pts(&[(0, 0), (40, 10), (80, 0), (120, 30)]);
        let segments = polyline_segments(&points, true);

        assert!(segments.len() > points.len());
        assert_eq!(segments.first().unwrap().from, [0.0, 0.0]);
        assert_eq!(segments.last().unwrap().to, [120.0, 30.0]);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].to, pair[1].from);
        }
        assert!(segments.iter().all(|s| s.from != s.to));
    }

    #[test]
    fn test_smooth_needs_three_points() {
        let segments = polyline_segments(&pts(&[(0, 0), (40, 10)]), true);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_outer_controls_at_one_third() {
        let points = pts(&[(0, 0), (10, 0), (20, 0)]);
        assert_eq!(bezier_control(&points, 0).unwrap().p1, Point::new(3, 0));
        assert_eq!(bezier_control(&points, 1).unwrap().p2, Point::new(16, 0));
        assert!(bezier_control(&points, 2).is_none());
    }

    #[test]
    fn test_ribbon_horizontal_segment() {
        let tex = ribbon_tex_coords(3.0);
        let v = ribbon_segment(&Segment::new([0.0, 0.0], [10.0, 0.0]), 3.0, &tex);

        assert_eq!(v[0], v[1]);
        assert_eq!(v[8].position, v[9].position);
        assert!(close(v[0].position, [-1.5, 2.0]));
        assert!(close(v[3].position, [0.5, 2.0]));
        assert!(close(v[4].position, [0.5, -2.0]));
        assert!(close(v[5].position, [10.0, 2.0]));
        assert!(close(v[6].position, [10.0, -2.0]));
        assert!(close(v[8].position, [12.0, -2.0]));
    }

    #[test]
    fn test_ribbon_tex_coords() {
        let tex = ribbon_tex_coords(4.0);
        let border = 32.0 / 4.0;
        assert_eq!(tex[0], [0.0, 0.0]);
        assert_eq!(tex[9], [0.0, 0.0]);
        assert_eq!(tex[2], [(64.0 - border) / 128.0, (64.0 - border) / 128.0]);
        assert_eq!(tex[3], [(128.0 + border) / 128.0, 0.75]);
    }

    #[test]
    fn test_tex_line_short_two_point_line_skipped() {
        let mut builder = TexLineBuilder::new(8, 10, 4.0, false);
        builder.begin_line(0, 2);
        assert!(builder
            .push(&Segment::new([0.0, 0.0], [5.0, 0.0]))
            .is_none());
    }

    #[test]
    fn test_tex_line_v_follows_length() {
        let mut builder = TexLineBuilder::new(8, 10, 4.0, false);
        builder.begin_line(50, 2);
        let quad = builder
            .push(&Segment::new([0.0, 0.0], [20.0, 0.0]))
            .unwrap();

        assert!((quad[0].tex_coords[1] + 0.5).abs() < 1e-3);
        assert!((quad[2].tex_coords[1] - 1.5).abs() < 1e-2);
        assert_eq!(quad[0].tex_coords[0], 1.0);
        assert_eq!(quad[1].tex_coords[0], 0.0);
        assert_eq!(quad[1], quad[3]);
        assert_eq!(quad[2], quad[4]);
    }

    #[test]
    fn test_tex_line_opposite_swaps() {
        let mut builder = TexLineBuilder::new(6, 10, 4.0, true);
        builder.begin_line(0, 3);
        let quad = builder
            .push(&Segment::new([0.0, 0.0], [0.0, 20.0]))
            .unwrap();
        assert_eq!(quad[0].tex_coords[0], 0.0);
        assert_eq!(quad[1].tex_coords[0], 6.0 / 8.0);
        assert!(quad[0].tex_coords[1] > quad[2].tex_coords[1]);
    }

    #[test]
    fn test_tex_line_merges_short_segment() {
        let mut builder = TexLineBuilder::new(8, 10, 4.0, false);
        builder.begin_line(0, 5);
        assert!(builder
            .push(&Segment::new([0.0, 0.0], [0.5, 0.0]))
            .is_none());
        let quad = builder
            .push(&Segment::new([0.5, 0.0], [4.0, 0.0]))
            .unwrap();
        // starts at the anchor of the merged piece
        assert!(close(quad[0].position, [0.0, 2.0]));
        assert!(close(quad[1].position, [0.0, -2.0]));
    }
}
