//! Sweep-line polygon fill
//!
//! Converts one polygon ring into a triangle list using lyon's fill
//! tessellator with the even-odd rule, so self-intersecting rings fill the
//! same way the GLU tessellator fills them.

use lyon::lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};
use lyon::math::point;
use lyon::path::PathEvent;
use wayfarer_paint::{Point, Vertex};

/// Path events of a closed ring
fn ring_events(points: &[Point]) -> Vec<PathEvent> {
    let mut events = Vec::with_capacity(points.len() + 1);
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return events;
    };

    let at = |p: &Point| point(p.x as f32, p.y as f32);

    events.push(PathEvent::Begin { at: at(first) });
    for pair in points.windows(2) {
        events.push(PathEvent::Line {
            from: at(&pair[0]),
            to: at(&pair[1]),
        });
    }
    events.push(PathEvent::End {
        last: at(last),
        first: at(first),
        close: true,
    });

    events
}

/// Fill `points` as one even-odd ring.
///
/// Returns the triangles as a flat vertex list, or `None` when the
/// tessellator rejects the input.
pub fn tessellate_ring(points: &[Point]) -> Option<Vec<Vertex>> {
    if points.len() < 3 {
        return None;
    }

    let events = ring_events(points);
    let mut geometry: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();

    let options = FillOptions::default()
        .with_tolerance(0.1)
        .with_fill_rule(FillRule::EvenOdd);

    let result = tessellator.tessellate(
        events.iter().cloned(),
        &options,
        &mut BuffersBuilder::new(&mut geometry, |vertex: FillVertex| {
            vertex.position().to_array()
        }),
    );

    if let Err(e) = result {
        tracing::warn!("polygon fill tessellation failed: {:?}", e);
        return None;
    }

    let vertices = geometry
        .indices
        .iter()
        .filter_map(|&i| geometry.vertices.get(i as usize))
        .map(|&[x, y]| Vertex::at(x, y))
        .collect();

    Some(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(i32, i32)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn covered_area(vertices: &[Vertex]) -> f32 {
        vertices
            .chunks_exact(3)
            .map(|t| {
                let (a, b, c) = (t[0], t[1], t[2]);
                ((b.x() - a.x()) * (c.y() - a.y()) - (b.y() - a.y()) * (c.x() - a.x())).abs() * 0.5
            })
            .sum()
    }

    #[test]
    fn test_square_fill() {
        let vertices = tessellate_ring(&pts(&[(0, 0), (10, 0), (10, 10), (0, 10)])).unwrap();
        assert_eq!(vertices.len() % 3, 0);
        assert!((covered_area(&vertices) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_self_intersecting_even_odd() {
        // bow tie crossing at (5, 5)
        let vertices = tessellate_ring(&pts(&[(0, 0), (10, 10), (10, 0), (0, 10)])).unwrap();
        assert!((covered_area(&vertices) - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_too_few_points() {
        assert!(tessellate_ring(&pts(&[(0, 0), (10, 0)])).is_none());
    }
}
