//! Ear-clipping polygon triangulation

use wayfarer_paint::Point;

/// Signed area of a ring, positive when counter-clockwise in a y-up frame
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0i64;
    let mut p = n - 1;
    for q in 0..n {
        area += points[p].x as i64 * points[q].y as i64 - points[q].x as i64 * points[p].y as i64;
        p = q;
    }
    area as f64 * 0.5
}

/// Remove consecutive duplicates (including the closing point) and the
/// middle point of axis-aligned straight runs.
///
/// Only horizontal and vertical runs are pruned; general collinear points
/// are kept.
pub fn prune(points: &[Point]) -> Vec<Point> {
    let mut ring: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if ring.last() != Some(&p) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    let mut i = 0;
    while i + 2 < ring.len() {
        let (a, b, c) = (ring[i], ring[i + 1], ring[i + 2]);
        if (a.x == b.x && b.x == c.x) || (a.y == b.y && b.y == c.y) {
            ring.remove(i + 1);
        } else {
            i += 1;
        }
    }

    ring
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    (a.x as i64 - o.x as i64) * (b.y as i64 - o.y as i64)
        - (a.y as i64 - o.y as i64) * (b.x as i64 - o.x as i64)
}

/// Whether `p` lies inside or on the boundary of triangle `abc`
/// (counter-clockwise).
fn inside_triangle(a: Point, b: Point, c: Point, p: Point) -> bool {
    cross(b, c, p) >= 0 && cross(c, a, p) >= 0 && cross(a, b, p) >= 0
}

fn is_ear(points: &[Point], u: usize, v: usize, w: usize, indices: &[usize]) -> bool {
    let a = points[indices[u]];
    let b = points[indices[v]];
    let c = points[indices[w]];

    // reflex corner; degenerate (zero area) corners are accepted
    if cross(a, b, c) < 0 {
        return false;
    }

    indices
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != u && i != v && i != w)
        .all(|(_, &index)| !inside_triangle(a, b, c, points[index]))
}

/// Triangulate a simple polygon.
///
/// Returns an empty list when fewer than three points survive pruning or no
/// ear can be found (non-simple input).
pub fn triangulate(points: &[Point]) -> Vec<[Point; 3]> {
    let points = prune(points);
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = if signed_area(&points) > 0.0 {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    };

    let mut triangles = Vec::with_capacity(n - 2);
    let mut remaining = n;
    let mut budget = 2 * remaining;
    let mut v = remaining - 1;

    while remaining > 2 {
        if budget == 0 {
            tracing::debug!("no ear found, polygon is probably not simple");
            return Vec::new();
        }
        budget -= 1;

        let u = if v < remaining { v } else { 0 };
        v = if u + 1 < remaining { u + 1 } else { 0 };
        let w = if v + 1 < remaining { v + 1 } else { 0 };

        if is_ear(&points, u, v, w, &indices) {
            triangles.push([points[indices[u]], points[indices[v]], points[indices[w]]]);
            indices.remove(v);
            remaining -= 1;
            budget = 2 * remaining;
        }
    }

    triangles
}
