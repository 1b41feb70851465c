//! Planar geometry primitives: ray casting, segment tests and polygon
//! measures

use crate::models::{Obstacle, Point};

/// Below this a ray and a wall are treated as parallel
const PARALLEL_EPS: f64 = 1e-12;

/// Slack on the wall parameter so rays aimed exactly at a corner still hit
const ENDPOINT_EPS: f64 = 1e-9;

/// Find parameter t where ray `origin + t * dir` hits `wall`.
/// Returns `Some(t)` for a hit at t >= 0, `None` on a miss or when parallel.
pub fn ray_segment_intersection(origin: Point, dir: (f64, f64), wall: &Obstacle) -> Option<f64> {
    let (dx, dy) = dir;
    let sx = wall.end.x - wall.start.x;
    let sy = wall.end.y - wall.start.y;
    let denom = dx * sy - dy * sx;
    if denom.abs() < PARALLEL_EPS {
        return None;
    }

    let ox = wall.start.x - origin.x;
    let oy = wall.start.y - origin.y;
    let t = (ox * sy - oy * sx) / denom;
    let u = (ox * dy - oy * dx) / denom;

    if t >= 0.0 && (-ENDPOINT_EPS..=1.0 + ENDPOINT_EPS).contains(&u) {
        Some(t)
    } else {
        None
    }
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Whether segments `p1p2` and `q1q2` share at least one point
/// (touching and collinear overlap included).
pub fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// True when no obstacle touches the segment between `a` and `b`
pub fn line_of_sight(a: Point, b: Point, obstacles: &[Obstacle]) -> bool {
    !obstacles
        .iter()
        .any(|wall| segments_intersect(a, b, wall.start, wall.end))
}

/// Shoelace area, positive regardless of winding order.
pub fn polygon_area(vertices: &[Point]) -> f64 {
    signed_area(vertices).abs()
}

fn signed_area(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += vertices[i].x * vertices[j].y;
        area -= vertices[j].x * vertices[i].y;
    }
    area / 2.0
}

/// Length of the closed ring through `vertices`.
pub fn polygon_perimeter(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| vertices[i].distance(&vertices[(i + 1) % n]))
        .sum()
}

/// Area-weighted centroid; vertex mean for a zero-area ring.
pub fn polygon_centroid(vertices: &[Point]) -> Option<Point> {
    if vertices.is_empty() {
        return None;
    }
    let a = signed_area(vertices);
    if a.abs() < f64::EPSILON {
        let n = vertices.len() as f64;
        let (sx, sy) = vertices
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Some(Point::new(sx / n, sy / n));
    }

    let n = vertices.len();
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let p = vertices[i];
        let q = vertices[(i + 1) % n];
        let cross = p.x * q.y - q.x * p.y;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    Some(Point::new(cx / (6.0 * a), cy / (6.0 * a)))
}

/// Axis-aligned bounds of every obstacle endpoint: (min, max)
pub fn bounds(obstacles: &[Obstacle]) -> Option<(Point, Point)> {
    let mut points = obstacles.iter().flat_map(|o| [o.start, o.end]);
    let first = points.next()?;
    Some(points.fold((first, first), |(lo, hi), p| {
        (
            Point::new(lo.x.min(p.x), lo.y.min(p.y)),
            Point::new(hi.x.max(p.x), hi.y.max(p.y)),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn wall(x1: f64, y1: f64, x2: f64, y2: f64) -> Obstacle {
        Obstacle::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_ray_hits_wall() {
        let t = ray_segment_intersection(Point::new(0.0, 0.0), (1.0, 0.0), &wall(5.0, -1.0, 5.0, 1.0));
        assert!((t.unwrap() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_ray_misses_wall() {
        let origin = Point::new(0.0, 0.0);
        // behind the origin
        assert!(ray_segment_intersection(origin, (1.0, 0.0), &wall(-5.0, -1.0, -5.0, 1.0)).is_none());
        // parallel
        assert!(ray_segment_intersection(origin, (1.0, 0.0), &wall(0.0, 1.0, 5.0, 1.0)).is_none());
        // passes beyond the end
        assert!(ray_segment_intersection(origin, (1.0, 0.0), &wall(5.0, 1.0, 5.0, 2.0)).is_none());
    }

    #[test]
    fn test_segments_intersect() {
        let p = |x, y| Point::new(x, y);
        assert!(segments_intersect(p(0.0, 0.0), p(2.0, 2.0), p(0.0, 2.0), p(2.0, 0.0)));
        assert!(!segments_intersect(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0), p(1.0, 1.0)));
        // touching at an endpoint counts
        assert!(segments_intersect(p(0.0, 0.0), p(1.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)));
        // collinear overlap counts
        assert!(segments_intersect(p(0.0, 0.0), p(2.0, 0.0), p(1.0, 0.0), p(3.0, 0.0)));
    }

    #[test]
    fn test_line_of_sight() {
        let walls = vec![wall(1.0, -1.0, 1.0, 1.0)];
        assert!(!line_of_sight(Point::new(0.0, 0.0), Point::new(2.0, 0.0), &walls));
        assert!(line_of_sight(Point::new(0.0, 2.0), Point::new(2.0, 2.0), &walls));
    }

    #[test]
    fn test_polygon_measures() {
        let square = unit_square();
        assert!((polygon_area(&square) - 1.0).abs() < EPSILON);
        assert!((polygon_perimeter(&square) - 4.0).abs() < EPSILON);
        let c = polygon_centroid(&square).unwrap();
        assert!((c.x - 0.5).abs() < EPSILON && (c.y - 0.5).abs() < EPSILON);

        let mut reversed = square.clone();
        reversed.reverse();
        assert!((polygon_area(&reversed) - 1.0).abs() < EPSILON);
        let c = polygon_centroid(&reversed).unwrap();
        assert!((c.x - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_degenerate_polygons() {
        assert_eq!(polygon_area(&[Point::new(0.0, 0.0), Point::new(1.0, 1.0)]), 0.0);
        assert!(polygon_centroid(&[]).is_none());
        assert!(bounds(&[]).is_none());
    }

    #[test]
    fn test_bounds() {
        let (lo, hi) = bounds(&[wall(3.0, -1.0, 0.0, 4.0), wall(-2.0, 0.0, 1.0, 1.0)]).unwrap();
        assert_eq!(lo, Point::new(-2.0, -1.0));
        assert_eq!(hi, Point::new(3.0, 4.0));
    }
}
