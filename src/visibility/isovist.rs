//! Isovists: the region visible from a single point
//!
//! Rays are cast at uniform angular spacing (ray `i` at `2πi / n`). Each
//! ray stops at the nearest wall it meets within `max_radius`, otherwise at
//! `max_radius`. The ordered endpoints form the isovist polygon.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::geometry::{polygon_area, polygon_centroid, polygon_perimeter, ray_segment_intersection};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::models::{Obstacle, Point};

/// Default number of rays per isovist (5° resolution)
pub const DEFAULT_RAY_COUNT: usize = 72;

/// Scalars derived from an isovist polygon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct IsovistMetrics {
    pub area: f64,
    pub perimeter: f64,
    /// Farthest vertex from the polygon centroid
    pub max_radial: f64,
    /// Mean vertex distance from the polygon centroid
    pub mean_radial: f64,
    /// 4π·area / perimeter², 1.0 for a circle
    pub compactness: f64,
}

/// Cast `ray_count` rays from `origin` and return the visible polygon.
pub fn compute_isovist(
    origin: Point,
    obstacles: &[Obstacle],
    ray_count: usize,
    max_radius: f64,
) -> AnalysisResult<Vec<Point>> {
    if ray_count < 3 {
        return Err(AnalysisError::GeometryDegenerate(format!(
            "isovist needs at least 3 rays, got {ray_count}"
        )));
    }
    if !origin.is_finite() || !max_radius.is_finite() || max_radius <= 0.0 {
        return Err(AnalysisError::GeometryDegenerate(format!(
            "cannot cast rays from ({}, {}) with radius {}",
            origin.x, origin.y, max_radius
        )));
    }

    let polygon = (0..ray_count)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / ray_count as f64;
            let dir = (angle.cos(), angle.sin());
            let reach = obstacles
                .iter()
                .filter_map(|wall| ray_segment_intersection(origin, dir, wall))
                .fold(max_radius, f64::min);
            Point::new(origin.x + dir.0 * reach, origin.y + dir.1 * reach)
        })
        .collect();
    Ok(polygon)
}

/// Area, perimeter, radial spread and compactness of an isovist polygon.
/// Radial distances are measured from the polygon centroid, not the
/// viewpoint.
pub fn analyze_isovist(polygon: &[Point]) -> IsovistMetrics {
    if polygon.len() < 3 {
        return IsovistMetrics::default();
    }
    let area = polygon_area(polygon);
    let perimeter = polygon_perimeter(polygon);

    let radials: Vec<f64> = match polygon_centroid(polygon) {
        Some(c) => polygon.iter().map(|p| p.distance(&c)).collect(),
        None => vec![],
    };
    let max_radial = radials.iter().copied().fold(0.0, f64::max);
    let mean_radial = if radials.is_empty() {
        0.0
    } else {
        radials.iter().sum::<f64>() / radials.len() as f64
    };
    let compactness = if perimeter > 0.0 {
        4.0 * PI * area / (perimeter * perimeter)
    } else {
        0.0
    };

    IsovistMetrics {
        area,
        perimeter,
        max_radial,
        mean_radial,
        compactness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(size: f64) -> Vec<Obstacle> {
        let p = Point::new;
        vec![
            Obstacle::new(p(0.0, 0.0), p(size, 0.0)),
            Obstacle::new(p(size, 0.0), p(size, size)),
            Obstacle::new(p(size, size), p(0.0, size)),
            Obstacle::new(p(0.0, size), p(0.0, 0.0)),
        ]
    }

    #[test]
    fn test_empty_room_isovist_matches_room_area() {
        let walls = room(10.0);
        let polygon = compute_isovist(Point::new(5.0, 5.0), &walls, DEFAULT_RAY_COUNT, 100.0).unwrap();
        let metrics = analyze_isovist(&polygon);
        // corners are clipped between neighbouring rays
        assert!((metrics.area - 100.0).abs() / 100.0 < 0.03, "area {}", metrics.area);
        assert!(metrics.area <= 100.0 + 1e-9);
        assert!(metrics.compactness > 0.7 && metrics.compactness < 0.8);
    }

    #[test]
    fn test_open_field_is_a_disc() {
        let polygon = compute_isovist(Point::new(0.0, 0.0), &[], 360, 10.0).unwrap();
        let metrics = analyze_isovist(&polygon);
        let disc = PI * 100.0;
        assert!((metrics.area - disc).abs() / disc < 0.001);
        assert!((metrics.max_radial - 10.0).abs() < 1e-6);
        assert!((metrics.mean_radial - 10.0).abs() < 1e-6);
        assert!(metrics.compactness > 0.99);
    }

    #[test]
    fn test_area_non_decreasing_with_radius() {
        let mut walls = room(20.0);
        walls.push(Obstacle::new(Point::new(8.0, 2.0), Point::new(8.0, 12.0)));
        let origin = Point::new(4.0, 6.0);
        let mut previous = 0.0;
        for radius in [0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0] {
            let polygon = compute_isovist(origin, &walls, DEFAULT_RAY_COUNT, radius).unwrap();
            let area = analyze_isovist(&polygon).area;
            assert!(area + 1e-9 >= previous, "radius {radius}: {area} < {previous}");
            previous = area;
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let origin = Point::new(0.0, 0.0);
        assert!(matches!(
            compute_isovist(origin, &[], 2, 10.0),
            Err(AnalysisError::GeometryDegenerate(_))
        ));
        assert!(compute_isovist(origin, &[], 72, 0.0).is_err());
        assert!(compute_isovist(Point::new(f64::NAN, 0.0), &[], 72, 1.0).is_err());
        assert_eq!(analyze_isovist(&[origin]), IsovistMetrics::default());
    }
}
