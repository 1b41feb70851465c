//! Visibility Field engine
//!
//! Samples free floor positions, computes an isovist at each, and links
//! mutually visible positions into a visibility graph:
//!
//! ```text
//! raster / walls ──► sample grid ──► isovists (first N points)
//!                          │                 │
//!                          └──► visibility graph (first M points)
//!                                            │
//!                     visual integration, critical points, summary
//! ```
//!
//! A point whose isovist cannot be built degrades to zero-valued isovist
//! scalars; the run carries on.

pub mod geometry;
pub mod grid;
pub mod isovist;
pub mod vga;

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::models::{FloorRaster, Obstacle, Point};

pub use isovist::IsovistMetrics;
pub use vga::{CriticalPoint, CriticalPoints, PointMetrics, VisibilitySummary};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityOptions {
    /// Lattice spacing in metres
    pub spacing_m: f64,
    /// Raster resolution; also scales the wall-bounds lattice
    pub pixels_per_meter: f64,
    pub ray_count: usize,
    pub max_radius: f64,
    pub distance_threshold: f64,
    pub max_samples: usize,
    /// Isovists are computed for this many leading sample points
    pub isovist_limit: usize,
    /// Visibility edges are built among this many leading sample points
    pub graph_limit: usize,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            spacing_m: 0.5,
            pixels_per_meter: 1.0,
            ray_count: isovist::DEFAULT_RAY_COUNT,
            max_radius: 1000.0,
            distance_threshold: 50.0,
            max_samples: grid::MAX_SAMPLE_POINTS,
            isovist_limit: 1000,
            graph_limit: vga::DEFAULT_GRAPH_LIMIT,
        }
    }
}

/// Output of a visibility pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityReport {
    pub points: Vec<PointMetrics>,
    pub critical_points: CriticalPoints,
    pub summary: VisibilitySummary,
    /// Points whose isovist degraded to zero
    pub degraded_points: usize,
}

impl VisibilityReport {
    pub fn mean_visual_integration(&self) -> f64 {
        self.summary.visual_integration.mean
    }
}

/// Runs the visibility pipeline against a fixed wall set
pub struct VisibilityAnalyzer {
    obstacles: Vec<Obstacle>,
    options: VisibilityOptions,
}

impl VisibilityAnalyzer {
    /// Zero-length and non-finite walls are dropped with a warning.
    pub fn new(obstacles: &[Obstacle], options: VisibilityOptions) -> Self {
        let (obstacles, degenerate): (Vec<Obstacle>, Vec<Obstacle>) = obstacles
            .iter()
            .copied()
            .partition(|o| o.length().is_finite() && o.length() > 0.0);
        if !degenerate.is_empty() {
            warn!(
                "{}",
                AnalysisError::GeometryDegenerate(format!(
                    "ignoring {} zero-length or non-finite walls",
                    degenerate.len()
                ))
            );
        }
        Self { obstacles, options }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Sample the raster's free space, or the wall bounding box when no
    /// raster is given.
    pub fn sample_points<R: Rng + ?Sized>(
        &self,
        raster: Option<&FloorRaster>,
        rng: &mut R,
    ) -> AnalysisResult<Vec<Point>> {
        let opts = &self.options;
        match raster {
            Some(raster) => grid::generate_sample_grid(
                raster,
                opts.pixels_per_meter,
                opts.spacing_m,
                opts.max_samples,
                rng,
            ),
            None => grid::generate_bounds_grid(
                &self.obstacles,
                opts.spacing_m * opts.pixels_per_meter,
                opts.max_samples,
                rng,
            ),
        }
    }

    /// Isovist scalars for the leading `isovist_limit` points; `None`
    /// beyond the limit or where the isovist degenerated.
    pub fn isovists(
        &self,
        points: &[Point],
        cancel: &CancellationToken,
    ) -> AnalysisResult<Vec<Option<IsovistMetrics>>> {
        let limit = points.len().min(self.options.isovist_limit);
        let mut out: Vec<Option<IsovistMetrics>> = points[..limit]
            .par_iter()
            .map(|p| -> AnalysisResult<Option<IsovistMetrics>> {
                cancel.check()?;
                match isovist::compute_isovist(
                    *p,
                    &self.obstacles,
                    self.options.ray_count,
                    self.options.max_radius,
                ) {
                    Ok(polygon) => Ok(Some(isovist::analyze_isovist(&polygon))),
                    Err(e) => {
                        debug!("Isovist at ({:.2}, {:.2}) degraded: {}", p.x, p.y, e);
                        Ok(None)
                    }
                }
            })
            .collect::<AnalysisResult<_>>()?;
        out.resize(points.len(), None);
        Ok(out)
    }

    /// Full pass over an already-sampled point set.
    pub fn analyze(
        &self,
        points: &[Point],
        cancel: &CancellationToken,
    ) -> AnalysisResult<VisibilityReport> {
        let isovists = self.isovists(points, cancel)?;
        let attempted = points.len().min(self.options.isovist_limit);
        let degraded_points = isovists[..attempted].iter().filter(|m| m.is_none()).count();
        if degraded_points > 0 {
            warn!(
                "{} of {} isovists degraded to zero-valued metrics",
                degraded_points, attempted
            );
        }

        let graph = vga::build_visibility_graph(
            points,
            &self.obstacles,
            self.options.distance_threshold,
            self.options.graph_limit,
            cancel,
        )?;
        let metrics = vga::point_metrics(points, &graph, &isovists);
        let critical_points = vga::identify_critical_points(&metrics);
        let summary = vga::summarize(&metrics, &graph);

        info!(
            "Visibility complete: {} points, {} edges, mean VI {:.3}",
            summary.point_count, summary.edge_count, summary.visual_integration.mean
        );

        Ok(VisibilityReport {
            points: metrics,
            critical_points,
            summary,
            degraded_points,
        })
    }

    /// Sample and analyze in one step.
    pub fn run<R: Rng + ?Sized>(
        &self,
        raster: Option<&FloorRaster>,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> AnalysisResult<VisibilityReport> {
        let points = self.sample_points(raster, rng)?;
        debug!("Sampled {} visibility points", points.len());
        self.analyze(&points, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisInput;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_options() -> VisibilityOptions {
        VisibilityOptions {
            spacing_m: 2.0,
            max_radius: 100.0,
            distance_threshold: 10.0,
            isovist_limit: 200,
            graph_limit: 200,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_on_sample_hospital() {
        let input = AnalysisInput::sample_hospital();
        let analyzer = VisibilityAnalyzer::new(&input.obstacles, small_options());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let report = analyzer
            .run(None, &mut rng, &CancellationToken::new())
            .unwrap();

        // 50 x 40 plan at 2 m spacing
        assert_eq!(report.summary.point_count, 25 * 20);
        assert!(report.summary.edge_count > 0);
        assert_eq!(report.degraded_points, 0);
        // every isovist stays inside the 50 x 40 shell
        assert!(report
            .points
            .iter()
            .all(|p| p.isovist.area <= 2000.0 + 1e-6));
        assert!(report.mean_visual_integration() > 0.0);
    }

    #[test]
    fn test_points_beyond_isovist_limit_are_zeroed() {
        let walls = vec![Obstacle::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0))];
        let options = VisibilityOptions {
            spacing_m: 1.0,
            isovist_limit: 5,
            ..Default::default()
        };
        let analyzer = VisibilityAnalyzer::new(&walls, options);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let points = analyzer.sample_points(None, &mut rng).unwrap();
        let isovists = analyzer.isovists(&points, &CancellationToken::new()).unwrap();
        assert_eq!(isovists.len(), 100);
        assert!(isovists[..5].iter().all(Option::is_some));
        assert!(isovists[5..].iter().all(Option::is_none));
    }

    #[test]
    fn test_degenerate_rays_degrade_instead_of_failing() {
        let walls = vec![Obstacle::new(Point::new(0.0, 0.0), Point::new(4.0, 4.0))];
        let options = VisibilityOptions {
            spacing_m: 1.0,
            ray_count: 2,
            ..Default::default()
        };
        let analyzer = VisibilityAnalyzer::new(&walls, options);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let report = analyzer.run(None, &mut rng, &CancellationToken::new()).unwrap();
        assert_eq!(report.degraded_points, 16);
        assert!(report.points.iter().all(|p| p.isovist.area == 0.0));
    }

    #[test]
    fn test_zero_length_walls_are_dropped() {
        let mut walls = AnalysisInput::sample_hospital().obstacles;
        let kept = walls.len();
        walls.push(Obstacle::new(Point::new(5.0, 5.0), Point::new(5.0, 5.0)));
        walls.push(Obstacle::new(Point::new(0.0, 0.0), Point::new(f64::NAN, 1.0)));
        let analyzer = VisibilityAnalyzer::new(&walls, small_options());
        assert_eq!(analyzer.obstacles().len(), kept);
        assert!(analyzer.obstacles().iter().all(|o| o.length() > 0.0));
    }

    #[test]
    fn test_cancelled_run() {
        let input = AnalysisInput::sample_hospital();
        let analyzer = VisibilityAnalyzer::new(&input.obstacles, small_options());
        let token = CancellationToken::new();
        token.cancel();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(
            analyzer.run(None, &mut rng, &token).unwrap_err(),
            AnalysisError::Cancelled
        );
    }
}
