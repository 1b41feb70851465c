//! Visibility graph analysis (VGA)
//!
//! Sample points become nodes of a petgraph `UnGraph`; two points are
//! joined when they are closer than the distance threshold and no wall
//! touches the segment between them. Visual integration then blends the
//! number of mutually visible points with the isovist area.

use petgraph::graph::{NodeIndex, UnGraph};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::geometry::line_of_sight;
use super::isovist::IsovistMetrics;
use crate::cancel::CancellationToken;
use crate::errors::AnalysisResult;
use crate::models::{Obstacle, Point};
use crate::stats::Distribution;

/// Only the first points of the sample take part in edge construction
pub const DEFAULT_GRAPH_LIMIT: usize = 500;

/// Length of each critical-point list
pub const CRITICAL_POINT_COUNT: usize = 20;

/// Visual integration below this marks a blind spot
pub const BLIND_SPOT_THRESHOLD: f64 = 0.2;

/// Isovist area that counts as one unit of visual integration
const AREA_NORMALISER: f64 = 10_000.0;

/// Inter-visibility graph over the sample points. Edge weight is the
/// distance between the two points.
#[derive(Debug, Clone)]
pub struct VisibilityGraph {
    graph: UnGraph<Point, f64>,
}

impl VisibilityGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn visible_neighbors(&self, idx: usize) -> usize {
        self.graph.neighbors(NodeIndex::new(idx)).count()
    }

    /// Endpoints and weight of every edge
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point, f64)> + '_ {
        self.graph.raw_edges().iter().map(move |e| {
            (
                self.graph[e.source()],
                self.graph[e.target()],
                e.weight,
            )
        })
    }
}

/// Connect every pair among the first `limit` points that are strictly
/// closer than `threshold` and mutually visible. All points stay nodes.
pub fn build_visibility_graph(
    points: &[Point],
    obstacles: &[Obstacle],
    threshold: f64,
    limit: usize,
    cancel: &CancellationToken,
) -> AnalysisResult<VisibilityGraph> {
    let mut graph = UnGraph::with_capacity(points.len(), 0);
    for p in points {
        graph.add_node(*p);
    }

    let m = points.len().min(limit);
    let edges: Vec<Vec<(usize, usize, f64)>> = (0..m)
        .into_par_iter()
        .map(|i| -> AnalysisResult<Vec<(usize, usize, f64)>> {
            cancel.check()?;
            let p = points[i];
            Ok(((i + 1)..m)
                .filter_map(|j| {
                    let q = points[j];
                    let dist = p.distance(&q);
                    (dist < threshold && line_of_sight(p, q, obstacles)).then_some((i, j, dist))
                })
                .collect())
        })
        .collect::<AnalysisResult<_>>()?;

    for (i, j, dist) in edges.into_iter().flatten() {
        graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), dist);
    }
    Ok(VisibilityGraph { graph })
}

/// 0.5 · visible neighbours + 0.5 · (isovist area / 10 000)
pub fn visual_integration(visible_neighbors: usize, isovist_area: f64) -> f64 {
    0.5 * visible_neighbors as f64 + 0.5 * (isovist_area / AREA_NORMALISER)
}

/// Visibility measures at one sample point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMetrics {
    pub position: Point,
    pub visual_integration: f64,
    pub visible_neighbors: usize,
    pub isovist: IsovistMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPoint {
    /// Index into the sample
    pub index: usize,
    pub position: Point,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CriticalPoints {
    /// Highest visual integration
    pub high_visual_integration: Vec<CriticalPoint>,
    /// Lowest visual integration
    pub blind_spots: Vec<CriticalPoint>,
    /// Largest isovist area
    pub wide_view_points: Vec<CriticalPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct VisibilitySummary {
    pub point_count: usize,
    pub edge_count: usize,
    pub visual_integration: Distribution,
    pub isovist_area: Distribution,
    pub blind_spot_count: usize,
}

/// Merge graph degree and isovist scalars into per-point metrics.
/// Points without an isovist get zero-valued isovist scalars.
pub fn point_metrics(
    points: &[Point],
    graph: &VisibilityGraph,
    isovists: &[Option<IsovistMetrics>],
) -> Vec<PointMetrics> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let isovist = isovists.get(i).copied().flatten().unwrap_or_default();
            let visible_neighbors = graph.visible_neighbors(i);
            PointMetrics {
                position: *p,
                visual_integration: visual_integration(visible_neighbors, isovist.area),
                visible_neighbors,
                isovist,
            }
        })
        .collect()
}

fn ranked(metrics: &[PointMetrics], key: fn(&PointMetrics) -> f64, descending: bool) -> Vec<CriticalPoint> {
    let mut out: Vec<CriticalPoint> = metrics
        .iter()
        .enumerate()
        .map(|(index, m)| CriticalPoint {
            index,
            position: m.position,
            value: key(m),
        })
        .collect();
    if descending {
        out.sort_by(|a, b| b.value.total_cmp(&a.value));
    } else {
        out.sort_by(|a, b| a.value.total_cmp(&b.value));
    }
    out.truncate(CRITICAL_POINT_COUNT);
    out
}

/// Top and bottom points by visual integration, and the widest views
pub fn identify_critical_points(metrics: &[PointMetrics]) -> CriticalPoints {
    CriticalPoints {
        high_visual_integration: ranked(metrics, |m| m.visual_integration, true),
        blind_spots: ranked(metrics, |m| m.visual_integration, false),
        wide_view_points: ranked(metrics, |m| m.isovist.area, true),
    }
}

pub fn summarize(metrics: &[PointMetrics], graph: &VisibilityGraph) -> VisibilitySummary {
    let vi: Vec<f64> = metrics.iter().map(|m| m.visual_integration).collect();
    let area: Vec<f64> = metrics.iter().map(|m| m.isovist.area).collect();
    VisibilitySummary {
        point_count: metrics.len(),
        edge_count: graph.edge_count(),
        visual_integration: Distribution::from_values(&vi),
        isovist_area: Distribution::from_values(&area),
        blind_spot_count: vi.iter().filter(|&&v| v < BLIND_SPOT_THRESHOLD).count(),
    }
}
