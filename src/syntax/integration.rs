//! Hillier integration plus the depth-based syntax measures
//! (connectivity, entrance depth, control)

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::graph::CirculationGraph;
use crate::stats::mean;

/// Entrances picked automatically when none are supplied
pub const MAX_AUTO_ENTRANCES: usize = 5;

/// Integration value with the intermediate asymmetry terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct IntegrationDetail {
    pub value: f64,
    pub ra: f64,
    pub rra: f64,
    pub mean_depth: f64,
}

/// Hillier & Hanson's D_k normalisation constant (approximated from
/// their published tables)
pub fn depth_factor(k: usize) -> f64 {
    let kf = k as f64;
    if k < 3 {
        1.0
    } else if k <= 10 {
        kf / 3.0
    } else if k <= 100 {
        2.0 * (kf - 1.0).sqrt()
    } else {
        2.0 * kf.ln()
    }
}

/// Integration (1 / RRA) for every node.
///
/// Mean depth averages the distance to every node the source can reach,
/// counting the source itself at depth 0. A node that reaches nothing, or
/// whose RRA is not positive, integrates to 0.
pub fn integration(graph: &CirculationGraph, weighted: bool) -> Vec<IntegrationDetail> {
    let k = graph.node_count();
    let d_k = depth_factor(k);

    (0..k)
        .into_par_iter()
        .map(|source| {
            let depths: Vec<f64> = graph
                .distances(source, weighted)
                .into_iter()
                .flatten()
                .collect();
            if depths.len() <= 1 {
                return IntegrationDetail::default();
            }
            let md = mean(&depths);
            if k <= 2 {
                return IntegrationDetail {
                    mean_depth: md,
                    ..Default::default()
                };
            }
            let ra = 2.0 * (md - 1.0) / (k as f64 - 2.0);
            let rra = ra / d_k;
            let value = if rra > 0.0 { 1.0 / rra } else { 0.0 };
            IntegrationDetail {
                value,
                ra,
                rra,
                mean_depth: md,
            }
        })
        .collect()
}

/// Eccentricity in hops. Every node is infinitely eccentric on a
/// disconnected plan.
pub fn connectivity(graph: &CirculationGraph) -> Vec<f64> {
    (0..graph.node_count())
        .into_par_iter()
        .map(|source| {
            let hops = graph.hop_distances(source);
            if hops.iter().any(Option::is_none) {
                f64::INFINITY
            } else {
                hops.into_iter().flatten().max().unwrap_or(0) as f64
            }
        })
        .collect()
}

/// Hop depth of one entrance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntranceDepth {
    pub entrance: String,
    pub depth: usize,
}

/// Depth of a node from each entrance that reaches it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DepthProfile {
    pub from_entrances: Vec<EntranceDepth>,
    /// Mean over `from_entrances`; `None` when no entrance reaches the node
    pub average: Option<f64>,
}

/// Low-degree nodes in insertion order, falling back to the first node.
pub fn identify_entrances(graph: &CirculationGraph) -> Vec<usize> {
    let mut entrances: Vec<usize> = (0..graph.node_count())
        .filter(|&v| graph.degree(v) <= 2)
        .take(MAX_AUTO_ENTRANCES)
        .collect();
    if entrances.is_empty() && !graph.is_empty() {
        entrances.push(0);
    }
    entrances
}

/// Resolve caller-supplied entrance ids, dropping unknown ones.
pub fn resolve_entrances(graph: &CirculationGraph, ids: &[String]) -> Vec<usize> {
    ids.iter()
        .filter_map(|id| {
            let idx = graph.index_of(id);
            if idx.is_none() {
                warn!("Ignoring unknown entrance '{}'", id);
            }
            idx
        })
        .collect()
}

/// Topological depth of every node from the given entrances.
pub fn depth(graph: &CirculationGraph, entrances: &[usize]) -> Vec<DepthProfile> {
    let mut profiles = vec![DepthProfile::default(); graph.node_count()];
    for &entrance in entrances {
        let name = graph.id(entrance).to_string();
        for (node, hops) in graph.hop_distances(entrance).into_iter().enumerate() {
            if let Some(depth) = hops {
                profiles[node].from_entrances.push(EntranceDepth {
                    entrance: name.clone(),
                    depth,
                });
            }
        }
    }
    for profile in &mut profiles {
        if !profile.from_entrances.is_empty() {
            let depths: Vec<f64> = profile
                .from_entrances
                .iter()
                .map(|d| d.depth as f64)
                .collect();
            profile.average = Some(mean(&depths));
        }
    }
    profiles
}

/// Control value: Σ 1/degree(u) over the neighbours u.
pub fn control(graph: &CirculationGraph) -> Vec<f64> {
    (0..graph.node_count())
        .map(|v| {
            graph
                .neighbors(v)
                .into_iter()
                .map(|u| 1.0 / graph.degree(u).max(1) as f64)
                .sum()
        })
        .collect()
}

/// Control divided by neighbour count (0 for isolated nodes).
pub fn controllability(graph: &CirculationGraph, control: &[f64]) -> Vec<f64> {
    control
        .iter()
        .enumerate()
        .map(|(v, c)| {
            let neighbors = graph.neighbors(v).len();
            if neighbors == 0 {
                0.0
            } else {
                c / neighbors as f64
            }
        })
        .collect()
}
