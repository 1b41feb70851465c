//! Space Syntax engine
//!
//! Topological and metric accessibility measures over the circulation
//! graph, after Hillier & Hanson. In weighted mode path lengths are edge
//! distances in metres; otherwise every step counts as one.
//!
//! ```text
//! degree          incident edges
//! closeness       (r-1)/Σd, scaled by reach (Wasserman & Faust)
//! betweenness     Brandes, normalised by (k-1)(k-2)
//! choice          same as betweenness
//! integration     1 / RRA,  RRA = RA / D_k,  RA = 2(MD-1)/(k-2)
//! connectivity    eccentricity in hops (∞ when disconnected)
//! depth           hops from each entrance, and their mean
//! control         Σ 1/degree(neighbour)
//! ```
//!
//! The engine never fails on disconnected or isolated nodes; only an empty
//! graph is rejected.

pub mod centrality;
pub mod integration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{AnalysisError, AnalysisResult};
use crate::graph::CirculationGraph;
use crate::stats::{mean, std_dev, Distribution};

pub use integration::{DepthProfile, EntranceDepth, IntegrationDetail};

/// Complexity weights: mean degree, max depth, inverse mean integration
const COMPLEXITY_WEIGHTS: (f64, f64, f64) = (0.4, 0.3, 0.3);

/// Minimum degree of a decision point
pub const DECISION_POINT_DEGREE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntaxOptions {
    /// Use edge distances instead of hop counts
    pub weighted: bool,
    /// Length of each critical-node ranking
    pub top_n: usize,
}

impl Default for SyntaxOptions {
    fn default() -> Self {
        Self {
            weighted: true,
            top_n: 10,
        }
    }
}

/// Every syntax measure for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSyntax {
    pub node: String,
    pub degree: usize,
    pub closeness: f64,
    pub betweenness: f64,
    pub choice: f64,
    pub integration: IntegrationDetail,
    /// Eccentricity in hops; `None` when the plan is disconnected
    pub connectivity: Option<f64>,
    pub depth: DepthProfile,
    pub control: f64,
    pub controllability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNode {
    pub node: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CriticalNodes {
    /// Highest betweenness
    pub bottlenecks: Vec<RankedNode>,
    /// Highest integration
    pub well_connected: Vec<RankedNode>,
    /// Highest degree
    pub branching: Vec<RankedNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ComplexityIndex {
    pub mean_degree: f64,
    pub std_degree: f64,
    pub mean_depth: f64,
    pub max_depth: f64,
    pub mean_integration: f64,
    pub composite: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SyntaxSummary {
    pub degree: Distribution,
    pub closeness: Distribution,
    pub betweenness: Distribution,
    pub integration: Distribution,
}

/// Output of a full Space Syntax pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxReport {
    pub weighted: bool,
    pub entrances: Vec<String>,
    pub nodes: Vec<NodeSyntax>,
    pub decision_points: Vec<String>,
    pub critical_nodes: CriticalNodes,
    pub complexity: ComplexityIndex,
    pub summary: SyntaxSummary,
}

impl SyntaxReport {
    pub fn node(&self, id: &str) -> Option<&NodeSyntax> {
        self.nodes.iter().find(|n| n.node == id)
    }

    pub fn mean_integration(&self) -> f64 {
        self.summary.integration.mean
    }
}

/// Computes syntax measures over a borrowed circulation graph
pub struct SpaceSyntaxAnalyzer<'a> {
    graph: &'a CirculationGraph,
    options: SyntaxOptions,
}

impl<'a> SpaceSyntaxAnalyzer<'a> {
    pub fn new(graph: &'a CirculationGraph, options: SyntaxOptions) -> Self {
        Self { graph, options }
    }

    pub fn degree(&self) -> Vec<usize> {
        (0..self.graph.node_count())
            .map(|v| self.graph.degree(v))
            .collect()
    }

    pub fn closeness(&self) -> Vec<f64> {
        centrality::closeness(self.graph, self.options.weighted)
    }

    pub fn betweenness(&self) -> Vec<f64> {
        centrality::betweenness(self.graph, self.options.weighted)
    }

    /// Choice is reported as betweenness
    pub fn choice(&self) -> Vec<f64> {
        self.betweenness()
    }

    pub fn integration(&self) -> Vec<IntegrationDetail> {
        integration::integration(self.graph, self.options.weighted)
    }

    pub fn connectivity(&self) -> Vec<f64> {
        integration::connectivity(self.graph)
    }

    /// Explicit entrances when any resolve, otherwise low-degree nodes.
    pub fn entrances(&self, explicit: Option<&[String]>) -> Vec<usize> {
        let resolved = explicit
            .map(|ids| integration::resolve_entrances(self.graph, ids))
            .unwrap_or_default();
        if resolved.is_empty() {
            integration::identify_entrances(self.graph)
        } else {
            resolved
        }
    }

    pub fn depth(&self, entrances: &[usize]) -> Vec<DepthProfile> {
        integration::depth(self.graph, entrances)
    }

    pub fn control(&self) -> Vec<f64> {
        integration::control(self.graph)
    }

    pub fn controllability(&self) -> Vec<f64> {
        integration::controllability(self.graph, &self.control())
    }

    /// Nodes where a route branches (degree ≥ 3)
    pub fn decision_points(&self) -> Vec<usize> {
        (0..self.graph.node_count())
            .filter(|&v| self.graph.degree(v) >= DECISION_POINT_DEGREE)
            .collect()
    }

    /// Run every measure and gather the report.
    pub fn analyze(&self, entrances: Option<&[String]>) -> AnalysisResult<SyntaxReport> {
        if self.graph.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "circulation graph has no nodes".to_string(),
            ));
        }
        debug!(
            "Space syntax over {} nodes (weighted: {})",
            self.graph.node_count(),
            self.options.weighted
        );

        let degree = self.degree();
        let closeness = self.closeness();
        let betweenness = self.betweenness();
        let integ = self.integration();
        let connectivity = self.connectivity();
        let entrance_idx = self.entrances(entrances);
        let depth = self.depth(&entrance_idx);
        let control = self.control();
        let controllability = integration::controllability(self.graph, &control);

        let nodes: Vec<NodeSyntax> = (0..self.graph.node_count())
            .map(|v| NodeSyntax {
                node: self.graph.id(v).to_string(),
                degree: degree[v],
                closeness: closeness[v],
                betweenness: betweenness[v],
                choice: betweenness[v],
                integration: integ[v],
                connectivity: Some(connectivity[v]).filter(|c| c.is_finite()),
                depth: depth[v].clone(),
                control: control[v],
                controllability: controllability[v],
            })
            .collect();

        let critical_nodes = identify_critical_nodes(&nodes, self.options.top_n);
        let complexity = complexity_index(&nodes);
        let summary = summarize(&nodes);

        info!(
            "Space syntax complete: mean integration {:.3}, complexity {:.2}",
            summary.integration.mean, complexity.composite
        );

        Ok(SyntaxReport {
            weighted: self.options.weighted,
            entrances: entrance_idx
                .iter()
                .map(|&v| self.graph.id(v).to_string())
                .collect(),
            decision_points: self
                .decision_points()
                .into_iter()
                .map(|v| self.graph.id(v).to_string())
                .collect(),
            nodes,
            critical_nodes,
            complexity,
            summary,
        })
    }
}

/// Descending, stable ranking of nodes by `key`.
fn rank_by(nodes: &[NodeSyntax], top_n: usize, key: impl Fn(&NodeSyntax) -> f64) -> Vec<RankedNode> {
    let mut ranked: Vec<RankedNode> = nodes
        .iter()
        .map(|n| RankedNode {
            node: n.node.clone(),
            value: key(n),
        })
        .collect();
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranked.truncate(top_n);
    ranked
}

/// Top nodes by betweenness, integration and degree
pub fn identify_critical_nodes(nodes: &[NodeSyntax], top_n: usize) -> CriticalNodes {
    CriticalNodes {
        bottlenecks: rank_by(nodes, top_n, |n| n.betweenness),
        well_connected: rank_by(nodes, top_n, |n| n.integration.value),
        branching: rank_by(nodes, top_n, |n| n.degree as f64),
    }
}

/// Composite plan complexity:
/// 0.4·mean degree + 0.3·max depth + 0.3·(1 / mean integration)
pub fn complexity_index(nodes: &[NodeSyntax]) -> ComplexityIndex {
    let degrees: Vec<f64> = nodes.iter().map(|n| n.degree as f64).collect();
    let depths: Vec<f64> = nodes.iter().filter_map(|n| n.depth.average).collect();
    let integ: Vec<f64> = nodes.iter().map(|n| n.integration.value).collect();

    let mean_degree = mean(&degrees);
    let max_depth = depths.iter().copied().fold(0.0, f64::max);
    let mean_integration = mean(&integ);
    let (w_degree, w_depth, w_integ) = COMPLEXITY_WEIGHTS;
    let inverse_integration = if mean_integration > 0.0 {
        1.0 / mean_integration
    } else {
        0.0
    };

    ComplexityIndex {
        mean_degree,
        std_degree: std_dev(&degrees),
        mean_depth: mean(&depths),
        max_depth,
        mean_integration,
        composite: w_degree * mean_degree + w_depth * max_depth + w_integ * inverse_integration,
    }
}

fn summarize(nodes: &[NodeSyntax]) -> SyntaxSummary {
    let collect = |f: fn(&NodeSyntax) -> f64| -> Vec<f64> { nodes.iter().map(f).collect() };
    SyntaxSummary {
        degree: Distribution::from_values(&collect(|n| n.degree as f64)),
        closeness: Distribution::from_values(&collect(|n| n.closeness)),
        betweenness: Distribution::from_values(&collect(|n| n.betweenness)),
        integration: Distribution::from_values(&collect(|n| n.integration.value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisInput, EdgeSpec, GraphSpec, NodeSpec};

    fn hospital() -> CirculationGraph {
        CirculationGraph::from_spec(&AnalysisInput::sample_hospital().graph).unwrap()
    }

    /// Mean shortest-path length over all reachable ordered pairs
    fn average_path_length(graph: &CirculationGraph) -> f64 {
        let mut total = 0.0;
        let mut pairs = 0usize;
        for v in 0..graph.node_count() {
            for d in graph.weighted_distances(v).into_iter().flatten() {
                if d > 0.0 {
                    total += d;
                    pairs += 1;
                }
            }
        }
        total / pairs as f64
    }

    #[test]
    fn test_analyze_hospital() {
        let g = hospital();
        let report = SpaceSyntaxAnalyzer::new(&g, SyntaxOptions::default())
            .analyze(None)
            .unwrap();

        assert_eq!(report.nodes.len(), 9);
        assert_eq!(report.node("node_1").unwrap().degree, 3);
        assert_eq!(report.decision_points, vec!["node_1", "node_2", "node_3"]);
        assert_eq!(report.entrances[0], "entrance");
        assert!(report.critical_nodes.bottlenecks.len() <= 10);
        // node_1 joins the two wings of the plan
        assert_eq!(report.critical_nodes.bottlenecks[0].node, "node_1");
        for node in &report.nodes {
            assert_eq!(node.choice, node.betweenness);
            assert!(node.connectivity.is_some());
        }
        assert!(report.complexity.composite > 0.0);
    }

    /// Six-node ring around a central hub, plus a pendant hanging off r1
    /// (which makes r1 a cut vertex)
    fn wheel_with_pendant() -> CirculationGraph {
        let ring = ["r1", "r2", "r3", "r4", "r5", "r6"];
        let mut g = CirculationGraph::new();
        g.add_node("hub", None).unwrap();
        for r in ring {
            g.add_node(r, None).unwrap();
        }
        g.add_node("pendant", None).unwrap();
        for (i, r) in ring.iter().enumerate() {
            g.add_edge("hub", r, 1.0).unwrap();
            g.add_edge(r, ring[(i + 1) % ring.len()], 1.0).unwrap();
        }
        g.add_edge("pendant", "r1", 1.0).unwrap();
        g
    }

    #[test]
    fn test_removing_top_bottleneck_lengthens_paths() {
        let g = wheel_with_pendant();
        let report = SpaceSyntaxAnalyzer::new(
            &g,
            SyntaxOptions {
                weighted: false,
                top_n: 3,
            },
        )
        .analyze(None)
        .unwrap();
        let top = &report.critical_nodes.bottlenecks[0].node;
        assert_eq!(top, "hub");

        let before = average_path_length(&g);
        let cut = g.without_node(top).unwrap();
        assert!(cut.hop_distances(0).iter().all(Option::is_some));
        assert!(average_path_length(&cut) > before);
    }

    #[test]
    fn test_explicit_entrances() {
        let g = hospital();
        let analyzer = SpaceSyntaxAnalyzer::new(&g, SyntaxOptions::default());
        let explicit = vec!["reception".to_string()];
        let report = analyzer.analyze(Some(&explicit)).unwrap();
        assert_eq!(report.entrances, vec!["reception"]);
        let ghost = vec!["ghost".to_string()];
        assert_eq!(analyzer.entrances(Some(&ghost)).len(), 5);
    }

    #[test]
    fn test_empty_graph_rejected() {
        let g = CirculationGraph::new();
        let result = SpaceSyntaxAnalyzer::new(&g, SyntaxOptions::default()).analyze(None);
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_disconnected_graph_does_not_fail() {
        let spec = GraphSpec {
            nodes: ["a", "b", "c", "d"].iter().map(|id| NodeSpec::new(*id)).collect(),
            edges: vec![EdgeSpec::new("a", "b", 1.0), EdgeSpec::new("c", "d", 1.0)],
        };
        let g = CirculationGraph::from_spec(&spec).unwrap();
        let report = SpaceSyntaxAnalyzer::new(
            &g,
            SyntaxOptions {
                weighted: false,
                top_n: 2,
            },
        )
        .analyze(None)
        .unwrap();
        assert!(report.nodes.iter().all(|n| n.connectivity.is_none()));
        assert_eq!(report.critical_nodes.branching.len(), 2);
        assert!(report.summary.integration.mean >= 0.0);
    }

    #[test]
    fn test_complexity_index_formula() {
        let g = hospital();
        let report = SpaceSyntaxAnalyzer::new(&g, SyntaxOptions::default())
            .analyze(None)
            .unwrap();
        let c = report.complexity;
        let expected = 0.4 * c.mean_degree
            + 0.3 * c.max_depth
            + 0.3 * (1.0 / c.mean_integration);
        assert!((c.composite - expected).abs() < 1e-9);
        assert!((c.mean_degree - 16.0 / 9.0).abs() < 1e-9);
    }
}
