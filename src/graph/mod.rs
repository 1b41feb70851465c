//! Circulation graph
//!
//! A thin wrapper over a petgraph `UnGraph` that keeps a name → index map
//! so engines can address nodes by their string ids while working on dense
//! `usize` indices internally. Nodes are never removed after construction,
//! so index `i` is always the i-th inserted node.
//!
//! Shortest paths use petgraph's A* with a zero heuristic (Dijkstra with
//! early exit), which is what the simulator needs for routing and
//! corrective re-routing.

use petgraph::algo::{astar, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::debug;

use crate::errors::{AnalysisError, AnalysisResult};
use crate::models::{GraphSpec, Point};

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub position: Option<Point>,
}

/// A minimum-weight route through the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub distance: f64,
    pub nodes: Vec<usize>,
}

/// Weighted undirected circulation graph with string-keyed nodes
#[derive(Debug, Clone, Default)]
pub struct CirculationGraph {
    graph: UnGraph<GraphNode, f64>,
    index: FxHashMap<String, NodeIndex>,
}

impl CirculationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the serialized document, validating ids and weights.
    pub fn from_spec(spec: &GraphSpec) -> AnalysisResult<Self> {
        let mut graph = Self::new();
        for node in &spec.nodes {
            graph.add_node(&node.id, node.position())?;
        }
        for edge in &spec.edges {
            graph.add_edge(&edge.from, &edge.to, edge.weight)?;
        }
        debug!(
            "Built circulation graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    pub fn add_node(&mut self, id: &str, position: Option<Point>) -> AnalysisResult<usize> {
        if id.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("empty node id".to_string()));
        }
        if self.index.contains_key(id) {
            return Err(AnalysisError::InvalidInput(format!(
                "duplicate node id '{id}'"
            )));
        }
        let idx = self.graph.add_node(GraphNode {
            id: id.to_string(),
            position,
        });
        self.index.insert(id.to_string(), idx);
        Ok(idx.index())
    }

    /// Connect two existing nodes. A repeated pair overwrites the weight.
    pub fn add_edge(&mut self, from: &str, to: &str, weight: f64) -> AnalysisResult<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "edge {from} - {to} has invalid weight {weight}"
            )));
        }
        let a = self.node_index(from)?;
        let b = self.node_index(to)?;
        if a == b {
            debug!("Ignoring self-loop on {}", from);
            return Ok(());
        }
        self.graph.update_edge(a, b, weight);
        Ok(())
    }

    fn node_index(&self, id: &str) -> AnalysisResult<NodeIndex> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| AnalysisError::UnknownNode(id.to_string()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).map(|idx| idx.index())
    }

    /// Node id for a dense index. Panics on an out-of-range index.
    pub fn id(&self, idx: usize) -> &str {
        &self.graph[NodeIndex::new(idx)].id
    }

    /// Node ids in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_weights().map(|n| n.id.as_str())
    }

    pub fn position(&self, idx: usize) -> Option<Point> {
        self.graph
            .node_weight(NodeIndex::new(idx))
            .and_then(|n| n.position)
    }

    pub fn degree(&self, idx: usize) -> usize {
        self.graph.edges(NodeIndex::new(idx)).count()
    }

    /// Neighbours in ascending index order
    pub fn neighbors(&self, idx: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .graph
            .neighbors(NodeIndex::new(idx))
            .map(|n| n.index())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn edge_weight(&self, a: usize, b: usize) -> Option<f64> {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .and_then(|e| self.graph.edge_weight(e).copied())
    }

    /// Minimum-weight route between two named nodes.
    pub fn shortest_path(&self, from: &str, to: &str) -> AnalysisResult<Route> {
        let a = self.node_index(from)?;
        let b = self.node_index(to)?;
        self.route(a.index(), b.index())
            .ok_or_else(|| AnalysisError::NoPath {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// Minimum-weight route between two indices, `None` when unreachable.
    pub fn route(&self, from: usize, to: usize) -> Option<Route> {
        let goal = NodeIndex::new(to);
        astar(
            &self.graph,
            NodeIndex::new(from),
            |n| n == goal,
            |e| *e.weight(),
            |_| 0.0,
        )
        .map(|(distance, path)| Route {
            distance,
            nodes: path.into_iter().map(|n| n.index()).collect(),
        })
    }

    /// Sum of edge weights along a walked path. Steps without a direct edge
    /// add nothing.
    pub fn path_length(&self, path: &[usize]) -> f64 {
        path.windows(2)
            .filter_map(|w| self.edge_weight(w[0], w[1]))
            .sum()
    }

    /// BFS hop counts from `source`; `None` for unreachable nodes.
    pub fn hop_distances(&self, source: usize) -> Vec<Option<usize>> {
        let n = self.node_count();
        let mut dist = vec![None; n];
        if source >= n {
            return dist;
        }
        dist[source] = Some(0);
        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            let d = dist[v].unwrap_or(0);
            for w in self.graph.neighbors(NodeIndex::new(v)) {
                let w = w.index();
                if dist[w].is_none() {
                    dist[w] = Some(d + 1);
                    queue.push_back(w);
                }
            }
        }
        dist
    }

    /// Dijkstra distances from `source`; `None` for unreachable nodes.
    pub fn weighted_distances(&self, source: usize) -> Vec<Option<f64>> {
        let n = self.node_count();
        let mut dist = vec![None; n];
        if source >= n {
            return dist;
        }
        for (node, d) in dijkstra(&self.graph, NodeIndex::new(source), None, |e| *e.weight()) {
            dist[node.index()] = Some(d);
        }
        dist
    }

    /// Hop or weighted distances depending on `weighted`
    pub fn distances(&self, source: usize, weighted: bool) -> Vec<Option<f64>> {
        if weighted {
            self.weighted_distances(source)
        } else {
            self.hop_distances(source)
                .into_iter()
                .map(|d| d.map(|h| h as f64))
                .collect()
        }
    }

    /// Weighted adjacency lists, indexed like the graph
    pub fn adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        (0..self.node_count())
            .map(|v| {
                let mut adj: Vec<(usize, f64)> = self
                    .graph
                    .edges(NodeIndex::new(v))
                    .map(|e| {
                        let other = if e.source().index() == v {
                            e.target().index()
                        } else {
                            e.source().index()
                        };
                        (other, *e.weight())
                    })
                    .collect();
                adj.sort_by_key(|(w, _)| *w);
                adj
            })
            .collect()
    }

    /// Copy of the graph with one node (and its edges) removed.
    pub fn without_node(&self, id: &str) -> AnalysisResult<Self> {
        let removed = self.node_index(id)?;
        let mut out = Self::new();
        for node in self.graph.node_weights() {
            if node.id != id {
                out.add_node(&node.id, node.position)?;
            }
        }
        for edge in self.graph.edge_references() {
            if edge.source() == removed || edge.target() == removed {
                continue;
            }
            out.add_edge(
                &self.graph[edge.source()].id,
                &self.graph[edge.target()].id,
                *edge.weight(),
            )?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EdgeSpec, NodeSpec};

    fn line_graph() -> CirculationGraph {
        let spec = GraphSpec {
            nodes: vec![NodeSpec::new("a"), NodeSpec::new("b"), NodeSpec::new("c")],
            edges: vec![EdgeSpec::new("a", "b", 2.0), EdgeSpec::new("b", "c", 3.0)],
        };
        CirculationGraph::from_spec(&spec).unwrap()
    }

    #[test]
    fn test_rejects_malformed_graphs() {
        let dup = GraphSpec {
            nodes: vec![NodeSpec::new("a"), NodeSpec::new("a")],
            edges: vec![],
        };
        assert!(matches!(
            CirculationGraph::from_spec(&dup),
            Err(AnalysisError::InvalidInput(_))
        ));

        let dangling = GraphSpec {
            nodes: vec![NodeSpec::new("a")],
            edges: vec![EdgeSpec::new("a", "ghost", 1.0)],
        };
        assert!(matches!(
            CirculationGraph::from_spec(&dangling),
            Err(AnalysisError::UnknownNode(_))
        ));

        let negative = GraphSpec {
            nodes: vec![NodeSpec::new("a"), NodeSpec::new("b")],
            edges: vec![EdgeSpec::new("a", "b", -1.0)],
        };
        assert!(CirculationGraph::from_spec(&negative).is_err());
    }

    #[test]
    fn test_self_loops_and_repeated_edges() {
        let mut g = CirculationGraph::new();
        g.add_node("a", None).unwrap();
        g.add_node("b", None).unwrap();
        g.add_edge("a", "a", 1.0).unwrap();
        g.add_edge("a", "b", 1.0).unwrap();
        g.add_edge("b", "a", 4.0).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.degree(0), 1);
        assert_eq!(g.edge_weight(0, 1), Some(4.0));
    }

    #[test]
    fn test_shortest_path() {
        let g = line_graph();
        let route = g.shortest_path("a", "c").unwrap();
        assert_eq!(route.distance, 5.0);
        assert_eq!(route.nodes, vec![0, 1, 2]);
        assert_eq!(g.path_length(&route.nodes), 5.0);
    }

    #[test]
    fn test_no_path_between_components() {
        let mut g = line_graph();
        g.add_node("island", None).unwrap();
        assert!(matches!(
            g.shortest_path("a", "island"),
            Err(AnalysisError::NoPath { .. })
        ));
        assert_eq!(g.hop_distances(0), vec![Some(0), Some(1), Some(2), None]);
    }

    #[test]
    fn test_weighted_distances() {
        let g = line_graph();
        assert_eq!(g.weighted_distances(2), vec![Some(5.0), Some(3.0), Some(0.0)]);
        assert_eq!(g.distances(2, false), vec![Some(2.0), Some(1.0), Some(0.0)]);
    }

    #[test]
    fn test_without_node() {
        let g = line_graph();
        let cut = g.without_node("b").unwrap();
        assert_eq!(cut.node_count(), 2);
        assert_eq!(cut.edge_count(), 0);
        assert_eq!(cut.node_ids().collect::<Vec<_>>(), vec!["a", "c"]);
    }
}
