//! Closeness and betweenness centrality over the circulation graph
//!
//! Both measures run one shortest-path pass per source node. The passes are
//! independent, so they are spread across the rayon pool and the partial
//! results are combined afterwards in node order.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use crate::graph::CirculationGraph;

/// Relative tolerance when deciding two weighted path lengths are equal
const PATH_EQ_TOLERANCE: f64 = 1e-9;

// ============================================================================
// CLOSENESS CENTRALITY
// ============================================================================
//
// How close is a space to everything it can reach?
//
//   C(u) = (r - 1) / Σ d(u, v)        over the r nodes reachable from u
//
// On disconnected plans a node in a small island would look "central" by
// the raw formula, so the value is scaled by the share of the plan it can
// reach (Wasserman & Faust):
//
//   C_wf(u) = C(u) · (r - 1) / (k - 1)          k = total node count
// ============================================================================

/// Closeness centrality for every node, in index order.
pub fn closeness(graph: &CirculationGraph, weighted: bool) -> Vec<f64> {
    let k = graph.node_count();
    (0..k)
        .into_par_iter()
        .map(|source| {
            let reached: Vec<f64> = graph
                .distances(source, weighted)
                .into_iter()
                .flatten()
                .collect();
            let total: f64 = reached.iter().sum();
            let r = reached.len();
            if total > 0.0 && k > 1 {
                let c = (r - 1) as f64 / total;
                c * (r - 1) as f64 / (k - 1) as f64
            } else {
                0.0
            }
        })
        .collect()
}

// ============================================================================
// BETWEENNESS CENTRALITY (Brandes Algorithm)
// ============================================================================
//
// How often does a space sit on the shortest route between two OTHER
// spaces? High betweenness = bottleneck corridor or lobby.
//
//   BC(v) = Σ σ_st(v) / σ_st            for all pairs s ≠ v ≠ t
//
// Brandes: one search per source (BFS for hops, Dijkstra for metres),
// then dependencies are accumulated backwards from the farthest node.
// Every unordered pair is visited from both ends, so the summed scores
// count each pair twice; the normalisation below folds that in:
//
//   BC_norm(v) = BC_sum(v) / ((k - 1)(k - 2))
// ============================================================================

/// Normalized betweenness centrality for every node, in index order.
pub fn betweenness(graph: &CirculationGraph, weighted: bool) -> Vec<f64> {
    let k = graph.node_count();
    if k == 0 {
        return vec![];
    }
    let adjacency = graph.adjacency();

    let partial_scores: Vec<Vec<f64>> = (0..k)
        .into_par_iter()
        .map(|source| {
            let pass = if weighted {
                weighted_pass(&adjacency, source)
            } else {
                hop_pass(&adjacency, source)
            };
            accumulate(pass, source)
        })
        .collect();

    let mut scores = vec![0.0; k];
    for partial in partial_scores {
        for (i, score) in partial.into_iter().enumerate() {
            scores[i] += score;
        }
    }

    if k <= 2 {
        return vec![0.0; k];
    }
    let scale = 1.0 / ((k - 1) as f64 * (k - 2) as f64);
    scores.iter_mut().for_each(|s| *s *= scale);
    scores
}

/// Result of one single-source search
struct ShortestPathDag {
    /// Nodes in order of non-decreasing distance from the source
    order: Vec<usize>,
    predecessors: Vec<Vec<usize>>,
    num_paths: Vec<f64>,
}

fn hop_pass(adjacency: &[Vec<(usize, f64)>], source: usize) -> ShortestPathDag {
    let n = adjacency.len();
    let mut order = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![vec![]; n];
    let mut num_paths = vec![0.0; n];
    let mut distance: Vec<i64> = vec![-1; n];
    num_paths[source] = 1.0;
    distance[source] = 0;

    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        order.push(v);
        for &(w, _) in &adjacency[v] {
            if distance[w] < 0 {
                distance[w] = distance[v] + 1;
                queue.push_back(w);
            }
            if distance[w] == distance[v] + 1 {
                num_paths[w] += num_paths[v];
                predecessors[w].push(v);
            }
        }
    }

    ShortestPathDag {
        order,
        predecessors,
        num_paths,
    }
}

#[derive(Clone, Copy)]
struct Frontier {
    dist: f64,
    node: usize,
    pred: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // Min-heap on distance; ties broken by node index for a stable order
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

fn same_length(a: f64, b: f64) -> bool {
    (a - b).abs() <= PATH_EQ_TOLERANCE * a.abs().max(1.0)
}

fn weighted_pass(adjacency: &[Vec<(usize, f64)>], source: usize) -> ShortestPathDag {
    let n = adjacency.len();
    let mut order = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![vec![]; n];
    let mut num_paths = vec![0.0; n];
    let mut settled: Vec<Option<f64>> = vec![None; n];
    let mut seen: Vec<Option<f64>> = vec![None; n];
    num_paths[source] = 1.0;
    seen[source] = Some(0.0);

    let mut heap = BinaryHeap::new();
    heap.push(Frontier {
        dist: 0.0,
        node: source,
        pred: source,
    });

    while let Some(Frontier { dist, node: v, pred }) = heap.pop() {
        if settled[v].is_some() {
            continue;
        }
        if v != source {
            num_paths[v] += num_paths[pred];
        }
        settled[v] = Some(dist);
        order.push(v);

        for &(w, weight) in &adjacency[v] {
            let candidate = dist + weight;
            if settled[w].is_some() {
                continue;
            }
            match seen[w] {
                Some(best) if same_length(candidate, best) => {
                    num_paths[w] += num_paths[v];
                    predecessors[w].push(v);
                }
                Some(best) if candidate > best => {}
                _ => {
                    seen[w] = Some(candidate);
                    num_paths[w] = 0.0;
                    predecessors[w] = vec![v];
                    heap.push(Frontier {
                        dist: candidate,
                        node: w,
                        pred: v,
                    });
                }
            }
        }
    }

    ShortestPathDag {
        order,
        predecessors,
        num_paths,
    }
}

fn accumulate(dag: ShortestPathDag, source: usize) -> Vec<f64> {
    let n = dag.num_paths.len();
    let mut partial = vec![0.0; n];
    let mut dependency = vec![0.0; n];
    let ShortestPathDag {
        mut order,
        predecessors,
        num_paths,
    } = dag;

    while let Some(w) = order.pop() {
        for &v in &predecessors[w] {
            dependency[v] += (num_paths[v] / num_paths[w]) * (1.0 + dependency[w]);
        }
        if w != source {
            partial[w] += dependency[w];
        }
    }
    partial
}
