//! Synthetic pedestrians and their journey state machine
//!
//! ```text
//!   Created ──route found──► Traveling ──arrived──► Succeeded
//!      │                        │
//!      └──no route──► Failed ◄──┘ stranded after a wrong turn
//! ```
//!
//! An agent walks the graph-optimal route one edge per step. At each node
//! it may take a wrong turn; a wrong turn that leaves the route triggers a
//! single corrective re-route to the destination, after which the journey
//! ends. Randomness comes from a [`RandomSource`] so tests can script every
//! draw.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::graph::CirculationGraph;

/// Seconds lost per hesitation
pub const HESITATION_PENALTY_S: f64 = 5.0;
/// Seconds lost per wrong turn
pub const ERROR_PENALTY_S: f64 = 10.0;
/// Upper bound on the per-node error probability
pub const MAX_ERROR_PROBABILITY: f64 = 0.9;

/// Visitor profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// Staff and regular visitors who know the building
    Habitual,
    FirstTime,
    Elderly,
    MobilityImpaired,
}

impl AgentType {
    pub const ALL: [AgentType; 4] = [
        AgentType::FirstTime,
        AgentType::Habitual,
        AgentType::Elderly,
        AgentType::MobilityImpaired,
    ];

    /// Chance of a wrong turn at an ordinary node
    pub fn base_error_rate(&self) -> f64 {
        match self {
            AgentType::Habitual => 0.05,
            AgentType::FirstTime => 0.25,
            AgentType::Elderly => 0.35,
            AgentType::MobilityImpaired => 0.30,
        }
    }

    /// Walking speed in m/s
    pub fn speed(&self) -> f64 {
        match self {
            AgentType::Habitual => 1.4,
            AgentType::FirstTime => 1.0,
            AgentType::Elderly => 0.8,
            AgentType::MobilityImpaired => 0.6,
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentType::Habitual => write!(f, "habitual"),
            AgentType::FirstTime => write!(f, "first-time"),
            AgentType::Elderly => write!(f, "elderly"),
            AgentType::MobilityImpaired => write!(f, "mobility-impaired"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Created,
    Traveling,
    Succeeded,
    Failed,
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Succeeded | AgentState::Failed)
    }
}

/// Source of the simulator's random draws
pub trait RandomSource {
    /// Uniform draw in [0, 1)
    fn unit(&mut self) -> f64;
    /// Uniform index in `0..n`, `n > 0`
    fn index(&mut self, n: usize) -> usize;
}

impl RandomSource for ChaCha8Rng {
    fn unit(&mut self) -> f64 {
        self.random::<f64>()
    }

    fn index(&mut self, n: usize) -> usize {
        self.random_range(0..n)
    }
}

/// Replays fixed draws. Once exhausted, unit draws return 1.0 (never a
/// wrong turn) and index draws return 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    units: VecDeque<f64>,
    indices: VecDeque<usize>,
}

impl ScriptedSource {
    pub fn new(units: impl IntoIterator<Item = f64>, indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            units: units.into_iter().collect(),
            indices: indices.into_iter().collect(),
        }
    }
}

impl RandomSource for ScriptedSource {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(1.0)
    }

    fn index(&mut self, n: usize) -> usize {
        self.indices.pop_front().unwrap_or(0).min(n.saturating_sub(1))
    }
}

/// Where the wayfinding aids are, as graph indices
#[derive(Debug, Clone, Default)]
pub struct WayfindingAids {
    pub signage: FxHashSet<usize>,
    pub landmarks: FxHashSet<usize>,
}

impl WayfindingAids {
    pub fn has_signage(&self, node: usize) -> bool {
        self.signage.contains(&node)
    }

    pub fn has_landmark(&self, node: usize) -> bool {
        self.landmarks.contains(&node)
    }
}

/// Per-node wrong-turn probability for an agent type.
pub fn error_probability(
    agent_type: AgentType,
    graph: &CirculationGraph,
    aids: &WayfindingAids,
    node: usize,
) -> f64 {
    let mut p = agent_type.base_error_rate();
    let degree = graph.degree(node);
    if degree >= 4 {
        p *= 1.5;
    } else if degree == 3 {
        p *= 1.2;
    }
    if aids.has_signage(node) {
        p *= 0.5;
    }
    if aids.has_landmark(node) {
        p *= 0.6;
    }
    p.min(MAX_ERROR_PROBABILITY)
}

/// Final record of one agent's journey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub agent_type: AgentType,
    pub state: AgentState,
    pub path: Vec<String>,
    pub distance: f64,
    /// Length of the graph-optimal route, 0 when none exists
    pub optimal_distance: f64,
    pub elapsed_time: f64,
    pub errors: u32,
    pub hesitations: u32,
    pub sign_usages: u32,
    pub success: bool,
}

/// One simulated pedestrian
#[derive(Debug, Clone)]
pub struct Agent {
    agent_type: AgentType,
    origin: usize,
    destination: usize,
    state: AgentState,
    planned: Vec<usize>,
    cursor: usize,
    path: Vec<usize>,
    optimal_distance: f64,
    errors: u32,
    hesitations: u32,
    sign_usages: u32,
}

impl Agent {
    pub fn new(agent_type: AgentType, origin: usize, destination: usize) -> Self {
        Self {
            agent_type,
            origin,
            destination,
            state: AgentState::Created,
            planned: Vec::new(),
            cursor: 0,
            path: Vec::new(),
            optimal_distance: 0.0,
            errors: 0,
            hesitations: 0,
            sign_usages: 0,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    fn finish(&mut self) {
        let arrived = self.path.last() == Some(&self.destination);
        self.state = if arrived {
            AgentState::Succeeded
        } else {
            AgentState::Failed
        };
    }

    /// Advance the state machine by one transition.
    pub fn step<S: RandomSource + ?Sized>(
        &mut self,
        graph: &CirculationGraph,
        aids: &WayfindingAids,
        rng: &mut S,
    ) -> AgentState {
        match self.state {
            AgentState::Created => match graph.route(self.origin, self.destination) {
                Some(route) => {
                    self.optimal_distance = route.distance;
                    self.planned = route.nodes;
                    self.path.push(self.origin);
                    self.state = AgentState::Traveling;
                }
                None => self.state = AgentState::Failed,
            },
            AgentState::Traveling => self.walk_edge(graph, aids, rng),
            AgentState::Succeeded | AgentState::Failed => {}
        }
        self.state
    }

    fn walk_edge<S: RandomSource + ?Sized>(
        &mut self,
        graph: &CirculationGraph,
        aids: &WayfindingAids,
        rng: &mut S,
    ) {
        let Some(&next) = self.planned.get(self.cursor + 1) else {
            self.finish();
            return;
        };
        let current = self.planned[self.cursor];

        let p = error_probability(self.agent_type, graph, aids, current);
        if rng.unit() < p {
            self.errors += 1;
            let neighbors = graph.neighbors(current);
            if neighbors.is_empty() {
                self.finish();
                return;
            }
            let wrong = neighbors[rng.index(neighbors.len())];
            self.path.push(wrong);
            if wrong != next {
                self.hesitations += 1;
                if let Some(correction) = graph.route(wrong, self.destination) {
                    self.path.extend(correction.nodes.into_iter().skip(1));
                }
                self.finish();
                return;
            }
        } else {
            if aids.has_signage(current) || aids.has_signage(next) {
                self.sign_usages += 1;
            }
            self.path.push(next);
        }
        self.cursor += 1;
    }

    /// Step until the journey ends.
    pub fn run<S: RandomSource + ?Sized>(
        &mut self,
        graph: &CirculationGraph,
        aids: &WayfindingAids,
        rng: &mut S,
    ) -> AgentOutcome {
        while !self.step(graph, aids, rng).is_terminal() {}
        self.outcome(graph)
    }

    pub fn outcome(&self, graph: &CirculationGraph) -> AgentOutcome {
        let distance = graph.path_length(&self.path);
        let elapsed_time = distance / self.agent_type.speed()
            + self.hesitations as f64 * HESITATION_PENALTY_S
            + self.errors as f64 * ERROR_PENALTY_S;
        AgentOutcome {
            agent_type: self.agent_type,
            state: self.state,
            path: self.path.iter().map(|&v| graph.id(v).to_string()).collect(),
            distance,
            optimal_distance: self.optimal_distance,
            elapsed_time,
            errors: self.errors,
            hesitations: self.hesitations,
            sign_usages: self.sign_usages,
            success: self.state == AgentState::Succeeded,
        }
    }
}
