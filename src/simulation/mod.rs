//! Agent-based wayfinding simulation
//!
//! Each scenario releases a population of synthetic visitors at an origin
//! and walks them to a destination (see [`agent`] for the journey rules).
//! Agents run in parallel; agent `i` of scenario `s` draws from its own
//! ChaCha stream derived from `(seed, s, i)`, so a fixed seed reproduces
//! the same report on any number of worker threads.
//!
//! Per scenario we report:
//!
//! | Metric              | Over                                   |
//! |---------------------|----------------------------------------|
//! | success rate        | all agents                             |
//! | first-pass success  | all agents (success with zero errors)  |
//! | time, distance      | successful agents, 0 when none         |
//! | errors, hesitations | all agents                             |
//! | hesitation rate     | all agents, hesitations per metre      |
//! | detour index        | successes with a positive optimal path |

pub mod agent;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::graph::CirculationGraph;
use crate::models::{Landmark, Scenario, SignageElement};
use crate::stats::{mean, std_dev};

pub use agent::{Agent, AgentOutcome, AgentState, AgentType, RandomSource, ScriptedSource, WayfindingAids};

/// Scenario success rate below this is flagged
pub const LOW_SUCCESS_THRESHOLD: f64 = 0.7;
/// Mean travel time (s) above this is flagged
pub const HIGH_TRAVEL_TIME_S: f64 = 180.0;
/// Mean errors per agent above this is flagged
pub const FREQUENT_ERRORS_THRESHOLD: f64 = 1.5;
/// Scenario names listed per flag
const MAX_FLAGGED_SCENARIOS: usize = 3;

/// Share of each visitor profile in a simulated population
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationMix {
    pub first_time: f64,
    pub habitual: f64,
    pub elderly: f64,
    pub mobility_impaired: f64,
}

impl Default for PopulationMix {
    fn default() -> Self {
        Self {
            first_time: 0.60,
            habitual: 0.20,
            elderly: 0.15,
            mobility_impaired: 0.05,
        }
    }
}

impl PopulationMix {
    fn shares(&self) -> [(AgentType, f64); 4] {
        [
            (AgentType::FirstTime, self.first_time),
            (AgentType::Habitual, self.habitual),
            (AgentType::Elderly, self.elderly),
            (AgentType::MobilityImpaired, self.mobility_impaired),
        ]
    }

    pub fn total(&self) -> f64 {
        self.shares().iter().map(|(_, s)| s).sum()
    }

    /// Shares are non-negative and sum to 1.0 (±0.001)
    pub fn is_valid(&self) -> bool {
        self.shares().iter().all(|(_, s)| s.is_finite() && *s >= 0.0)
            && (self.total() - 1.0).abs() < 0.001
    }

    /// Reject negative or non-finite shares. A total other than 1.0 is
    /// fine here; `normalize` rescales it.
    pub fn validate(&self) -> AnalysisResult<()> {
        match self
            .shares()
            .into_iter()
            .find(|(_, share)| !share.is_finite() || *share < 0.0)
        {
            Some((agent_type, share)) => Err(AnalysisError::InvalidInput(format!(
                "population share for {} must be a non-negative number, got {}",
                agent_type, share
            ))),
            None => Ok(()),
        }
    }

    /// Rescale so the shares sum to 1.0. A mix with a negative share or
    /// nothing to scale becomes the default.
    pub fn normalize(&mut self) {
        let total = self.total();
        if self.validate().is_err() || total <= 0.0 {
            *self = Self::default();
            return;
        }
        self.first_time /= total;
        self.habitual /= total;
        self.elderly /= total;
        self.mobility_impaired /= total;
    }

    /// Map a uniform draw in [0, 1) onto an agent type.
    pub fn pick(&self, unit: f64) -> AgentType {
        let total = self.total();
        let mut cumulative = 0.0;
        for (agent_type, share) in self.shares() {
            cumulative += share / total;
            if unit < cumulative {
                return agent_type;
            }
        }
        AgentType::MobilityImpaired
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    pub agents_per_scenario: usize,
    pub seed: u64,
    pub population: PopulationMix,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            agents_per_scenario: 100,
            seed: 42,
            population: PopulationMix::default(),
        }
    }
}

/// Aggregate outcome of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStats {
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub n_agents: usize,
    pub success_rate: f64,
    pub first_pass_success: f64,
    pub mean_time: f64,
    pub std_time: f64,
    pub mean_distance: f64,
    pub std_distance: f64,
    pub mean_errors: f64,
    pub mean_hesitations: f64,
    pub mean_sign_usage: f64,
    /// Hesitations per metre walked, averaged over agents
    pub hesitation_rate: f64,
    /// Mean actual / optimal distance over successful agents
    pub detour_index: f64,
    pub agent_type_counts: BTreeMap<AgentType, usize>,
}

impl ScenarioStats {
    pub fn from_outcomes(scenario: &Scenario, outcomes: &[AgentOutcome]) -> Self {
        let n = outcomes.len();
        let rate = |count: usize| if n == 0 { 0.0 } else { count as f64 / n as f64 };
        let successes: Vec<&AgentOutcome> = outcomes.iter().filter(|o| o.success).collect();

        let times: Vec<f64> = successes.iter().map(|o| o.elapsed_time).collect();
        let distances: Vec<f64> = successes.iter().map(|o| o.distance).collect();
        let errors: Vec<f64> = outcomes.iter().map(|o| o.errors as f64).collect();
        let hesitations: Vec<f64> = outcomes.iter().map(|o| o.hesitations as f64).collect();
        let signs: Vec<f64> = outcomes.iter().map(|o| o.sign_usages as f64).collect();
        let per_metre: Vec<f64> = outcomes
            .iter()
            .map(|o| {
                if o.distance > 0.0 {
                    o.hesitations as f64 / o.distance
                } else {
                    0.0
                }
            })
            .collect();
        let ratios: Vec<f64> = successes
            .iter()
            .filter(|o| o.optimal_distance > 0.0)
            .map(|o| o.distance / o.optimal_distance)
            .collect();

        let mut agent_type_counts = BTreeMap::new();
        for o in outcomes {
            *agent_type_counts.entry(o.agent_type).or_insert(0) += 1;
        }

        Self {
            name: scenario.name.clone(),
            origin: scenario.origin.clone(),
            destination: scenario.destination.clone(),
            n_agents: n,
            success_rate: rate(successes.len()),
            first_pass_success: rate(successes.iter().filter(|o| o.errors == 0).count()),
            mean_time: mean(&times),
            std_time: std_dev(&times),
            mean_distance: mean(&distances),
            std_distance: std_dev(&distances),
            mean_errors: mean(&errors),
            mean_hesitations: mean(&hesitations),
            mean_sign_usage: mean(&signs),
            hesitation_rate: mean(&per_metre),
            detour_index: if ratios.is_empty() { 1.0 } else { mean(&ratios) },
            agent_type_counts,
        }
    }
}

/// Issues raised by the cross-scenario rollup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationFlag {
    LowSuccess { scenarios: Vec<String> },
    HighTravelTime { scenarios: Vec<String> },
    FrequentErrors { scenarios: Vec<String> },
    NoCriticalIssues,
}

/// Cross-scenario rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub overall_success_rate: f64,
    pub overall_mean_time: f64,
    pub overall_mean_errors: f64,
    pub best_scenario: Option<String>,
    pub worst_scenario: Option<String>,
    pub flags: Vec<SimulationFlag>,
}

impl SimulationSummary {
    pub fn from_scenarios(scenarios: &[ScenarioStats]) -> Self {
        let success: Vec<f64> = scenarios.iter().map(|s| s.success_rate).collect();
        let times: Vec<f64> = scenarios.iter().map(|s| s.mean_time).collect();
        let errors: Vec<f64> = scenarios.iter().map(|s| s.mean_errors).collect();

        // strict comparisons keep the first scenario on ties
        let mut best: Option<&ScenarioStats> = None;
        let mut worst: Option<&ScenarioStats> = None;
        for s in scenarios {
            if best.map_or(true, |b| s.success_rate > b.success_rate) {
                best = Some(s);
            }
            if worst.map_or(true, |w| s.success_rate < w.success_rate) {
                worst = Some(s);
            }
        }

        Self {
            overall_success_rate: mean(&success),
            overall_mean_time: mean(&times),
            overall_mean_errors: mean(&errors),
            best_scenario: best.map(|s| s.name.clone()),
            worst_scenario: worst.map(|s| s.name.clone()),
            flags: flags(scenarios),
        }
    }
}

fn flagged(scenarios: &[ScenarioStats], pred: impl Fn(&ScenarioStats) -> bool) -> Vec<String> {
    scenarios
        .iter()
        .filter(|s| pred(s))
        .take(MAX_FLAGGED_SCENARIOS)
        .map(|s| s.name.clone())
        .collect()
}

/// Threshold checks over the scenario aggregates
pub fn flags(scenarios: &[ScenarioStats]) -> Vec<SimulationFlag> {
    let mut out = Vec::new();
    let low = flagged(scenarios, |s| s.success_rate < LOW_SUCCESS_THRESHOLD);
    if !low.is_empty() {
        out.push(SimulationFlag::LowSuccess { scenarios: low });
    }
    let slow = flagged(scenarios, |s| s.mean_time > HIGH_TRAVEL_TIME_S);
    if !slow.is_empty() {
        out.push(SimulationFlag::HighTravelTime { scenarios: slow });
    }
    let lost = flagged(scenarios, |s| s.mean_errors > FREQUENT_ERRORS_THRESHOLD);
    if !lost.is_empty() {
        out.push(SimulationFlag::FrequentErrors { scenarios: lost });
    }
    if out.is_empty() {
        out.push(SimulationFlag::NoCriticalIssues);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenarios: Vec<ScenarioStats>,
    pub summary: SimulationSummary,
}

impl SimulationReport {
    pub fn scenario(&self, name: &str) -> Option<&ScenarioStats> {
        self.scenarios.iter().find(|s| s.name == name)
    }
}

/// Independent stream for agent `agent` of scenario `scenario`
pub fn agent_rng(seed: u64, scenario: usize, agent: usize) -> ChaCha8Rng {
    let mut rng =
        ChaCha8Rng::seed_from_u64(seed ^ (scenario as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    rng.set_stream(agent as u64);
    rng
}

/// Runs agent populations over a circulation graph
pub struct AgentSimulator<'a> {
    graph: &'a CirculationGraph,
    aids: WayfindingAids,
    options: SimulationOptions,
}

impl<'a> AgentSimulator<'a> {
    /// Signage and landmarks on unknown nodes are ignored with a warning.
    pub fn new(
        graph: &'a CirculationGraph,
        signage: &[SignageElement],
        landmarks: &[Landmark],
        options: SimulationOptions,
    ) -> Self {
        let mut aids = WayfindingAids::default();
        for sign in signage {
            match graph.index_of(&sign.node_id) {
                Some(idx) => {
                    aids.signage.insert(idx);
                }
                None => warn!("Signage at unknown node '{}' ignored", sign.node_id),
            }
        }
        for landmark in landmarks {
            match graph.index_of(&landmark.node_id) {
                Some(idx) => {
                    aids.landmarks.insert(idx);
                }
                None => warn!("Landmark at unknown node '{}' ignored", landmark.node_id),
            }
        }
        let mut options = options;
        if !options.population.is_valid() {
            warn!(
                "Population mix sums to {:.3}, normalizing",
                options.population.total()
            );
            options.population.normalize();
        }
        Self {
            graph,
            aids,
            options,
        }
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    /// Walk every agent of one scenario. A missing endpoint fails every
    /// agent rather than the scenario.
    pub fn simulate_agents(
        &self,
        scenario_idx: usize,
        scenario: &Scenario,
        cancel: &CancellationToken,
    ) -> AnalysisResult<Vec<AgentOutcome>> {
        let origin = self.graph.index_of(&scenario.origin);
        let destination = self.graph.index_of(&scenario.destination);
        if origin.is_none() || destination.is_none() {
            warn!(
                "Scenario '{}': {}",
                scenario.name,
                AnalysisError::UnknownNode(if origin.is_none() {
                    scenario.origin.clone()
                } else {
                    scenario.destination.clone()
                })
            );
        }

        (0..self.options.agents_per_scenario)
            .into_par_iter()
            .map(|i| -> AnalysisResult<AgentOutcome> {
                cancel.check()?;
                let mut rng = agent_rng(self.options.seed, scenario_idx, i);
                let agent_type = self.options.population.pick(rng.unit());
                Ok(match (origin, destination) {
                    (Some(o), Some(d)) => {
                        Agent::new(agent_type, o, d).run(self.graph, &self.aids, &mut rng)
                    }
                    _ => AgentOutcome {
                        agent_type,
                        state: AgentState::Failed,
                        path: Vec::new(),
                        distance: 0.0,
                        optimal_distance: 0.0,
                        elapsed_time: 0.0,
                        errors: 0,
                        hesitations: 0,
                        sign_usages: 0,
                        success: false,
                    },
                })
            })
            .collect()
    }

    pub fn simulate_scenario(
        &self,
        scenario_idx: usize,
        scenario: &Scenario,
        cancel: &CancellationToken,
    ) -> AnalysisResult<ScenarioStats> {
        let outcomes = self.simulate_agents(scenario_idx, scenario, cancel)?;
        let stats = ScenarioStats::from_outcomes(scenario, &outcomes);
        debug!(
            "Scenario '{}': success {:.1}%, mean time {:.1}s",
            stats.name,
            stats.success_rate * 100.0,
            stats.mean_time
        );
        Ok(stats)
    }

    pub fn run(
        &self,
        scenarios: &[Scenario],
        cancel: &CancellationToken,
    ) -> AnalysisResult<SimulationReport> {
        let stats = scenarios
            .iter()
            .enumerate()
            .map(|(i, s)| self.simulate_scenario(i, s, cancel))
            .collect::<AnalysisResult<Vec<_>>>()?;
        let summary = SimulationSummary::from_scenarios(&stats);
        info!(
            "Simulation complete: {} scenarios x {} agents, success {:.1}%",
            stats.len(),
            self.options.agents_per_scenario,
            summary.overall_success_rate * 100.0
        );
        Ok(SimulationReport {
            scenarios: stats,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisInput;

    fn hospital() -> (AnalysisInput, CirculationGraph) {
        let input = AnalysisInput::sample_hospital();
        let graph = CirculationGraph::from_spec(&input.graph).unwrap();
        (input, graph)
    }

    fn stats(name: &str, success_rate: f64, mean_time: f64, mean_errors: f64) -> ScenarioStats {
        ScenarioStats {
            name: name.to_string(),
            origin: "a".to_string(),
            destination: "b".to_string(),
            n_agents: 10,
            success_rate,
            first_pass_success: 0.0,
            mean_time,
            std_time: 0.0,
            mean_distance: 0.0,
            std_distance: 0.0,
            mean_errors,
            mean_hesitations: 0.0,
            mean_sign_usage: 0.0,
            hesitation_rate: 0.0,
            detour_index: 1.0,
            agent_type_counts: BTreeMap::new(),
        }
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let (input, graph) = hospital();
        let options = SimulationOptions {
            agents_per_scenario: 50,
            ..Default::default()
        };
        let sim = AgentSimulator::new(&graph, &input.signage, &input.landmarks, options);
        let scenarios = input.effective_scenarios();
        let a = sim.run(&scenarios, &CancellationToken::new()).unwrap();
        let b = sim.run(&scenarios, &CancellationToken::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hospital_journeys() {
        let (input, graph) = hospital();
        let sim = AgentSimulator::new(&graph, &input.signage, &input.landmarks, SimulationOptions::default());
        let report = sim.run(&input.effective_scenarios(), &CancellationToken::new()).unwrap();

        assert_eq!(report.scenarios.len(), 3);
        for s in &report.scenarios {
            assert_eq!(s.n_agents, 100);
            assert_eq!(s.agent_type_counts.values().sum::<usize>(), 100);
            // a connected graph always admits a corrective route
            assert_eq!(s.success_rate, 1.0);
            assert!(s.first_pass_success <= s.success_rate);
            assert!(s.detour_index >= 1.0);
            assert!(s.mean_time > 0.0);
        }
        let emergency = report.scenario("entrance_to_emergency").unwrap();
        assert!(emergency.mean_distance >= 33.0);
        assert!(report.summary.best_scenario.is_some());
    }

    #[test]
    fn test_missing_endpoint_fails_every_agent() {
        let (input, graph) = hospital();
        let options = SimulationOptions {
            agents_per_scenario: 20,
            ..Default::default()
        };
        let sim = AgentSimulator::new(&graph, &input.signage, &input.landmarks, options);
        let scenarios = vec![
            Scenario::new("to_nowhere", "entrance", "cafeteria"),
            Scenario::new("to_pharmacy", "entrance", "pharmacy"),
        ];
        let report = sim.run(&scenarios, &CancellationToken::new()).unwrap();

        let nowhere = &report.scenarios[0];
        assert_eq!(nowhere.n_agents, 20);
        assert_eq!(nowhere.success_rate, 0.0);
        assert_eq!(nowhere.mean_time, 0.0);
        assert_eq!(nowhere.detour_index, 1.0);
        assert_eq!(report.scenarios[1].success_rate, 1.0);
        assert_eq!(report.summary.worst_scenario.as_deref(), Some("to_nowhere"));
        assert_eq!(
            report.summary.flags,
            vec![SimulationFlag::LowSuccess {
                scenarios: vec!["to_nowhere".to_string()]
            }]
        );
    }

    #[test]
    fn test_aggregation_from_outcomes() {
        let scenario = Scenario::new("s", "a", "b");
        let outcome = |success: bool, distance: f64, time: f64, errors: u32, hesitations: u32| AgentOutcome {
            agent_type: AgentType::FirstTime,
            state: if success { AgentState::Succeeded } else { AgentState::Failed },
            path: vec![],
            distance,
            optimal_distance: 10.0,
            elapsed_time: time,
            errors,
            hesitations,
            sign_usages: 1,
            success,
        };
        let outcomes = vec![
            outcome(true, 10.0, 10.0, 0, 0),
            outcome(true, 20.0, 40.0, 1, 1),
            outcome(false, 0.0, 0.0, 0, 0),
            outcome(true, 10.0, 10.0, 1, 0),
        ];
        let s = ScenarioStats::from_outcomes(&scenario, &outcomes);
        assert_eq!(s.success_rate, 0.75);
        assert_eq!(s.first_pass_success, 0.25);
        assert_eq!(s.mean_time, 20.0);
        assert!((s.std_time - 200.0_f64.sqrt()).abs() < 1e-9);
        assert!((s.mean_distance - 40.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.mean_errors, 0.5);
        assert_eq!(s.mean_hesitations, 0.25);
        assert_eq!(s.mean_sign_usage, 1.0);
        assert_eq!(s.hesitation_rate, (1.0 / 20.0) / 4.0);
        assert!((s.detour_index - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.agent_type_counts[&AgentType::FirstTime], 4);
    }

    #[test]
    fn test_rollup_ties_and_flags() {
        let scenarios = vec![
            stats("a", 0.9, 100.0, 0.5),
            stats("b", 0.5, 200.0, 2.0),
            stats("c", 0.9, 50.0, 0.1),
            stats("d", 0.5, 60.0, 0.1),
        ];
        let summary = SimulationSummary::from_scenarios(&scenarios);
        assert_eq!(summary.best_scenario.as_deref(), Some("a"));
        assert_eq!(summary.worst_scenario.as_deref(), Some("b"));
        assert!((summary.overall_success_rate - 0.7).abs() < 1e-9);
        assert_eq!(summary.overall_mean_time, 102.5);
        assert_eq!(
            summary.flags,
            vec![
                SimulationFlag::LowSuccess {
                    scenarios: vec!["b".to_string(), "d".to_string()]
                },
                SimulationFlag::HighTravelTime {
                    scenarios: vec!["b".to_string()]
                },
                SimulationFlag::FrequentErrors {
                    scenarios: vec!["b".to_string()]
                },
            ]
        );

        let calm = SimulationSummary::from_scenarios(&[stats("ok", 1.0, 30.0, 0.0)]);
        assert_eq!(calm.flags, vec![SimulationFlag::NoCriticalIssues]);

        let empty = SimulationSummary::from_scenarios(&[]);
        assert_eq!(empty.best_scenario, None);
        assert_eq!(empty.overall_success_rate, 0.0);
    }

    #[test]
    fn test_flags_list_at_most_three_names() {
        let scenarios: Vec<ScenarioStats> =
            (0..5).map(|i| stats(&format!("s{i}"), 0.1, 10.0, 0.0)).collect();
        let flags = flags(&scenarios);
        assert_eq!(
            flags,
            vec![SimulationFlag::LowSuccess {
                scenarios: vec!["s0".to_string(), "s1".to_string(), "s2".to_string()]
            }]
        );
    }

    #[test]
    fn test_population_mix() {
        let mix = PopulationMix::default();
        assert!(mix.is_valid());
        assert_eq!(mix.pick(0.0), AgentType::FirstTime);
        assert_eq!(mix.pick(0.59), AgentType::FirstTime);
        assert_eq!(mix.pick(0.61), AgentType::Habitual);
        assert_eq!(mix.pick(0.85), AgentType::Elderly);
        assert_eq!(mix.pick(0.99), AgentType::MobilityImpaired);

        let mut skewed = PopulationMix {
            first_time: 2.0,
            habitual: 2.0,
            elderly: 0.0,
            mobility_impaired: 0.0,
        };
        assert!(!skewed.is_valid());
        skewed.normalize();
        assert!(skewed.is_valid());
        assert_eq!(skewed.first_time, 0.5);
    }

    #[test]
    fn test_negative_share_is_rejected() {
        let mut mix = PopulationMix {
            first_time: -0.5,
            habitual: 1.5,
            elderly: 0.5,
            mobility_impaired: 0.0,
        };
        assert!(matches!(mix.validate(), Err(AnalysisError::InvalidInput(_))));
        assert!(!mix.is_valid());
        mix.normalize();
        assert_eq!(mix, PopulationMix::default());

        let nan = PopulationMix {
            elderly: f64::NAN,
            ..PopulationMix::default()
        };
        assert!(nan.validate().is_err());
        assert!(PopulationMix::default().validate().is_ok());
    }

    #[test]
    fn test_simulator_never_runs_a_negative_mix() {
        let (input, graph) = hospital();
        let options = SimulationOptions {
            population: PopulationMix {
                first_time: -0.5,
                habitual: 1.5,
                elderly: 0.5,
                mobility_impaired: 0.0,
            },
            ..SimulationOptions::default()
        };
        let sim = AgentSimulator::new(&graph, &input.signage, &input.landmarks, options);
        assert_eq!(sim.options().population, PopulationMix::default());
    }

    #[test]
    fn test_cancelled_simulation() {
        let (input, graph) = hospital();
        let sim = AgentSimulator::new(&graph, &input.signage, &input.landmarks, SimulationOptions::default());
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            sim.run(&input.effective_scenarios(), &token).unwrap_err(),
            AnalysisError::Cancelled
        );
    }
}
