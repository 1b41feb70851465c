//! Analysis pipeline
//!
//! Runs the engines in dependency order over an immutable
//! [`AnalysisContext`]:
//!
//! 1. Visibility field (skipped when the input has no geometry)
//! 2. Space syntax over the circulation graph
//! 3. Agent simulation for every scenario
//! 4. WES scoring from whatever the earlier stages produced
//!
//! A stage that fails on its own input is logged, recorded in the report's
//! warnings and left out; scoring falls back to neutral defaults for it.
//! Cancellation is the one error that stops the whole run.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::graph::CirculationGraph;
use crate::models::AnalysisInput;
use crate::scoring::{Benchmarks, RawMetrics, WesResult, WesScorer, WesWeights};
use crate::simulation::{AgentSimulator, SimulationOptions, SimulationReport};
use crate::syntax::{SpaceSyntaxAnalyzer, SyntaxOptions, SyntaxReport};
use crate::visibility::{VisibilityAnalyzer, VisibilityOptions, VisibilityReport};

/// Engine settings for one run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub visibility: VisibilityOptions,
    pub syntax: SyntaxOptions,
    pub simulation: SimulationOptions,
    pub weights: WesWeights,
    pub benchmarks: Benchmarks,
}

/// Everything a run reads, fixed at construction
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    input: AnalysisInput,
    graph: CirculationGraph,
    options: PipelineOptions,
}

impl AnalysisContext {
    /// Validate the input and options, then build the circulation graph. The raster's
    /// resolution, when the input states one, overrides the configured one.
    pub fn new(input: AnalysisInput, options: PipelineOptions) -> AnalysisResult<Self> {
        let graph = CirculationGraph::from_spec(&input.graph)?;
        options.simulation.population.validate()?;
        let mut options = options;
        if let Some(ppm) = input.pixels_per_meter {
            if ppm.is_finite() && ppm > 0.0 {
                options.visibility.pixels_per_meter = ppm;
            } else {
                warn!("Ignoring invalid pixels_per_meter {}", ppm);
            }
        }
        Ok(Self {
            input,
            graph,
            options,
        })
    }

    pub fn input(&self) -> &AnalysisInput {
        &self.input
    }

    pub fn graph(&self) -> &CirculationGraph {
        &self.graph
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn has_geometry(&self) -> bool {
        !self.input.obstacles.is_empty() || self.input.raster.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Visibility,
    Syntax,
    Simulation,
    Scoring,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Visibility => write!(f, "Visibility field"),
            Stage::Syntax => write!(f, "Space syntax"),
            Stage::Simulation => write!(f, "Agent simulation"),
            Stage::Scoring => write!(f, "WES scoring"),
        }
    }
}

/// Progress notifications for a caller-supplied observer
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    Started,
    Completed,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
}

/// Terminal artifact of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub seed: u64,
    pub graph: GraphStats,
    pub visibility: Option<VisibilityReport>,
    pub syntax: Option<SyntaxReport>,
    pub simulation: Option<SimulationReport>,
    pub wes: WesResult,
    /// Stages that were skipped or failed, in run order
    pub warnings: Vec<String>,
}

pub fn run_visibility(
    ctx: &AnalysisContext,
    cancel: &CancellationToken,
) -> AnalysisResult<VisibilityReport> {
    let analyzer = VisibilityAnalyzer::new(&ctx.input.obstacles, ctx.options.visibility);
    let mut rng = ChaCha8Rng::seed_from_u64(ctx.options.simulation.seed);
    analyzer.run(ctx.input.raster.as_ref(), &mut rng, cancel)
}

/// Space syntax, with the input's decision points taking precedence over
/// the degree-derived ones.
pub fn run_syntax(ctx: &AnalysisContext) -> AnalysisResult<SyntaxReport> {
    let analyzer = SpaceSyntaxAnalyzer::new(&ctx.graph, ctx.options.syntax);
    let mut report = analyzer.analyze(ctx.input.entrances.as_deref())?;
    if let Some(points) = &ctx.input.decision_points {
        let known: Vec<String> = points
            .iter()
            .filter(|id| {
                let found = ctx.graph.contains(id);
                if !found {
                    warn!("Decision point '{}' is not a graph node", id);
                }
                found
            })
            .cloned()
            .collect();
        if !known.is_empty() {
            report.decision_points = known;
        }
    }
    Ok(report)
}

pub fn run_simulation(
    ctx: &AnalysisContext,
    cancel: &CancellationToken,
) -> AnalysisResult<SimulationReport> {
    let simulator = AgentSimulator::new(
        &ctx.graph,
        &ctx.input.signage,
        &ctx.input.landmarks,
        ctx.options.simulation,
    );
    simulator.run(&ctx.input.effective_scenarios(), cancel)
}

pub fn score(
    ctx: &AnalysisContext,
    visibility: Option<&VisibilityReport>,
    syntax: Option<&SyntaxReport>,
    simulation: Option<&SimulationReport>,
) -> WesResult {
    let scorer = WesScorer::new(ctx.options.weights, ctx.options.benchmarks);
    let raw = RawMetrics::extract(simulation, visibility, syntax, ctx.input.signage_score);
    scorer.calculate(&raw)
}

/// Run every stage without progress reporting.
pub fn run_pipeline(
    ctx: &AnalysisContext,
    cancel: &CancellationToken,
) -> AnalysisResult<AnalysisReport> {
    run_pipeline_with(ctx, cancel, |_, _| {})
}

/// Keep a stage's output, or record why there is none. Cancellation
/// aborts the run.
fn settle<T>(
    stage: Stage,
    result: AnalysisResult<T>,
    warnings: &mut Vec<String>,
    observer: &mut impl FnMut(Stage, StageEvent),
) -> AnalysisResult<Option<T>> {
    match result {
        Ok(value) => {
            observer(stage, StageEvent::Completed);
            Ok(Some(value))
        }
        Err(AnalysisError::Cancelled) => Err(AnalysisError::Cancelled),
        Err(e) => {
            warn!("{} stage failed: {}", stage, e);
            warnings.push(format!("{}: {}", stage, e));
            observer(stage, StageEvent::Failed(e.to_string()));
            Ok(None)
        }
    }
}

/// Run every stage, reporting start and end of each to `observer`.
pub fn run_pipeline_with(
    ctx: &AnalysisContext,
    cancel: &CancellationToken,
    mut observer: impl FnMut(Stage, StageEvent),
) -> AnalysisResult<AnalysisReport> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let visibility = if ctx.has_geometry() {
        observer(Stage::Visibility, StageEvent::Started);
        settle(Stage::Visibility, run_visibility(ctx, cancel), &mut warnings, &mut observer)?
    } else {
        let reason = "no obstacles or raster in input".to_string();
        debug!("Skipping visibility: {}", reason);
        warnings.push(format!("{}: skipped, {}", Stage::Visibility, reason));
        observer(Stage::Visibility, StageEvent::Skipped(reason));
        None
    };
    cancel.check()?;

    observer(Stage::Syntax, StageEvent::Started);
    let syntax = settle(Stage::Syntax, run_syntax(ctx), &mut warnings, &mut observer)?;
    cancel.check()?;

    observer(Stage::Simulation, StageEvent::Started);
    let simulation = settle(
        Stage::Simulation,
        run_simulation(ctx, cancel),
        &mut warnings,
        &mut observer,
    )?;

    observer(Stage::Scoring, StageEvent::Started);
    let wes = score(ctx, visibility.as_ref(), syntax.as_ref(), simulation.as_ref());
    observer(Stage::Scoring, StageEvent::Completed);

    let duration_ms = start.elapsed().as_millis() as u64;
    info!("Analysis complete in {}ms: WES {:.1} ({})", duration_ms, wes.score, wes.grade);

    Ok(AnalysisReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        generated_at: Utc::now(),
        duration_ms,
        seed: ctx.options.simulation.seed,
        graph: GraphStats {
            nodes: ctx.graph.node_count(),
            edges: ctx.graph.edge_count(),
        },
        visibility,
        syntax,
        simulation,
        wes,
        warnings,
    })
}
