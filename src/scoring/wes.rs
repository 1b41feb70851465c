//! WES calculation, breakdown and explanation

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{calculate_grade, Benchmarks, WesDimension, WesWeights};
use crate::errors::AnalysisError;
use crate::simulation::{ScenarioStats, SimulationReport};
use crate::stats::{mean, std_dev};
use crate::syntax::SyntaxReport;
use crate::visibility::VisibilityReport;

/// Normalized value at or above which a dimension needs no work
const PRIORITY_TARGET: f64 = 0.9;

/// Fallbacks when an engine did not run
const DEFAULT_VISUAL_INTEGRATION: f64 = 0.5;
const DEFAULT_SIGNAGE_SCORE: f64 = 50.0;
const DEFAULT_ACCESSIBILITY: f64 = 0.5;

/// Raw inputs to the score, in their natural units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub mean_time: f64,
    pub mean_detour: f64,
    pub mean_errors: f64,
    pub mean_hesitations: f64,
    pub visual_integration: f64,
    pub signage_score: f64,
    pub accessibility: f64,
}

impl Default for RawMetrics {
    fn default() -> Self {
        Self {
            mean_time: 0.0,
            mean_detour: 1.0,
            mean_errors: 0.0,
            mean_hesitations: 0.0,
            visual_integration: DEFAULT_VISUAL_INTEGRATION,
            signage_score: DEFAULT_SIGNAGE_SCORE,
            accessibility: DEFAULT_ACCESSIBILITY,
        }
    }
}

impl RawMetrics {
    /// Pull the score inputs out of whichever engine reports are present.
    pub fn extract(
        simulation: Option<&SimulationReport>,
        visibility: Option<&VisibilityReport>,
        syntax: Option<&SyntaxReport>,
        signage_score: Option<f64>,
    ) -> Self {
        let mut raw = Self::default();
        if let Some(sim) = simulation.filter(|s| !s.scenarios.is_empty()) {
            let of = |f: fn(&ScenarioStats) -> f64| -> f64 {
                mean(&sim.scenarios.iter().map(f).collect::<Vec<_>>())
            };
            raw.mean_time = of(|s| s.mean_time);
            raw.mean_detour = of(|s| s.detour_index);
            raw.mean_errors = of(|s| s.mean_errors);
            raw.mean_hesitations = of(|s| s.mean_hesitations);
        }
        if let Some(vis) = visibility {
            raw.visual_integration = vis.mean_visual_integration();
        }
        if let Some(syn) = syntax {
            raw.accessibility = syn.mean_integration();
        }
        if let Some(score) = signage_score {
            raw.signage_score = score;
        }
        raw
    }

    pub fn get(&self, dimension: WesDimension) -> f64 {
        match dimension {
            WesDimension::Time => self.mean_time,
            WesDimension::Detour => self.mean_detour,
            WesDimension::Errors => self.mean_errors,
            WesDimension::Hesitations => self.mean_hesitations,
            WesDimension::VisualIntegration => self.visual_integration,
            WesDimension::Signage => self.signage_score,
            WesDimension::Accessibility => self.accessibility,
        }
    }
}

/// Per-dimension values in [0, 1], 1 = good
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NormalizedMetrics {
    pub time: f64,
    pub detour: f64,
    pub errors: f64,
    pub hesitations: f64,
    pub visual_integration: f64,
    pub signage: f64,
    pub accessibility: f64,
}

impl NormalizedMetrics {
    pub fn get(&self, dimension: WesDimension) -> f64 {
        match dimension {
            WesDimension::Time => self.time,
            WesDimension::Detour => self.detour,
            WesDimension::Errors => self.errors,
            WesDimension::Hesitations => self.hesitations,
            WesDimension::VisualIntegration => self.visual_integration,
            WesDimension::Signage => self.signage,
            WesDimension::Accessibility => self.accessibility,
        }
    }
}

/// 1 at zero, 0 at or above `max`, linear between
fn inverse_linear(value: f64, max: f64) -> f64 {
    if value <= 0.0 {
        1.0
    } else if value >= max {
        0.0
    } else {
        1.0 - value / max
    }
}

/// 0 at or below `min`, 1 at or above `max`, linear between
fn linear(value: f64, min: f64, max: f64) -> f64 {
    if value <= min {
        0.0
    } else if value >= max {
        1.0
    } else {
        (value - min) / (max - min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpretation {
    Excellent,
    Good,
    Acceptable,
    Poor,
    Critical,
}

impl Interpretation {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Interpretation::Excellent
        } else if score >= 75.0 {
            Interpretation::Good
        } else if score >= 60.0 {
            Interpretation::Acceptable
        } else if score >= 45.0 {
            Interpretation::Poor
        } else {
            Interpretation::Critical
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Interpretation::Excellent => "Excellent: exceptional design exceeding research standards",
            Interpretation::Good => "Good: strong performance with minor improvement opportunities",
            Interpretation::Acceptable => "Acceptable: reasonable performance with notable issues",
            Interpretation::Poor => "Poor: significant problems requiring redesign",
            Interpretation::Critical => "Critical: fundamental deficiencies requiring comprehensive overhaul",
        }
    }
}

impl std::fmt::Display for Interpretation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriorityLevel {
    High,
    Medium,
    Low,
}

impl PriorityLevel {
    pub fn from_impact(impact: f64) -> Self {
        if impact > 5.0 {
            PriorityLevel::High
        } else if impact > 2.0 {
            PriorityLevel::Medium
        } else {
            PriorityLevel::Low
        }
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityLevel::High => write!(f, "HIGH"),
            PriorityLevel::Medium => write!(f, "MEDIUM"),
            PriorityLevel::Low => write!(f, "LOW"),
        }
    }
}

/// Signed points a dimension adds to (or removes from) the base
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub dimension: WesDimension,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImprovementPriority {
    pub dimension: WesDimension,
    pub current: f64,
    pub improvement_potential: f64,
    /// WES points gained by lifting the dimension to 0.9
    pub impact: f64,
    pub level: PriorityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkCheck {
    pub dimension: WesDimension,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub meets_standard: bool,
    /// Value as a percentage of the maximum, penalty dimensions only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage_of_benchmark: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub checks: Vec<BenchmarkCheck>,
    pub met: usize,
    pub total: usize,
    pub compliance_percentage: f64,
}

/// Complete score breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WesResult {
    pub score: f64,
    pub grade: String,
    pub interpretation: Interpretation,
    pub raw: RawMetrics,
    pub normalized: NormalizedMetrics,
    pub contributions: Vec<Contribution>,
    pub priorities: Vec<ImprovementPriority>,
    pub benchmarks: BenchmarkComparison,
    pub weights_used: WesWeights,
}

/// Scores designs against fixed weights and benchmarks
#[derive(Debug, Clone)]
pub struct WesScorer {
    weights: WesWeights,
    benchmarks: Benchmarks,
}

impl Default for WesScorer {
    fn default() -> Self {
        Self::new(WesWeights::default(), Benchmarks::default())
    }
}

impl WesScorer {
    /// Weights that do not sum to 100 are renormalized, never rejected.
    pub fn new(weights: WesWeights, benchmarks: Benchmarks) -> Self {
        let mut weights = weights;
        if !weights.is_valid() {
            warn!(
                "{}",
                AnalysisError::Configuration(format!(
                    "WES weights sum to {:.2}, expected 100; renormalizing",
                    weights.total()
                ))
            );
            weights.normalize();
        }
        Self {
            weights,
            benchmarks,
        }
    }

    pub fn weights(&self) -> &WesWeights {
        &self.weights
    }

    pub fn normalize(&self, raw: &RawMetrics) -> NormalizedMetrics {
        let b = &self.benchmarks;
        NormalizedMetrics {
            time: inverse_linear(raw.mean_time, b.max_time),
            detour: inverse_linear((raw.mean_detour - 1.0).max(0.0), b.max_detour - 1.0),
            errors: inverse_linear(raw.mean_errors, b.max_errors),
            hesitations: inverse_linear(raw.mean_hesitations, b.max_hesitations),
            visual_integration: linear(
                raw.visual_integration,
                b.min_visual_integration,
                b.max_visual_integration,
            ),
            signage: linear(raw.signage_score, b.min_signage, b.max_signage),
            accessibility: linear(raw.accessibility, b.min_accessibility, b.max_accessibility),
        }
    }

    /// Signed contribution per dimension, in `WesDimension::ALL` order
    pub fn contributions(&self, normalized: &NormalizedMetrics) -> Vec<Contribution> {
        WesDimension::ALL
            .iter()
            .map(|&dimension| {
                let w = self.weights.get(dimension);
                let n = normalized.get(dimension);
                let value = if dimension.is_penalty() {
                    -w * (1.0 - n)
                } else {
                    w * n
                };
                Contribution { dimension, value }
            })
            .collect()
    }

    /// Base plus contributions, clamped to [0, 100]
    pub fn score(&self, normalized: &NormalizedMetrics) -> f64 {
        let sum: f64 = self
            .contributions(normalized)
            .iter()
            .map(|c| c.value)
            .sum();
        (self.weights.base() + sum).clamp(0.0, 100.0)
    }

    /// Dimensions below 0.9, highest impact first
    pub fn priorities(&self, normalized: &NormalizedMetrics) -> Vec<ImprovementPriority> {
        let mut out: Vec<ImprovementPriority> = WesDimension::ALL
            .iter()
            .filter_map(|&dimension| {
                let current = normalized.get(dimension);
                if current >= PRIORITY_TARGET {
                    return None;
                }
                let impact = (PRIORITY_TARGET - current) * self.weights.get(dimension);
                Some(ImprovementPriority {
                    dimension,
                    current,
                    improvement_potential: 1.0 - current,
                    impact,
                    level: PriorityLevel::from_impact(impact),
                })
            })
            .collect();
        out.sort_by(|a, b| b.impact.total_cmp(&a.impact));
        out
    }

    pub fn compare_to_benchmarks(&self, raw: &RawMetrics) -> BenchmarkComparison {
        let b = &self.benchmarks;
        let ceiling = |dimension: WesDimension, max: f64| {
            let value = raw.get(dimension);
            BenchmarkCheck {
                dimension,
                value,
                min: None,
                max: Some(max),
                meets_standard: value <= max,
                percentage_of_benchmark: (max > 0.0).then(|| value / max * 100.0),
            }
        };
        let floor = |dimension: WesDimension, min: f64, max: f64| {
            let value = raw.get(dimension);
            BenchmarkCheck {
                dimension,
                value,
                min: Some(min),
                max: Some(max),
                meets_standard: value >= min,
                percentage_of_benchmark: None,
            }
        };
        let checks = vec![
            ceiling(WesDimension::Time, b.max_time),
            ceiling(WesDimension::Detour, b.max_detour),
            ceiling(WesDimension::Errors, b.max_errors),
            ceiling(WesDimension::Hesitations, b.max_hesitations),
            floor(
                WesDimension::VisualIntegration,
                b.min_visual_integration,
                b.max_visual_integration,
            ),
            floor(WesDimension::Signage, b.min_signage, b.max_signage),
            floor(WesDimension::Accessibility, b.min_accessibility, b.max_accessibility),
        ];
        let met = checks.iter().filter(|c| c.meets_standard).count();
        let total = checks.len();
        BenchmarkComparison {
            checks,
            met,
            total,
            compliance_percentage: met as f64 / total as f64 * 100.0,
        }
    }

    /// Calculate the complete score with breakdown
    pub fn calculate(&self, raw: &RawMetrics) -> WesResult {
        let normalized = self.normalize(raw);
        debug!("Normalized WES metrics: {:?}", normalized);
        let score = self.score(&normalized);
        let result = WesResult {
            score,
            grade: calculate_grade(score).to_string(),
            interpretation: Interpretation::from_score(score),
            raw: *raw,
            normalized,
            contributions: self.contributions(&normalized),
            priorities: self.priorities(&normalized),
            benchmarks: self.compare_to_benchmarks(raw),
            weights_used: self.weights,
        };
        info!("WES calculation complete: {:.1}/100 ({})", score, result.grade);
        result
    }

    /// Generate human-readable explanation of the score
    pub fn explain(&self, result: &WesResult) -> String {
        let mut lines = Vec::new();

        lines.push(format!("# Wayfinding Efficiency Score: {:.1} ({})\n", result.score, result.grade));
        lines.push(format!("{}\n", result.interpretation));

        lines.push("## Scoring Formula\n".to_string());
        lines.push("```".to_string());
        lines.push(format!(
            "WES = {:.0} - Σ penalty_w × (1 - norm) + Σ bonus_w × norm",
            self.weights.base()
        ));
        lines.push("```\n".to_string());

        lines.push("## Dimensions\n".to_string());
        lines.push("| Dimension | Raw | Normalized | Weight | Contribution |".to_string());
        lines.push("|-----------|-----|------------|--------|--------------|".to_string());
        for c in &result.contributions {
            lines.push(format!(
                "| {} | {:.2} | {:.2} | {:.1} | {:+.1} |",
                c.dimension.label(),
                result.raw.get(c.dimension),
                result.normalized.get(c.dimension),
                result.weights_used.get(c.dimension),
                c.value
            ));
        }
        lines.push(String::new());

        if !result.priorities.is_empty() {
            lines.push("## Improvement Priorities\n".to_string());
            for p in &result.priorities {
                lines.push(format!(
                    "- **{}** [{}]: +{:.1} points if raised to {:.0}%",
                    p.dimension.label(),
                    p.level,
                    p.impact,
                    PRIORITY_TARGET * 100.0
                ));
            }
            lines.push(String::new());
        }

        lines.push(format!(
            "## Benchmarks: {}/{} met ({:.0}%)\n",
            result.benchmarks.met, result.benchmarks.total, result.benchmarks.compliance_percentage
        ));
        for check in &result.benchmarks.checks {
            let mark = if check.meets_standard { "✓" } else { "✗" };
            let bound = match (check.min, check.max, check.dimension.is_penalty()) {
                (_, Some(max), true) => format!("≤ {:.2}", max),
                (Some(min), _, _) => format!("≥ {:.2}", min),
                _ => String::new(),
            };
            lines.push(format!(
                "- {} {}: {:.2} ({})",
                mark,
                check.dimension.label(),
                check.value,
                bound
            ));
        }

        lines.join("\n")
    }
}

/// Side-by-side view of several scored designs or scenarios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignComparison {
    pub best: String,
    pub worst: String,
    pub best_score: f64,
    pub worst_score: f64,
    pub mean_score: f64,
    pub std_deviation: f64,
    pub score_range: f64,
    pub scores: Vec<(String, f64)>,
}

/// `None` for an empty set. The first design wins ties.
pub fn compare_designs(scores: &[(String, f64)]) -> Option<DesignComparison> {
    let (first, rest) = scores.split_first()?;
    let mut best = first;
    let mut worst = first;
    for entry in rest {
        if entry.1 > best.1 {
            best = entry;
        }
        if entry.1 < worst.1 {
            worst = entry;
        }
    }
    let values: Vec<f64> = scores.iter().map(|(_, s)| *s).collect();
    Some(DesignComparison {
        best: best.0.clone(),
        worst: worst.0.clone(),
        best_score: best.1,
        worst_score: worst.1,
        mean_score: mean(&values),
        std_deviation: std_dev(&values),
        score_range: best.1 - worst.1,
        scores: scores.to_vec(),
    })
}
