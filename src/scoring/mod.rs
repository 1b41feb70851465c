//! Wayfinding Efficiency Score (WES)
//!
//! Combines the simulator, visibility and space syntax outputs into one
//! 0-100 number:
//!
//! ```text
//! WES = base − Σ penalty_w · (1 − norm) + Σ bonus_w · norm
//! base = Σ penalty_w                        (55 with default weights)
//! ```
//!
//! Every metric is normalized to [0, 1] with 1 meaning "good", so a
//! perfect design scores 100 and a design at every benchmark limit scores
//! 0. Weights must sum to 100; anything else is renormalized with a
//! warning.

pub mod wes;

use serde::{Deserialize, Serialize};

pub use wes::{
    compare_designs, BenchmarkCheck, BenchmarkComparison, Contribution, DesignComparison,
    ImprovementPriority, Interpretation, NormalizedMetrics, PriorityLevel, RawMetrics, WesResult,
    WesScorer,
};

/// The seven scored dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WesDimension {
    Time,
    Detour,
    Errors,
    Hesitations,
    VisualIntegration,
    Signage,
    Accessibility,
}

impl WesDimension {
    pub const ALL: [WesDimension; 7] = [
        WesDimension::Time,
        WesDimension::Detour,
        WesDimension::Errors,
        WesDimension::Hesitations,
        WesDimension::VisualIntegration,
        WesDimension::Signage,
        WesDimension::Accessibility,
    ];

    /// Penalty dimensions subtract from the base; the rest add to it
    pub fn is_penalty(&self) -> bool {
        matches!(
            self,
            WesDimension::Time | WesDimension::Detour | WesDimension::Errors | WesDimension::Hesitations
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            WesDimension::Time => "Travel time",
            WesDimension::Detour => "Detour",
            WesDimension::Errors => "Wayfinding errors",
            WesDimension::Hesitations => "Hesitations",
            WesDimension::VisualIntegration => "Visual integration",
            WesDimension::Signage => "Signage",
            WesDimension::Accessibility => "Accessibility",
        }
    }
}

impl std::fmt::Display for WesDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WesDimension::Time => "time",
            WesDimension::Detour => "detour",
            WesDimension::Errors => "errors",
            WesDimension::Hesitations => "hesitations",
            WesDimension::VisualIntegration => "visual_integration",
            WesDimension::Signage => "signage",
            WesDimension::Accessibility => "accessibility",
        };
        write!(f, "{}", name)
    }
}

/// Points allotted to each dimension (default sum: 100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WesWeights {
    #[serde(default = "default_time_weight")]
    pub time: f64,
    #[serde(default = "default_detour_weight")]
    pub detour: f64,
    #[serde(default = "default_errors_weight")]
    pub errors: f64,
    #[serde(default = "default_hesitations_weight")]
    pub hesitations: f64,
    #[serde(default = "default_visual_integration_weight")]
    pub visual_integration: f64,
    #[serde(default = "default_signage_weight")]
    pub signage: f64,
    #[serde(default = "default_accessibility_weight")]
    pub accessibility: f64,
}

impl Default for WesWeights {
    fn default() -> Self {
        Self {
            time: default_time_weight(),
            detour: default_detour_weight(),
            errors: default_errors_weight(),
            hesitations: default_hesitations_weight(),
            visual_integration: default_visual_integration_weight(),
            signage: default_signage_weight(),
            accessibility: default_accessibility_weight(),
        }
    }
}

fn default_time_weight() -> f64 {
    15.0
}
fn default_detour_weight() -> f64 {
    10.0
}
fn default_errors_weight() -> f64 {
    20.0
}
fn default_hesitations_weight() -> f64 {
    10.0
}
fn default_visual_integration_weight() -> f64 {
    20.0
}
fn default_signage_weight() -> f64 {
    15.0
}
fn default_accessibility_weight() -> f64 {
    10.0
}

impl WesWeights {
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

    fn values_mut(&mut self) -> [&mut f64; 7] {
        [
            &mut self.time,
            &mut self.detour,
            &mut self.errors,
            &mut self.hesitations,
            &mut self.visual_integration,
            &mut self.signage,
            &mut self.accessibility,
        ]
    }

    pub fn total(&self) -> f64 {
        WesDimension::ALL.iter().map(|d| self.get(*d)).sum()
    }

    /// Sum of the penalty weights; the score of a design that is perfect
    /// on penalties and earns no bonus. Starting from this base rather than
    /// 100, a design at its worst on every metric loses exactly the base
    /// and scores 0, while one at its best gains the bonus weights to 100.
    pub fn base(&self) -> f64 {
        WesDimension::ALL
            .iter()
            .filter(|d| d.is_penalty())
            .map(|d| self.get(*d))
            .sum()
    }

    /// Validate that weights are non-negative and sum to 100 (with tolerance)
    pub fn is_valid(&self) -> bool {
        WesDimension::ALL
            .iter()
            .all(|d| self.get(*d).is_finite() && self.get(*d) >= 0.0)
            && (self.total() - 100.0).abs() < 0.001
    }

    /// Rescale proportionally to sum to 100. Negative, non-finite or
    /// all-zero weights fall back to the defaults.
    pub fn normalize(&mut self) {
        let usable = WesDimension::ALL
            .iter()
            .all(|d| self.get(*d).is_finite() && self.get(*d) >= 0.0);
        let total = self.total();
        if !usable || total <= 0.0 {
            *self = Self::default();
            return;
        }
        for w in self.values_mut() {
            *w *= 100.0 / total;
        }
    }
}

/// Acceptable ranges for each raw metric (healthcare defaults)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks {
    /// Seconds
    #[serde(default = "default_max_time")]
    pub max_time: f64,
    /// Actual / optimal distance
    #[serde(default = "default_max_detour")]
    pub max_detour: f64,
    #[serde(default = "default_max_errors")]
    pub max_errors: f64,
    #[serde(default = "default_max_hesitations")]
    pub max_hesitations: f64,
    #[serde(default = "default_min_visual_integration")]
    pub min_visual_integration: f64,
    #[serde(default = "default_max_visual_integration")]
    pub max_visual_integration: f64,
    #[serde(default = "default_min_signage")]
    pub min_signage: f64,
    #[serde(default = "default_max_signage")]
    pub max_signage: f64,
    #[serde(default = "default_min_accessibility")]
    pub min_accessibility: f64,
    #[serde(default = "default_max_accessibility")]
    pub max_accessibility: f64,
}

impl Default for Benchmarks {
    fn default() -> Self {
        Self {
            max_time: default_max_time(),
            max_detour: default_max_detour(),
            max_errors: default_max_errors(),
            max_hesitations: default_max_hesitations(),
            min_visual_integration: default_min_visual_integration(),
            max_visual_integration: default_max_visual_integration(),
            min_signage: default_min_signage(),
            max_signage: default_max_signage(),
            min_accessibility: default_min_accessibility(),
            max_accessibility: default_max_accessibility(),
        }
    }
}

fn default_max_time() -> f64 {
    300.0
}
fn default_max_detour() -> f64 {
    1.5
}
fn default_max_errors() -> f64 {
    3.0
}
fn default_max_hesitations() -> f64 {
    5.0
}
fn default_min_visual_integration() -> f64 {
    0.3
}
fn default_max_visual_integration() -> f64 {
    0.9
}
fn default_min_signage() -> f64 {
    40.0
}
fn default_max_signage() -> f64 {
    95.0
}
fn default_min_accessibility() -> f64 {
    0.5
}
fn default_max_accessibility() -> f64 {
    1.0
}

/// Letter grade for a WES value
pub fn calculate_grade(score: f64) -> &'static str {
    if score >= 90.0 { "A+" }
    else if score >= 85.0 { "A" }
    else if score >= 80.0 { "A-" }
    else if score >= 75.0 { "B+" }
    else if score >= 70.0 { "B" }
    else if score >= 65.0 { "B-" }
    else if score >= 60.0 { "C+" }
    else if score >= 55.0 { "C" }
    else if score >= 50.0 { "C-" }
    else if score >= 45.0 { "D" }
    else { "F" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let w = WesWeights::default();
        assert!(w.is_valid());
        assert_eq!(w.total(), 100.0);
        assert_eq!(w.base(), 55.0);
    }

    #[test]
    fn test_normalize_rescales_proportionally() {
        let mut w = WesWeights::default();
        w.time = 30.0;
        w.errors = 40.0;
        assert!(!w.is_valid());
        w.normalize();
        assert!(w.is_valid());
        // 30 / 135 of 100
        assert!((w.time - 3000.0 / 135.0).abs() < 1e-9);
    }

    #[test]
    fn test_bad_weights_fall_back_to_defaults() {
        let mut negative = WesWeights::default();
        negative.signage = -5.0;
        negative.normalize();
        assert_eq!(negative, WesWeights::default());

        let mut zeros = WesWeights {
            time: 0.0,
            detour: 0.0,
            errors: 0.0,
            hesitations: 0.0,
            visual_integration: 0.0,
            signage: 0.0,
            accessibility: 0.0,
        };
        zeros.normalize();
        assert_eq!(zeros, WesWeights::default());
    }

    #[test]
    fn test_base_tracks_penalty_weights() {
        let mut w = WesWeights::default();
        w.time = 25.0;
        w.visual_integration = 10.0;
        assert!(w.is_valid());
        assert_eq!(w.base(), 65.0);
        // worst case: every penalty costs its full weight, no bonus is earned
        let worst: f64 = WesDimension::ALL
            .iter()
            .filter(|d| d.is_penalty())
            .map(|d| -w.get(*d))
            .sum();
        assert_eq!(w.base() + worst, 0.0);
    }

    #[test]
    fn test_grade_bands() {
        assert_eq!(calculate_grade(100.0), "A+");
        assert_eq!(calculate_grade(90.0), "A+");
        assert_eq!(calculate_grade(89.9), "A");
        assert_eq!(calculate_grade(72.0), "B");
        assert_eq!(calculate_grade(55.0), "C");
        assert_eq!(calculate_grade(45.0), "D");
        assert_eq!(calculate_grade(44.9), "F");
    }

    #[test]
    fn test_dimension_split() {
        let penalties: Vec<_> = WesDimension::ALL.iter().filter(|d| d.is_penalty()).collect();
        assert_eq!(penalties.len(), 4);
        assert_eq!(WesDimension::VisualIntegration.to_string(), "visual_integration");
    }
}
