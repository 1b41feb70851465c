//! Analysis configuration support
//!
//! Loads configuration from `wayfind.toml` or `.wayfindrc.json` in the
//! working directory. Every section and field is optional.
//!
//! # Configuration Format
//!
//! ```toml
//! # wayfind.toml
//!
//! [visibility]
//! spacing_m = 0.5
//! distance_threshold = 50.0
//!
//! [syntax]
//! weighted = true
//!
//! [simulation]
//! agents_per_scenario = 100
//! seed = 42
//! population = { first_time = 0.6, habitual = 0.2, elderly = 0.15, mobility_impaired = 0.05 }
//!
//! [scoring.weights]
//! errors = 25.0
//! visual_integration = 15.0
//!
//! [scoring.benchmarks]
//! max_time = 240.0
//!
//! [defaults]
//! format = "text"
//! workers = 8
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::pipeline::PipelineOptions;
use crate::scoring::{Benchmarks, WesWeights};
use crate::simulation::SimulationOptions;
use crate::syntax::SyntaxOptions;
use crate::visibility::VisibilityOptions;

/// Written by `wayfind init`
pub const DEFAULT_CONFIG_TOML: &str = r#"# wayfind configuration
# Every value below is the built-in default; delete what you don't change.

[visibility]
# Sample lattice spacing in metres
spacing_m = 0.5
# Raster pixels per metre (overridden by the input's pixels_per_meter)
pixels_per_meter = 1.0
ray_count = 72
max_radius = 1000.0
# Sample points closer than this (m) may share a visibility edge
distance_threshold = 50.0
max_samples = 5000
isovist_limit = 1000
graph_limit = 500

[syntax]
# Use edge distances instead of hop counts
weighted = true
top_n = 10

[simulation]
agents_per_scenario = 100
seed = 42

[simulation.population]
first_time = 0.60
habitual = 0.20
elderly = 0.15
mobility_impaired = 0.05

[scoring.weights]
# Must sum to 100; other totals are rescaled
time = 15.0
detour = 10.0
errors = 20.0
hesitations = 10.0
visual_integration = 20.0
signage = 15.0
accessibility = 10.0

[scoring.benchmarks]
max_time = 300.0
max_detour = 1.5
max_errors = 3.0
max_hesitations = 5.0
min_visual_integration = 0.3
max_visual_integration = 0.9
min_signage = 40.0
max_signage = 95.0
min_accessibility = 0.5
max_accessibility = 1.0

[defaults]
# format = "text"
# workers = 8
"#;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub visibility: VisibilityOptions,

    #[serde(default)]
    pub syntax: SyntaxOptions,

    #[serde(default)]
    pub simulation: SimulationOptions,

    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Default CLI flags
    #[serde(default)]
    pub defaults: CliDefaults,
}

impl AnalysisConfig {
    /// Engine settings, before any CLI overrides
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            visibility: self.visibility,
            syntax: self.syntax,
            simulation: self.simulation,
            weights: self.scoring.weights,
            benchmarks: self.scoring.benchmarks,
        }
    }
}

/// WES configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: WesWeights,

    #[serde(default)]
    pub benchmarks: Benchmarks,
}

/// Default CLI flags that can be set in the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliDefaults {
    /// Default output format (text, json)
    #[serde(default)]
    pub format: Option<String>,

    /// Default number of workers
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Load configuration from a directory.
///
/// Searches for configuration files in this order:
/// 1. `wayfind.toml`
/// 2. `.wayfindrc.json`
///
/// A file that fails to parse is skipped with a warning. Returns the
/// defaults if no usable file is found.
pub fn load_analysis_config(dir: &Path) -> AnalysisConfig {
    // Try TOML first (preferred format)
    let toml_path = dir.join("wayfind.toml");
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    // Try JSON
    let json_path = dir.join(".wayfindrc.json");
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    debug!("No config found, using defaults");
    AnalysisConfig::default()
}

/// Load configuration from a TOML file
fn load_toml_config(path: &Path) -> anyhow::Result<AnalysisConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AnalysisConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load configuration from a JSON file
fn load_json_config(path: &Path) -> anyhow::Result<AnalysisConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AnalysisConfig = serde_json::from_str(&content)?;
    Ok(config)
}
