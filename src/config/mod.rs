//! Configuration module for wayfind
//!
//! This module handles:
//! - Analysis configuration (wayfind.toml / .wayfindrc.json)
//! - Engine tuning per stage
//! - WES weights and benchmarks
//! - CLI defaults

mod analysis_config;

pub use analysis_config::{
    load_analysis_config, AnalysisConfig, CliDefaults, ScoringConfig, DEFAULT_CONFIG_TOML,
};
