//! wayfind - Wayfinding analysis engine
//!
//! Four engines over a building's circulation graph and floor geometry:
//!
//! - [`visibility`]: isovists and visibility graph analysis (VGA)
//! - [`syntax`]: space syntax centrality and integration
//! - [`simulation`]: stochastic agent-based wayfinding
//! - [`scoring`]: the Wayfinding Efficiency Score (WES)
//!
//! [`pipeline`] runs them in order over an immutable
//! [`pipeline::AnalysisContext`].

pub mod cancel;
pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
pub mod models;
pub mod pipeline;
pub mod reporters;
pub mod scoring;
pub mod simulation;
pub mod stats;
pub mod syntax;
pub mod visibility;

pub use errors::{AnalysisError, AnalysisResult};
