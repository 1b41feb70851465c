//! Error types shared by the analysis engines
//!
//! Most variants are recoverable: the engines log them and degrade the
//! affected metric, scenario or agent instead of aborting the whole run.
//! Only a fundamentally invalid input (e.g. a graph with no nodes) is
//! fatal for a stage.

use thiserror::Error;

/// Errors that can occur while analyzing a floor plan
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Degenerate geometry: {0}")]
    GeometryDegenerate(String),

    #[error("No path from {from} to {to}")]
    NoPath { from: String, to: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
