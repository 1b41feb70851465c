//! Sample command - emit the built-in hospital input document

use crate::models::AnalysisInput;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Run the sample command
pub fn run(output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(&AnalysisInput::sample_hospital())
        .context("Failed to serialize sample input")?;

    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote sample hospital to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
