//! CLI command definitions and handlers

mod analyze;
mod init;
mod sample;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Parse and validate the agent count (at least 1)
fn parse_agents(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("agents must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

/// wayfind - Wayfinding analysis for building floor plans
#[derive(Parser, Debug)]
#[command(name = "wayfind")]
#[command(
    version,
    about = "Wayfinding analysis for floor plans: visibility, space syntax, agent simulation and a composite efficiency score",
    long_about = "wayfind reads an analysis input document (circulation graph, walls, \
signage and journeys), runs four engines over it and fuses their results into the \
Wayfinding Efficiency Score (WES, 0-100).\n\n\
Engines: isovist / visibility graph analysis, space syntax centrality, \
agent-based pedestrian simulation, WES composite scoring.",
    after_help = "\
Examples:
  wayfind sample -o hospital.json             Write the sample hospital input
  wayfind analyze hospital.json               Analyze and print a summary
  wayfind analyze hospital.json -f json       JSON output for scripting
  wayfind init                                Write a default wayfind.toml"
)]
pub struct Cli {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64, default: config or all cores)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a floor plan input document
    #[command(after_help = "\
Examples:
  wayfind analyze plan.json                        Text summary on stdout
  wayfind analyze plan.json --format json -o out.json   Full JSON report to a file
  wayfind analyze plan.json --seed 7 --agents 500  Larger, reseeded simulation
  wayfind analyze plan.json --explain-score        Show full WES breakdown")]
    Analyze {
        /// Path to the analysis input (JSON)
        input: PathBuf,

        /// Output format: text, json (default: config or text)
        #[arg(long, short = 'f', value_parser = ["text", "json"])]
        format: Option<String>,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Random seed for sampling and simulation
        #[arg(long)]
        seed: Option<u64>,

        /// Agents simulated per scenario
        #[arg(long, value_parser = parse_agents)]
        agents: Option<usize>,

        /// Explain the scoring formula with full breakdown
        #[arg(long)]
        explain_score: bool,
    },

    /// Write a wayfind.toml config file with default settings
    Init {
        /// Directory to write into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing wayfind.toml
        #[arg(long)]
        force: bool,
    },

    /// Print the built-in sample hospital input document
    Sample {
        /// Write to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze {
            input,
            format,
            output,
            seed,
            agents,
            explain_score,
        } => analyze::run(analyze::AnalyzeArgs {
            input,
            format,
            output,
            seed,
            agents,
            explain_score,
            workers: cli.workers,
        }),
        Commands::Init { path, force } => init::run(&path, force),
        Commands::Sample { output } => sample::run(output.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("4"), Ok(4));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_parse_analyze_command() {
        let cli = Cli::try_parse_from([
            "wayfind", "analyze", "plan.json", "--format", "json", "--seed", "7", "--agents", "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze {
                input,
                format,
                seed,
                agents,
                explain_score,
                ..
            } => {
                assert_eq!(input, PathBuf::from("plan.json"));
                assert_eq!(format.as_deref(), Some("json"));
                assert_eq!(seed, Some(7));
                assert_eq!(agents, Some(10));
                assert!(!explain_score);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["wayfind", "analyze", "plan.json", "-f", "sarif"]).is_err());
        assert!(Cli::try_parse_from(["wayfind", "analyze", "plan.json", "--agents", "0"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["wayfind", "sample", "--workers", "2", "--log-level", "debug"])
            .unwrap();
        assert_eq!(cli.workers, Some(2));
        assert_eq!(cli.log_level, "debug");
    }
}
