//! Analyze command implementation
//!
//! 1. Load wayfind.toml / .wayfindrc.json from the working directory
//! 2. Read and validate the input document
//! 3. Run the four engines on a sized rayon pool, one spinner per stage
//! 4. Render the report (text, json) to stdout or a file

use crate::cancel::CancellationToken;
use crate::config::load_analysis_config;
use crate::models::AnalysisInput;
use crate::pipeline::{run_pipeline_with, AnalysisContext, AnalysisReport, Stage, StageEvent};
use crate::reporters::{self, OutputFormat};
use crate::scoring::WesScorer;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Options for one `wayfind analyze` invocation
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub input: PathBuf,
    pub format: Option<String>,
    pub output: Option<PathBuf>,
    pub seed: Option<u64>,
    pub agents: Option<usize>,
    pub explain_score: bool,
    pub workers: Option<usize>,
}

/// Create spinner progress style
fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Read and parse the input document
fn read_input(path: &Path) -> Result<AnalysisInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid analysis input: {}", path.display()))
}

/// One spinner per stage, finished with the stage's outcome
struct StageSpinners {
    style: ProgressStyle,
    current: Option<ProgressBar>,
}

impl StageSpinners {
    fn new() -> Self {
        Self {
            style: create_spinner_style(),
            current: None,
        }
    }

    fn on_event(&mut self, stage: Stage, event: StageEvent) {
        match event {
            StageEvent::Started => {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(self.style.clone());
                spinner.set_message(format!("{}...", stage));
                spinner.enable_steady_tick(Duration::from_millis(100));
                self.current = Some(spinner);
            }
            StageEvent::Completed => {
                if let Some(spinner) = self.current.take() {
                    spinner.finish_with_message(format!("{} {}", style("✓").green(), stage));
                }
            }
            StageEvent::Skipped(reason) => {
                let spinner = self.current.take().unwrap_or_else(ProgressBar::new_spinner);
                spinner.set_style(self.style.clone());
                spinner.finish_with_message(format!(
                    "{} {} skipped ({})",
                    style("-").dim(),
                    stage,
                    reason
                ));
            }
            StageEvent::Failed(reason) => {
                if let Some(spinner) = self.current.take() {
                    spinner.finish_with_message(format!(
                        "{} {} failed: {}",
                        style("⚠").yellow(),
                        stage,
                        reason
                    ));
                }
            }
        }
    }
}

/// Run the analysis on a rayon pool of `workers` threads
fn execute(ctx: &AnalysisContext, workers: Option<usize>) -> Result<AnalysisReport> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = workers {
        builder = builder.num_threads(n);
    }
    let pool = builder.build().context("Failed to build worker pool")?;

    let cancel = CancellationToken::new();
    let mut spinners = StageSpinners::new();
    let report = pool.install(|| {
        run_pipeline_with(ctx, &cancel, |stage, event| spinners.on_event(stage, event))
    })?;
    Ok(report)
}

/// Run the analyze command
pub fn run(args: AnalyzeArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    let config = load_analysis_config(&cwd);

    let format_name = args
        .format
        .or_else(|| config.defaults.format.clone())
        .unwrap_or_else(|| "text".to_string());
    let format = OutputFormat::from_str(&format_name)?;
    let workers = args.workers.or(config.defaults.workers);

    let mut options = config.pipeline_options();
    if let Some(seed) = args.seed {
        options.simulation.seed = seed;
    }
    if let Some(agents) = args.agents {
        options.simulation.agents_per_scenario = agents;
    }
    debug!("Pipeline options: {:?}", options);

    let input = read_input(&args.input)?;
    let ctx = AnalysisContext::new(input, options)
        .with_context(|| format!("Invalid circulation graph in {}", args.input.display()))?;

    let report = execute(&ctx, workers)?;
    let rendered = reporters::report_with_format(&report, format)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            eprintln!(
                "{} Wrote {} report to {}",
                style("✓").green(),
                format,
                style(path.display()).cyan()
            );
        }
        None => println!("{}", rendered),
    }

    if args.explain_score {
        let scorer = WesScorer::new(report.wes.weights_used, ctx.options().benchmarks);
        println!("{}", scorer.explain(&report.wes));
    }

    Ok(())
}
