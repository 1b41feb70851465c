//! Text (terminal) reporter with colors and formatting

use crate::pipeline::AnalysisReport;
use crate::scoring::PriorityLevel;
use crate::simulation::{SimulationFlag, SimulationReport};
use crate::syntax::SyntaxReport;
use crate::visibility::VisibilityReport;
use anyhow::Result;

/// Grade colors (ANSI escape codes)
fn grade_color(grade: &str) -> &'static str {
    match grade.chars().next() {
        Some('A') => "\x1b[32m", // Green
        Some('B') => "\x1b[92m", // Light green
        Some('C') => "\x1b[33m", // Yellow
        Some('D') => "\x1b[91m", // Light red
        Some('F') => "\x1b[31m", // Red
        _ => "\x1b[0m",
    }
}

fn priority_color(level: PriorityLevel) -> &'static str {
    match level {
        PriorityLevel::High => "\x1b[91m",
        PriorityLevel::Medium => "\x1b[33m",
        PriorityLevel::Low => "\x1b[34m",
    }
}

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RULE: &str = "──────────────────────────────────────";

/// Rows shown per ranking
const TOP_ROWS: usize = 5;

/// Render report as formatted terminal output
pub fn render(report: &AnalysisReport) -> Result<String> {
    let mut out = String::new();
    let wes = &report.wes;

    // Header
    let grade_c = grade_color(&wes.grade);
    out.push_str(&format!("\n{BOLD}Wayfinding Analysis{RESET}\n"));
    out.push_str(&format!("{DIM}{RULE}{RESET}\n"));
    out.push_str(&format!(
        "WES: {BOLD}{:.1}/100{RESET}  Grade: {grade_c}{BOLD}{}{RESET}  ",
        wes.score, wes.grade
    ));
    out.push_str(&format!(
        "Nodes: {}  Edges: {}  Seed: {}\n",
        report.graph.nodes, report.graph.edges, report.seed
    ));
    out.push_str(&format!("{DIM}{}{RESET}\n\n", wes.interpretation));

    if let Some(vis) = &report.visibility {
        render_visibility(&mut out, vis);
    }
    if let Some(syn) = &report.syntax {
        render_syntax(&mut out, syn);
    }
    if let Some(sim) = &report.simulation {
        render_simulation(&mut out, sim);
    }

    // Score breakdown
    out.push_str(&format!("{BOLD}SCORE BREAKDOWN{RESET}\n"));
    for c in &wes.contributions {
        out.push_str(&format!(
            "  {:<20} {:>6.2}  {:>+6.1}\n",
            c.dimension.label(),
            wes.normalized.get(c.dimension),
            c.value
        ));
    }
    out.push_str(&format!(
        "  {DIM}Benchmarks met: {}/{} ({:.0}%){RESET}\n\n",
        wes.benchmarks.met, wes.benchmarks.total, wes.benchmarks.compliance_percentage
    ));

    if !wes.priorities.is_empty() {
        out.push_str(&format!("{BOLD}IMPROVEMENT PRIORITIES{RESET}\n"));
        for p in &wes.priorities {
            let c = priority_color(p.level);
            out.push_str(&format!(
                "  {c}{:<6}{RESET} {:<20} +{:.1} pts\n",
                p.level,
                p.dimension.label(),
                p.impact
            ));
        }
        out.push('\n');
    }

    if !report.warnings.is_empty() {
        out.push_str(&format!("{BOLD}WARNINGS{RESET}\n"));
        for w in &report.warnings {
            out.push_str(&format!("  \x1b[33m!{RESET} {}\n", w));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "{DIM}wayfind {} · {} · {}ms{RESET}\n",
        report.version,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.duration_ms
    ));
    Ok(out)
}

fn render_visibility(out: &mut String, vis: &VisibilityReport) {
    let s = &vis.summary;
    out.push_str(&format!("{BOLD}VISIBILITY{RESET}\n"));
    out.push_str(&format!(
        "  Points: {}  Edges: {}  Mean VI: {:.3}  Blind spots: {}\n",
        s.point_count, s.edge_count, s.visual_integration.mean, s.blind_spot_count
    ));
    out.push_str(&format!(
        "  Isovist area: mean {:.1} m², max {:.1} m²\n",
        s.isovist_area.mean, s.isovist_area.max
    ));
    if vis.degraded_points > 0 {
        out.push_str(&format!(
            "  {DIM}{} isovists degraded to zero{RESET}\n",
            vis.degraded_points
        ));
    }
    out.push('\n');
}

fn render_syntax(out: &mut String, syn: &SyntaxReport) {
    out.push_str(&format!("{BOLD}SPACE SYNTAX{RESET}\n"));
    out.push_str(&format!(
        "  Mean integration: {:.3}  Complexity: {:.2}  Decision points: {}\n",
        syn.mean_integration(),
        syn.complexity.composite,
        syn.decision_points.len()
    ));
    if !syn.entrances.is_empty() {
        out.push_str(&format!("  Entrances: {}\n", syn.entrances.join(", ")));
    }
    if !syn.critical_nodes.bottlenecks.is_empty() {
        out.push_str(&format!("  {DIM}Bottlenecks (betweenness){RESET}\n"));
        for n in syn.critical_nodes.bottlenecks.iter().take(TOP_ROWS) {
            out.push_str(&format!("    {:<24} {:.3}\n", n.node, n.value));
        }
    }
    out.push('\n');
}

fn render_simulation(out: &mut String, sim: &SimulationReport) {
    out.push_str(&format!("{BOLD}SIMULATION{RESET}\n"));
    out.push_str(&format!(
        "{DIM}  SCENARIO                   AGENTS  SUCCESS  1ST-PASS  TIME(s)  ERRORS  DETOUR{RESET}\n"
    ));
    for s in &sim.scenarios {
        let name: String = s.name.chars().take(25).collect();
        out.push_str(&format!(
            "  {:<25} {:>7}  {:>6.1}%  {:>7.1}%  {:>7.1}  {:>6.2}  {:>6.2}\n",
            name,
            s.n_agents,
            s.success_rate * 100.0,
            s.first_pass_success * 100.0,
            s.mean_time,
            s.mean_errors,
            s.detour_index
        ));
    }
    let summary = &sim.summary;
    out.push_str(&format!(
        "  Overall success {:.1}%, mean time {:.1}s\n",
        summary.overall_success_rate * 100.0,
        summary.overall_mean_time
    ));
    for flag in &summary.flags {
        out.push_str(&format!("  {}\n", describe_flag(flag)));
    }
    out.push('\n');
}

/// One-line description of a simulation flag
pub fn describe_flag(flag: &SimulationFlag) -> String {
    match flag {
        SimulationFlag::LowSuccess { scenarios } => format!(
            "\x1b[91m✗{RESET} Low success rate (<70%): {}",
            scenarios.join(", ")
        ),
        SimulationFlag::HighTravelTime { scenarios } => format!(
            "\x1b[33m!{RESET} Long travel times (>180s): {}",
            scenarios.join(", ")
        ),
        SimulationFlag::FrequentErrors { scenarios } => format!(
            "\x1b[33m!{RESET} Frequent wayfinding errors (>1.5 per agent): {}",
            scenarios.join(", ")
        ),
        SimulationFlag::NoCriticalIssues => {
            format!("\x1b[32m✓{RESET} No critical wayfinding issues identified")
        }
    }
}
