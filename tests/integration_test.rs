//! End-to-end tests over the library API using the sample hospital

use wayfind::cancel::CancellationToken;
use wayfind::models::{AnalysisInput, Scenario};
use wayfind::pipeline::{run_pipeline, AnalysisContext, PipelineOptions};
use wayfind::reporters::{report_with_format, OutputFormat};
use wayfind::scoring::calculate_grade;
use wayfind::simulation::SimulationFlag;

fn fast_options(seed: u64) -> PipelineOptions {
    let mut options = PipelineOptions::default();
    options.visibility.spacing_m = 2.0;
    options.visibility.isovist_limit = 150;
    options.visibility.graph_limit = 150;
    options.simulation.agents_per_scenario = 40;
    options.simulation.seed = seed;
    options
}

fn analyze(input: AnalysisInput, seed: u64) -> wayfind::pipeline::AnalysisReport {
    let ctx = AnalysisContext::new(input, fast_options(seed)).unwrap();
    run_pipeline(&ctx, &CancellationToken::new()).unwrap()
}

#[test]
fn test_sample_hospital_full_report() {
    let report = analyze(AnalysisInput::sample_hospital(), 42);

    assert_eq!(report.graph.nodes, 9);
    assert_eq!(report.graph.edges, 8);
    assert!(report.visibility.is_some());
    assert!(report.syntax.is_some());

    let sim = report.simulation.as_ref().unwrap();
    assert_eq!(sim.scenarios.len(), 3);
    for stats in &sim.scenarios {
        assert_eq!(stats.n_agents, 40);
        // the hospital is connected, so every agent eventually arrives
        assert_eq!(stats.success_rate, 1.0);
        assert!(stats.detour_index >= 1.0);
    }

    let wes = &report.wes;
    assert!((0.0..=100.0).contains(&wes.score));
    assert_eq!(wes.grade, calculate_grade(wes.score));
    assert_eq!(wes.contributions.len(), 7);
}

#[test]
fn test_same_seed_same_report() {
    let a = analyze(AnalysisInput::sample_hospital(), 7);
    let b = analyze(AnalysisInput::sample_hospital(), 7);
    assert_eq!(a.simulation, b.simulation);
    assert_eq!(a.wes.score, b.wes.score);
    assert_eq!(
        a.visibility.map(|v| v.summary.point_count),
        b.visibility.map(|v| v.summary.point_count)
    );
}

#[test]
fn test_unknown_destination_is_flagged() {
    let mut input = AnalysisInput::sample_hospital();
    input.scenarios = vec![
        Scenario::new("lost", "entrance", "cafeteria"),
        Scenario::new("to_er", "entrance", "emergency"),
    ];
    let report = analyze(input, 42);

    let sim = report.simulation.as_ref().unwrap();
    assert_eq!(sim.scenario("lost").unwrap().success_rate, 0.0);
    assert_eq!(sim.scenario("to_er").unwrap().success_rate, 1.0);
    assert!(sim.summary.flags.contains(&SimulationFlag::LowSuccess {
        scenarios: vec!["lost".to_string()],
    }));
}

#[test]
fn test_reports_render_in_both_formats() {
    let report = analyze(AnalysisInput::sample_hospital(), 42);

    let text = report_with_format(&report, OutputFormat::Text).unwrap();
    assert!(text.contains("SIMULATION"));
    assert!(text.contains("entrance_to_emergency"));

    let json = report_with_format(&report, OutputFormat::Json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["graph"]["nodes"], 9);
    assert_eq!(parsed["wes"]["grade"], report.wes.grade.as_str());
}

#[test]
fn test_input_document_round_trips_through_json() {
    let input = AnalysisInput::sample_hospital();
    let json = serde_json::to_string(&input).unwrap();
    let parsed: AnalysisInput = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.graph, input.graph);
    assert_eq!(parsed.scenarios, input.scenarios);
}
