//! CLI contract tests against the built binary

use std::path::Path;
use std::process::Command;

fn wayfind_bin() -> &'static str {
    env!("CARGO_BIN_EXE_wayfind")
}

/// Keep the visibility pass small so debug builds stay quick
const FAST_CONFIG: &str = r#"
[visibility]
spacing_m = 2.0
isovist_limit = 150
graph_limit = 150

[simulation]
agents_per_scenario = 20
"#;

fn setup_workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("wayfind.toml"), FAST_CONFIG).unwrap();
    let status = Command::new(wayfind_bin())
        .args(["sample", "-o", "plan.json"])
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());
    dir
}

fn run(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(wayfind_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn test_sample_writes_valid_input() {
    let dir = setup_workspace();
    let content = std::fs::read_to_string(dir.path().join("plan.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed["graph"]["nodes"].as_array().unwrap().len(), 9);
}

#[test]
fn test_analyze_json_stdout() {
    let dir = setup_workspace();
    let (code, stdout, _) = run(dir.path(), &["analyze", "plan.json", "--format", "json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["wes"]["score"].is_number());
    assert_eq!(parsed["seed"], 42);
    // wayfind.toml set the agent count
    assert_eq!(parsed["simulation"]["scenarios"][0]["n_agents"], 20);
}

#[test]
fn test_cli_flags_override_config() {
    let dir = setup_workspace();
    let (code, _, stderr) = run(
        dir.path(),
        &[
            "analyze", "plan.json", "-f", "json", "-o", "report.json", "--seed", "9", "--agents",
            "5",
        ],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stderr.contains("report.json"));

    let content = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed["seed"], 9);
    assert_eq!(parsed["simulation"]["scenarios"][0]["n_agents"], 5);
}

#[test]
fn test_analyze_text_with_explanation() {
    let dir = setup_workspace();
    let (code, stdout, _) = run(dir.path(), &["analyze", "plan.json", "--explain-score"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Wayfinding Analysis"));
    assert!(stdout.contains("# Wayfinding Efficiency Score"));
}

#[test]
fn test_missing_input_fails() {
    let dir = setup_workspace();
    let (code, _, stderr) = run(dir.path(), &["analyze", "missing.json"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("missing.json"));
}

#[test]
fn test_invalid_graph_fails() {
    let dir = setup_workspace();
    std::fs::write(
        dir.path().join("bad.json"),
        r#"{"graph": {"nodes": [{"id": "a"}], "edges": [{"from": "a", "to": "b", "weight": 1.0}]}}"#,
    )
    .unwrap();
    let (code, _, _) = run(dir.path(), &["analyze", "bad.json"]);
    assert_ne!(code, 0);
}

#[test]
fn test_init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(dir.path(), &["init"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Created"));
    assert!(dir.path().join("wayfind.toml").exists());

    let (code, stdout, _) = run(dir.path(), &["init"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Already initialized"));

    let (code, stdout, _) = run(dir.path(), &["init", "--force"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Created"));
}
