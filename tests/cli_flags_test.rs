//! CLI contract tests
//!
//! Runs the built binary and checks JSON output shape, the `-o` report file,
//! and the train/query round trip through `--model-dir`.

use std::path::Path;
use std::process::{Command, Output};

fn recon_bin() -> &'static str {
    env!("CARGO_BIN_EXE_user-recon")
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(recon_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("USER_RECON_CONTAMINATION")
        .env_remove("USER_RECON_MODEL_DIR")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run user-recon")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_compare_json() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["compare", "elhamjvdi", "elham87jvdi", "--format", "json"]);
    let json = json_stdout(&out);
    assert_eq!(json["identifier_a"], "elhamjvdi");
    assert!(json["combined_score"].as_f64().unwrap() >= 60.0);
    assert_eq!(json["verdict"], "Possibly same user");
}

#[test]
fn test_aliases_json() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["aliases", "admin", "-f", "json"]);
    let json = json_stdout(&out);
    let candidates: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["candidate"].as_str().unwrap())
        .collect();
    assert!(candidates.contains(&"admin2024"));
    assert!(candidates.contains(&"_admin_"));
}

#[test]
fn test_analyze_writes_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["analyze", "elhamjvdi", "-o", "report.json"]);
    assert!(out.status.success());

    let content = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(report["username"], "elhamjvdi");
    assert!(report["analysis"]["anomaly_reports"].is_array());
}

#[test]
fn test_project_config_is_validated() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("user-recon.toml"),
        "[anomaly]\ncontamination = 0.9\n",
    )
    .unwrap();
    let out = run_in(dir.path(), &["patterns", "admin"]);
    assert!(!out.status.success());
}

#[test]
fn test_train_and_query_models() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("corpus.txt"),
        "elhamjvdi\nadmin123\ntest_user\nbot9999\nxXcoolguyXx\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("labels.csv"),
        "bot1111,bot\nbot2222,bot\nelhamjvdi,personal\nsarahconnor,personal\n",
    )
    .unwrap();

    let models = dir.path().join("models");
    let models = models.to_str().unwrap();

    let out = run_in(dir.path(), &["train-similarity", "corpus.txt", "--model-dir", models, "-f", "json"]);
    assert_eq!(json_stdout(&out)["status"], "trained");

    let out = run_in(dir.path(), &["similarity", "elhamjvdi", "elhamjvdi", "--model-dir", models, "-f", "json"]);
    assert_eq!(json_stdout(&out)["similarity"], 100.0);

    let out = run_in(dir.path(), &["train-classifier", "labels.csv", "--model-dir", models, "-f", "json"]);
    assert_eq!(json_stdout(&out)["status"], "trained");

    let out = run_in(dir.path(), &["predict-label", "bot3333", "--model-dir", models, "-f", "json"]);
    assert_eq!(json_stdout(&out)["label"], "bot");
}

#[test]
fn test_query_without_training_fails() {
    let dir = tempfile::tempdir().unwrap();
    let models = dir.path().join("empty");
    let out = run_in(
        dir.path(),
        &["predict-label", "bob", "--model-dir", models.to_str().unwrap()],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("train"));
}

#[test]
fn test_check_flags_unsafe_input() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["check", "safe_user", "<script>x</script>", "-f", "json"]);
    let json = json_stdout(&out);
    let rows = json.as_array().unwrap();
    assert_eq!(rows[0]["valid"], true);
    assert_eq!(rows[1]["valid"], false);
    assert_eq!(rows[1]["sanitized"], "scriptxscript");
}
