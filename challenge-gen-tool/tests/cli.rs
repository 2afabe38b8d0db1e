use std::path::{Path, PathBuf};
use std::process::Command;

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "challenge-gen-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("challenge-gen")
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn cli_without_required_arguments_prints_usage() {
    let exe = env!("CARGO_BIN_EXE_challenge-gen");
    let output = Command::new(exe)
        .args(["--game-id", "g1"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
    assert!(stdout.contains("--snapshot-file"));
}

#[test]
fn cli_generates_challenges_from_snapshot_file() {
    let exe = env!("CARGO_BIN_EXE_challenge-gen");
    let dir = temp_path("run");
    let output_path = dir.join("challenge.json");
    let summary_path = dir.join("summary.json");
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let status = Command::new(exe)
        .args(["--game-id", "g1", "--input"])
        .arg(fixture("rules.csv"))
        .arg("--snapshot-file")
        .arg(fixture("state.json"))
        .args([
            "--start",
            "2026-10-19",
            "--use-recommendation-system",
            "true",
            "--format",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .arg("--summary")
        .arg(&summary_path)
        .status()
        .expect("run cli");
    assert!(status.success());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output_path).expect("read output"))
            .expect("parse output");
    assert_eq!(written.as_array().map(Vec::len), Some(10));
    assert_eq!(written[0]["name"], "rs_Walk_Km_101");

    let report =
        std::fs::read_to_string(dir.join("generated-rules-report.csv")).expect("read report");
    assert!(report.starts_with("RULE;MODEL;MATCHED;GENERATED;OUTCOME"));
    assert!(dir.join("recommendations.json").exists());

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary_path).expect("read summary"))
            .expect("parse summary");
    assert_eq!(summary["stage"], "Done");
    assert_eq!(summary["instances"], 10);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn cli_rejects_non_csv_rules_with_failure_status() {
    let exe = env!("CARGO_BIN_EXE_challenge-gen");
    let dir = temp_path("bad-input");
    let output = Command::new(exe)
        .args(["--game-id", "g1", "--input"])
        .arg(fixture("state.json"))
        .arg("--snapshot-file")
        .arg(fixture("state.json"))
        .arg("--output")
        .arg(dir.join("challenge.json"))
        .output()
        .expect("run cli");
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nothing was written"));
    assert!(!dir.join("challenge.json").exists());
}
