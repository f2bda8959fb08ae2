//! CLI-level tests that spawn the real binary.

use std::process::Command;

fn triad() -> Command {
    Command::new(env!("CARGO_BIN_EXE_triad"))
}

/// With an empty PATH no agent binary resolves; the run must abort with the
/// failing role named and a non-zero exit.
#[test]
fn missing_agent_binary_aborts_with_context() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = triad()
        .args(["write a hello world function", "--no-save", "-n", "1"])
        .current_dir(temp.path())
        .env("PATH", "")
        .output()
        .expect("spawn triad");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Creator"), "stderr was: {stderr}");
    assert!(stderr.contains("initial generation"), "stderr was: {stderr}");
    // Aborted run: nothing usable lands on stdout.
    assert!(output.stdout.is_empty());
}

#[test]
fn rejects_zero_iterations() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = triad()
        .args(["task", "-n", "0"])
        .current_dir(temp.path())
        .output()
        .expect("spawn triad");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("0"), "stderr was: {stderr}");
}

#[test]
fn rejects_missing_task() {
    let output = triad().output().expect("spawn triad");
    assert!(!output.status.success());
}

#[test]
fn rejects_malformed_config_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    std::fs::write(temp.path().join("triad.toml"), "iterations = \"five\"\n").expect("write");
    let output = triad()
        .args(["task", "--no-save"])
        .current_dir(temp.path())
        .env("PATH", "")
        .output()
        .expect("spawn triad");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("triad.toml"), "stderr was: {stderr}");
}
