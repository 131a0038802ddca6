//! E2E tests for the `ticket-dedup` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn dedup_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ticket-dedup"));
    cmd.current_dir(dir);
    cmd.env_remove("EXPORT_DIR");
    cmd.env_remove("FORMAT");
    cmd.env_remove("TICKET_DEDUP_TIMING");
    cmd.env_remove("RUST_BACKTRACE");
    cmd.env_remove("RUST_LIB_BACKTRACE");
    cmd.env("TICKET_DEDUP_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".user-config"));
    cmd
}

fn write_ticket(root: &Path, rel: &str, id: &str, updated_at: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        format!(r#"{{"ticket":{{"id":{id},"updated_at":"{updated_at}","subject":"x"}}}}"#),
    )
    .unwrap();
    path
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = dedup_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("ticket-dedup should not crash");
    assert!(
        output.status.success(),
        "ticket-dedup failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

fn basic_export(dir: &Path) -> PathBuf {
    let root = dir.join("export");
    write_ticket(&root, "a.json", "1", "2024-01-01");
    write_ticket(&root, "b.json", "1", "2024-02-01");
    write_ticket(&root, "c.json", "2", "2024-01-01");
    root
}

#[test]
fn removes_older_version_and_reports_summary() {
    let dir = TempDir::new().unwrap();
    let root = basic_export(dir.path());

    let json = run_json(dir.path(), &["--export-path", root.to_str().unwrap()]);

    assert_eq!(json["dry_run"], false);
    assert_eq!(json["summary"]["removed"], 1);
    assert_eq!(json["summary"]["kept"], 2);
    assert_eq!(json["summary"]["failed"], 0);
    assert_eq!(json["duplicates"][0]["ticket_id"], "1");
    assert_eq!(json["duplicates"][0]["versions"], 2);
    assert!(!root.join("a.json").exists());
    assert!(root.join("b.json").exists());
    assert!(root.join("c.json").exists());
}

#[test]
fn default_export_path_is_export_in_cwd() {
    let dir = TempDir::new().unwrap();
    let root = basic_export(dir.path());

    dedup_cmd(dir.path())
        .args(["--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("summary dry_run=false removed=1 kept=2"));

    assert!(!root.join("a.json").exists());
}

#[test]
fn dry_run_reports_but_deletes_nothing() {
    let dir = TempDir::new().unwrap();
    let root = basic_export(dir.path());

    dedup_cmd(dir.path())
        .args(["--dry-run", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would-remove"))
        .stdout(predicate::str::contains("a.json"))
        .stdout(predicate::str::contains("would_remove=1 kept=2"));

    for name in ["a.json", "b.json", "c.json"] {
        assert!(root.join(name).exists(), "{name} should survive a dry run");
    }
}

#[test]
fn missing_export_path_fails_before_scanning() {
    let dir = TempDir::new().unwrap();

    dedup_cmd(dir.path())
        .args(["--export-path", "does-not-exist"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does-not-exist"));

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
}

#[test]
fn missing_export_path_error_is_json_in_json_mode() {
    let dir = TempDir::new().unwrap();

    let output = dedup_cmd(dir.path())
        .args(["--export-path", "nope", "--json"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    // main's returned anyhow error prints an `Error: ...` line after the JSON object.
    let json_end = stderr.rfind('}').expect("JSON error object on stderr");
    let err: Value = serde_json::from_str(&stderr[..=json_end]).expect("error must parse");
    assert_eq!(err["error"]["error_code"], "E1001");
}

#[test]
fn unknown_argument_prints_usage_and_exits_nonzero() {
    let dir = TempDir::new().unwrap();

    dedup_cmd(dir.path())
        .arg("--frobnicate")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn export_dir_env_is_a_fallback_for_export_path() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("elsewhere");
    write_ticket(&root, "2024/January/02/5.json", "5", "2024-01-02T00:00:00Z");
    write_ticket(&root, "2024/March/09/5.json", "5", "2024-03-09T00:00:00Z");

    let json = {
        let output = dedup_cmd(dir.path())
            .env("EXPORT_DIR", &root)
            .arg("--json")
            .output()
            .unwrap();
        assert!(output.status.success());
        serde_json::from_slice::<Value>(&output.stdout).unwrap()
    };

    assert_eq!(json["summary"]["removed"], 1);
    assert_eq!(json["summary"]["pruned_dirs"], 2);
    assert!(!root.join("2024/January").exists());
    assert!(root.join("2024/March/09/5.json").exists());
}

#[test]
fn project_config_supplies_export_path() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("tickets");
    write_ticket(&root, "x.json", "9", "2024-01-01");
    write_ticket(&root, "y.json", "9", "2024-01-02");
    fs::write(
        dir.path().join(".ticket-dedup.toml"),
        "export_path = \"tickets\"\njobs = 2\n",
    )
    .unwrap();

    let json = run_json(dir.path(), &["--dry-run"]);
    assert_eq!(json["summary"]["would_remove"], 1);
    assert_eq!(json["summary"]["removed"], 0);
    assert!(root.join("x.json").exists());
}

#[test]
fn malformed_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    basic_export(dir.path());
    fs::write(dir.path().join(".ticket-dedup.toml"), "jobs = [").unwrap();

    dedup_cmd(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(".ticket-dedup.toml"));
}

#[test]
fn malformed_ticket_is_skipped_and_kept() {
    let dir = TempDir::new().unwrap();
    let root = basic_export(dir.path());
    let broken = root.join("broken.json");
    fs::write(&broken, "{\"ticket\": ").unwrap();

    let json = run_json(dir.path(), &["--strict"]);

    assert!(broken.exists());
    assert_eq!(json["scan"]["files_seen"], 4);
    assert_eq!(json["scan"]["skipped"], 1);
    assert_eq!(json["issues"][0]["error_code"], "E2002");
    assert_eq!(json["summary"]["kept"], 2);
}

#[test]
fn second_run_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    basic_export(dir.path());

    let first = run_json(dir.path(), &[]);
    let second = run_json(dir.path(), &[]);

    assert_eq!(first["summary"]["removed"], 1);
    assert_eq!(second["summary"]["removed"], 0);
    assert_eq!(second["summary"]["kept"], 2);
    assert_eq!(second["duplicates"].as_array().map(Vec::len), Some(0));
}

#[test]
fn timing_is_embedded_in_json_output() {
    let dir = TempDir::new().unwrap();
    basic_export(dir.path());

    let json = run_json(dir.path(), &["--timing", "--dry-run"]);
    let phases = json["timing"]["phases"].as_array().expect("phases array");
    let names: Vec<_> = phases.iter().filter_map(|p| p["name"].as_str()).collect();
    assert_eq!(names, ["scan", "select"]);
}

#[test]
fn completions_generate_script() {
    let dir = TempDir::new().unwrap();

    dedup_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ticket-dedup"));
}
