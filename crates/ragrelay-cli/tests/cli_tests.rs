//! Integration tests for CLI surfaces that do not need a live provider

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ragrelay_cmd(cache_dir: &TempDir) -> Command {
    let cache_path = cache_dir.path().join("responses.sqlite");
    let mut cmd = Command::cargo_bin("ragrelay").unwrap();
    cmd.env("RAGRELAY_CACHE", cache_path.to_str().unwrap());
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let cache_dir = TempDir::new().unwrap();
    let mut cmd = ragrelay_cmd(&cache_dir);
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("embed"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_empty_query_is_rejected_before_any_network_call() {
    let cache_dir = TempDir::new().unwrap();
    let mut cmd = ragrelay_cmd(&cache_dir);
    cmd.arg("query").arg("   ");

    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("invalid-input"));
}

#[test]
fn test_unknown_mode_is_rejected() {
    let cache_dir = TempDir::new().unwrap();
    let mut cmd = ragrelay_cmd(&cache_dir);
    cmd.arg("query")
        .arg("What does error code E-114 mean?")
        .arg("--mode")
        .arg("fancy");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown query mode"));
}

#[test]
fn test_cache_stats_on_fresh_cache() {
    let cache_dir = TempDir::new().unwrap();
    let mut cmd = ragrelay_cmd(&cache_dir);
    cmd.arg("cache").arg("stats");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0 cached responses"));
}

#[test]
fn test_cache_stats_json_format() {
    let cache_dir = TempDir::new().unwrap();
    let mut cmd = ragrelay_cmd(&cache_dir);
    cmd.arg("cache").arg("stats").arg("--format").arg("json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#"{"entries":0}"#));
}

#[test]
fn test_cache_clear_on_fresh_cache() {
    let cache_dir = TempDir::new().unwrap();
    let mut cmd = ragrelay_cmd(&cache_dir);
    cmd.arg("cache").arg("clear");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("removed 0 cached responses"));
}
