//! Integration tests for the `netsync` CLI binary.
//!
//! Every test writes its own config and snapshot into a temp directory;
//! nothing reads the user's real configuration.
#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `netsync` binary with env isolation.
fn netsync_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("netsync");
    cmd.env("HOME", "/tmp/netsync-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/netsync-cli-test-nonexistent")
        .env_remove("RUST_LOG")
        .env_remove("NETSYNC_DESTINATION__TAG")
        .env_remove("NETSYNC_DESTINATION__REMOVE_ORPHANS");
    cmd
}

const SNAPSHOT: &str = r#"{
  "devices": [
    {
      "id": "dev-1",
      "name": "fw-prod-01",
      "model": "FPR-2110",
      "manufacturer": "Cisco",
      "serial": "JAD123",
      "os_name": "FTD",
      "os_version": "7.2.5",
      "physical_interfaces": [
        { "id": "if-1", "name": "Ethernet1/1",
          "ipv4": { "static": { "address": "10.1.0.1", "netmask": "255.255.255.0" } } }
      ],
      "vlan_interfaces": [
        { "id": "if-2", "name": "Vlan20", "vid": 20,
          "ipv4": { "static": { "address": "10.20.0.1", "netmask": "24" } } }
      ]
    }
  ]
}"#;

/// Config + snapshot in a fresh directory. Returns the config path.
fn fixture(dir: &Path, extra: &str) -> PathBuf {
    fs::write(dir.join("fmc.json"), SNAPSHOT).unwrap();
    let config = format!(
        r#"
[destination]
tag = "netsync"

[[sources]]
name = "fmc-prod"
path = "fmc.json"
default_site = "HQ"
permitted_subnets = ["10.0.0.0/8"]
host_tenant_relations = [".*-prod = Production"]
{extra}
"#
    );
    let path = dir.join("netsync.toml");
    fs::write(&path, config).unwrap();
    path
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = netsync_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    netsync_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("plan").and(predicate::str::contains("check-config")),
    );
}

#[test]
fn test_version_flag() {
    netsync_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("netsync"));
}

// ── check-config ────────────────────────────────────────────────────

#[test]
fn test_check_config_summarises_sources() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "");

    netsync_cmd()
        .arg("--config")
        .arg(&config)
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("fmc-prod").and(predicate::str::contains("HQ")));
}

#[test]
fn test_check_config_effective_prints_toml() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "");

    netsync_cmd()
        .arg("--config")
        .arg(&config)
        .args(["check-config", "--effective"])
        .env("NETSYNC_DESTINATION__TAG", "from-env")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"tag = "from-env""#));
}

#[test]
fn test_check_config_missing_file() {
    netsync_cmd()
        .args(["--config", "/tmp/netsync-cli-test-nonexistent/absent.toml", "check-config"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_check_config_bad_rule_names_source_and_field() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), r#"host_site_relations = ["([ = Broken"]"#);

    netsync_cmd()
        .arg("--config")
        .arg(&config)
        .arg("check-config")
        .assert()
        .code(3)
        .stderr(
            predicate::str::contains("fmc-prod").and(predicate::str::contains("host_site_relations")),
        );
}

// ── plan ────────────────────────────────────────────────────────────

#[test]
fn test_plan_json_reports_creates() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "");

    let output = netsync_cmd()
        .arg("--config")
        .arg(&config)
        .args(["--output", "json", "plan"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["sources"][0]["source"], "fmc-prod");
    assert_eq!(report["sources"][0]["devices_synced"], 1);
    assert_eq!(report["changes"]["device"]["created"], 1);
    assert_eq!(report["changes"]["interface"]["created"], 2);
    assert_eq!(report["changes"]["vlan"]["created"], 1);
    assert_eq!(report["changes"]["prefix"]["created"], 1);
    assert_eq!(report["changes"]["tenant"]["created"], 1);
}

#[test]
fn test_plan_table_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "");

    netsync_cmd()
        .arg("--config")
        .arg(&config)
        .arg("plan")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("fmc-prod")
                .and(predicate::str::contains("ip_address"))
                .and(predicate::str::contains("Created")),
        );
}

#[test]
fn test_plan_operations_lists_writes() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "");

    netsync_cmd()
        .arg("--config")
        .arg(&config)
        .args(["plan", "--operations", "--no-prune"])
        .assert()
        .success()
        .stdout(predicate::str::contains("create").and(predicate::str::contains("fw-prod-01")));
}

#[test]
fn test_plan_unknown_source() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "");

    netsync_cmd()
        .arg("--config")
        .arg(&config)
        .args(["plan", "--source", "vcenter"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("vcenter").and(predicate::str::contains("fmc-prod")));
}

#[test]
fn test_plan_missing_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "");
    fs::remove_file(dir.path().join("fmc.json")).unwrap();

    netsync_cmd()
        .arg("--config")
        .arg(&config)
        .arg("plan")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("fmc.json"));
}

#[test]
fn test_plan_without_sources() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("empty.toml");
    fs::write(&config, "[destination]\nremove_orphans = false\n").unwrap();

    netsync_cmd()
        .arg("--config")
        .arg(&config)
        .arg("plan")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No sources configured"));
}
