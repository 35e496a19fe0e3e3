use oxidized_bench::config::{Config, ConfigError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

// ── defaults ──────────────────────────────────────────────────────────────────

#[test]
fn empty_file_uses_defaults() {
    let config = Config::from_toml("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.audit.timeout_secs, 120);
    assert_eq!(config.audit.workspace, PathBuf::from("/"));
    assert_eq!(config.audit.shell, PathBuf::from("/bin/sh"));
    assert!(!config.output.no_remediations);
    assert!(config.constraints.define.is_empty());
}

#[test]
fn default_context_matches_audit_section() {
    let ctx = Config::default().audit_context();
    assert_eq!(ctx.timeout, Some(Duration::from_secs(120)));
    assert_eq!(ctx.workspace, PathBuf::from("/"));
}

// ── parsing ───────────────────────────────────────────────────────────────────

#[test]
fn parses_every_section() {
    let config = Config::from_toml(
        r#"
[audit]
timeout_secs = 30
workspace = "/mnt/image"
shell = "/bin/bash"

[constraints]
define = ["platform=ubuntu", "boot=grub"]

[output]
no_remediations = true
include_test_output = true

[custom]
cluster = "prod"
"#,
    )
    .unwrap();

    let ctx = config.audit_context();
    assert_eq!(ctx.timeout, Some(Duration::from_secs(30)));
    assert_eq!(ctx.workspace, PathBuf::from("/mnt/image"));
    assert_eq!(ctx.shell, PathBuf::from("/bin/bash"));
    assert_eq!(ctx.custom.get("cluster").map(String::as_str), Some("prod"));
    assert!(config.output.no_remediations);
    assert!(config.output.include_test_output);
}

#[test]
fn zero_timeout_disables_it() {
    let config = Config::from_toml("[audit]\ntimeout_secs = 0\n").unwrap();
    assert_eq!(config.timeout(), None);
    assert_eq!(config.audit_context().timeout, None);
}

#[test]
fn invalid_toml_is_an_error() {
    assert!(Config::from_toml("[audit\n").is_err());
    assert!(Config::from_toml("[audit]\ntimeout_secs = \"soon\"\n").is_err());
}

// ── constraints ───────────────────────────────────────────────────────────────

#[test]
fn defines_merge_file_and_extra_entries() {
    let config = Config::from_toml("[constraints]\ndefine = [\"platform=ubuntu\"]\n").unwrap();
    let defined = config.defined_constraints(&["boot=grub", "platform=debian"]);
    assert!(defined.contains("platform", "ubuntu"));
    assert!(defined.contains("platform", "debian"));
    assert!(defined.contains("boot", "grub"));
}

#[test]
fn no_defines_means_no_constraints() {
    let defined = Config::default().defined_constraints::<String>(&[]);
    assert!(defined.is_empty());
}

// ── loading ───────────────────────────────────────────────────────────────────

#[test]
fn loads_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bench.toml");
    std::fs::write(&path, "[audit]\ntimeout_secs = 7\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.audit.timeout_secs, 7);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/bench.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
    assert!(err.to_string().contains("/nonexistent/bench.toml"));
}

#[test]
fn unparsable_file_reports_its_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bench.toml");
    std::fs::write(&path, "not toml at all [").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("bench.toml"));
}
