mod common;

use oxidized_bench::audit::{AuditError, AuditRegistry};
use oxidized_bench::check::CheckType;
use oxidized_bench::constraints::DefinedConstraints;
use oxidized_bench::controls::{Controls, DefinitionError};
use oxidized_bench::state::{State, Summary};
use std::path::Path;

const BENCHMARK: &str = r#"
id: "1"
text: "Kubelet Benchmark"
groups:
  - id: "1.1"
    text: "Kubelet flags"
    checks:
      - id: "1.1.1"
        text: "Ensure anonymous auth is disabled"
        audit_type: mock
        audit: "kubelet --anonymous-auth=false"
        tests:
          test_items:
            - flag: "--anonymous-auth"
              compare:
                op: eq
                value: false
        remediation: "Set --anonymous-auth=false"
        scored: true
      - id: "1.1.2"
        text: "Ensure read-only port is disabled"
        audit_type: mock
        audit:
          state: FAIL
          output: "kubelet --read-only-port=0"
          error: "kubelet config file is unreadable"
        tests:
          test_items:
            - flag: "--read-only-port"
              compare:
                op: eq
                value: 0
        remediation: "Set --read-only-port=0"
        scored: true
      - id: "1.1.3"
        text: "Ensure streaming timeout is set"
        type: skip
        scored: true
  - id: "1.2"
    text: "Platform specific"
    checks:
      - id: "1.2.1"
        text: "Ensure profiling is disabled"
        scored: true
        sub_checks:
          - check:
              constraints:
                platform: [rhel]
              audit_type: mock
              audit: "--profiling=false"
              tests:
                test_items:
                  - flag: "--profiling"
                    compare: { op: eq, value: false }
          - check:
              constraints:
                platform: [ubuntu, debian]
              audit_type: mock
              audit: "--profiling=true"
              tests:
                test_items:
                  - flag: "--profiling"
                    compare: { op: eq, value: false }
              remediation: "Edit /etc/default/kubelet"
"#;

const GROUP_SKIPS: &str = r#"
id: "2"
text: "Group skips"
groups:
  - id: "2.1"
    text: "Skipped group"
    type: skip
    checks:
      - id: "2.1.1"
        text: "Would pass"
        audit_type: mock
        audit: "ok"
        tests:
          test_items:
            - flag: "ok"
        scored: true
  - id: "2.2"
    text: "Windows only"
    constraints:
      platform: [windows]
    checks:
      - id: "2.2.1"
        text: "Would pass"
        audit_type: mock
        audit: "ok"
        tests:
          test_items:
            - flag: "ok"
        scored: true
  - id: "2.3"
    text: "Applies"
    checks:
      - id: "2.3.1"
        text: "Passes"
        audit_type: mock
        audit: "ok"
        tests:
          test_items:
            - flag: "ok"
        scored: true
"#;

fn registry() -> AuditRegistry {
    let mut registry = AuditRegistry::with_builtins();
    registry
        .register("mock", common::mock_from_descriptor)
        .expect("mock type is free");
    registry
}

fn load(yaml: &str) -> Controls {
    Controls::from_yaml(yaml, &registry())
        .expect("valid definitions")
        .with_constraints(DefinedConstraints::parse(["platform=ubuntu"]))
}

fn states(controls: &Controls) -> Vec<(String, Option<State>)> {
    controls
        .results()
        .iter()
        .flat_map(|g| g.checks.iter())
        .map(|c| (c.id.clone(), c.state))
        .collect()
}

// ── loading ───────────────────────────────────────────────────────────────────

#[test]
fn loads_groups_checks_and_sub_checks() {
    let controls = load(BENCHMARK);
    assert_eq!(controls.id, "1");
    assert_eq!(controls.text, "Kubelet Benchmark");
    assert_eq!(controls.groups.len(), 2);
    assert_eq!(controls.groups[0].checks.len(), 3);
    assert_eq!(controls.groups[0].checks[2].check_type, CheckType::Skip);
    assert_eq!(controls.groups[1].checks[0].sub_checks.len(), 2);
    assert_eq!(controls.groups[0].checks[0].unit.audit_type, "mock");
}

#[test]
fn numeric_ids_are_read_as_strings() {
    let yaml = "id: 1.2\ntext: t\ngroups:\n  - id: 3\n    text: g\n";
    let controls = Controls::from_yaml(yaml, &registry()).unwrap();
    assert_eq!(controls.id, "1.2");
    assert_eq!(controls.groups[0].id, "3");
}

#[test]
fn unregistered_audit_type_fails_to_load() {
    let err = Controls::from_yaml(BENCHMARK, &AuditRegistry::with_builtins()).unwrap_err();
    match err {
        DefinitionError::Audit { check, source } => {
            assert_eq!(check, "1.1.1");
            assert_eq!(source, AuditError::UnknownType("mock".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_yaml_fails_to_load() {
    let err = Controls::from_yaml("groups: [unclosed", &registry()).unwrap_err();
    assert!(matches!(err, DefinitionError::Yaml(_)));
}

#[test]
fn missing_file_fails_to_load() {
    let err = Controls::from_path(Path::new("/nonexistent/cis.yaml"), &registry()).unwrap_err();
    assert!(matches!(err, DefinitionError::Io { .. }));
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = registry();
    assert_eq!(
        registry.register("mock", common::mock_from_descriptor),
        Err(AuditError::DuplicateType("mock".to_string()))
    );
    assert_eq!(
        registry.register("audit", common::mock_from_descriptor),
        Err(AuditError::DuplicateType("audit".to_string()))
    );
    assert!(registry.contains("mock"));
    assert_eq!(registry.types()[0], "audit");
}

#[test]
fn find_check_returns_its_group() {
    let controls = load(BENCHMARK);
    let (group, check) = controls.find_check("1.2.1").unwrap();
    assert_eq!(group.id, "1.2");
    assert_eq!(check.text, "Ensure profiling is disabled");
    assert!(controls.find_check("9.9.9").is_none());
}

// ── running ───────────────────────────────────────────────────────────────────

#[test]
fn run_all_groups_counts_every_state() {
    let mut controls = load(BENCHMARK);
    let summary = controls.run_groups::<&str>(&[]);

    assert_eq!(
        summary,
        Summary {
            pass: 1,
            fail: 2,
            warn: 0,
            info: 1,
        }
    );
    assert_eq!(controls.summary(), summary);
    assert_eq!(
        states(&controls),
        vec![
            ("1.1.1".to_string(), Some(State::Pass)),
            ("1.1.2".to_string(), Some(State::Fail)),
            ("1.1.3".to_string(), Some(State::Info)),
            ("1.2.1".to_string(), Some(State::Fail)),
        ]
    );

    // 1.1.2 fails on the audit's own verdict even though its output would pass
    let decided = &controls.results()[0].checks[1];
    assert_eq!(decided.actual_value, "kubelet --read-only-port=0");
    assert_eq!(
        decided.audit_error.as_deref(),
        Some("kubelet config file is unreadable")
    );
    assert!(decided.expected_result.is_empty());

    let group = &controls.results()[0];
    assert_eq!(group.summary.pass, 1);
    assert_eq!(group.summary.fail, 1);
    assert_eq!(group.summary.info, 1);
}

#[test]
fn sub_check_remediation_is_reported() {
    let mut controls = load(BENCHMARK);
    controls.run_checks(&["1.2.1"]);
    let check = &controls.results()[0].checks[0];
    assert_eq!(check.remediation(), "Edit /etc/default/kubelet");
}

#[test]
fn definitions_are_not_modified_by_a_run() {
    let mut controls = load(BENCHMARK);
    controls.run_groups::<&str>(&[]);
    assert!(controls
        .groups
        .iter()
        .flat_map(|g| g.checks.iter())
        .all(|c| c.state.is_none()));
}

#[test]
fn repeated_runs_give_identical_results() {
    let mut controls = load(BENCHMARK);
    let first = controls.run_groups::<&str>(&[]);
    let first_states = states(&controls);
    let second = controls.run_groups::<&str>(&[]);

    assert_eq!(first, second);
    assert_eq!(first_states, states(&controls));
}

#[test]
fn run_selected_groups() {
    let mut controls = load(BENCHMARK);
    let summary = controls.run_groups(&["1.2"]);

    assert_eq!(summary.total(), 1);
    assert_eq!(controls.results().len(), 1);
    assert_eq!(controls.results()[0].id, "1.2");
}

#[test]
fn run_selected_checks_regroups_them() {
    let mut controls = load(BENCHMARK);
    let summary = controls.run_checks(&["1.1.2", "1.2.1"]);

    assert_eq!(summary.fail, 2);
    assert_eq!(summary.total(), 2);
    let results = controls.results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "1.1");
    assert_eq!(results[0].checks.len(), 1);
    assert_eq!(results[0].checks[0].id, "1.1.2");
    assert_eq!(results[1].id, "1.2");
}

#[test]
fn unknown_ids_select_nothing() {
    let mut controls = load(BENCHMARK);
    assert_eq!(controls.run_checks(&["9.9"]).total(), 0);
    assert!(controls.results().is_empty());
    assert_eq!(controls.run_groups(&["9"]).total(), 0);
}

#[test]
fn skipped_and_incompatible_groups_are_info() {
    let mut controls = load(GROUP_SKIPS);
    let summary = controls.run_groups::<&str>(&[]);

    assert_eq!(summary.info, 2);
    assert_eq!(summary.pass, 1);
    assert_eq!(
        states(&controls),
        vec![
            ("2.1.1".to_string(), Some(State::Info)),
            ("2.2.1".to_string(), Some(State::Info)),
            ("2.3.1".to_string(), Some(State::Pass)),
        ]
    );
}

#[test]
fn group_skip_applies_to_check_selection() {
    let mut controls = load(GROUP_SKIPS);
    let summary = controls.run_checks(&["2.1.1"]);
    assert_eq!(summary.info, 1);
}

#[test]
fn group_constraints_apply_once_defined() {
    let mut controls = load(GROUP_SKIPS)
        .with_constraints(DefinedConstraints::parse(["platform=windows"]));
    let summary = controls.run_groups(&["2.2"]);
    assert_eq!(summary.pass, 1);
}
