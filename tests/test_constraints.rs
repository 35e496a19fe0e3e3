mod common;

use common::MockAuditer;
use oxidized_bench::check::{select_sub_check, AuditableUnit, SubCheck};
use oxidized_bench::constraints::{ConstraintMap, DefinedConstraints};

fn declared(pairs: &[(&str, &[&str])]) -> ConstraintMap {
    pairs
        .iter()
        .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
        .collect()
}

fn sub_check(output: &str, constraints: &[(&str, &[&str])]) -> SubCheck {
    let mut unit = AuditableUnit::new(MockAuditer::returning(output));
    for (key, values) in constraints {
        unit = unit.with_constraint(*key, values.iter().copied());
    }
    SubCheck::new(unit)
}

// ── parsing ───────────────────────────────────────────────────────────────────

#[test]
fn parses_key_value_definitions() {
    let defined = DefinedConstraints::parse(["platform=ubuntu", "boot=grub"]);
    assert!(defined.contains("platform", "ubuntu"));
    assert!(defined.contains("boot", "grub"));
    assert!(!defined.contains("platform", "rhel"));
}

#[test]
fn repeated_keys_accumulate_values() {
    let defined = DefinedConstraints::parse(["platform=ubuntu", "platform=debian"]);
    assert!(defined.contains("platform", "ubuntu"));
    assert!(defined.contains("platform", "debian"));
}

#[test]
fn malformed_definitions_are_ignored() {
    let defined = DefinedConstraints::parse(["junk", "=value", "key=", "a=b=c"]);
    assert!(defined.is_empty());
}

#[test]
fn collects_from_pairs() {
    let defined: DefinedConstraints = [("platform", "ubuntu")].into_iter().collect();
    assert!(defined.is_defined("platform"));
    assert_eq!(defined.iter().count(), 1);
}

// ── matching ──────────────────────────────────────────────────────────────────

#[test]
fn empty_declaration_is_always_satisfied() {
    assert!(DefinedConstraints::new().satisfies(&ConstraintMap::new()));
}

#[test]
fn any_declared_value_satisfies_a_key() {
    let defined = DefinedConstraints::parse(["platform=ubuntu"]);
    assert!(defined.satisfies(&declared(&[("platform", &["rhel", "ubuntu"])])));
    assert!(!defined.satisfies(&declared(&[("platform", &["rhel", "centos"])])));
}

#[test]
fn every_declared_key_must_be_satisfied() {
    let defined = DefinedConstraints::parse(["platform=ubuntu", "boot=grub"]);
    assert!(defined.satisfies(&declared(&[
        ("platform", &["ubuntu"]),
        ("boot", &["grub"]),
    ])));
    assert!(!defined.satisfies(&declared(&[
        ("platform", &["ubuntu"]),
        ("boot", &["systemd-boot"]),
    ])));
}

#[test]
fn undefined_key_is_never_compatible() {
    let defined = DefinedConstraints::parse(["platform=ubuntu"]);
    assert!(!defined.is_key_compatible("boot", &["grub".to_string()]));
    assert!(!defined.is_key_compatible("boot", &[]));
}

#[test]
fn key_without_values_only_needs_to_be_defined() {
    let defined = DefinedConstraints::parse(["platform=ubuntu"]);
    assert!(defined.is_key_compatible("platform", &[]));
}

// ── sub-check selection ───────────────────────────────────────────────────────

#[test]
fn selects_first_compatible_sub_check() {
    let sub_checks = vec![
        sub_check("rhel", &[("platform", &["rhel"])]),
        sub_check("ubuntu", &[("platform", &["ubuntu", "debian"])]),
        sub_check("debian", &[("platform", &["debian"])]),
    ];
    let defined = DefinedConstraints::parse(["platform=debian"]);
    let selected = select_sub_check(&sub_checks, &defined).unwrap();
    assert_eq!(selected.unit.constraints["platform"], vec!["ubuntu", "debian"]);
}

#[test]
fn unconstrained_sub_check_is_a_fallback() {
    let sub_checks = vec![
        sub_check("rhel", &[("platform", &["rhel"])]),
        sub_check("any", &[]),
    ];
    let defined = DefinedConstraints::parse(["platform=ubuntu"]);
    let selected = select_sub_check(&sub_checks, &defined).unwrap();
    assert!(selected.unit.constraints.is_empty());
}

#[test]
fn no_compatible_sub_check() {
    let sub_checks = vec![sub_check("rhel", &[("platform", &["rhel"])])];
    assert!(select_sub_check(&sub_checks, &DefinedConstraints::new()).is_none());
}
