//! Benchmark definitions and the run orchestrator.
//!
//! [`Controls`] owns the parsed definition tree (groups of checks), the
//! [`DefinedConstraints`] of the current environment and the [`Summary`] of
//! the last run. [`Controls::run_groups`] and [`Controls::run_checks`] run a
//! selection of checks in declaration order and record their results on
//! copies of the selected groups ([`Controls::results`]); the definition
//! tree itself is never modified by a run.

use crate::audit::{AuditContext, AuditError, AuditRegistry};
use crate::check::{AuditableUnit, Check, CheckType, SubCheck};
use crate::constraints::{ConstraintMap, DefinedConstraints};
use crate::eval::{scalar_string, TestSet};
use crate::state::Summary;
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Errors raised while loading a definition document.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid definition document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("check {check}: {source}")]
    Audit { check: String, source: AuditError },
}

/// A named collection of checks.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub id: String,
    pub text: String,
    /// `skip` forces every contained check to INFO.
    pub group_type: CheckType,
    /// Unsatisfied constraints also force every contained check to INFO.
    pub constraints: ConstraintMap,
    pub checks: Vec<Check>,
    /// State counts of the last run.
    pub summary: Summary,
}

impl Group {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Group {
            id: id.into(),
            text: text.into(),
            ..Group::default()
        }
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Whether the group's checks are skipped in this environment.
    pub fn is_skipped(&self, defined: &DefinedConstraints) -> bool {
        self.group_type == CheckType::Skip || !defined.satisfies(&self.constraints)
    }
}

/// A loaded benchmark and the results of its last run.
#[derive(Debug, Clone, Default)]
pub struct Controls {
    pub id: String,
    pub text: String,
    pub groups: Vec<Group>,
    defined: DefinedConstraints,
    context: AuditContext,
    summary: Summary,
    results: Vec<Group>,
}

impl Controls {
    pub fn new(id: impl Into<String>, text: impl Into<String>, groups: Vec<Group>) -> Self {
        Controls {
            id: id.into(),
            text: text.into(),
            groups,
            ..Controls::default()
        }
    }

    /// Parses a YAML definition document, building every audit producer
    /// through `registry`.
    ///
    /// # Errors
    ///
    /// [`DefinitionError::Yaml`] for malformed YAML and
    /// [`DefinitionError::Audit`] for an unregistered `audit_type` or an
    /// audit descriptor its producer rejects.
    ///
    /// # Examples
    ///
    /// ```
    /// use oxidized_bench::audit::AuditRegistry;
    /// use oxidized_bench::controls::Controls;
    ///
    /// let yaml = r#"
    /// id: "1"
    /// text: "Demo"
    /// groups:
    ///   - id: "1.1"
    ///     text: "Group"
    ///     checks:
    ///       - id: "1.1.1"
    ///         text: "Echo"
    ///         audit: "echo enabled"
    ///         tests:
    ///           test_items:
    ///             - flag: "enabled"
    /// "#;
    /// let controls = Controls::from_yaml(yaml, &AuditRegistry::with_builtins()).unwrap();
    /// assert_eq!(controls.groups[0].checks[0].id, "1.1.1");
    /// ```
    pub fn from_yaml(input: &str, registry: &AuditRegistry) -> Result<Controls, DefinitionError> {
        let raw: RawControls = serde_yaml::from_str(input)?;
        let groups = raw
            .groups
            .into_iter()
            .map(|g| g.build(registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Controls::new(raw.id, raw.text, groups))
    }

    /// Reads and parses a definition file.
    pub fn from_path(path: &Path, registry: &AuditRegistry) -> Result<Controls, DefinitionError> {
        let input = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&input, registry)
    }

    pub fn with_constraints(mut self, defined: DefinedConstraints) -> Self {
        self.defined = defined;
        self
    }

    pub fn with_context(mut self, context: AuditContext) -> Self {
        self.context = context;
        self
    }

    pub fn defined_constraints(&self) -> &DefinedConstraints {
        &self.defined
    }

    /// Summary of the last run.
    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// Groups of the last run with their checks' results.
    pub fn results(&self) -> &[Group] {
        &self.results
    }

    /// Finds a check definition and the group containing it.
    pub fn find_check(&self, id: &str) -> Option<(&Group, &Check)> {
        self.groups
            .iter()
            .find_map(|g| g.checks.iter().find(|c| c.id == id).map(|c| (g, c)))
    }

    /// Runs every check of the groups named in `ids`, or of all groups when
    /// `ids` is empty.
    pub fn run_groups<S: AsRef<str>>(&mut self, ids: &[S]) -> Summary {
        let selected = self
            .groups
            .iter()
            .filter(|g| ids.is_empty() || ids.iter().any(|id| id.as_ref().trim() == g.id))
            .cloned()
            .collect();
        self.run_selection(selected)
    }

    /// Runs the checks named in `ids`, or every check when `ids` is empty.
    ///
    /// Results are grouped under copies of the original groups that contain
    /// only the selected checks.
    pub fn run_checks<S: AsRef<str>>(&mut self, ids: &[S]) -> Summary {
        let selected = self
            .groups
            .iter()
            .filter_map(|g| {
                let checks: Vec<Check> = g
                    .checks
                    .iter()
                    .filter(|c| ids.is_empty() || ids.iter().any(|id| id.as_ref().trim() == c.id))
                    .cloned()
                    .collect();
                if checks.is_empty() {
                    return None;
                }
                let mut group = g.clone_header();
                group.checks = checks;
                Some(group)
            })
            .collect();
        self.run_selection(selected)
    }

    fn run_selection(&mut self, mut groups: Vec<Group>) -> Summary {
        self.summary = Summary::default();

        for group in &mut groups {
            group.summary = Summary::default();
            let skipped = group.is_skipped(&self.defined);
            if skipped {
                info!("group {} does not apply, skipping its checks", group.id);
            }

            for check in &mut group.checks {
                if skipped {
                    check.check_type = CheckType::Skip;
                }
                let state = check.run(&self.defined, &self.context);
                group.summary.record(state);
                self.summary.record(state);
            }
        }

        self.results = groups;
        self.summary
    }
}

impl Group {
    /// A copy of the group without its checks.
    fn clone_header(&self) -> Group {
        Group {
            id: self.id.clone(),
            text: self.text.clone(),
            group_type: self.group_type,
            constraints: self.constraints.clone(),
            checks: Vec::new(),
            summary: Summary::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawControls {
    #[serde(deserialize_with = "scalar_string")]
    id: String,
    text: String,
    groups: Vec<RawGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGroup {
    #[serde(deserialize_with = "scalar_string")]
    id: String,
    text: String,
    #[serde(rename = "type")]
    group_type: String,
    constraints: ConstraintMap,
    checks: Vec<RawCheck>,
}

impl RawGroup {
    fn build(self, registry: &AuditRegistry) -> Result<Group, DefinitionError> {
        let checks = self
            .checks
            .into_iter()
            .map(|c| c.build(registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Group {
            id: self.id,
            text: self.text,
            group_type: CheckType::parse(&self.group_type),
            constraints: self.constraints,
            checks,
            summary: Summary::default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCheck {
    #[serde(deserialize_with = "scalar_string")]
    id: String,
    text: String,
    #[serde(rename = "type")]
    check_type: String,
    scored: bool,
    use_multiple_values: bool,
    audit: serde_yaml::Value,
    #[serde(alias = "audittype")]
    audit_type: String,
    tests: Option<TestSet>,
    remediation: String,
    sub_checks: Vec<RawSubCheck>,
}

impl RawCheck {
    fn build(self, registry: &AuditRegistry) -> Result<Check, DefinitionError> {
        let id = self.id;
        let unit = RawUnit {
            constraints: ConstraintMap::new(),
            audit: self.audit,
            audit_type: self.audit_type,
            tests: self.tests,
            remediation: self.remediation,
        }
        .build(registry, &id)?;

        let sub_checks = self
            .sub_checks
            .into_iter()
            .map(|sc| sc.check.build(registry, &id).map(SubCheck::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Check {
            id,
            text: self.text,
            check_type: CheckType::parse(&self.check_type),
            scored: self.scored,
            use_multiple_values: self.use_multiple_values,
            unit,
            sub_checks,
            ..Check::default()
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSubCheck {
    check: RawUnit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUnit {
    constraints: ConstraintMap,
    audit: serde_yaml::Value,
    #[serde(alias = "audittype")]
    audit_type: String,
    tests: Option<TestSet>,
    remediation: String,
}

impl RawUnit {
    fn build(self, registry: &AuditRegistry, check: &str) -> Result<AuditableUnit, DefinitionError> {
        let auditer = registry
            .build(&self.audit_type, &self.audit)
            .map_err(|source| DefinitionError::Audit {
                check: check.to_string(),
                source,
            })?;

        let mut unit = AuditableUnit::new(auditer)
            .with_descriptor(self.audit_type, self.audit)
            .with_remediation(self.remediation);
        unit.constraints = self.constraints;
        unit.tests = self.tests;
        Ok(unit)
    }
}
