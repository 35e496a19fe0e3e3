//! Checks, sub-checks and the per-check state machine.
//!
//! A [`Check`] carries its own audit and tests in an [`AuditableUnit`], or a
//! list of environment-specific [`SubCheck`]s. Running a check walks these
//! rules in order; the first one that applies decides the state:
//!
//! | # | Condition | State |
//! |---|-----------|-------|
//! | 1 | type `skip` | INFO |
//! | 2 | type `manual` | WARN |
//! | 3 | no sub-checks and no test items | WARN |
//! | 4 | sub-checks present but none compatible | WARN |
//! | 5 | the audit producer decided a state | that state |
//! | 6 | tests hold / fail and scored / fail and unscored | PASS / FAIL / WARN |
//! | 7 | tests produced no verdict | WARN |

use crate::audit::{AuditContext, Auditer};
use crate::constraints::{ConstraintMap, DefinedConstraints};
use crate::eval::TestSet;
use crate::state::State;
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;

/// The `type` tag of a check or group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CheckType {
    /// Executed and evaluated.
    #[default]
    Normal,
    /// Needs a human; always WARN.
    Manual,
    /// Never executed; always INFO.
    Skip,
}

impl CheckType {
    /// Parses a `type` tag. Anything but `manual` and `skip` is a normal check.
    pub fn parse(tag: &str) -> CheckType {
        match tag {
            "manual" => CheckType::Manual,
            "skip" => CheckType::Skip,
            "" => CheckType::Normal,
            other => {
                debug!("treating check type '{other}' as a normal check");
                CheckType::Normal
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::Normal => "",
            CheckType::Manual => "manual",
            CheckType::Skip => "skip",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckType::Normal => f.write_str("normal"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// An audit producer together with the tests run against its output.
///
/// This is the part a [`Check`] and a [`SubCheck`] have in common.
#[derive(Debug, Clone, Default)]
pub struct AuditableUnit {
    /// The `audit_type` key the producer was built from.
    pub audit_type: String,
    /// The raw `audit` descriptor, kept for reports.
    pub audit: serde_yaml::Value,
    pub tests: Option<TestSet>,
    pub remediation: String,
    /// Environment requirements; only consulted for sub-checks.
    pub constraints: ConstraintMap,
    auditer: Option<Arc<dyn Auditer>>,
}

impl AuditableUnit {
    pub fn new(auditer: Arc<dyn Auditer>) -> Self {
        AuditableUnit {
            auditer: Some(auditer),
            ..AuditableUnit::default()
        }
    }

    pub fn with_descriptor(mut self, audit_type: impl Into<String>, audit: serde_yaml::Value) -> Self {
        self.audit_type = audit_type.into();
        self.audit = audit;
        self
    }

    pub fn with_tests(mut self, tests: TestSet) -> Self {
        self.tests = Some(tests);
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    pub fn with_constraint<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn auditer(&self) -> Option<&Arc<dyn Auditer>> {
        self.auditer.as_ref()
    }

    pub fn has_tests(&self) -> bool {
        self.tests.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// The audit descriptor rendered as text: the command for shell audits,
    /// compact YAML for typed ones.
    pub fn audit_text(&self) -> String {
        match &self.audit {
            serde_yaml::Value::Null => String::new(),
            serde_yaml::Value::String(s) => s.clone(),
            other => serde_yaml::to_string(other)
                .map(|s| s.trim_end().to_string())
                .unwrap_or_default(),
        }
    }
}

/// An environment-specific alternative for a check's audit and tests.
#[derive(Debug, Clone, Default)]
pub struct SubCheck {
    pub unit: AuditableUnit,
}

impl SubCheck {
    pub fn new(unit: AuditableUnit) -> Self {
        SubCheck { unit }
    }
}

/// Returns the first sub-check whose constraints the environment satisfies.
///
/// A sub-check without constraints is always compatible, so it works as a
/// fallback when listed last.
pub fn select_sub_check<'a>(
    sub_checks: &'a [SubCheck],
    defined: &DefinedConstraints,
) -> Option<&'a SubCheck> {
    sub_checks
        .iter()
        .find(|sc| defined.satisfies(&sc.unit.constraints))
}

/// One benchmark recommendation and, after a run, its result.
#[derive(Debug, Clone, Default)]
pub struct Check {
    pub id: String,
    pub text: String,
    pub check_type: CheckType,
    pub scored: bool,
    /// Evaluate every output line separately.
    pub use_multiple_values: bool,
    pub unit: AuditableUnit,
    pub sub_checks: Vec<SubCheck>,

    /// Terminal state of the last run.
    pub state: Option<State>,
    /// Raw output the tests ran against.
    pub actual_value: String,
    /// What the tests asserted, or why no verdict was reached.
    pub expected_result: String,
    /// Remediation text collected during the last run.
    pub test_info: Vec<String>,
    /// Advisory error reported by the audit producer.
    pub audit_error: Option<String>,
    /// Audit that was actually executed (the selected sub-check's, if any).
    pub audit_used: String,
}

impl Check {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Check {
            id: id.into(),
            text: text.into(),
            ..Check::default()
        }
    }

    pub fn with_type(mut self, check_type: CheckType) -> Self {
        self.check_type = check_type;
        self
    }

    pub fn with_scored(mut self, scored: bool) -> Self {
        self.scored = scored;
        self
    }

    pub fn with_multiple_values(mut self, multi_row: bool) -> Self {
        self.use_multiple_values = multi_row;
        self
    }

    pub fn with_unit(mut self, unit: AuditableUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_sub_check(mut self, sub_check: SubCheck) -> Self {
        self.sub_checks.push(sub_check);
        self
    }

    /// Remediation from the last run, joined for display.
    pub fn remediation(&self) -> String {
        self.test_info.join("\n")
    }

    fn reset_results(&mut self) {
        self.state = None;
        self.actual_value.clear();
        self.expected_result.clear();
        self.test_info.clear();
        self.audit_error = None;
        self.audit_used.clear();
    }

    /// Runs the check and records its result.
    ///
    /// Result fields from a previous run are cleared first, so running the
    /// same check twice leaves it in the same state.
    pub fn run(&mut self, defined: &DefinedConstraints, ctx: &AuditContext) -> State {
        self.reset_results();
        let record = self.evaluate(defined, ctx);

        if !record.remediation.is_empty() {
            self.test_info.push(record.remediation);
        }
        self.actual_value = record.actual_value;
        self.expected_result = record.expected_result;
        self.audit_error = record.audit_error;
        self.audit_used = record.audit_used;
        self.state = Some(record.state);

        info!("check {} [{}]: {}", self.id, self.text, record.state);
        record.state
    }

    fn evaluate(&self, defined: &DefinedConstraints, ctx: &AuditContext) -> RunRecord {
        match self.check_type {
            CheckType::Skip => return RunRecord::decided(State::Info, &self.unit),
            CheckType::Manual => return RunRecord::decided(State::Warn, &self.unit),
            CheckType::Normal => {}
        }

        let unit = if self.sub_checks.is_empty() {
            if !self.unit.has_tests() {
                debug!("check {} has no tests", self.id);
                return RunRecord::decided(State::Warn, &self.unit);
            }
            &self.unit
        } else {
            match select_sub_check(&self.sub_checks, defined) {
                Some(sub_check) => &sub_check.unit,
                None => {
                    warn!("failed to find a compatible sub-check for check {}", self.id);
                    let mut record = RunRecord::decided(State::Warn, &self.unit);
                    record.expected_result = "no sub-check matches the defined constraints".to_string();
                    return record;
                }
            }
        };

        let mut record = RunRecord::decided(State::Warn, unit);
        record.audit_used = unit.audit_text();

        let Some(auditer) = unit.auditer() else {
            record.audit_error = Some("no audit to run".to_string());
            return record;
        };

        let audit = auditer.execute(ctx);
        if let Some(ref e) = audit.error {
            debug!("check {}: {e}", self.id);
        }
        record.audit_error = audit.error;

        if let Some(state) = audit.state {
            record.state = state;
            record.actual_value = audit.output;
            return record;
        }

        let Some(tests) = unit.tests.as_ref() else {
            record.actual_value = audit.output;
            return record;
        };

        match tests.execute(&audit.output, &self.id, self.use_multiple_values) {
            Ok(Some(outcome)) => {
                record.state = if outcome.passed {
                    State::Pass
                } else if self.scored {
                    State::Fail
                } else {
                    State::Warn
                };
                record.actual_value = outcome.actual;
                record.expected_result = outcome.expected;
            }
            Ok(None) => {
                debug!("check {}: tests produced no verdict", self.id);
                record.actual_value = audit.output;
            }
            Err(e) => {
                warn!("check {}: {e}", self.id);
                record.actual_value = audit.output;
                record.expected_result = e.to_string();
            }
        }
        record
    }
}

/// Result fields computed by one run before they are stored on the check.
struct RunRecord {
    state: State,
    actual_value: String,
    expected_result: String,
    remediation: String,
    audit_error: Option<String>,
    audit_used: String,
}

impl RunRecord {
    fn decided(state: State, unit: &AuditableUnit) -> Self {
        RunRecord {
            state,
            actual_value: String::new(),
            expected_result: String::new(),
            remediation: unit.remediation.clone(),
            audit_error: None,
            audit_used: String::new(),
        }
    }
}
