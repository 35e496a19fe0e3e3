//! Declarative test evaluation.
//!
//! A check's `tests` block is a [`TestSet`]: an ordered list of [`TestItem`]s
//! combined with a [`BinOp`]. Each item names a flag (or a structured
//! [`path`]) and either asserts its presence/absence or compares its value
//! with one of the [`compare`] operators.
//!
//! ```yaml
//! tests:
//!   bin_op: or
//!   test_items:
//!     - flag: "--anonymous-auth"
//!       compare:
//!         op: eq
//!         value: false
//!     - flag: "--authorization-mode"
//!       set: true
//! ```

pub mod compare;
pub mod flag;
pub mod path;

use compare::{CompareOp, Evaluation};
use log::{debug, warn};
use serde::Deserialize;

/// Errors produced while evaluating a single test item.
///
/// These never abort a run: the item evaluates to `false` and the error is
/// logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("invalid number '{value}': {reason}")]
    InvalidNumber { value: String, reason: String },

    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("unknown compare operator '{0}'")]
    UnknownOperator(String),

    #[error("failed to load YAML or JSON: {0}")]
    UnparsableDocument(String),

    #[error("error executing path expression '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Errors that prevent a whole [`TestSet`] from producing a verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestSetError {
    #[error("unknown binary operator for tests '{0}'")]
    UnknownBinOp(String),
}

/// How the verdicts of a [`TestSet`]'s items are combined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum BinOp {
    /// Every item must pass. Also used when `bin_op` is empty or absent.
    #[default]
    And,
    /// At least one item must pass.
    Or,
    /// An operator this evaluator does not know; executing the set fails.
    Unknown(String),
}

impl From<String> for BinOp {
    fn from(op: String) -> Self {
        match op.as_str() {
            "" | "and" => BinOp::And,
            "or" => BinOp::Or,
            _ => BinOp::Unknown(op),
        }
    }
}

/// A comparison attached to a test item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Compare {
    pub op: String,
    #[serde(deserialize_with = "scalar_string")]
    pub value: String,
}

/// One declarative assertion against audit output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestItem {
    /// Flag or key whose value is extracted from the output.
    pub flag: String,
    /// Structured path used instead of `flag` for JSON/YAML output.
    pub path: String,
    /// `true`: the flag must be present (or its value must satisfy
    /// `compare`). `false`: the flag must be absent.
    pub set: bool,
    pub compare: Option<Compare>,
}

impl Default for TestItem {
    fn default() -> Self {
        TestItem {
            flag: String::new(),
            path: String::new(),
            set: true,
            compare: None,
        }
    }
}

impl TestItem {
    /// Convenience constructor for a presence test.
    pub fn present(flag: impl Into<String>) -> Self {
        TestItem {
            flag: flag.into(),
            ..TestItem::default()
        }
    }

    /// Convenience constructor for a comparison test.
    pub fn comparing(flag: impl Into<String>, op: &str, value: impl Into<String>) -> Self {
        TestItem {
            flag: flag.into(),
            compare: Some(Compare {
                op: op.to_string(),
                value: value.into(),
            }),
            ..TestItem::default()
        }
    }

    /// The name used in explanations: the flag, or the path when no flag is set.
    fn subject(&self) -> &str {
        if self.flag.is_empty() {
            &self.path
        } else {
            &self.flag
        }
    }

    /// Evaluates this item against one unit of output (a line, or the whole
    /// output).
    pub fn evaluate(&self, output: &str) -> Evaluation {
        let structured = if self.flag.is_empty() && !self.path.is_empty() {
            let extracted = path::parse_document(output)
                .and_then(|doc| path::evaluate(&self.path, &doc));
            match extracted {
                Ok(value) => Some(value),
                Err(e) => return Evaluation::failed(String::new(), e),
            }
        } else {
            None
        };

        let subject = self.subject();
        let present = || match &structured {
            Some(value) => !value.is_empty(),
            None => flag::is_present(output, &self.flag),
        };

        let result = if !self.set {
            Evaluation::new(!present(), format!("'{subject}' Is not present"))
        } else {
            let op = self
                .compare
                .as_ref()
                .and_then(|c| CompareOp::parse(&c.op).map(|op| (op, c.value.as_str())));
            match op {
                Some((op, expected)) => {
                    let actual = match structured {
                        Some(ref value) => value.clone(),
                        None => flag::extract(output, &self.flag),
                    };
                    compare::compare(&op, &actual, expected, subject)
                }
                None => Evaluation::new(present(), format!("'{subject}' Is present")),
            }
        };

        debug!(
            "evaluate '{subject}': passed={} expected={}",
            result.passed, result.explanation
        );
        result
    }

    /// Evaluates this item against raw audit output.
    ///
    /// With `multi_row`, every line must pass; evaluation stops at the first
    /// failing line and reports that line's result.
    pub fn execute(&self, output: &str, multi_row: bool) -> Evaluation {
        let output = output.trim_end_matches([' ', '\n']);

        if !multi_row {
            return self.evaluate(output);
        }

        let mut result = Evaluation::default();
        for line in output.split('\n') {
            result = self.evaluate(line);
            if !result.passed {
                break;
            }
        }
        result
    }
}

/// The verdict of a whole [`TestSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestOutcome {
    pub passed: bool,
    /// The raw output the tests ran against.
    pub actual: String,
    /// Item explanations joined with ` AND ` / ` OR `.
    pub expected: String,
}

/// An ordered list of test items combined with a [`BinOp`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestSet {
    pub test_items: Vec<TestItem>,
    pub bin_op: BinOp,
}

impl TestSet {
    pub fn new(test_items: Vec<TestItem>, bin_op: BinOp) -> Self {
        TestSet { test_items, bin_op }
    }

    pub fn is_empty(&self) -> bool {
        self.test_items.is_empty()
    }

    /// Runs every item against `output` and combines the verdicts.
    ///
    /// Returns `Ok(None)` when there are no items: nothing was asserted, so
    /// the caller cannot decide pass or fail.
    ///
    /// # Errors
    ///
    /// [`TestSetError::UnknownBinOp`] when `bin_op` is not `and`, `or` or empty.
    pub fn execute(
        &self,
        output: &str,
        check_id: &str,
        multi_row: bool,
    ) -> Result<Option<TestOutcome>, TestSetError> {
        if self.test_items.is_empty() {
            return Ok(None);
        }

        let separator = match &self.bin_op {
            BinOp::And => " AND ",
            BinOp::Or => " OR ",
            BinOp::Unknown(op) => return Err(TestSetError::UnknownBinOp(op.clone())),
        };

        let results: Vec<Evaluation> = self
            .test_items
            .iter()
            .map(|item| {
                let result = item.execute(output, multi_row);
                if let Some(ref e) = result.error {
                    warn!("failed running test {check_id}: {e}");
                }
                result
            })
            .collect();

        let passed = match self.bin_op {
            BinOp::Or => results.iter().any(|r| r.passed),
            _ => results.iter().all(|r| r.passed),
        };

        let expected = results
            .iter()
            .map(|r| r.explanation.as_str())
            .collect::<Vec<_>>()
            .join(separator);

        Ok(Some(TestOutcome {
            passed,
            actual: output.to_string(),
            expected,
        }))
    }
}

/// Deserializes any YAML scalar (`false`, `640`, `"text"`) as its string form.
pub(crate) fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s,
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .map_err(serde::de::Error::custom)?,
    })
}
