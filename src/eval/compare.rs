//! Comparison operators for test items.
//!
//! [`compare`] tests one extracted value against an expected value and
//! produces an [`Evaluation`]: a verdict, a human-readable explanation of what
//! was compared, and an optional [`EvalError`] for malformed input. Errors
//! never abort evaluation; they always come back with `passed == false`.
//!
//! The explanation templates are part of the report format and are kept
//! stable:
//!
//! | Operator | Explanation |
//! |----------|-------------|
//! | `eq` | `'<flag>' is equal to '<expected>'` |
//! | `noteq` | `'<flag>' is not equal to '<expected>'` |
//! | `gt` / `gte` | `'<flag>' is greater than <expected>` / `… greater or equal to …` |
//! | `lt` / `lte` | `'<flag>' is lower than <expected>` / `… lower or equal to …` |
//! | `has` / `nothave` | `'<flag>' has '<expected>'` / `'<flag>' does not have '<expected>'` |
//! | `regex` | `'<flag>' matched by regex expression '<expected>'` |
//! | `valid_elements` | `'<flag>' contains valid elements from '<expected>'` |
//! | `bitmask` | `'<flag>' has permissions <actual>, expected <expected> or more restrictive` |

use super::EvalError;
use log::debug;
use regex::Regex;
use std::fmt;

/// Separator used by `valid_elements` lists.
pub const ARRAY_SEPARATOR: char = ',';

/// A comparison operator named in a test item's `compare.op`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Has,
    NotHave,
    Regex,
    ValidElements,
    Bitmask,
    /// An operator name this evaluator does not know.
    Unknown(String),
}

impl CompareOp {
    /// Parses an operator name. Returns `None` for an empty name, meaning
    /// "no comparison".
    pub fn parse(op: &str) -> Option<CompareOp> {
        let op = match op {
            "" => return None,
            "eq" => CompareOp::Eq,
            "noteq" => CompareOp::NotEq,
            "gt" => CompareOp::Gt,
            "gte" => CompareOp::Gte,
            "lt" => CompareOp::Lt,
            "lte" => CompareOp::Lte,
            "has" => CompareOp::Has,
            "nothave" => CompareOp::NotHave,
            "regex" => CompareOp::Regex,
            "valid_elements" => CompareOp::ValidElements,
            "bitmask" => CompareOp::Bitmask,
            other => CompareOp::Unknown(other.to_string()),
        };
        Some(op)
    }

    pub fn as_str(&self) -> &str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::NotEq => "noteq",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Has => "has",
            CompareOp::NotHave => "nothave",
            CompareOp::Regex => "regex",
            CompareOp::ValidElements => "valid_elements",
            CompareOp::Bitmask => "bitmask",
            CompareOp::Unknown(name) => name,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one comparison or one test item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub passed: bool,
    pub explanation: String,
    pub error: Option<EvalError>,
}

impl Evaluation {
    pub fn new(passed: bool, explanation: impl Into<String>) -> Self {
        Evaluation {
            passed,
            explanation: explanation.into(),
            error: None,
        }
    }

    pub fn failed(explanation: impl Into<String>, error: EvalError) -> Self {
        Evaluation {
            passed: false,
            explanation: explanation.into(),
            error: Some(error),
        }
    }
}

/// Compares `actual` (the value extracted for `flag`) against `expected`
/// using `op`.
///
/// # Examples
///
/// ```
/// use oxidized_bench::eval::compare::{compare, CompareOp};
///
/// let eval = compare(&CompareOp::Eq, "True", "true", "enabled");
/// assert!(eval.passed);
/// assert_eq!(eval.explanation, "'enabled' is equal to 'true'");
///
/// let eval = compare(&CompareOp::Gt, "ten", "5", "count");
/// assert!(!eval.passed);
/// assert!(eval.error.is_some());
/// ```
pub fn compare(op: &CompareOp, actual: &str, expected: &str, flag: &str) -> Evaluation {
    debug!("actual value flag '{flag}' = '{actual}'");

    match op {
        CompareOp::Eq => {
            let passed = values_equal(actual, expected);
            if actual.is_empty() && expected.is_empty() {
                Evaluation::new(passed, format!("{flag} '{expected}' has no output"))
            } else {
                Evaluation::new(passed, format!("'{flag}' is equal to '{expected}'"))
            }
        }
        CompareOp::NotEq => Evaluation::new(
            !values_equal(actual, expected),
            format!("'{flag}' is not equal to '{expected}'"),
        ),
        CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
            compare_numeric(op, actual, expected, flag)
        }
        CompareOp::Has => Evaluation::new(
            actual.contains(expected),
            format!("'{flag}' has '{expected}'"),
        ),
        CompareOp::NotHave => Evaluation::new(
            !actual.contains(expected),
            format!("'{flag}' does not have '{expected}'"),
        ),
        CompareOp::Regex => {
            let explanation = format!("'{flag}' matched by regex expression '{expected}'");
            match Regex::new(expected) {
                Ok(re) => Evaluation::new(re.is_match(actual), explanation),
                Err(e) => Evaluation::failed(
                    explanation,
                    EvalError::InvalidRegex {
                        pattern: expected.to_string(),
                        reason: e.to_string(),
                    },
                ),
            }
        }
        CompareOp::ValidElements => {
            let source = split_elements(actual);
            let target = split_elements(expected);
            Evaluation::new(
                all_elements_valid(&source, &target),
                format!("'{flag}' contains valid elements from '{expected}'"),
            )
        }
        CompareOp::Bitmask => compare_bitmask(actual, expected, flag),
        CompareOp::Unknown(name) => {
            Evaluation::failed(String::new(), EvalError::UnknownOperator(name.clone()))
        }
    }
}

/// Equality shared by `eq` and `noteq`.
///
/// Booleans compare case-insensitively when both sides spell `true` or
/// `false`; everything else is an exact string comparison.
fn values_equal(actual: &str, expected: &str) -> bool {
    let actual_lower = actual.to_lowercase();
    let expected_lower = expected.to_lowercase();
    if is_bool_literal(&actual_lower) && is_bool_literal(&expected_lower) {
        actual_lower == expected_lower
    } else {
        actual == expected
    }
}

fn is_bool_literal(s: &str) -> bool {
    s == "true" || s == "false"
}

fn compare_numeric(op: &CompareOp, actual: &str, expected: &str, flag: &str) -> Evaluation {
    let (a, b) = match to_numeric(actual, expected) {
        Ok(pair) => pair,
        Err(e) => {
            debug!("not numeric value - flag: {actual:?} - compareValue: {expected:?} {e}");
            return Evaluation::failed(
                format!("Invalid Number(s) used for comparison: '{actual}' '{expected}'"),
                e,
            );
        }
    };

    match op {
        CompareOp::Gt => Evaluation::new(a > b, format!("'{flag}' is greater than {expected}")),
        CompareOp::Gte => Evaluation::new(
            a >= b,
            format!("'{flag}' is greater or equal to {expected}"),
        ),
        CompareOp::Lt => Evaluation::new(a < b, format!("'{flag}' is lower than {expected}")),
        _ => Evaluation::new(
            a <= b,
            format!("'{flag}' is lower or equal to {expected}"),
        ),
    }
}

/// Parses both operands as decimal integers after trimming surrounding
/// whitespace (spaces, tabs, CR and LF included).
pub fn to_numeric(a: &str, b: &str) -> Result<(i64, i64), EvalError> {
    let a = a.trim();
    let b = b.trim();

    if a.is_empty() || b.is_empty() {
        return Err(EvalError::InvalidNumber {
            value: String::new(),
            reason: "cannot convert blank value to numeric".to_string(),
        });
    }

    let parse = |s: &str| {
        s.parse::<i64>().map_err(|e| EvalError::InvalidNumber {
            value: s.to_string(),
            reason: e.to_string(),
        })
    };

    Ok((parse(a)?, parse(b)?))
}

fn compare_bitmask(actual: &str, expected: &str, flag: &str) -> Evaluation {
    let requested = match i64::from_str_radix(actual, 8) {
        Ok(v) => v,
        Err(e) => {
            return Evaluation::failed(
                format!("'{flag}' has a non numeric value: '{actual}'"),
                EvalError::InvalidNumber {
                    value: actual.to_string(),
                    reason: e.to_string(),
                },
            )
        }
    };
    let allowed = match i64::from_str_radix(expected, 8) {
        Ok(v) => v,
        Err(e) => {
            return Evaluation::failed(
                format!("'{flag}' is testing for a non numeric value: '{expected}'"),
                EvalError::InvalidNumber {
                    value: expected.to_string(),
                    reason: e.to_string(),
                },
            )
        }
    };

    Evaluation::new(
        allowed & requested == requested,
        format!("'{flag}' has permissions {actual}, expected {expected} or more restrictive"),
    )
}

/// Splits a separator-delimited list, trimming every element and ignoring a
/// trailing separator. A blank input yields an empty list.
pub fn split_elements(s: &str) -> Vec<String> {
    let clean = s.trim().trim_end_matches(ARRAY_SEPARATOR);
    if clean.is_empty() {
        return Vec::new();
    }
    clean
        .split(ARRAY_SEPARATOR)
        .map(|e| e.trim().to_string())
        .collect()
}

/// Returns `true` when every element of `source` appears in `target`.
///
/// Two empty lists are trivially valid; exactly one empty list never is.
pub fn all_elements_valid(source: &[String], target: &[String]) -> bool {
    match (source.is_empty(), target.is_empty()) {
        (true, true) => true,
        (true, false) | (false, true) => false,
        (false, false) => source.iter().all(|s| target.contains(s)),
    }
}
