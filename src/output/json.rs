//! JSON output formatter.
//!
//! Produces a pretty-printed JSON document with the benchmark identity, one
//! entry per group (with its state counters and check results) and the
//! overall totals.

use crate::controls::Group;
use crate::output::Report;
use crate::state::{State, Summary};

#[derive(serde::Serialize)]
struct JsonOutput<'a> {
    id: &'a str,
    text: &'a str,
    tests: Vec<JsonGroup<'a>>,
    #[serde(flatten)]
    summary: Summary,
    timestamp: &'a str,
}

#[derive(serde::Serialize)]
struct JsonGroup<'a> {
    section: &'a str,
    desc: &'a str,
    results: Vec<JsonCheck<'a>>,
    pass: usize,
    fail: usize,
    warn: usize,
    info: usize,
}

#[derive(serde::Serialize)]
struct JsonCheck<'a> {
    test_number: &'a str,
    test_desc: &'a str,
    audit: &'a str,
    #[serde(rename = "type")]
    check_type: &'static str,
    test_info: &'a [String],
    status: Option<State>,
    actual_value: &'a str,
    expected_result: &'a str,
    scored: bool,
}

impl<'a> JsonGroup<'a> {
    fn new(group: &'a Group) -> Self {
        JsonGroup {
            section: &group.id,
            desc: &group.text,
            results: group
                .checks
                .iter()
                .map(|c| JsonCheck {
                    test_number: &c.id,
                    test_desc: &c.text,
                    audit: &c.audit_used,
                    check_type: c.check_type.as_str(),
                    test_info: &c.test_info,
                    status: c.state,
                    actual_value: &c.actual_value,
                    expected_result: &c.expected_result,
                    scored: c.scored,
                })
                .collect(),
            pass: group.summary.pass,
            fail: group.summary.fail,
            warn: group.summary.warn,
            info: group.summary.info,
        }
    }
}

/// Formats a [`Report`] as pretty-printed JSON.
///
/// # Panics
///
/// Panics if the report cannot be serialized (should not happen with valid data).
pub fn format(report: &Report) -> String {
    let output = JsonOutput {
        id: report.id,
        text: report.text,
        tests: report.groups.iter().map(JsonGroup::new).collect(),
        summary: report.summary,
        timestamp: &report.timestamp,
    };

    serde_json::to_string_pretty(&output).expect("JSON serialization failed")
}
