//! Human-readable colored text formatter.
//!
//! Produces a terminal-friendly report with ANSI color codes: one
//! `[STATE] id text` line per group and check, the remediation of every
//! check that did not pass, and the state totals.

use crate::check::Check;
use crate::config::OutputConfig;
use crate::output::Report;
use crate::state::State;
use colored::Colorize;

/// Formats a [`Report`] as human-readable, ANSI-colored text.
///
/// Sections rendered (in order):
/// 1. **Results**: benchmark, group and check lines, optionally followed by
///    the raw audit output of failing checks.
/// 2. **Remediations**: skipped when `no_remediations` is set.
/// 3. **Summary**: one count per state.
pub fn format(report: &Report, options: &OutputConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!("{} {} {}\n", tag(State::Info), report.id, report.text));
    for group in report.groups {
        out.push_str(&format!("{} {} {}\n", tag(State::Info), group.id, group.text));
        for check in &group.checks {
            let state = check.state.unwrap_or(State::Warn);
            out.push_str(&format!("{} {} {}\n", tag(state), check.id, check.text));
            if options.include_test_output && state == State::Fail && !check.actual_value.is_empty()
            {
                for line in check.actual_value.lines() {
                    out.push_str(&format!("\t {}\n", line.dimmed()));
                }
            }
        }
    }
    out.push('\n');

    if !options.no_remediations {
        let mut pending = report
            .groups
            .iter()
            .flat_map(|g| g.checks.iter())
            .filter(|c| needs_remediation(c))
            .peekable();
        if pending.peek().is_some() {
            out.push_str(&format!("{}\n", "== Remediations ==".bold()));
            for check in pending {
                out.push_str(&format!("{} {}\n\n", check.id, check.remediation()));
            }
        }
    }

    out.push_str(&format!("{}\n", "== Summary ==".bold()));
    let summary = report.summary;
    for (state, count) in [
        (State::Pass, summary.pass),
        (State::Fail, summary.fail),
        (State::Warn, summary.warn),
        (State::Info, summary.info),
    ] {
        out.push_str(&format!("{count} checks {}\n", colorize(state, state.as_str())));
    }

    out
}

fn needs_remediation(check: &Check) -> bool {
    matches!(check.state, Some(State::Fail) | Some(State::Warn)) && !check.test_info.is_empty()
}

fn tag(state: State) -> String {
    colorize(state, &format!("[{state}]"))
}

fn colorize(state: State, text: &str) -> String {
    match state {
        State::Pass => text.green().bold().to_string(),
        State::Fail => text.red().bold().to_string(),
        State::Warn => text.yellow().bold().to_string(),
        State::Info => text.blue().bold().to_string(),
    }
}
