//! Terminal check states and run summaries.

use std::fmt;

/// The terminal classification of a check after a run.
///
/// Every check that is run ends in exactly one of these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    /// The audit output satisfied the check's tests.
    Pass,
    /// A scored check whose tests did not hold, or an auditer-signalled failure.
    Fail,
    /// The check could not be carried out, is manual, or is not scored.
    Warn,
    /// Informational only; the check was skipped.
    Info,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Pass => "PASS",
            State::Fail => "FAIL",
            State::Warn => "WARN",
            State::Info => "INFO",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counts of check states for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Summary {
    #[serde(rename = "total_pass")]
    pub pass: usize,
    #[serde(rename = "total_fail")]
    pub fail: usize,
    #[serde(rename = "total_warn")]
    pub warn: usize,
    #[serde(rename = "total_info")]
    pub info: usize,
}

impl Summary {
    /// Increments the counter matching `state`.
    pub fn record(&mut self, state: State) {
        match state {
            State::Pass => self.pass += 1,
            State::Fail => self.fail += 1,
            State::Warn => self.warn += 1,
            State::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.warn + self.info
    }

    /// The most severe state present, used to colour report summaries.
    ///
    /// FAIL outranks WARN, which outranks INFO; an empty or all-pass
    /// summary yields PASS.
    pub fn worst(&self) -> State {
        if self.fail > 0 {
            State::Fail
        } else if self.warn > 0 {
            State::Warn
        } else if self.info > 0 {
            State::Info
        } else {
            State::Pass
        }
    }
}
