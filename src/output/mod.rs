//! Output formatting for benchmark reports.
//!
//! Three formats are supported:
//!
//! | Format | Module | Use case |
//! |--------|--------|----------|
//! | [`Pretty`](OutputFormat::Pretty) | [`pretty`] | Terminal / human review |
//! | [`Json`](OutputFormat::Json)     | [`json`]   | Automation / scripting  |
//! | [`Sarif`](OutputFormat::Sarif)   | [`sarif`]  | CI/CD integration       |
//!
//! Use [`format_report`] to render a [`Report`] in any of the above formats.

pub mod json;
pub mod pretty;
pub mod sarif;

use crate::config::OutputConfig;
use crate::controls::{Controls, Group};
use crate::state::Summary;

/// Supported output formats for benchmark reports.
#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored text with remediations and a summary.
    Pretty,
    /// Machine-readable JSON.
    Json,
    /// [SARIF 2.1.0](https://sarifweb.azurewebsites.net/) for CI/CD tool integration.
    Sarif,
}

/// The results of one run, ready to be rendered.
#[derive(Debug, Clone)]
pub struct Report<'a> {
    pub id: &'a str,
    pub text: &'a str,
    pub groups: &'a [Group],
    pub summary: Summary,
    /// RFC 3339 time the report was assembled.
    pub timestamp: String,
}

impl<'a> Report<'a> {
    /// Captures the last run of `controls`.
    pub fn new(controls: &'a Controls) -> Self {
        Report {
            id: &controls.id,
            text: &controls.text,
            groups: controls.results(),
            summary: controls.summary(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Formats a [`Report`] in the requested [`OutputFormat`].
///
/// # Examples
///
/// ```rust,no_run
/// use oxidized_bench::config::OutputConfig;
/// use oxidized_bench::output::{format_report, OutputFormat, Report};
/// # use oxidized_bench::controls::Controls;
/// # fn example(controls: &Controls) {
/// let report = Report::new(controls);
/// let json = format_report(&report, &OutputFormat::Json, &OutputConfig::default());
/// println!("{json}");
/// # }
/// ```
pub fn format_report(report: &Report, format: &OutputFormat, options: &OutputConfig) -> String {
    match format {
        OutputFormat::Pretty => pretty::format(report, options),
        OutputFormat::Json => json::format(report),
        OutputFormat::Sarif => sarif::format(report),
    }
}
