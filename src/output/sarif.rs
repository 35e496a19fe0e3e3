use crate::check::Check;
use crate::output::Report;
use crate::state::State;
use serde_sarif::sarif::{
    Message, MultiformatMessageString, ReportingDescriptor, Result as SarifResult, ResultLevel,
    Run, Sarif, Tool, ToolComponent,
};
use std::collections::HashMap;

/// Formats a [`Report`] as SARIF 2.1.0.
///
/// Every FAIL check becomes an `error` result and every WARN check a
/// `warning`; the rule of a result is its check ID.
pub fn format(report: &Report) -> String {
    let flagged: Vec<&Check> = report
        .groups
        .iter()
        .flat_map(|g| g.checks.iter())
        .filter(|c| matches!(c.state, Some(State::Fail) | Some(State::Warn)))
        .collect();

    // One rule per distinct check ID, in first-seen order.
    let mut rule_index: HashMap<&str, i64> = HashMap::new();
    let mut rules: Vec<ReportingDescriptor> = Vec::new();
    for check in &flagged {
        if rule_index.contains_key(check.id.as_str()) {
            continue;
        }
        rule_index.insert(check.id.as_str(), rules.len() as i64);

        let mut rule = ReportingDescriptor::builder().id(check.id.clone()).build();
        rule.short_description = Some(
            MultiformatMessageString::builder()
                .text(check.text.clone())
                .build(),
        );
        let remediation = check.remediation();
        if !remediation.is_empty() {
            rule.help = Some(
                MultiformatMessageString::builder()
                    .text(remediation)
                    .build(),
            );
        }
        rules.push(rule);
    }

    let results: Vec<SarifResult> = flagged
        .iter()
        .map(|check| {
            let level = match check.state {
                Some(State::Fail) => ResultLevel::Error,
                _ => ResultLevel::Warning,
            };

            let text = if check.expected_result.is_empty() {
                check.text.clone()
            } else {
                format!("{}: {}", check.text, check.expected_result)
            };

            let mut result = SarifResult::builder()
                .message(Message::builder().text(text).build())
                .build();

            result.rule_id = Some(check.id.clone());
            result.level = Some(level);
            result.rule_index = rule_index.get(check.id.as_str()).copied();
            result
        })
        .collect();

    let driver = ToolComponent::builder()
        .name("oxidized-bench")
        .version(env!("CARGO_PKG_VERSION").to_string())
        .rules(rules)
        .build();

    let tool = Tool::builder().driver(driver).build();

    let run = Run::builder().tool(tool).results(results).build();

    let sarif = Sarif::builder().version("2.1.0").runs(vec![run]).build();

    serde_json::to_string_pretty(&sarif).expect("SARIF serialization failed")
}
