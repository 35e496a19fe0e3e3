mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use oxidized_bench::audit::AuditRegistry;
use oxidized_bench::check::Check;
use oxidized_bench::controls::Controls;
use oxidized_bench::{config, output};
use std::path::Path;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = AuditRegistry::with_builtins();

    match cli.command {
        Commands::Run {
            definitions,
            defines,
            group,
            check,
            format,
            output: output_path,
            no_remediations,
            include_test_output,
            timeout,
            workspace,
            config: config_path,
        } => {
            let mut config = config::Config::load(config_path.as_deref()).unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                std::process::exit(2);
            });

            if let Some(secs) = timeout {
                config.audit.timeout_secs = secs;
            }
            if let Some(dir) = workspace {
                config.audit.workspace = dir;
            }
            if no_remediations {
                config.output.no_remediations = true;
            }
            if include_test_output {
                config.output.include_test_output = true;
            }

            let mut controls = load_controls(&definitions, &registry)
                .with_constraints(config.defined_constraints(&defines))
                .with_context(config.audit_context());

            let summary = if check.is_empty() {
                controls.run_groups(&group)
            } else {
                controls.run_checks(&check)
            };

            let report = output::Report::new(&controls);
            let formatted = output::format_report(&report, &format, &config.output);

            if let Some(out_path) = output_path {
                std::fs::write(&out_path, &formatted).unwrap_or_else(|e| {
                    eprintln!("Error writing output: {e}");
                    std::process::exit(2);
                });
                eprintln!("Output written to {}", out_path.display());
            } else {
                print!("{formatted}");
            }

            std::process::exit(if summary.fail > 0 { 1 } else { 0 });
        }

        Commands::ListChecks { definitions } => {
            let controls = load_controls(&definitions, &registry);
            println!("{} {}", controls.id.bold(), controls.text.bold().underline());

            let mut total = 0usize;
            for group in &controls.groups {
                println!();
                println!("  {} {}", group.id.bold(), group.text);
                for check in &group.checks {
                    println!(
                        "    {id:<12} {flags:<16} {text}",
                        id = check.id,
                        flags = check_flags(check).dimmed(),
                        text = check.text,
                    );
                    total += 1;
                }
            }

            println!();
            println!("  Total: {} checks in {} groups", total, controls.groups.len());
        }

        Commands::Explain {
            definitions,
            check_id,
        } => {
            let controls = load_controls(&definitions, &registry);
            match controls.find_check(&check_id) {
                Some((group, check)) => print_explanation(group.id.as_str(), check),
                None => {
                    eprintln!("Unknown check: {check_id}");
                    eprintln!("Use 'oxidized-bench list-checks' to see all available checks.");
                    std::process::exit(2);
                }
            }
        }

        Commands::AuditTypes => {
            println!("{}", "Audit Types".bold().underline());
            println!();
            for audit_type in registry.types() {
                println!("  {audit_type}");
            }
        }
    }
}

/// Maps `-v` occurrences to a default log filter; `RUST_LOG` still wins.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_controls(path: &Path, registry: &AuditRegistry) -> Controls {
    Controls::from_path(path, registry).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(2);
    })
}

fn check_flags(check: &Check) -> String {
    let mut flags = Vec::new();
    if check.check_type != Default::default() {
        flags.push(check.check_type.to_string());
    }
    if check.scored {
        flags.push("scored".to_string());
    }
    if !check.sub_checks.is_empty() {
        flags.push(format!("{} sub-checks", check.sub_checks.len()));
    }
    flags.join(", ")
}

fn print_explanation(group_id: &str, check: &Check) {
    println!("{} {}", check.id.bold(), check.text);
    println!();
    println!("  Group:        {group_id}");
    println!("  Type:         {}", check.check_type);
    println!("  Scored:       {}", check.scored);

    let units = std::iter::once(&check.unit)
        .filter(|_| check.sub_checks.is_empty())
        .chain(check.sub_checks.iter().map(|sc| &sc.unit));

    for unit in units {
        println!();
        if !unit.constraints.is_empty() {
            let constraints: Vec<String> = unit
                .constraints
                .iter()
                .map(|(k, v)| format!("{k}={}", v.join("|")))
                .collect();
            println!("  Constraints:  {}", constraints.join(", "));
        }
        if !unit.audit_type.is_empty() {
            println!("  Audit type:   {}", unit.audit_type);
        }
        println!("  Audit:        {}", unit.audit_text());
        if let Some(ref tests) = unit.tests {
            for item in &tests.test_items {
                let subject = if item.flag.is_empty() { &item.path } else { &item.flag };
                let assertion = match item.compare {
                    Some(ref c) if !c.op.is_empty() => format!("{} '{}'", c.op, c.value),
                    _ if item.set => "is present".to_string(),
                    _ => "is not present".to_string(),
                };
                println!("  Test:         '{subject}' {assertion}");
            }
        }
        if !unit.remediation.is_empty() {
            println!("  Remediation:  {}", unit.remediation);
        }
    }
}
