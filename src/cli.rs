use clap::{ArgAction, Parser, Subcommand};
use oxidized_bench::output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "oxidized-bench",
    version,
    about = "Run compliance benchmark checks defined in YAML"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the checks of a benchmark definition file
    Run {
        /// Path to the YAML definition file
        definitions: PathBuf,

        /// Describe the environment as key=value (repeatable)
        #[arg(long = "define", short = 'D', value_name = "KEY=VALUE")]
        defines: Vec<String>,

        /// Only run these groups (comma-separated IDs)
        #[arg(long, value_delimiter = ',', conflicts_with = "check")]
        group: Vec<String>,

        /// Only run these checks (comma-separated IDs)
        #[arg(long, value_delimiter = ',')]
        check: Vec<String>,

        /// Output format
        #[arg(long, short, default_value = "pretty", value_enum)]
        format: OutputFormat,

        /// Write output to file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Leave remediations out of the report
        #[arg(long)]
        no_remediations: bool,

        /// Print the audit output of failing checks
        #[arg(long)]
        include_test_output: bool,

        /// Per-audit timeout in seconds (0 disables it)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Root directory for text_search and file_search audits
        #[arg(long)]
        workspace: Option<PathBuf>,

        /// Custom config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the groups and checks of a definition file
    #[command(name = "list-checks")]
    ListChecks {
        /// Path to the YAML definition file
        definitions: PathBuf,
    },

    /// Show the audit, tests and remediation of one check
    Explain {
        /// Path to the YAML definition file
        definitions: PathBuf,

        /// Check ID (e.g., "1.1.2")
        check_id: String,
    },

    /// List the registered audit types
    #[command(name = "audit-types")]
    AuditTypes,
}
