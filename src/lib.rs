//! # oxidized-bench
//!
//! Check-evaluation engine for compliance benchmarks.
//!
//! A benchmark is a YAML document of groups of checks. Each check runs an
//! audit (a shell command, or a pluggable producer such as a file search),
//! evaluates declarative tests against the audit output and ends in one of
//! four states: PASS, FAIL, WARN or INFO. Environment constraints pick the
//! right variant of a check for the platform being audited.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use oxidized_bench::audit::AuditRegistry;
//! use oxidized_bench::config::Config;
//! use oxidized_bench::controls::Controls;
//! use oxidized_bench::output;
//!
//! let config = Config::load(None).expect("failed to load config");
//! let registry = AuditRegistry::with_builtins();
//! let mut controls = Controls::from_path(Path::new("cis.yaml"), &registry)
//!     .expect("invalid definitions")
//!     .with_constraints(config.defined_constraints(&["platform=ubuntu"]))
//!     .with_context(config.audit_context());
//!
//! let summary = controls.run_groups::<&str>(&[]);
//! let report = output::Report::new(&controls);
//! print!("{}", output::format_report(&report, &output::OutputFormat::Pretty, &config.output));
//! std::process::exit(if summary.fail > 0 { 1 } else { 0 });
//! ```
//!
//! ## Architecture
//!
//! The crate is organized around a pipeline:
//!
//! 1. **[`config`]**: load runner settings from TOML.
//! 2. **[`controls`]**: parse definitions and orchestrate runs over groups.
//! 3. **[`check`]**: resolve sub-checks by [`constraints`] and decide a
//!    check's [`state::State`].
//! 4. **[`audit`]**: pluggable [`audit::Auditer`] producers (shell,
//!    `text_search`, `file_search`).
//! 5. **[`eval`]**: flag extraction, comparison operators and test sets.
//! 6. **[`output`]**: format results as pretty text, JSON, or [SARIF].
//!
//! ## Comparison operators
//!
//! | Operator | Passes when |
//! |----------|-------------|
//! | `eq` / `noteq` | value equals / differs (booleans case-insensitive) |
//! | `gt` `gte` `lt` `lte` | integer comparison |
//! | `has` / `nothave` | value contains / lacks a substring |
//! | `regex` | regex matches the value |
//! | `valid_elements` | every comma-separated element is allowed |
//! | `bitmask` | octal permission is at most as permissive |
//!
//! [SARIF]: https://sarifweb.azurewebsites.net/

pub mod audit;
pub mod check;
pub mod config;
pub mod constraints;
pub mod controls;
pub mod eval;
pub mod output;
pub mod state;
