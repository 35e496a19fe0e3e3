//! Configuration loading and management.
//!
//! The runner reads an optional TOML file, `oxidized-bench.toml` in the
//! current working directory by default. Every section and field has a
//! default, so the file can be omitted entirely:
//!
//! ```toml
//! [audit]
//! timeout_secs = 60        # 0 waits forever
//! workspace = "/mnt/image" # root for text_search / file_search audits
//! shell = "/bin/bash"
//!
//! [constraints]
//! define = ["platform=ubuntu", "boot=grub"]
//!
//! [output]
//! no_remediations = false
//! include_test_output = true
//!
//! [custom]
//! cluster = "prod"
//! ```
//!
//! Command-line flags override values loaded from the file.

use crate::audit::{AuditContext, DEFAULT_TIMEOUT};
use crate::constraints::DefinedConstraints;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "oxidized-bench.toml";

/// Errors raised while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Main configuration for a benchmark run.
///
/// # Examples
///
/// ```rust,no_run
/// use oxidized_bench::config::Config;
///
/// // Load from the default location or fall back to built-in defaults.
/// let config = Config::load(None).unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    pub audit: AuditConfig,
    pub constraints: ConstraintsConfig,
    pub output: OutputConfig,
    /// Free-form settings forwarded to every audit producer.
    pub custom: BTreeMap<String, String>,
}

/// How audits are executed.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Per-audit timeout in seconds; `0` disables the timeout.
    pub timeout_secs: u64,
    /// Root directory search audits are confined to.
    pub workspace: PathBuf,
    /// Shell used for command audits.
    pub shell: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            workspace: PathBuf::from("/"),
            shell: PathBuf::from("/bin/sh"),
        }
    }
}

/// Environment description used to select sub-checks and skip groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ConstraintsConfig {
    /// `key=value` entries, e.g. `"platform=ubuntu"`.
    pub define: Vec<String>,
}

/// Report options.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Leave the remediation section out of reports.
    pub no_remediations: bool,
    /// Print the raw audit output of failing checks.
    pub include_test_output: bool,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// Resolution order:
    /// 1. If `path` is `Some`, load from that file (error if missing).
    /// 2. If `path` is `None`, try `oxidized-bench.toml` in the current directory.
    /// 3. If that file does not exist either, return [`Config::default()`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the explicit path does not exist, the
    /// file cannot be read, or the TOML content fails to parse.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use std::path::Path;
    /// use oxidized_bench::config::Config;
    ///
    /// // Explicit path
    /// let cfg = Config::load(Some(Path::new("my-config.toml")))?;
    ///
    /// // Auto-detect or default
    /// let cfg = Config::load(None)?;
    /// # Ok::<(), oxidized_bench::config::ConfigError>(())
    /// ```
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let config_path = match path {
            Some(p) if p.exists() => Some(p.to_path_buf()),
            Some(p) => return Err(ConfigError::NotFound(p.to_path_buf())),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                default_path.exists().then(|| default_path.to_path_buf())
            }
        };

        match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|source| {
                    ConfigError::Read {
                        path: path.clone(),
                        source,
                    }
                })?;
                Self::from_toml(&content).map_err(|source| ConfigError::Parse { path, source })
            }
            None => Ok(Config::default()),
        }
    }

    /// Parses configuration from TOML text.
    ///
    /// # Examples
    ///
    /// ```
    /// use oxidized_bench::config::Config;
    ///
    /// let config = Config::from_toml("[audit]\ntimeout_secs = 5\n").unwrap();
    /// assert_eq!(config.audit.timeout_secs, 5);
    /// assert_eq!(config.audit.shell.to_str(), Some("/bin/sh"));
    /// ```
    pub fn from_toml(content: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(content)
    }

    /// The per-audit timeout, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.audit.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Builds the context handed to audit producers.
    pub fn audit_context(&self) -> AuditContext {
        AuditContext {
            timeout: self.timeout(),
            workspace: self.audit.workspace.clone(),
            shell: self.audit.shell.clone(),
            custom: self.custom.clone(),
        }
    }

    /// Parses `[constraints] define` together with `extra` entries (typically
    /// from `--define` flags).
    pub fn defined_constraints<S: AsRef<str>>(&self, extra: &[S]) -> DefinedConstraints {
        DefinedConstraints::parse(
            self.constraints
                .define
                .iter()
                .map(String::as_str)
                .chain(extra.iter().map(AsRef::<str>::as_ref)),
        )
    }
}
