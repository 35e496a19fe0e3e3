//! Pluggable audit producers.
//!
//! An audit is whatever produces the raw text a check's tests run against.
//! Every producer implements the [`Auditer`] trait and is created from the
//! `audit` descriptor of a check when the definitions are loaded.
//!
//! | `audit_type` | Producer | Descriptor |
//! |--------------|----------|------------|
//! | `""` / `audit` | [`shell::ShellAudit`] | a shell command string |
//! | `text_search` | [`text_search::TextSearch`] | mapping: `path`, `searchTerm`, `searchType`, `count` |
//! | `file_search` | [`file_search::FileSearch`] | mapping: `path`, `searchTerm`, `searchType`, `fileType`, `perm`, `userId`, `groupId`, `count` |
//!
//! Additional producers are added with [`AuditRegistry::register`].

pub mod file_search;
pub mod shell;
pub mod text_search;

use crate::state::State;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Audit type key of the default shell producer.
pub const SHELL_AUDIT_TYPE: &str = "audit";

/// Default per-audit timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A producer of raw audit output.
///
/// Implementers **must** be [`Send`] + [`Sync`]: loaded definitions share
/// producers between cloned checks.
///
/// # Implementing a custom producer
///
/// ```rust
/// use oxidized_bench::audit::{AuditContext, AuditOutput, Auditer};
///
/// #[derive(Debug)]
/// struct Fixed(String);
///
/// impl Auditer for Fixed {
///     fn execute(&self, _ctx: &AuditContext) -> AuditOutput {
///         AuditOutput::ok(self.0.clone())
///     }
/// }
///
/// let out = Fixed("--anonymous-auth=false".into()).execute(&AuditContext::default());
/// assert_eq!(out.output, "--anonymous-auth=false");
/// assert!(out.state.is_none());
/// ```
pub trait Auditer: Send + Sync + fmt::Debug {
    /// Produces the audit output.
    ///
    /// A producer that already knows the verdict (e.g. the audit could not
    /// run at all) sets [`AuditOutput::state`]; the check then adopts it and
    /// skips its tests.
    fn execute(&self, ctx: &AuditContext) -> AuditOutput;
}

/// Shared runtime settings handed to every [`Auditer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    /// Upper bound for one audit; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Root directory that search audits are confined to.
    pub workspace: PathBuf,
    /// Shell used for command audits.
    pub shell: PathBuf,
    /// Free-form settings from the `[custom]` configuration table.
    pub custom: BTreeMap<String, String>,
}

impl Default for AuditContext {
    fn default() -> Self {
        AuditContext {
            timeout: Some(DEFAULT_TIMEOUT),
            workspace: PathBuf::from("/"),
            shell: PathBuf::from("/bin/sh"),
            custom: BTreeMap::new(),
        }
    }
}

/// What an [`Auditer`] produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOutput {
    /// Raw text the tests run against.
    pub output: String,
    /// Advisory error message.
    pub error: Option<String>,
    /// A verdict forced by the producer.
    pub state: Option<State>,
}

impl AuditOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        AuditOutput {
            output: output.into(),
            ..AuditOutput::default()
        }
    }

    /// Output accompanied by an advisory error; the tests still decide.
    pub fn with_error(output: impl Into<String>, error: impl Into<String>) -> Self {
        AuditOutput {
            output: output.into(),
            error: Some(error.into()),
            state: None,
        }
    }

    /// A producer-decided verdict.
    pub fn decided(state: State, output: impl Into<String>, error: impl Into<String>) -> Self {
        AuditOutput {
            output: output.into(),
            error: Some(error.into()),
            state: Some(state),
        }
    }
}

/// Errors raised while registering or constructing producers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    #[error("audit type '{0}' already registered")]
    DuplicateType(String),

    #[error("audit type '{0}' is not registered")]
    UnknownType(String),

    #[error("invalid '{audit_type}' audit: {reason}")]
    InvalidDescriptor { audit_type: String, reason: String },
}

impl AuditError {
    pub(crate) fn invalid(audit_type: &str, reason: impl fmt::Display) -> Self {
        AuditError::InvalidDescriptor {
            audit_type: audit_type.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Builds a producer from the raw `audit` descriptor of a check.
pub type AuditConstructor = fn(&serde_yaml::Value) -> Result<Arc<dyn Auditer>, AuditError>;

/// Maps `audit_type` keys to producer constructors.
///
/// The shell producer is always available under `""` and `"audit"` and
/// cannot be replaced.
#[derive(Clone, Default)]
pub struct AuditRegistry {
    constructors: BTreeMap<String, AuditConstructor>,
}

impl fmt::Debug for AuditRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditRegistry")
            .field("types", &self.types())
            .finish()
    }
}

impl AuditRegistry {
    /// A registry with only the shell producer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in producer.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.constructors.insert(
            text_search::AUDIT_TYPE.to_string(),
            text_search::from_descriptor,
        );
        registry.constructors.insert(
            file_search::AUDIT_TYPE.to_string(),
            file_search::from_descriptor,
        );
        registry
    }

    /// Registers a constructor under `audit_type`.
    ///
    /// # Errors
    ///
    /// [`AuditError::DuplicateType`] if the key is already taken.
    pub fn register(
        &mut self,
        audit_type: impl Into<String>,
        constructor: AuditConstructor,
    ) -> Result<(), AuditError> {
        let audit_type = audit_type.into();
        if is_shell_type(&audit_type) || self.constructors.contains_key(&audit_type) {
            return Err(AuditError::DuplicateType(audit_type));
        }
        self.constructors.insert(audit_type, constructor);
        Ok(())
    }

    pub fn contains(&self, audit_type: &str) -> bool {
        is_shell_type(audit_type) || self.constructors.contains_key(audit_type)
    }

    /// Every usable `audit_type` key, the shell producer first.
    pub fn types(&self) -> Vec<&str> {
        std::iter::once(SHELL_AUDIT_TYPE)
            .chain(self.constructors.keys().map(String::as_str))
            .collect()
    }

    /// Builds the producer for one descriptor.
    ///
    /// # Errors
    ///
    /// [`AuditError::UnknownType`] for an unregistered key, or whatever the
    /// constructor reports for a malformed descriptor.
    pub fn build(
        &self,
        audit_type: &str,
        descriptor: &serde_yaml::Value,
    ) -> Result<Arc<dyn Auditer>, AuditError> {
        if is_shell_type(audit_type) {
            return shell::from_descriptor(descriptor);
        }
        let constructor = self
            .constructors
            .get(audit_type)
            .ok_or_else(|| AuditError::UnknownType(audit_type.to_string()))?;
        constructor(descriptor)
    }
}

fn is_shell_type(audit_type: &str) -> bool {
    audit_type.is_empty() || audit_type == SHELL_AUDIT_TYPE
}

/// Name filter shared by the search producers (`searchType`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SearchType {
    /// Case-insensitive equality.
    #[serde(rename = "exact")]
    Exact,
    #[default]
    #[serde(rename = "contains", alias = "")]
    Contains,
    #[serde(rename = "hasPrefix")]
    HasPrefix,
    #[serde(rename = "hasSuffix")]
    HasSuffix,
}

impl SearchType {
    pub fn matches(&self, candidate: &str, term: &str) -> bool {
        match self {
            SearchType::Exact => candidate.to_lowercase() == term.to_lowercase(),
            SearchType::Contains => candidate.contains(term),
            SearchType::HasPrefix => candidate.starts_with(term),
            SearchType::HasSuffix => candidate.ends_with(term),
        }
    }
}

/// Joins `relative` onto `workspace` and rejects results outside it.
///
/// The join is lexical: `..` components are resolved without touching the
/// filesystem, so `../../etc/passwd` is caught even if it does not exist.
pub fn resolve_in_workspace(workspace: &Path, relative: &str) -> Result<PathBuf, String> {
    let root = normalize(workspace);
    let relative = relative.trim_start_matches('/');
    let joined = normalize(&root.join(relative));
    if joined.starts_with(&root) {
        Ok(joined)
    } else {
        Err(format!(
            "relative path '{}' escapes the workspace '{}'",
            relative,
            root.display()
        ))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Renders match counts the way `count: true` audits report them.
pub(crate) fn count_output(count: usize) -> String {
    format!("{count}\n")
}
