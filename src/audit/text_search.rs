//! `text_search` audits: grep-like word search in one file.
//!
//! ```yaml
//! audit_type: text_search
//! audit:
//!   path: /etc/ssh/sshd_config
//!   searchTerm: PermitRootLogin
//!   searchType: hasPrefix
//! ```
//!
//! A line matches when any of its whitespace-separated words satisfies the
//! filter. The output is the matching lines, or their number with
//! `count: true`. A file that cannot be read, a path outside the workspace
//! and an empty result all fail the check directly.

use super::{
    count_output, resolve_in_workspace, AuditContext, AuditError, AuditOutput, Auditer, SearchType,
};
use crate::state::State;
use serde::Deserialize;
use std::fs;
use std::sync::Arc;

pub const AUDIT_TYPE: &str = "text_search";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextSearch {
    /// File to search, relative to the workspace.
    pub path: String,
    #[serde(deserialize_with = "crate::eval::scalar_string")]
    pub search_term: String,
    pub search_type: SearchType,
    pub count: bool,
}

impl TextSearch {
    fn fail(&self, reason: impl Into<String>) -> AuditOutput {
        AuditOutput::decided(State::Fail, "", format!("{AUDIT_TYPE}: {}", reason.into()))
    }
}

impl Auditer for TextSearch {
    fn execute(&self, ctx: &AuditContext) -> AuditOutput {
        let file = match resolve_in_workspace(&ctx.workspace, &self.path) {
            Ok(file) => file,
            Err(reason) => return self.fail(reason),
        };

        let meta = match fs::symlink_metadata(&file) {
            Ok(meta) => meta,
            Err(e) => return self.fail(format!("{}: {e}", file.display())),
        };

        if meta.file_type().is_symlink() {
            // The link target must stay inside the workspace too.
            let root = fs::canonicalize(&ctx.workspace).unwrap_or_else(|_| ctx.workspace.clone());
            match fs::canonicalize(&file) {
                Ok(target) if target.starts_with(&root) => {}
                Ok(target) => {
                    return self.fail(format!(
                        "symbolic link {} refers to {}, outside the workspace",
                        file.display(),
                        target.display()
                    ))
                }
                Err(e) => return self.fail(format!("{}: {e}", file.display())),
            }
        } else if !meta.is_file() {
            return self.fail(format!("invalid file {}", file.display()));
        }

        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(format!("unable to open file {}: {e}", file.display())),
        };
        let content = String::from_utf8_lossy(&bytes);

        let matching: Vec<&str> = content
            .lines()
            .filter(|line| {
                line.split_whitespace()
                    .any(|word| self.search_type.matches(word, &self.search_term))
            })
            .collect();

        let output = if self.count {
            count_output(matching.len())
        } else {
            matching.iter().map(|line| format!("{line}\n")).collect()
        };

        if matching.is_empty() {
            return AuditOutput::decided(
                State::Fail,
                output,
                format!("{AUDIT_TYPE}: no results found"),
            );
        }
        AuditOutput::ok(output)
    }
}

/// Builds a [`TextSearch`] from a mapping descriptor.
pub fn from_descriptor(descriptor: &serde_yaml::Value) -> Result<Arc<dyn Auditer>, AuditError> {
    let search: TextSearch = serde_yaml::from_value(descriptor.clone())
        .map_err(|e| AuditError::invalid(AUDIT_TYPE, e))?;
    if search.path.is_empty() {
        return Err(AuditError::invalid(AUDIT_TYPE, "missing 'path'"));
    }
    Ok(Arc::new(search))
}
