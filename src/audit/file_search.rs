//! `file_search` audits: `find`-like filesystem search.
//!
//! ```yaml
//! audit_type: file_search
//! audit:
//!   path: /etc/kubernetes
//!   searchTerm: .conf
//!   searchType: hasSuffix
//!   fileType: file
//!   perm: /022
//!   count: true
//! ```
//!
//! Every entry under `path` that satisfies all filters is reported as one
//! line, rooted at the workspace (`/etc/kubernetes/admin.conf`). Symbolic
//! links are reported, never followed.
//!
//! `perm` follows `find -perm`: `-NNN` requires all bits, `/NNN` any bit and a
//! bare `NNN` the exact mode (setuid/setgid/sticky included when four digits
//! are given).

use super::{
    count_output, resolve_in_workspace, AuditContext, AuditError, AuditOutput, Auditer, SearchType,
};
use crate::state::State;
use serde::Deserialize;
use std::fs::Metadata;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

pub const AUDIT_TYPE: &str = "file_search";

/// `fileType` filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Directory,
    #[serde(alias = "symblink")]
    Symlink,
    File,
    #[default]
    #[serde(other)]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermMode {
    Exact,
    AllBits,
    AnyBits,
}

/// A parsed `perm` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermFilter {
    pub mode: PermMode,
    pub bits: u32,
}

impl PermFilter {
    /// Parses `NNN`, `-NNN` or `/NNN` with three or four octal digits.
    ///
    /// # Examples
    ///
    /// ```
    /// use oxidized_bench::audit::file_search::{PermFilter, PermMode};
    ///
    /// let perm = PermFilter::parse("/022").unwrap();
    /// assert_eq!(perm.mode, PermMode::AnyBits);
    /// assert_eq!(perm.bits, 0o022);
    /// assert!(PermFilter::parse("64").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<PermFilter, String> {
        let (mode, digits) = if let Some(rest) = raw.strip_prefix('-') {
            (PermMode::AllBits, rest)
        } else if let Some(rest) = raw.strip_prefix('/') {
            (PermMode::AnyBits, rest)
        } else {
            (PermMode::Exact, raw)
        };

        if !(3..=4).contains(&digits.len()) {
            return Err(format!("invalid permission format '{raw}'"));
        }
        let bits = u32::from_str_radix(digits, 8)
            .map_err(|e| format!("invalid permission '{raw}': {e}"))?;
        Ok(PermFilter { mode, bits })
    }

    pub fn matches(&self, mode: u32) -> bool {
        let mode = mode & 0o7777;
        match self.mode {
            PermMode::Exact => mode == self.bits,
            PermMode::AllBits => mode & self.bits == self.bits,
            PermMode::AnyBits => self.bits == 0 || mode & self.bits != 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Args {
    path: String,
    #[serde(deserialize_with = "crate::eval::scalar_string")]
    search_term: String,
    search_type: SearchType,
    file_type: FileType,
    #[serde(deserialize_with = "crate::eval::scalar_string")]
    perm: String,
    user_id: Option<u32>,
    group_id: Option<u32>,
    count: bool,
}

/// A validated `file_search` audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSearch {
    pub path: String,
    pub search_term: String,
    pub search_type: SearchType,
    pub file_type: FileType,
    pub perm: Option<PermFilter>,
    pub user_id: Option<u32>,
    pub group_id: Option<u32>,
    pub count: bool,
}

impl FileSearch {
    fn accepts(&self, name: &str, file_type: std::fs::FileType, meta: &Metadata) -> bool {
        if !self.search_term.is_empty() && !self.search_type.matches(name, &self.search_term) {
            return false;
        }

        let type_ok = match self.file_type {
            FileType::Directory => file_type.is_dir(),
            FileType::Symlink => file_type.is_symlink(),
            FileType::File => file_type.is_file(),
            FileType::All => true,
        };
        if !type_ok {
            return false;
        }

        let (mode, uid, gid) = mode_and_owner(meta);
        if self.perm.is_some_and(|perm| !perm.matches(mode)) {
            return false;
        }
        if self.user_id.is_some_and(|id| id != uid) {
            return false;
        }
        if self.group_id.is_some_and(|id| id != gid) {
            return false;
        }
        true
    }
}

impl Auditer for FileSearch {
    fn execute(&self, ctx: &AuditContext) -> AuditOutput {
        let root = match resolve_in_workspace(&ctx.workspace, &self.path) {
            Ok(root) => root,
            Err(reason) => {
                return AuditOutput::decided(State::Fail, "", format!("{AUDIT_TYPE}: {reason}"))
            }
        };
        let workspace =
            resolve_in_workspace(&ctx.workspace, "").unwrap_or_else(|_| ctx.workspace.clone());

        let mut found = Vec::new();
        for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    return AuditOutput::decided(State::Fail, "", format!("{AUDIT_TYPE}: {e}"))
                }
            };
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    return AuditOutput::decided(State::Fail, "", format!("{AUDIT_TYPE}: {e}"))
                }
            };
            let name = entry.file_name().to_string_lossy();
            if self.accepts(&name, entry.file_type(), &meta) {
                found.push(workspace_path(&workspace, entry.path()));
            }
        }

        if self.count {
            AuditOutput::ok(count_output(found.len()))
        } else {
            AuditOutput::ok(found.iter().map(|p| format!("{p}\n")).collect::<String>())
        }
    }
}

/// Renders `path` as an absolute path inside the workspace.
fn workspace_path(workspace: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(workspace).unwrap_or(path);
    Path::new("/").join(relative).display().to_string()
}

#[cfg(unix)]
fn mode_and_owner(meta: &Metadata) -> (u32, u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (meta.mode(), meta.uid(), meta.gid())
}

#[cfg(not(unix))]
fn mode_and_owner(_meta: &Metadata) -> (u32, u32, u32) {
    (0, 0, 0)
}

/// Builds a [`FileSearch`] from a mapping descriptor.
pub fn from_descriptor(descriptor: &serde_yaml::Value) -> Result<Arc<dyn Auditer>, AuditError> {
    let args: Args = serde_yaml::from_value(descriptor.clone())
        .map_err(|e| AuditError::invalid(AUDIT_TYPE, e))?;

    let perm = if args.perm.is_empty() {
        None
    } else {
        Some(PermFilter::parse(&args.perm).map_err(|e| AuditError::invalid(AUDIT_TYPE, e))?)
    };

    Ok(Arc::new(FileSearch {
        path: args.path,
        search_term: args.search_term,
        search_type: args.search_type,
        file_type: args.file_type,
        perm,
        user_id: args.user_id,
        group_id: args.group_id,
        count: args.count,
    }))
}
