//! Runtime environment constraints.
//!
//! A [`DefinedConstraints`] value describes the environment the benchmark is
//! running on, e.g. `platform -> {ubuntu}`, `boot -> {grub}`. It is built once
//! per invocation from a flat list of `key=value` strings and then used to pick
//! environment-specific sub-checks and to skip groups that do not apply.
//!
//! # Matching rule
//!
//! A declared constraint map is satisfied when, for **every** declared key:
//!
//! - the key is defined for this run, and
//! - **at least one** of the declared values is among the defined values
//!   (a key declared with no values only requires the key to be defined).
//!
//! An empty declared map is always satisfied.

use log::warn;
use std::collections::{BTreeMap, BTreeSet};

/// Constraint declarations as they appear in a definition document:
/// key → ordered list of acceptable values.
pub type ConstraintMap = BTreeMap<String, Vec<String>>;

/// The caller-supplied description of the actual runtime environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DefinedConstraints {
    values: BTreeMap<String, BTreeSet<String>>,
}

impl DefinedConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a list of `key=value` definitions.
    ///
    /// Entries that are not exactly one `=` with a non-empty key and value are
    /// ignored with a warning. Repeated keys accumulate values.
    ///
    /// # Examples
    ///
    /// ```
    /// use oxidized_bench::constraints::DefinedConstraints;
    ///
    /// let defined = DefinedConstraints::parse(["platform=ubuntu", "boot=grub", "junk"]);
    /// assert!(defined.contains("platform", "ubuntu"));
    /// assert!(!defined.is_defined("junk"));
    /// ```
    pub fn parse<I, S>(definitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut defined = Self::new();
        for raw in definitions {
            let raw = raw.as_ref();
            let parts: Vec<&str> = raw.split('=').collect();
            match parts.as_slice() {
                [key, value] if !key.is_empty() && !value.is_empty() => {
                    defined.insert(*key, *value);
                }
                _ => warn!("failed to parse defined constraint '{raw}'"),
            }
        }
        defined
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .entry(key.into())
            .or_default()
            .insert(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_defined(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|vals| !vals.is_empty())
    }

    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.values.get(key).is_some_and(|vals| vals.contains(value))
    }

    /// Returns `true` when a single declared key is compatible with this
    /// environment.
    pub fn is_key_compatible(&self, key: &str, declared: &[String]) -> bool {
        let Some(defined) = self.values.get(key).filter(|vals| !vals.is_empty()) else {
            return false;
        };
        declared.is_empty() || declared.iter().any(|val| defined.contains(val))
    }

    /// Returns `true` when every key of `declared` is compatible.
    pub fn satisfies(&self, declared: &ConstraintMap) -> bool {
        declared
            .iter()
            .all(|(key, vals)| self.is_key_compatible(key, vals))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for DefinedConstraints
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut defined = Self::new();
        for (k, v) in iter {
            defined.insert(k, v);
        }
        defined
    }
}
