//! Flag value extraction from free-form command output.
//!
//! Command output comes in many shapes (`--flag=value`, `key: value`,
//! `Key value`, a bare `--flag`). [`extract`] tries a fixed list of patterns
//! from most to least specific and returns the first non-empty capture:
//!
//! 1. `flag` + `=`/`:` + a double-quoted string → the quoted content.
//! 2. `flag` + `=`/`:` + an unquoted token → the token.
//! 3. `flag` + whitespace + a token not starting with `-` → the token.
//! 4. the bare `flag` as a whole word → the flag itself (presence signal).
//!
//! Every pattern requires the flag to start at the beginning of the line or
//! after whitespace, so `User` never matches inside `someJunkUser`.

use regex::Regex;

/// Characters that continue a flag name; a flag followed or preceded by one
/// of these is part of a larger token.
const WORD_CHARS: &str = "a-zA-Z0-9_-";

/// Extracts the value associated with `flag` in `line`.
///
/// Returns the whole line when `flag` is empty and an empty string when
/// nothing matches.
///
/// # Examples
///
/// ```
/// use oxidized_bench::eval::flag::extract;
///
/// assert_eq!(extract("XXX: User=root XXX", "User"), "root");
/// assert_eq!(extract("--flag", "--flag"), "--flag");
/// assert_eq!(extract("XXX: someJunkUser=root XXX", "User"), "");
/// ```
pub fn extract(line: &str, flag: &str) -> String {
    if flag.is_empty() {
        return line.to_string();
    }

    let f = regex::escape(flag);
    let patterns = [
        format!(r#"(?:^|\s+)"?{f}"?\s*[=:][\r\t\f\v ]*"(.*)""#),
        format!(r#"(?:^|\s+)"?{f}"?\s*[=:][\r\t\f\v ]*(\S*)"#),
        format!(r#"(?:^|\s+)"?{f}"?\s+([^-\s]+)"#),
        format!(r"(?:^|\s+)({f})(?:\s|$)"),
    ];

    for pattern in &patterns {
        // The flag is escaped, so every pattern is well-formed.
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(caps) = re.captures(line) {
            let value = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .find(|v| !v.is_empty());
            if let Some(value) = value {
                return value.to_string();
            }
        }
    }

    String::new()
}

/// Returns `true` when `flag` occurs in `text` as a whole word.
///
/// # Examples
///
/// ```
/// use oxidized_bench::eval::flag::is_present;
///
/// assert!(is_present("--anonymous-auth=false", "--anonymous-auth"));
/// assert!(!is_present("someJunkUser", "User"));
/// ```
pub fn is_present(text: &str, flag: &str) -> bool {
    let pattern = format!(
        r"(?:^|[^{WORD_CHARS}]){}(?:[^{WORD_CHARS}]|$)",
        regex::escape(flag)
    );
    Regex::new(&pattern).is_ok_and(|re| re.is_match(text))
}
