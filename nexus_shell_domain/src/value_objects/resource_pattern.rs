// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource Pattern
//!
//! Anchored glob patterns over permission keys in the
//! `<action>:<resource>` wire format, e.g. `fs:read:/var/log/**` or
//! `proc:kill:*`.
//!
//! ## Matching Rules
//!
//! - `*` matches any run of characters that does not cross a separator
//!   (`:` or `/`)
//! - `**` matches any run of characters, separators included
//! - every other character matches literally
//! - matches are anchored at both ends and greedy
//!
//! Patterns compile to a [`regex::Regex`] once at construction; matching is
//! a single regex test thereafter.

use crate::error::ShellError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A compiled, anchored glob pattern over permission keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePattern {
    pattern: String,
    #[serde(skip)]
    compiled: Option<Regex>,
}

impl ResourcePattern {
    /// Compiles a new resource pattern
    pub fn new(pattern: impl Into<String>) -> Result<Self, ShellError> {
        let pattern = pattern.into();
        let compiled = Some(Self::compile(&pattern)?);
        Ok(Self { pattern, compiled })
    }

    fn compile(pattern: &str) -> Result<Regex, ShellError> {
        let mut regex = String::with_capacity(pattern.len() * 2 + 2);
        regex.push('^');
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        regex.push_str(".*");
                    } else {
                        regex.push_str("[^:/]*");
                    }
                }
                c if regex_syntax_char(c) => {
                    regex.push('\\');
                    regex.push(c);
                }
                c => regex.push(c),
            }
        }
        regex.push('$');
        Regex::new(&regex)
            .map_err(|e| ShellError::invalid_argument(format!("bad resource pattern '{}': {}", pattern, e)))
    }

    /// Gets the source pattern text
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Checks whether the pattern contains a glob metacharacter
    pub fn is_wildcard(&self) -> bool {
        self.pattern.contains('*')
    }

    /// Tests a permission key against the pattern
    pub fn matches(&self, key: &str) -> bool {
        match &self.compiled {
            Some(re) => re.is_match(key),
            // Deserialized instance; fall back to a fresh compile.
            None => Self::compile(&self.pattern)
                .map(|re| re.is_match(key))
                .unwrap_or(false),
        }
    }
}

impl PartialEq for ResourcePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for ResourcePattern {}

impl std::fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

fn regex_syntax_char(c: char) -> bool {
    matches!(
        c,
        '.' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pat(p: &str) -> ResourcePattern {
        ResourcePattern::new(p).unwrap()
    }

    #[test]
    fn test_exact_match_is_anchored() {
        let p = pat("fs:read:/etc/hosts");
        assert!(p.matches("fs:read:/etc/hosts"));
        assert!(!p.matches("fs:read:/etc/hosts.bak"));
        assert!(!p.matches("xfs:read:/etc/hosts"));
    }

    #[test]
    fn test_single_star_stops_at_separators() {
        let p = pat("fs:read:/var/log/*");
        assert!(p.matches("fs:read:/var/log/syslog"));
        assert!(!p.matches("fs:read:/var/log/nginx/access.log"));

        let action = pat("fs:*:/tmp/scratch");
        assert!(action.matches("fs:write:/tmp/scratch"));
        assert!(!action.matches("fs:read:extra:/tmp/scratch"));
    }

    #[test]
    fn test_double_star_crosses_separators() {
        let p = pat("fs:read:/var/log/**");
        assert!(p.matches("fs:read:/var/log/nginx/access.log"));
        assert!(p.matches("fs:read:/var/log/syslog"));
        assert!(!p.matches("fs:write:/var/log/syslog"));

        let all = pat("**");
        assert!(all.matches("net:http:api.example.com"));
    }

    #[test]
    fn test_literal_metacharacters_are_escaped() {
        let p = pat("fs:read:/srv/data.v1/(staging)");
        assert!(p.matches("fs:read:/srv/data.v1/(staging)"));
        assert!(!p.matches("fs:read:/srv/dataXv1/(staging)"));
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(pat("fs:read:*").is_wildcard());
        assert!(!pat("proc:kill:1234").is_wildcard());
    }

    proptest::proptest! {
        // A star-free pattern matches exactly itself, regardless of any
        // regex metacharacters it contains.
        #[test]
        fn literal_patterns_match_only_themselves(
            key in "[a-z]{1,6}:[a-z]{1,6}:[a-zA-Z0-9/._()+?$^-]{1,16}",
            other in "[a-z]{1,6}:[a-z]{1,6}:[a-zA-Z0-9/._()+?$^-]{1,16}",
        ) {
            let p = pat(&key);
            proptest::prop_assert!(p.matches(&key));
            if other != key {
                proptest::prop_assert!(!p.matches(&other));
            }
        }

        #[test]
        fn double_star_suffix_covers_any_extension(
            base in "[a-z]{1,6}:[a-z]{1,6}:/[a-z]{1,8}",
            rest in "[a-z/.]{0,16}",
        ) {
            let p = pat(&format!("{}/**", base));
            proptest::prop_assert!(p.matches(&format!("{}/{}", base, rest)), "double-star suffix should match extension");
        }
    }
}
