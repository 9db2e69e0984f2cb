// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Parsed Command
//!
//! One element of a command plan: a resolved name, positional arguments,
//! parsed flags, and the raw segment text it came from.
//!
//! ## Flag Rules
//!
//! - `--key=value` stores `key → value`
//! - `--key` stores `key → true`
//! - `-abc` expands into the three boolean short flags `a`, `b`, `c`
//! - quoted tokens preserve internal whitespace and arrive unquoted
//!
//! The flags map is immutable once the parser emits it; there is no
//! post-parse mutation anywhere in the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed flag value: either a boolean presence flag or a string payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Str(String),
}

impl FlagValue {
    /// Gets the boolean payload if present
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the string payload if present
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagValue::Bool(v) => write!(f, "{}", v),
            FlagValue::Str(v) => write!(f, "{}", v),
        }
    }
}

/// One command of a plan: name, positional args, flags, background marker,
/// and the raw text of the segment it was parsed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommand {
    name: String,
    args: Vec<String>,
    flags: BTreeMap<String, FlagValue>,
    background: bool,
    raw: String,
}

impl ParsedCommand {
    /// Creates a new parsed command
    pub fn new(
        name: impl Into<String>,
        args: Vec<String>,
        flags: BTreeMap<String, FlagValue>,
        background: bool,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            args,
            flags,
            background,
            raw: raw.into(),
        }
    }

    /// Gets the command name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the positional arguments
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Gets the parsed flags
    pub fn flags(&self) -> &BTreeMap<String, FlagValue> {
        &self.flags
    }

    /// Checks whether the command was marked to run in the background
    pub fn background(&self) -> bool {
        self.background
    }

    /// Gets the raw segment text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Checks whether a flag is present
    pub fn has_flag(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    /// Gets a flag's string payload, if the flag carries one
    pub fn flag_str(&self, key: &str) -> Option<&str> {
        self.flags.get(key).and_then(FlagValue::as_str)
    }

    /// Returns a copy with the name replaced, keeping args/flags/raw.
    ///
    /// Used by alias resolution, which substitutes only the command name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: self.args.clone(),
            flags: self.flags.clone(),
            background: self.background,
            raw: self.raw.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(pairs: &[(&str, FlagValue)]) -> BTreeMap<String, FlagValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_flag_accessors() {
        let cmd = ParsedCommand::new(
            "ls",
            vec!["src".into()],
            flags(&[
                ("all", FlagValue::Bool(true)),
                ("color", FlagValue::Str("auto".into())),
            ]),
            false,
            "ls src --all --color=auto",
        );
        assert!(cmd.has_flag("all"));
        assert_eq!(cmd.flag_str("color"), Some("auto"));
        assert_eq!(cmd.flag_str("all"), None);
        assert!(!cmd.background());
    }

    #[test]
    fn test_with_name_keeps_everything_else() {
        let cmd = ParsedCommand::new("ll", vec!["-l".into()], BTreeMap::new(), true, "ll -l &");
        let resolved = cmd.with_name("ls");
        assert_eq!(resolved.name(), "ls");
        assert_eq!(resolved.args(), cmd.args());
        assert_eq!(resolved.raw(), cmd.raw());
        assert!(resolved.background());
    }
}
