// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Parsed Input Plan
//!
//! The parser's output for one input line: the detected mode, the parsed
//! commands (for traditional pipelines), and the script text (for scripted
//! evaluation).
//!
//! A pipeline whose segments mix traditional and scripted syntax is promoted
//! to a fully scripted plan with `script = original` - the engine never
//! splices values across a `|` boundary between the two evaluation models.
//! `Mixed` is therefore a classification verdict, not a final plan mode: the
//! parser emits `Traditional` or `Scripted` plans only.

use crate::value_objects::parsed_command::ParsedCommand;
use serde::{Deserialize, Serialize};

/// Input classification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Tokenised command pipeline
    Traditional,
    /// Scripted expression for the embedded evaluator
    Scripted,
    /// Pipeline mixing both syntaxes; promoted to `Scripted` before a plan
    /// is emitted
    Mixed,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputMode::Traditional => write!(f, "traditional"),
            InputMode::Scripted => write!(f, "scripted"),
            InputMode::Mixed => write!(f, "mixed"),
        }
    }
}

/// The structured command plan for one raw input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedInput {
    original: String,
    mode: InputMode,
    commands: Vec<ParsedCommand>,
    script: Option<String>,
}

impl ParsedInput {
    /// Creates a traditional plan from parsed pipeline commands
    pub fn traditional(original: impl Into<String>, commands: Vec<ParsedCommand>) -> Self {
        Self {
            original: original.into(),
            mode: InputMode::Traditional,
            commands,
            script: None,
        }
    }

    /// Creates a scripted plan whose script is the whole original line
    pub fn scripted(original: impl Into<String>) -> Self {
        let original = original.into();
        let script = original.clone();
        Self {
            original,
            mode: InputMode::Scripted,
            commands: Vec::new(),
            script: Some(script),
        }
    }

    /// Gets the original raw line
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Gets the detected mode
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Gets the parsed commands (empty for scripted plans)
    pub fn commands(&self) -> &[ParsedCommand] {
        &self.commands
    }

    /// Gets the script text (present only for scripted plans)
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    /// Checks whether the plan is a multi-stage pipeline
    pub fn is_pipeline(&self) -> bool {
        self.commands.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_scripted_plan_carries_original_as_script() {
        let plan = ParsedInput::scripted("fs.listDir(\".\")");
        assert_eq!(plan.mode(), InputMode::Scripted);
        assert_eq!(plan.script(), Some("fs.listDir(\".\")"));
        assert!(plan.commands().is_empty());
    }

    #[test]
    fn test_traditional_plan_pipeline_detection() {
        let cmd = |name: &str| ParsedCommand::new(name, vec![], BTreeMap::new(), false, name);
        let single = ParsedInput::traditional("ls", vec![cmd("ls")]);
        assert!(!single.is_pipeline());

        let piped = ParsedInput::traditional("ls | wc", vec![cmd("ls"), cmd("wc")]);
        assert!(piped.is_pipeline());
        assert_eq!(piped.mode(), InputMode::Traditional);
    }
}
