// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Parser / Classifier
//!
//! Turns one raw input line into a structured command plan. The parser is
//! the single source of truth for classification, tokenisation, completion
//! candidates, and highlight spans - the terminal UI only renders.
//!
//! ## Pipeline
//!
//! ```text
//! raw line ──► classify ──► (scripted? plan with script = original)
//!                │
//!                └─► split on unquoted `|` ──► classify each segment
//!                        │                        │
//!                        │              any scripted? promote whole plan
//!                        └─► tokenize ──► flag rules ──► ParsedCommand
//! ```
//!
//! A promoted (mixed) plan is fully scripted: the engine never marshals
//! values across a `|` boundary between the two evaluation models.

pub mod classifier;
pub mod completion;
pub mod highlight;
pub mod tokenizer;

pub use completion::completions;
pub use highlight::{highlight, HighlightKind, HighlightSpan};

use nexus_shell_domain::{FlagValue, InputMode, ParsedCommand, ParsedInput, ShellError};
use std::collections::BTreeMap;
use tokenizer::{split_pipeline, tokenize, Token};

/// Parses raw input lines into command plans.
#[derive(Debug, Clone, Default)]
pub struct InputParser {
    known_commands: Vec<String>,
}

impl InputParser {
    /// Creates a parser with no registered command names
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the builtin command names offered by completion
    pub fn set_known_commands(&mut self, names: Vec<String>) {
        self.known_commands = names;
        self.known_commands.sort();
    }

    /// Gets the registered command names
    pub fn known_commands(&self) -> &[String] {
        &self.known_commands
    }

    /// Parses one raw line into a plan.
    ///
    /// Total: every input yields a plan or a `SyntaxError` whose offset
    /// lies within `[0, input.len()]`.
    pub fn parse(&self, input: &str) -> Result<ParsedInput, ShellError> {
        if classifier::classify(input) == InputMode::Scripted {
            return Ok(ParsedInput::scripted(input));
        }

        let segments = split_pipeline(input)?;

        // A single scripted segment promotes the whole plan: no partial
        // evaluation across the pipe.
        if segments
            .iter()
            .any(|s| classifier::classify(&s.text) == InputMode::Scripted)
        {
            return Ok(ParsedInput::scripted(input));
        }

        let mut commands = Vec::with_capacity(segments.len());
        for segment in &segments {
            let tokens = tokenize(&segment.text).map_err(|e| shift_offset(e, segment.offset))?;
            if tokens.is_empty() {
                continue;
            }
            commands.push(build_command(&segment.text, tokens));
        }
        Ok(ParsedInput::traditional(input, commands))
    }

    /// Completion candidates for the word under the cursor
    pub fn completions(&self, line: &str, cursor: usize) -> Vec<String> {
        completions(line, cursor, &self.known_commands)
    }

    /// Highlight spans for one line
    pub fn highlight(&self, line: &str) -> Vec<HighlightSpan> {
        highlight(line)
    }
}

fn shift_offset(err: ShellError, base: usize) -> ShellError {
    match err {
        ShellError::SyntaxError { message, offset } => ShellError::SyntaxError {
            message,
            offset: offset + base,
        },
        other => other,
    }
}

/// Applies the flag rules to a token stream, producing one command.
///
/// - `--k=v` ⇒ `k → v`
/// - `--k` ⇒ `k → true`
/// - `-abc` expands to the boolean short flags `a`, `b`, `c`
/// - quoted tokens are always positional
/// - a trailing unquoted `&` marks the command for background execution
fn build_command(raw: &str, mut tokens: Vec<Token>) -> ParsedCommand {
    let mut background = false;
    if let Some(last) = tokens.last() {
        if !last.quoted && last.text == "&" {
            background = true;
            tokens.pop();
        }
    }

    let mut iter = tokens.into_iter();
    let name = iter.next().map(|t| t.text).unwrap_or_default();
    let mut args = Vec::new();
    let mut flags: BTreeMap<String, FlagValue> = BTreeMap::new();

    for token in iter {
        if token.quoted {
            args.push(token.text);
            continue;
        }
        let text = token.text;
        if let Some(body) = text.strip_prefix("--") {
            if body.is_empty() {
                args.push(text);
            } else if let Some((key, value)) = body.split_once('=') {
                flags.insert(key.to_string(), FlagValue::Str(value.to_string()));
            } else {
                flags.insert(body.to_string(), FlagValue::Bool(true));
            }
        } else if text.len() > 1 && text.starts_with('-') && !text[1..].starts_with('-') {
            for c in text[1..].chars() {
                flags.insert(c.to_string(), FlagValue::Bool(true));
            }
        } else {
            args.push(text);
        }
    }

    ParsedCommand::new(name, args, flags, background, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> InputParser {
        InputParser::new()
    }

    #[test]
    fn test_single_command_plan() {
        let plan = parser().parse("ls -la src --color=auto").unwrap();
        assert_eq!(plan.mode(), InputMode::Traditional);
        let cmd = &plan.commands()[0];
        assert_eq!(cmd.name(), "ls");
        assert_eq!(cmd.args(), ["src"]);
        assert_eq!(cmd.flags().get("l"), Some(&FlagValue::Bool(true)));
        assert_eq!(cmd.flags().get("a"), Some(&FlagValue::Bool(true)));
        assert_eq!(cmd.flag_str("color"), Some("auto"));
    }

    #[test]
    fn test_pipeline_plan() {
        let plan = parser().parse("echo hello | wc -c").unwrap();
        assert_eq!(plan.mode(), InputMode::Traditional);
        assert!(plan.is_pipeline());
        assert_eq!(plan.commands().len(), 2);
        assert_eq!(plan.commands()[0].name(), "echo");
        assert_eq!(plan.commands()[1].name(), "wc");
    }

    #[test]
    fn test_scripted_line_keeps_original_as_script() {
        let line = "fs.dir(\".\").filter(f => f.size > 1024).map(f => f.name)";
        let plan = parser().parse(line).unwrap();
        assert_eq!(plan.mode(), InputMode::Scripted);
        assert_eq!(plan.script(), Some(line));
    }

    #[test]
    fn test_mixed_pipeline_promotes_to_scripted() {
        let line = "ls | utils.formatBytes(1024)";
        let plan = parser().parse(line).unwrap();
        assert_eq!(plan.mode(), InputMode::Scripted);
        assert_eq!(plan.script(), Some(line));
        assert!(plan.commands().is_empty());
    }

    #[test]
    fn test_quoted_token_is_positional() {
        let plan = parser().parse("ls \"a b\".txt").unwrap();
        let cmd = &plan.commands()[0];
        assert_eq!(cmd.args(), ["a b.txt"]);
        assert!(cmd.flags().is_empty());
    }

    #[test]
    fn test_background_marker() {
        let plan = parser().parse("sleep 5 &").unwrap();
        let cmd = &plan.commands()[0];
        assert!(cmd.background());
        assert_eq!(cmd.args(), ["5"]);
    }

    #[test]
    fn test_syntax_error_offset_within_input() {
        let input = "echo ok | echo \"open";
        let err = parser().parse(input).unwrap_err();
        let offset = err.offset().unwrap();
        assert!(offset <= input.len());
        assert_eq!(offset, 15);
    }

    #[test]
    fn test_empty_input_yields_empty_plan() {
        let plan = parser().parse("   ").unwrap();
        assert_eq!(plan.mode(), InputMode::Traditional);
        assert!(plan.commands().is_empty());
    }
}
