// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Input Classifier
//!
//! Decides whether a line is a traditional command pipeline or a scripted
//! expression. Classification is purely syntactic - it never evaluates the
//! line - and runs on a copy of the input with quoted regions blanked out
//! so string contents cannot trigger scripted detection.
//!
//! ## Scripted Markers
//!
//! A line classifies as scripted when any of these matches outside quoted
//! strings:
//!
//! - a dotted call: identifier `.` identifier `(`
//! - the arrow-function token `=>`
//! - the keywords `const`, `let`, `var`, `function`, `async`, `await`,
//!   `return`, or `if (` / `for (` / `while (` / `try {`
//! - the input is multi-line and opens more braces/brackets/parens than it
//!   closes
//!
//! Everything else is traditional.

use crate::infrastructure::parser::tokenizer::blank_quoted_regions;
use nexus_shell_domain::InputMode;
use once_cell::sync::Lazy;
use regex::Regex;

static DOTTED_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*\s*\(").expect("static pattern")
});

static KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(const|let|var|function|async|await|return)\b").expect("static pattern")
});

static BLOCK_KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(if|for|while)\s*\(|\btry\s*\{").expect("static pattern"));

/// Classifies one input line (possibly multi-line).
pub fn classify(input: &str) -> InputMode {
    let visible = blank_quoted_regions(input);

    if DOTTED_CALL.is_match(&visible)
        || visible.contains("=>")
        || KEYWORDS.is_match(&visible)
        || BLOCK_KEYWORDS.is_match(&visible)
    {
        return InputMode::Scripted;
    }

    if input.contains('\n') && has_unbalanced_open(&visible) {
        return InputMode::Scripted;
    }

    InputMode::Traditional
}

fn has_unbalanced_open(visible: &str) -> bool {
    let mut depth = 0i64;
    for c in visible.chars() {
        match c {
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth -= 1,
            _ => {}
        }
    }
    depth > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_commands_are_traditional() {
        assert_eq!(classify("ls -la /tmp"), InputMode::Traditional);
        assert_eq!(classify("echo hello | wc -c"), InputMode::Traditional);
        assert_eq!(classify("git commit -m update"), InputMode::Traditional);
    }

    #[test]
    fn test_dotted_call_is_scripted() {
        assert_eq!(classify("fs.readFile(\"/etc/hosts\")"), InputMode::Scripted);
        assert_eq!(
            classify("fs.dir(\".\").filter(f => f.size > 1024).map(f => f.name)"),
            InputMode::Scripted
        );
    }

    #[test]
    fn test_keywords_are_scripted() {
        assert_eq!(classify("let x = 1"), InputMode::Scripted);
        assert_eq!(classify("return 42"), InputMode::Scripted);
        assert_eq!(classify("if (x > 0) { }"), InputMode::Scripted);
        assert_eq!(classify("try { risky() }"), InputMode::Scripted);
    }

    #[test]
    fn test_arrow_token_is_scripted() {
        assert_eq!(classify("xs.map(x => x + 1)"), InputMode::Scripted);
    }

    #[test]
    fn test_quoted_markers_do_not_classify() {
        assert_eq!(classify("echo \"let x = 1\""), InputMode::Traditional);
        assert_eq!(classify("grep 'fs.read(' log.txt"), InputMode::Traditional);
        assert_eq!(classify("echo \"a => b\""), InputMode::Traditional);
    }

    #[test]
    fn test_multiline_unbalanced_open_is_scripted() {
        assert_eq!(classify("fn {\n  body"), InputMode::Scripted);
        // Balanced multi-line stays traditional.
        assert_eq!(classify("echo a\necho b"), InputMode::Traditional);
    }

    #[test]
    fn test_dot_without_call_is_traditional() {
        assert_eq!(classify("cat notes.txt"), InputMode::Traditional);
        assert_eq!(classify("ls a.b.c"), InputMode::Traditional);
    }
}
