// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Parser Property Tests
//!
//! Invariants over the classifier and tokenizer:
//!
//! - the classifier is a total function: every input yields a plan or a
//!   `SyntaxError` whose offset lies within `[0, len(input)]`
//! - classification never evaluates the line (no side effects to observe,
//!   but it must never panic either)
//! - highlight spans stay inside the line

use nexus_shell::infrastructure::parser::{highlight, InputParser};
use proptest::prelude::*;

proptest! {
    #[test]
    fn classifier_is_total(input in "\\PC{0,120}") {
        let parser = InputParser::new();
        match parser.parse(&input) {
            Ok(plan) => {
                prop_assert_eq!(plan.original(), input.as_str());
            }
            Err(e) => {
                prop_assert_eq!(e.kind(), "SyntaxError");
                let offset = e.offset().expect("syntax errors carry an offset");
                prop_assert!(offset <= input.len());
            }
        }
    }

    #[test]
    fn printable_lines_with_quotes_stay_total(
        head in "[a-z]{1,8}",
        quoted in "[a-z ]{0,12}",
        tail in "[a-z]{0,8}",
    ) {
        let parser = InputParser::new();
        let line = format!("{} \"{}\"{}", head, quoted, tail);
        let plan = parser.parse(&line).unwrap();
        prop_assert!(!plan.commands().is_empty() || plan.script().is_some());
    }

    #[test]
    fn highlight_spans_stay_in_bounds(input in "\\PC{0,80}") {
        for span in highlight(&input) {
            prop_assert!(span.offset <= input.len());
            prop_assert!(span.offset + span.length <= input.len());
        }
    }

    // Consonant-only words (no y) cannot collide with scripted keywords.
    #[test]
    fn pipeline_segments_reassemble(
        parts in prop::collection::vec(
            "[bcdfghjkmnpqrstvwxz]{1,6}( [bcdfghjkmnpqrstvwxz]{1,6}){0,2}",
            1..4,
        ),
    ) {
        let parser = InputParser::new();
        let line = parts.join(" | ");
        let plan = parser.parse(&line).unwrap();
        prop_assert_eq!(plan.commands().len(), parts.len());
        for (cmd, part) in plan.commands().iter().zip(&parts) {
            prop_assert_eq!(cmd.raw(), part.as_str());
        }
    }
}

#[test]
fn completion_ordering_is_exact_then_alphabetical() {
    let mut parser = InputParser::new();
    parser.set_known_commands(vec![
        "cd".to_string(),
        "cdrecord".to_string(),
        "cda".to_string(),
    ]);
    let got = parser.completions("cd", 2);
    assert_eq!(got, vec!["cd", "cda", "cdrecord"]);
}
