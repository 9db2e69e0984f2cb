// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Highlight Tokens
//!
//! Span generation for terminal colouring. The parser is the single source
//! of truth; the UI maps each [`HighlightKind`] to a colour and nothing
//! more.
//!
//! Traditional lines mark the first word of each pipeline segment as a
//! command, `-`-prefixed tokens as flags, quoted regions as strings, `|` as
//! an operator, and `#` to end-of-line as a comment. Scripted lines mark
//! keywords, dotted method paths, string literals, and the arrow operator.

use crate::infrastructure::parser::classifier;
use crate::infrastructure::parser::tokenizer::{blank_quoted_regions, split_pipeline, tokenize};
use nexus_shell_domain::InputMode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Categories the terminal UI may colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Command,
    Flag,
    Argument,
    String,
    Keyword,
    Method,
    Operator,
    Comment,
}

/// One coloured span: byte offset, byte length, category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
    pub offset: usize,
    pub length: usize,
    pub kind: HighlightKind,
}

static METHOD_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(fs|proc|net|utils)\.[A-Za-z_][A-Za-z0-9_]*").expect("static pattern")
});

static SCRIPT_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(const|let|var|function|async|await|return|if|for|while|try|catch)\b")
        .expect("static pattern")
});

/// Computes highlight spans for one line.
pub fn highlight(line: &str) -> Vec<HighlightSpan> {
    let mut spans = match classifier::classify(line) {
        InputMode::Traditional => highlight_traditional(line),
        _ => highlight_scripted(line),
    };
    spans.extend(string_spans(line));
    spans.sort_by_key(|s| s.offset);
    spans
}

fn highlight_traditional(line: &str) -> Vec<HighlightSpan> {
    let mut spans = Vec::new();

    // Unquoted comment tail.
    let visible = blank_quoted_regions(line);
    let comment_at = visible.find('#');
    let effective = comment_at.map(|at| &line[..at]).unwrap_or(line);
    if let Some(at) = comment_at {
        spans.push(HighlightSpan {
            offset: at,
            length: line.len() - at,
            kind: HighlightKind::Comment,
        });
    }

    let segments = match split_pipeline(effective) {
        Ok(segments) => segments,
        Err(_) => return spans,
    };
    for segment in &segments {
        let tokens = match tokenize(&segment.text) {
            Ok(tokens) => tokens,
            Err(_) => continue,
        };
        for (i, token) in tokens.iter().enumerate() {
            if token.quoted {
                continue; // covered by string spans
            }
            let kind = if i == 0 {
                HighlightKind::Command
            } else if token.text.starts_with('-') && token.text.len() > 1 {
                HighlightKind::Flag
            } else {
                HighlightKind::Argument
            };
            spans.push(HighlightSpan {
                offset: segment.offset + token.offset,
                length: token.text.len(),
                kind,
            });
        }
    }

    // Pipe operators between segments.
    for (i, c) in visible.char_indices() {
        if c == '|' && comment_at.map(|at| i < at).unwrap_or(true) {
            spans.push(HighlightSpan {
                offset: i,
                length: 1,
                kind: HighlightKind::Operator,
            });
        }
    }
    spans
}

fn highlight_scripted(line: &str) -> Vec<HighlightSpan> {
    let mut spans = Vec::new();
    let visible = blank_quoted_regions(line);

    for m in METHOD_PATH.find_iter(&visible) {
        spans.push(HighlightSpan {
            offset: m.start(),
            length: m.len(),
            kind: HighlightKind::Method,
        });
    }
    for m in SCRIPT_KEYWORD.find_iter(&visible) {
        spans.push(HighlightSpan {
            offset: m.start(),
            length: m.len(),
            kind: HighlightKind::Keyword,
        });
    }
    let mut search_from = 0;
    while let Some(found) = visible[search_from..].find("=>") {
        let at = search_from + found;
        spans.push(HighlightSpan {
            offset: at,
            length: 2,
            kind: HighlightKind::Operator,
        });
        search_from = at + 2;
    }
    spans
}

/// Quoted-region spans, shared by both modes.
fn string_spans(line: &str) -> Vec<HighlightSpan> {
    let mut spans = Vec::new();
    let mut open: Option<(usize, char)> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match open {
            None => match c {
                '\\' => escaped = true,
                '\'' | '"' => open = Some((i, c)),
                _ => {}
            },
            Some((start, quote)) => {
                if c == '\\' && quote == '"' {
                    escaped = true;
                } else if c == quote {
                    spans.push(HighlightSpan {
                        offset: start,
                        length: i + c.len_utf8() - start,
                        kind: HighlightKind::String,
                    });
                    open = None;
                }
            }
        }
    }
    if let Some((start, _)) = open {
        spans.push(HighlightSpan {
            offset: start,
            length: line.len() - start,
            kind: HighlightKind::String,
        });
    }
    spans
}
