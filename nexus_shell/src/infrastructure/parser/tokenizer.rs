// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tokenizer
//!
//! Single-pass state machine over characters with states `normal`,
//! `in-single-quote`, `in-double-quote`, and `escape`. Whitespace separates
//! tokens in `normal`; quotes preserve their content verbatim except that a
//! backslash inside a double-quoted string (or in normal state) escapes the
//! next character.
//!
//! ## Validation
//!
//! - unterminated quote → `SyntaxError` at the opening quote's offset
//! - trailing escape → `SyntaxError` at the backslash's offset
//! - stray control characters → `SyntaxError` at the character's offset
//!
//! Tab and newline are ordinary whitespace (callers may concatenate
//! multi-line input); every other control character is rejected.
//!
//! The same machine backs pipeline splitting: [`split_pipeline`] finds
//! unquoted top-level `|` separators (never `||`).

use nexus_shell_domain::ShellError;

/// One token with its byte offset into the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub offset: usize,
    /// Whether any part of the token came from a quoted region. Quoted
    /// tokens are always positional arguments, never flags.
    pub quoted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuote,
    DoubleQuote,
}

fn is_stray_control(c: char) -> bool {
    c.is_control() && c != '\t' && c != '\n'
}

/// Tokenises one command segment.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ShellError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut token_start = 0usize;
    let mut token_quoted = false;
    let mut in_token = false;
    let mut state = State::Normal;
    let mut quote_open_at = 0usize;
    let mut escape_at: Option<usize> = None;

    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if is_stray_control(c) {
            return Err(ShellError::syntax(
                format!("stray control character U+{:04X}", c as u32),
                i,
            ));
        }
        if escape_at.take().is_some() {
            // The escaped character is taken verbatim.
            current.push(c);
            continue;
        }
        match state {
            State::Normal => match c {
                '\\' => {
                    if !in_token {
                        in_token = true;
                        token_start = i;
                        token_quoted = false;
                    }
                    escape_at = Some(i);
                }
                '\'' => {
                    if !in_token {
                        in_token = true;
                        token_start = i;
                        token_quoted = false;
                    }
                    token_quoted = true;
                    quote_open_at = i;
                    state = State::SingleQuote;
                }
                '"' => {
                    if !in_token {
                        in_token = true;
                        token_start = i;
                        token_quoted = false;
                    }
                    token_quoted = true;
                    quote_open_at = i;
                    state = State::DoubleQuote;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(Token {
                            text: std::mem::take(&mut current),
                            offset: token_start,
                            quoted: token_quoted,
                        });
                        in_token = false;
                        token_quoted = false;
                    }
                }
                c => {
                    if !in_token {
                        in_token = true;
                        token_start = i;
                        token_quoted = false;
                    }
                    current.push(c);
                }
            },
            State::SingleQuote => match c {
                '\'' => state = State::Normal,
                c => current.push(c),
            },
            State::DoubleQuote => match c {
                '"' => state = State::Normal,
                '\\' => escape_at = Some(i),
                c => current.push(c),
            },
        }
    }

    if let Some(esc) = escape_at {
        return Err(ShellError::syntax("trailing escape", esc));
    }
    if state != State::Normal {
        return Err(ShellError::syntax("unterminated quote", quote_open_at));
    }
    if in_token {
        tokens.push(Token {
            text: current,
            offset: token_start,
            quoted: token_quoted,
        });
    }
    Ok(tokens)
}

/// One pipeline segment with its byte offset into the original line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub offset: usize,
}

/// Splits a line on unquoted top-level `|` separators.
///
/// `||` is not a pipeline separator and is passed through to the segment
/// text. Quoted pipes never split. Segment text is trimmed; the offset
/// points at the first non-whitespace character of the segment.
pub fn split_pipeline(input: &str) -> Result<Vec<Segment>, ShellError> {
    let mut segments = Vec::new();
    let mut seg_start = 0usize;
    let mut state = State::Normal;
    let mut quote_open_at = 0usize;
    let mut escaped = false;

    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if escaped {
            escaped = false;
            continue;
        }
        match state {
            State::Normal => match c {
                '\\' => escaped = true,
                '\'' => {
                    quote_open_at = i;
                    state = State::SingleQuote;
                }
                '"' => {
                    quote_open_at = i;
                    state = State::DoubleQuote;
                }
                '|' => {
                    if chars.peek().map(|(_, n)| *n) == Some('|') {
                        chars.next();
                    } else {
                        push_segment(input, seg_start, i, &mut segments);
                        seg_start = i + 1;
                    }
                }
                _ => {}
            },
            State::SingleQuote => {
                if c == '\'' {
                    state = State::Normal;
                }
            }
            State::DoubleQuote => match c {
                '"' => state = State::Normal,
                '\\' => escaped = true,
                _ => {}
            },
        }
    }
    if state != State::Normal {
        return Err(ShellError::syntax("unterminated quote", quote_open_at));
    }
    push_segment(input, seg_start, input.len(), &mut segments);
    Ok(segments)
}

fn push_segment(input: &str, start: usize, end: usize, segments: &mut Vec<Segment>) {
    let raw = &input[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = raw.len() - raw.trim_start().len();
    segments.push(Segment {
        text: trimmed.to_string(),
        offset: start + lead,
    });
}

/// Blanks quoted regions with spaces, preserving byte length so offsets
/// into the blanked text are valid offsets into the original.
///
/// The classifier runs its token rules on the blanked text so quoted
/// strings never trigger scripted detection.
pub fn blank_quoted_regions(input: &str) -> String {
    fn blank(out: &mut String, c: char) {
        for _ in 0..c.len_utf8() {
            out.push(' ');
        }
    }

    let mut out = String::with_capacity(input.len());
    let mut state = State::Normal;
    let mut escaped = false;
    for c in input.chars() {
        if escaped {
            escaped = false;
            if state == State::Normal {
                out.push(c);
            } else {
                blank(&mut out, c);
            }
            continue;
        }
        match state {
            State::Normal => match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '\'' => {
                    state = State::SingleQuote;
                    out.push(' ');
                }
                '"' => {
                    state = State::DoubleQuote;
                    out.push(' ');
                }
                c => out.push(c),
            },
            State::SingleQuote => {
                if c == '\'' {
                    state = State::Normal;
                    out.push(' ');
                } else {
                    blank(&mut out, c);
                }
            }
            State::DoubleQuote => match c {
                '"' => {
                    state = State::Normal;
                    out.push(' ');
                }
                '\\' => {
                    escaped = true;
                    out.push(' ');
                }
                c => blank(&mut out, c),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_whitespace_separates_tokens() {
        let tokens = tokenize("ls  -l   src").unwrap();
        assert_eq!(texts(&tokens), vec!["ls", "-l", "src"]);
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[1].offset, 4);
        assert_eq!(tokens[2].offset, 9);
    }

    #[test]
    fn test_quotes_preserve_whitespace_and_join_token() {
        // `ls "a b".txt` yields one positional arg `a b.txt`.
        let tokens = tokenize("ls \"a b\".txt").unwrap();
        assert_eq!(texts(&tokens), vec!["ls", "a b.txt"]);
        assert!(tokens[1].quoted);
    }

    #[test]
    fn test_single_quotes_are_verbatim() {
        let tokens = tokenize(r#"echo 'a \ "b"'"#).unwrap();
        assert_eq!(texts(&tokens), vec!["echo", r#"a \ "b""#]);
    }

    #[test]
    fn test_double_quote_backslash_escapes() {
        let tokens = tokenize(r#"echo "a\"b""#).unwrap();
        assert_eq!(texts(&tokens), vec!["echo", "a\"b"]);
    }

    #[test]
    fn test_unterminated_quote_offset() {
        let err = tokenize("echo \"open").unwrap_err();
        assert_eq!(err.kind(), "SyntaxError");
        assert_eq!(err.offset(), Some(5));
    }

    #[test]
    fn test_trailing_escape_offset() {
        let err = tokenize("echo abc\\").unwrap_err();
        assert_eq!(err.offset(), Some(8));
    }

    #[test]
    fn test_stray_control_character() {
        let err = tokenize("echo \u{7}bell").unwrap_err();
        assert_eq!(err.kind(), "SyntaxError");
        assert_eq!(err.offset(), Some(5));
    }

    #[test]
    fn test_split_pipeline_basic() {
        let segments = split_pipeline("echo hello | wc -c").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "echo hello");
        assert_eq!(segments[1].text, "wc -c");
    }

    #[test]
    fn test_split_skips_quoted_and_double_pipe() {
        let segments = split_pipeline("echo \"a|b\" || true").unwrap();
        assert_eq!(segments.len(), 1);

        let piped = split_pipeline("grep x | sort").unwrap();
        assert_eq!(piped.len(), 2);
    }

    #[test]
    fn test_blank_quoted_regions_preserves_length() {
        let line = "run \"fs.read(x)\" now";
        let blanked = blank_quoted_regions(line);
        assert_eq!(blanked.len(), line.len());
        assert!(!blanked.contains("fs.read"));
        assert!(blanked.contains("run"));
        assert!(blanked.contains("now"));
    }
}
