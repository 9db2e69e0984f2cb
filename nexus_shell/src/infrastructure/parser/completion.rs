// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Completion
//!
//! Candidate generation for the word under the cursor: registered builtin
//! command names, plus the scripted surface method paths (`fs.`, `proc.`,
//! `net.`, `utils.`) when the prefix is a dotted path. Ordering is exact
//! match first, then alphabetical.

/// The fixed scripted-surface method paths.
pub const SURFACE_PATHS: &[&str] = &[
    "fs.dir",
    "fs.find",
    "fs.listDir",
    "fs.readFile",
    "fs.stat",
    "fs.watch",
    "fs.writeFile",
    "net.download",
    "net.get",
    "net.post",
    "proc.exec",
    "proc.info",
    "proc.kill",
    "proc.list",
    "proc.monitor",
    "utils.deepClone",
    "utils.deepMerge",
    "utils.formatBytes",
    "utils.hash",
    "utils.retry",
    "utils.sleep",
    "utils.uuid",
];

/// Extracts the word containing/preceding the cursor.
fn word_at(line: &str, cursor: usize) -> &str {
    let cursor = cursor.min(line.len());
    let head = &line[..cursor];
    match head.rfind(char::is_whitespace) {
        Some(ws) => &head[ws + 1..],
        None => head,
    }
}

/// Returns completion candidates for the word under the cursor.
pub fn completions(line: &str, cursor: usize, known_commands: &[String]) -> Vec<String> {
    let word = word_at(line, cursor);
    if word.is_empty() {
        let mut all: Vec<String> = known_commands.to_vec();
        all.sort();
        return all;
    }

    let mut matches: Vec<String> = if word.contains('.') {
        SURFACE_PATHS
            .iter()
            .filter(|p| p.starts_with(word))
            .map(|p| p.to_string())
            .collect()
    } else {
        let mut candidates: Vec<String> = known_commands
            .iter()
            .filter(|c| c.starts_with(word))
            .cloned()
            .collect();
        // A bare identifier may also be the start of a surface namespace.
        candidates.extend(
            SURFACE_PATHS
                .iter()
                .filter(|p| p.starts_with(word))
                .map(|p| p.to_string()),
        );
        candidates
    };

    matches.sort();
    matches.dedup();
    if let Some(pos) = matches.iter().position(|m| m == word) {
        let exact = matches.remove(pos);
        matches.insert(0, exact);
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands() -> Vec<String> {
        ["cd", "pwd", "echo", "export", "alias", "unalias"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_command_prefix_completion() {
        let got = completions("e", 1, &commands());
        assert_eq!(got, vec!["echo", "export"]);
    }

    #[test]
    fn test_dotted_path_completion() {
        let got = completions("fs.r", 4, &commands());
        assert_eq!(got, vec!["fs.readFile"]);

        let all_fs = completions("fs.", 3, &commands());
        assert!(all_fs.contains(&"fs.listDir".to_string()));
        assert!(all_fs.contains(&"fs.watch".to_string()));
    }

    #[test]
    fn test_exact_match_ordered_first() {
        let mut cmds = commands();
        cmds.push("cdx".to_string());
        let got = completions("cd", 2, &cmds);
        assert_eq!(got[0], "cd");
        assert_eq!(got[1], "cdx");
    }

    #[test]
    fn test_word_under_cursor_mid_line() {
        let line = "echo hello | pw";
        let got = completions(line, line.len(), &commands());
        assert_eq!(got, vec!["pwd"]);
    }
}
