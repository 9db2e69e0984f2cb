// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Spawner Port
//!
//! The byte-stream boundary to the host OS. The contract is
//! `spawn(argv, cwd, env, capture) → {code, stdout, stderr}`: `argv[0]`
//! resolution follows host PATH rules and no shell metacharacter
//! re-interpretation occurs. A non-zero exit code is data, not an error;
//! failure to spawn at all (binary not found) is a `NotFound` error.

use crate::error::ShellError;
use crate::value_objects::{CancellationToken, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Request to spawn one external process.
#[derive(Debug, Clone)]
pub struct SpawnRequest<'a> {
    pub argv: &'a [String],
    pub cwd: &'a Path,
    pub env: &'a BTreeMap<String, String>,
    /// Bytes to feed the child's stdin, if any (pipeline threading)
    pub stdin: Option<&'a [u8]>,
    /// Capture stdio into the result instead of inheriting the terminal
    pub capture: bool,
    pub cancellation: CancellationToken,
}

/// Outcome of one spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl SpawnOutput {
    /// Converts the outcome into the engine's result value shape:
    /// `{code, stdout, stderr, success}`.
    pub fn into_value(self) -> Value {
        let success = self.code == 0;
        Value::map_from(vec![
            ("code", Value::int(self.code as i64)),
            ("stdout", Value::string(self.stdout)),
            ("stderr", Value::string(self.stderr)),
            ("success", Value::boolean(success)),
        ])
    }
}

/// Spawns external processes at the host boundary.
pub trait ProcessSpawner: Send + Sync {
    /// Spawns the process and waits for completion
    fn spawn(&self, request: SpawnRequest<'_>) -> Result<SpawnOutput, ShellError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_value_shape() {
        let out = SpawnOutput {
            code: 1,
            stdout: "6\n".into(),
            stderr: String::new(),
        };
        let value = out.into_value();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("code").unwrap().as_int(), Some(1));
        assert_eq!(map.get("stdout").unwrap().as_str(), Some("6\n"));
        assert_eq!(map.get("success").unwrap().as_bool(), Some(false));
    }
}
