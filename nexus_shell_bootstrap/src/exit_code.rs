// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Provides standardized Unix exit codes following BSD `sysexits.h`
//! conventions, narrowed to the codes the shell process actually emits.
//!
//! ## Exit Code Conventions
//!
//! - **0**: Normal termination
//! - **1**: Initialization failure
//! - **64-74**: Specific error conditions (BSD sysexits.h)
//! - **130**: SIGINT after graceful shutdown (128 + signal 2)
//!
//! Per-command errors inside a running session never affect the process
//! exit code; only lifecycle failures do.

use std::fmt;

/// Exit codes following Unix conventions (BSD sysexits.h)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// Initialization failure (1)
    InitFailure = 1,

    /// Command line usage error (64)
    /// - Invalid arguments
    /// - Unknown flags
    UsageError = 64,

    /// Data format error (65)
    /// - Malformed configuration file
    DataError = 65,

    /// Cannot open input (66)
    /// - Config file not found or unreadable
    NoInput = 66,

    /// Internal software error (70)
    /// - Unexpected error during lifecycle management
    Software = 70,

    /// I/O error (74)
    IoError = 74,

    /// Terminated by SIGINT after graceful shutdown (130)
    Interrupted = 130,
}

impl ExitCode {
    /// Converts to the raw process exit code
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a lifecycle error into an exit code by message heuristics.
    ///
    /// Anything unrecognized maps to `InitFailure`, the documented general
    /// init-failure code.
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        let msg = error.to_string().to_lowercase();
        if msg.contains("usage") || msg.contains("argument") {
            ExitCode::UsageError
        } else if msg.contains("config") && (msg.contains("parse") || msg.contains("json")) {
            ExitCode::DataError
        } else if msg.contains("not found") || msg.contains("no such file") {
            ExitCode::NoInput
        } else if msg.contains("i/o") || msg.contains("io error") {
            ExitCode::IoError
        } else {
            ExitCode::InitFailure
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitCode::Success => "success",
            ExitCode::InitFailure => "init failure",
            ExitCode::UsageError => "usage error",
            ExitCode::DataError => "data error",
            ExitCode::NoInput => "no input",
            ExitCode::Software => "software error",
            ExitCode::IoError => "io error",
            ExitCode::Interrupted => "interrupted",
        };
        write!(f, "{} ({})", name, self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_codes() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::InitFailure.as_i32(), 1);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_from_error_heuristics() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config not found");
        assert_eq!(ExitCode::from_error(&err), ExitCode::NoInput);

        let other = std::io::Error::other("boom");
        assert_eq!(ExitCode::from_error(&other), ExitCode::InitFailure);
    }
}
