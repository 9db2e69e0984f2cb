// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling for the `nexus` binary.
//!
//! ## Surface
//!
//! - optional first positional: config-file path (JSON)
//! - `--debug` / `-d`: structured error traces and debug logging
//! - `--threads`: worker pool size override
//! - `-c <line>`: execute a single line and exit (non-interactive)
//!
//! ## Environment Variables
//!
//! - `NEXUS_DEBUG` - boolean, same effect as `--debug`
//! - `NEXUS_MAX_MEMORY` - byte count or `<n>MB` spec for the value cap
//! - `NEXUS_PLUGIN_PATH` - plugin search path handed to the config layer
//! - `NEXUS_JS_PATH` - script module search path handed to the config layer
//!
//! Environment overrides are read once at startup and folded into the
//! loaded configuration by the application layer.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Validation errors for parsed CLI arguments.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("invalid value for {arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

/// CLI arguments for the shell process.
#[derive(Debug, Clone, Parser)]
#[command(name = "nexus", version, about = "Nexus dual-mode command shell")]
pub struct Cli {
    /// Path to a JSON configuration file
    pub config: Option<PathBuf>,

    /// Enable debug output (structured error traces)
    #[arg(short, long)]
    pub debug: bool,

    /// Worker pool size override
    #[arg(long)]
    pub threads: Option<usize>,

    /// Execute a single line and exit
    #[arg(short = 'c', long = "command")]
    pub command: Option<String>,
}

/// Parses the process arguments
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Validates numeric ranges on parsed arguments
pub fn validate_cli(cli: &Cli) -> Result<(), ParseError> {
    if let Some(threads) = cli.threads {
        if threads == 0 || threads > 128 {
            return Err(ParseError::InvalidValue {
                arg: "threads".to_string(),
                reason: "must be between 1 and 128".to_string(),
            });
        }
    }
    Ok(())
}

/// Environment-variable overrides read at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub debug: Option<bool>,
    pub max_memory: Option<String>,
    pub plugin_path: Option<PathBuf>,
    pub js_path: Option<PathBuf>,
}

impl EnvOverrides {
    /// Reads the `NEXUS_*` variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through a lookup function (testable seam)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            debug: lookup("NEXUS_DEBUG").map(|v| parse_bool(&v)),
            max_memory: lookup("NEXUS_MAX_MEMORY"),
            plugin_path: lookup("NEXUS_PLUGIN_PATH").map(PathBuf::from),
            js_path: lookup("NEXUS_JS_PATH").map(PathBuf::from),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
