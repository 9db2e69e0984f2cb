// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shell State Entity
//!
//! The single authoritative mutable state of the shell: working directory,
//! environment, and alias table. There are no other global mutable
//! variables anywhere in the core - all access goes through the kernel's
//! writer lock, and every command reads a consistent [`StateSnapshot`]
//! captured at command start so concurrent mutation never tears an
//! observation mid-command.
//!
//! ## Alias Resolution
//!
//! Resolution is a single lookup with no recursive expansion. If the
//! resolved target is itself aliased, resolution reports `AliasCycle`
//! rather than chaining - this makes resolution trivially terminating.
//!
//! ## Snapshots
//!
//! `snapshot()` captures `{cwd, env, aliases}` by value; `restore()` puts a
//! snapshot back verbatim. Transactions rely on this pair for their
//! atomicity guarantee: after a rollback the state is bit-identical to the
//! pre-`begin` capture.

use crate::error::ShellError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A by-value capture of the mutable shell state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    cwd: PathBuf,
    env: BTreeMap<String, String>,
    aliases: BTreeMap<String, String>,
}

impl StateSnapshot {
    /// Gets the captured working directory
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Gets the captured environment
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Gets the captured alias table
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }
}

/// The mutable shell state: cwd, environment, and aliases.
#[derive(Debug, Clone)]
pub struct ShellState {
    cwd: PathBuf,
    env: BTreeMap<String, String>,
    aliases: BTreeMap<String, String>,
}

impl ShellState {
    /// Creates shell state rooted at `cwd` with the given environment
    pub fn new(cwd: impl Into<PathBuf>, env: BTreeMap<String, String>) -> Self {
        Self {
            cwd: cwd.into(),
            env,
            aliases: BTreeMap::new(),
        }
    }

    /// Gets the working directory
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Sets the working directory
    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) {
        self.cwd = cwd.into();
    }

    /// Gets the environment
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Sets an environment variable
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    /// Removes an environment variable
    pub fn unset_env(&mut self, key: &str) -> Option<String> {
        self.env.remove(key)
    }

    /// Gets the alias table
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Defines or replaces an alias
    pub fn set_alias(&mut self, name: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(name.into(), target.into());
    }

    /// Removes an alias
    pub fn remove_alias(&mut self, name: &str) -> Option<String> {
        self.aliases.remove(name)
    }

    /// Resolves a command name through the alias table.
    ///
    /// Exactly one lookup step. Returns the target if `name` is aliased,
    /// `None` if it is not, and `AliasCycle` if the target is itself an
    /// alias (including self-aliases).
    pub fn resolve_alias(&self, name: &str) -> Result<Option<&str>, ShellError> {
        match self.aliases.get(name) {
            None => Ok(None),
            Some(target) => {
                if self.aliases.contains_key(target.as_str()) {
                    Err(ShellError::AliasCycle(format!(
                        "alias '{}' resolves to aliased name '{}'",
                        name, target
                    )))
                } else {
                    Ok(Some(target))
                }
            }
        }
    }

    /// Captures the full state by value
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            cwd: self.cwd.clone(),
            env: self.env.clone(),
            aliases: self.aliases.clone(),
        }
    }

    /// Restores a previously captured snapshot verbatim
    pub fn restore(&mut self, snapshot: &StateSnapshot) {
        self.cwd = snapshot.cwd.clone();
        self.env = snapshot.env.clone();
        self.aliases = snapshot.aliases.clone();
    }
}
