// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Builtin Command Port
//!
//! The contract every registered builtin satisfies: take a
//! [`CommandContext`], return a [`Value`]. The concrete set of builtins is
//! an external collaborator - the engine only requires the registry shape
//! defined here.

use crate::entities::CommandContext;
use crate::error::ShellError;
use crate::value_objects::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A command implemented inside the shell process.
pub trait BuiltinCommand: Send + Sync {
    /// The name the command registers under
    fn name(&self) -> &str;

    /// One-line description for completion listings
    fn description(&self) -> &str {
        ""
    }

    /// Executes the command under the given context
    fn run(&self, ctx: &mut CommandContext) -> Result<Value, ShellError>;
}

/// Name-keyed registry of builtins consulted by the engine's dispatch.
#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    commands: BTreeMap<String, Arc<dyn BuiltinCommand>>,
}

impl BuiltinRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a builtin, replacing any previous command of the same name
    pub fn register(&mut self, command: Arc<dyn BuiltinCommand>) {
        self.commands.insert(command.name().to_string(), command);
    }

    /// Looks up a builtin by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn BuiltinCommand>> {
        self.commands.get(name)
    }

    /// Checks whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Iterates registered names in sorted order (completion source)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Number of registered builtins
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Checks whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl std::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinRegistry")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}
