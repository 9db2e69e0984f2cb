// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command Context Entity
//!
//! The per-invocation execution context handed to builtins, the scripted
//! evaluator, and the bridge surfaces. A context is created for every
//! command invocation from a consistent snapshot of the shell state taken
//! at command start, so concurrent mutation by another command never tears
//! observations mid-command.
//!
//! ## Immutability
//!
//! The context is immutable after construction with one exception:
//! `pipeline_input`, which the engine sets between pipeline stages to
//! thread the previous stage's result into the next.
//!
//! ## Contents
//!
//! - working directory and environment (snapshotted)
//! - the invocation's positional args and parsed flags
//! - pipeline position (`index` of this stage, total `length`)
//! - stdio capture and replay markers
//! - the capability gate consulted on every boundary crossing
//! - the cooperative cancellation token for this invocation

use crate::services::capability_gate::CapabilityGate;
use crate::value_objects::{CancellationToken, FlagValue, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Per-invocation execution context.
#[derive(Clone)]
pub struct CommandContext {
    cwd: PathBuf,
    env: BTreeMap<String, String>,
    args: Vec<String>,
    flags: BTreeMap<String, FlagValue>,
    capabilities: Arc<dyn CapabilityGate>,
    pipeline_input: Option<Value>,
    pipeline_index: usize,
    pipeline_length: usize,
    capture_stdio: bool,
    in_replay: bool,
    cancellation: CancellationToken,
}

impl CommandContext {
    /// Creates a context from a shell-state snapshot and a capability gate
    pub fn new(
        cwd: impl Into<PathBuf>,
        env: BTreeMap<String, String>,
        capabilities: Arc<dyn CapabilityGate>,
    ) -> Self {
        Self {
            cwd: cwd.into(),
            env,
            args: Vec::new(),
            flags: BTreeMap::new(),
            capabilities,
            pipeline_input: None,
            pipeline_index: 0,
            pipeline_length: 1,
            capture_stdio: true,
            in_replay: false,
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the positional arguments, returning the updated context
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Sets the parsed flags, returning the updated context
    pub fn with_flags(mut self, flags: BTreeMap<String, FlagValue>) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the pipeline position, returning the updated context
    pub fn for_stage(mut self, index: usize, length: usize) -> Self {
        self.pipeline_index = index;
        self.pipeline_length = length.max(1);
        self
    }

    /// Sets stdio capture behaviour, returning the updated context
    pub fn with_capture_stdio(mut self, capture: bool) -> Self {
        self.capture_stdio = capture;
        self
    }

    /// Marks the context as belonging to a replay session
    pub fn with_replay(mut self, in_replay: bool) -> Self {
        self.in_replay = in_replay;
        self
    }

    /// Attaches a cancellation token, returning the updated context
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Gets the working directory captured at command start
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Gets the environment captured at command start
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Gets the positional arguments
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Gets the parsed flags
    pub fn flags(&self) -> &BTreeMap<String, FlagValue> {
        &self.flags
    }

    /// Gets the capability gate for this invocation
    pub fn capabilities(&self) -> &Arc<dyn CapabilityGate> {
        &self.capabilities
    }

    /// Gets the previous pipeline stage's result, if any
    pub fn pipeline_input(&self) -> Option<&Value> {
        self.pipeline_input.as_ref()
    }

    /// Takes the previous pipeline stage's result, leaving `None`
    pub fn take_pipeline_input(&mut self) -> Option<Value> {
        self.pipeline_input.take()
    }

    /// Sets the pipeline input. The engine calls this between stages; it is
    /// the only post-construction mutation the context permits.
    pub fn set_pipeline_input(&mut self, value: Option<Value>) {
        self.pipeline_input = value;
    }

    /// Gets this stage's index within its pipeline
    pub fn pipeline_index(&self) -> usize {
        self.pipeline_index
    }

    /// Gets the pipeline's total stage count
    pub fn pipeline_length(&self) -> usize {
        self.pipeline_length
    }

    /// Checks whether child-process stdio should be captured
    pub fn capture_stdio(&self) -> bool {
        self.capture_stdio
    }

    /// Checks whether this invocation happens inside a replay session
    pub fn in_replay(&self) -> bool {
        self.in_replay
    }

    /// Gets the cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Resolves a possibly relative path against the context's cwd
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.cwd.join(p)
        }
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("cwd", &self.cwd)
            .field("args", &self.args)
            .field("flags", &self.flags)
            .field("pipeline_index", &self.pipeline_index)
            .field("pipeline_length", &self.pipeline_length)
            .field("capture_stdio", &self.capture_stdio)
            .field("in_replay", &self.in_replay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::capability_gate::AllowAllGate;

    fn ctx() -> CommandContext {
        CommandContext::new("/home/u", BTreeMap::new(), Arc::new(AllowAllGate))
    }

    #[test]
    fn test_defaults() {
        let c = ctx();
        assert_eq!(c.pipeline_index(), 0);
        assert_eq!(c.pipeline_length(), 1);
        assert!(c.capture_stdio());
        assert!(!c.in_replay());
        assert!(c.pipeline_input().is_none());
    }

    #[test]
    fn test_pipeline_input_threading() {
        let mut c = ctx().for_stage(1, 3);
        c.set_pipeline_input(Some(Value::string("upstream")));
        assert_eq!(c.pipeline_input().unwrap().as_str(), Some("upstream"));
        let taken = c.take_pipeline_input().unwrap();
        assert_eq!(taken.as_str(), Some("upstream"));
        assert!(c.pipeline_input().is_none());
    }

    #[test]
    fn test_resolve_path_against_cwd() {
        let c = ctx();
        assert_eq!(c.resolve_path("notes.txt"), PathBuf::from("/home/u/notes.txt"));
        assert_eq!(c.resolve_path("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
