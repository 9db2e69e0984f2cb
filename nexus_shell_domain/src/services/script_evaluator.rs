// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Script Evaluator Port
//!
//! The seam between the engine and the embedded scripting runtime. The
//! runtime itself is an external collaborator - the domain only fixes the
//! contract: a script plus a command context in, a [`Value`] or a
//! [`ShellError`] out. Every host interaction inside the script funnels
//! through the object bridge, which the infrastructure implementation
//! binds into the runtime before evaluation.

use crate::entities::CommandContext;
use crate::error::ShellError;
use crate::value_objects::Value;

/// Evaluates scripted expressions against the live bridge surfaces.
pub trait ScriptEvaluator: Send + Sync {
    /// Evaluates `script` under `ctx`, returning the resulting value.
    ///
    /// Runtime syntax errors surface as `SyntaxError`; permission denials
    /// raised by bridge surfaces pass through unchanged.
    fn eval(&self, script: &str, ctx: &CommandContext) -> Result<Value, ShellError>;
}
