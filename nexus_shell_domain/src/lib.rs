// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Nexus Shell Domain
//!
//! Pure domain layer for the Nexus dual-mode shell. Every line of input is
//! either a traditional pipeline of tokenised commands or a scripted
//! expression; both execute against the same object model and the same
//! capability-checked gateway. This crate holds that object model and the
//! contracts between components - no I/O, no runtime, no tokio.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (Kernel façade, builtin wiring)                            │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (this crate)                │
//! │  (Values, Plans, Contexts, Capabilities, Transactions,      │
//! │   Recordings, Service + Repository Ports)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (Parser, Engine, Bridge, Capability Store, Recorder, …)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Concepts
//!
//! ### Values
//! The tagged, metadata-carrying datum ([`Value`]) passed through the
//! engine and marshalled across the object bridge: scalars, strings,
//! bytes, lists, maps, and opaque handles pinned by the bridge.
//!
//! ### Plans
//! The parser's output for one line ([`ParsedInput`]): a mode (traditional
//! or scripted), the tokenised commands, and the script text.
//!
//! ### Contexts
//! Every invocation receives a [`CommandContext`] built from a consistent
//! snapshot of the shell state, the capability gate, and the pipeline
//! position.
//!
//! ### Capabilities
//! Permissions are `action:resource` keys checked against a grant map and
//! named [`Capability`] grants with glob resource patterns.
//!
//! ### Transactions and Recordings
//! Transactions scope shell-state mutation with snapshot/rollback
//! semantics; recordings capture command streams for deterministic replay.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{
    CommandContext, Recording, RecordingEntry, RollbackFn, ShellState, StateSnapshot,
    SystemSnapshot, Transaction, TransactionState,
};
pub use error::ShellError;
pub use repositories::RecordingStore;
pub use services::{
    AllowAllGate, BuiltinCommand, BuiltinRegistry, CapabilityGate, HashAlgorithm, ProcessSpawner,
    ScriptEvaluator, SpawnOutput, SpawnRequest,
};
pub use value_objects::{
    CancellationToken, Capability, FlagValue, HandleId, InputMode, ParsedCommand, ParsedInput,
    ResourcePattern, Value, ValueMeta, ValuePayload, WorkerCount,
};
