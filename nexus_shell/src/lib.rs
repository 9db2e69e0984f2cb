// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Nexus Shell
//!
//! A dual-mode command shell: every input line is either a traditional
//! pipeline of tokenised commands separated by `|`, or a scripted
//! expression in an embedded general-purpose language whose surface
//! matches the host data APIs (`fs.*`, `proc.*`, `net.*`, `utils.*`).
//! Both modes execute against the same in-process object model and the
//! same capability-checked system gateway.
//!
//! ## Request Lifecycle
//!
//! ```text
//! raw input ──► Parser/Classifier ──► Plan
//!                                      │
//!                                      ▼
//!                             Execution Engine ──► builtin
//!                                      │        ├► scripted evaluator
//!                                      │        └► external process
//!                                      ▼
//!                                   Value ──► Recorder (if recording)
//!                                      │  ──► Transaction log (if in tx)
//!                                      ▼
//!                                    caller
//! ```
//!
//! Every scripted call funnels through the object bridge; every bridge
//! call funnels through the capability store; every command runs under
//! the engine; and every engine invocation may sit inside a transaction
//! and/or a recording.
//!
//! ## Layers
//!
//! - **application**: the [`Kernel`](application::Kernel) façade and core
//!   builtins
//! - **infrastructure**: parser, engine, worker pool, object bridge (rhai
//!   embedding), capability store, transaction manager, recorder, config,
//!   metrics
//!
//! The domain model lives in the `nexus-shell-domain` crate; entry-point
//! concerns (CLI, signals, exit codes) live in `nexus-shell-bootstrap`.

pub mod application;
pub mod infrastructure;

pub use application::{Kernel, register_core_builtins};
pub use infrastructure::bridge::{ObjectBridge, RhaiEvaluator};
pub use infrastructure::config::ShellConfig;
pub use infrastructure::parser::InputParser;
pub use infrastructure::recorder::{ExecutionRecorder, ReplayOptions, ReplaySession};
pub use infrastructure::runtime::{ExecutionEngine, MemoryGauge, WorkerPool};
pub use infrastructure::security::{CapabilityStore, Policy};
pub use infrastructure::transaction::TransactionManager;
