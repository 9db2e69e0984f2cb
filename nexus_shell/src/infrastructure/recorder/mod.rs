// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Recorder Infrastructure
//!
//! Command-stream capture, deterministic replay, and JSON persistence.

pub mod recorder;
pub mod replay;
pub mod store;

pub use recorder::ExecutionRecorder;
pub use replay::{ReplayOptions, ReplayOutcome, ReplayReport, ReplaySession};
pub use store::JsonRecordingStore;
