// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Service Ports
//!
//! Trait seams implemented by the infrastructure layer: the capability
//! gate, the embedded script evaluator, the process spawner, and the
//! builtin command registry.

pub mod builtin_command;
pub mod capability_gate;
pub mod checksum;
pub mod process_spawner;
pub mod script_evaluator;

pub use builtin_command::{BuiltinCommand, BuiltinRegistry};
pub use capability_gate::{AllowAllGate, CapabilityGate};
pub use checksum::HashAlgorithm;
pub use process_spawner::{ProcessSpawner, SpawnOutput, SpawnRequest};
pub use script_evaluator::ScriptEvaluator;
