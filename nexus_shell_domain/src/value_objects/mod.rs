// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Value Objects
//!
//! Immutable domain values of the shell core: the tagged value model, the
//! parsed command plan, capability patterns, and operational bounds.

pub mod cancellation_token;
pub mod capability;
pub mod parsed_command;
pub mod parsed_input;
pub mod resource_pattern;
pub mod value;
pub mod worker_count;

pub use cancellation_token::CancellationToken;
pub use capability::Capability;
pub use parsed_command::{FlagValue, ParsedCommand};
pub use parsed_input::{InputMode, ParsedInput};
pub use resource_pattern::ResourcePattern;
pub use value::{HandleId, Value, ValueMeta, ValuePayload};
pub use worker_count::WorkerCount;
