// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transaction Infrastructure
//!
//! Snapshot/rollback scoping over the mutable shell state.

pub mod manager;

pub use manager::{RollbackCallback, TransactionManager};
