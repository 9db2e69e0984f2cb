// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Runtime Infrastructure
//!
//! The execution engine, the fixed-size worker pool, and live-value
//! memory accounting.

pub mod engine;
pub mod memory_gauge;
pub mod worker_pool;

pub use engine::ExecutionEngine;
pub use memory_gauge::{MemoryGauge, MemoryReservation, DEFAULT_MEMORY_CAP};
pub use worker_pool::{TaskHandle, WorkerPool};
