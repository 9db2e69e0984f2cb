// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Concrete implementations behind the domain's ports: the parser, the
//! execution engine and worker pool, the object bridge with its rhai
//! embedding, the capability store, the transaction manager, the
//! execution recorder, configuration, and metrics.

pub mod adapters;
pub mod bridge;
pub mod config;
pub mod metrics;
pub mod parser;
pub mod recorder;
pub mod runtime;
pub mod security;
pub mod transaction;
