// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration Infrastructure
//!
//! JSON configuration loading with environment overrides.

pub mod shell_config;

pub use shell_config::{parse_byte_spec, PerformanceSection, SecuritySection, ShellConfig, ShellSection, Thresholds};
