// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the enterprise application layers
//! (domain, application, infrastructure) and provides:
//!
//! - **Entry point** - Application lifecycle management
//! - **Signal handling** - Graceful shutdown (SIGTERM, SIGINT, SIGHUP)
//! - **Argument parsing** - CLI surface and `NEXUS_*` environment variables
//! - **Error handling** - Unix exit code mapping (0 / 1 / 130)
//! - **Async coordination** - Shutdown coordination with a grace period
//!
//! ## Architecture Position
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          BOOTSTRAP (This Module)            │
//! │  - Entry Point                              │
//! │  - CLI + Environment Parsing                │
//! │  - Signal Handling                          │
//! │  - Exit Codes                               │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │         APPLICATION LAYER                   │
//! │  - Kernel façade                            │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_cli, validate_cli, Cli, EnvOverrides, ParseError};
pub use exit_code::ExitCode;
pub use logger::{BootstrapLogger, ConsoleLogger, NoopLogger};
pub use shutdown::{ShutdownCoordinator, ShutdownToken, DEFAULT_GRACE_PERIOD_SECS};
pub use signals::{platform_signals, ShutdownCallback, SystemSignals};
