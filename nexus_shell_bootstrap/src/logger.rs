// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Logger
//!
//! Lightweight logging abstraction for the bootstrap phase.
//!
//! ## Design Rationale
//!
//! Application logging goes through `tracing` once the subscriber is
//! installed, but bootstrap itself runs before that point. This trait
//! keeps bootstrap messages testable and routes them through tracing when
//! it is available.

/// Bootstrap logging abstraction
pub trait BootstrapLogger: Send + Sync {
    /// Log a fatal bootstrap error
    fn error(&self, message: &str);

    /// Log a non-fatal bootstrap issue
    fn warn(&self, message: &str);

    /// Log normal bootstrap progress
    fn info(&self, message: &str);

    /// Log detailed bootstrap diagnostics
    fn debug(&self, message: &str);
}

/// Console logger implementation routing through the tracing crate.
#[derive(Debug, Default)]
pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    /// Create a new console logger with the default prefix
    pub fn new() -> Self {
        Self::with_prefix("bootstrap")
    }

    /// Create a new console logger with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        tracing::error!("[{}] {}", self.prefix, message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("[{}] {}", self.prefix, message);
    }

    fn info(&self, message: &str) {
        tracing::info!("[{}] {}", self.prefix, message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!("[{}] {}", self.prefix, message);
    }
}

/// No-op logger for tests.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl BootstrapLogger for NoopLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loggers_do_not_panic_without_subscriber() {
        let console = ConsoleLogger::new();
        console.info("starting");
        console.debug("details");

        let noop = NoopLogger;
        noop.error("ignored");
    }
}
