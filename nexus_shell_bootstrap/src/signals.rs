// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # System Signal Handling
//!
//! Cross-platform signal handling for graceful shutdown.
//!
//! ## Supported Signals
//!
//! - **SIGTERM** (15) - Graceful shutdown request
//! - **SIGINT** (2) - User interrupt (Ctrl+C); the process exits 130 after
//!   draining
//! - **SIGHUP** (1) - Hangup (terminal closed), Unix only
//!
//! ## Design Pattern
//!
//! - **Async signal handling** via tokio
//! - **Trait abstraction** for testing
//! - **Callback-based** shutdown initiation

use std::future::Future;
use std::pin::Pin;

/// Callback type for shutdown notification. The argument tells the caller
/// whether the triggering signal was SIGINT (exit code 130) or another
/// shutdown signal.
pub type ShutdownCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// System signal handling trait
///
/// Abstracts platform-specific signal handling for graceful shutdown.
pub trait SystemSignals: Send + Sync {
    /// Wait for a shutdown signal and invoke the callback
    ///
    /// Blocks until SIGTERM, SIGINT, or (Unix) SIGHUP is received, then
    /// invokes the callback with `true` when the signal was SIGINT.
    fn wait_for_signal(
        &self,
        on_shutdown: ShutdownCallback,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Unix signal handler implementation
///
/// Handles SIGTERM, SIGINT, and SIGHUP using tokio::signal.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct UnixSignalHandler;

#[cfg(unix)]
impl UnixSignalHandler {
    /// Create a new Unix signal handler
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl SystemSignals for UnixSignalHandler {
    fn wait_for_signal(
        &self,
        on_shutdown: ShutdownCallback,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let sigterm = signal(SignalKind::terminate());
            let sigint = signal(SignalKind::interrupt());
            let sighup = signal(SignalKind::hangup());

            match (sigterm, sigint, sighup) {
                (Ok(mut term), Ok(mut int), Ok(mut hup)) => {
                    let was_interrupt = tokio::select! {
                        _ = term.recv() => {
                            tracing::info!("Received SIGTERM, initiating graceful shutdown");
                            false
                        }
                        _ = int.recv() => {
                            tracing::info!("Received SIGINT, initiating graceful shutdown");
                            true
                        }
                        _ = hup.recv() => {
                            tracing::info!("Received SIGHUP, initiating graceful shutdown");
                            false
                        }
                    };
                    on_shutdown(was_interrupt);
                }
                _ => {
                    tracing::error!("Failed to register Unix signal handlers");
                    on_shutdown(false);
                }
            }
        })
    }
}

/// Portable fallback handler using Ctrl+C only.
#[cfg(not(unix))]
#[derive(Debug, Default)]
pub struct CtrlCSignalHandler;

#[cfg(not(unix))]
impl CtrlCSignalHandler {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(unix))]
impl SystemSignals for CtrlCSignalHandler {
    fn wait_for_signal(
        &self,
        on_shutdown: ShutdownCallback,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                on_shutdown(true);
            } else {
                tracing::error!("Failed to register Ctrl+C handler");
                on_shutdown(false);
            }
        })
    }
}

/// Creates the signal handler for the current platform
#[cfg(unix)]
pub fn platform_signals() -> UnixSignalHandler {
    UnixSignalHandler::new()
}

/// Creates the signal handler for the current platform
#[cfg(not(unix))]
pub fn platform_signals() -> CtrlCSignalHandler {
    CtrlCSignalHandler::new()
}
