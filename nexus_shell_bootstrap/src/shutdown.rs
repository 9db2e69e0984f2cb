// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! Manages graceful shutdown across application components.
//!
//! ## Design Pattern
//!
//! - **Shutdown token** for propagating the signal to async tasks
//! - **Grace period** so in-flight commands can drain
//! - **Atomic state** for idempotent initiation
//!
//! The REPL loop selects on `token.cancelled()`; the signal handler calls
//! `initiate_shutdown` exactly once, and `wait_for_shutdown` enforces the
//! grace period before the process exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Default grace period for graceful shutdown (in seconds)
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

/// Clone-able token observed by async tasks.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownToken {
    /// Checks whether shutdown has been initiated
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown is initiated
    pub async fn cancelled(&self) {
        if self.is_shutdown() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Coordinates shutdown initiation and the drain grace period.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
    grace_period: Duration,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with the given grace period
    pub fn new(grace_period: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            grace_period,
        }
    }

    /// Gets a token for async tasks
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            flag: self.flag.clone(),
            notify: self.notify.clone(),
        }
    }

    /// Initiates shutdown; idempotent
    pub fn initiate_shutdown(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Waits out the grace period after initiation
    pub async fn wait_for_shutdown(&self) {
        if !self.flag.load(Ordering::SeqCst) {
            self.token().cancelled().await;
        }
        tokio::time::sleep(self.grace_period).await;
    }

    /// Gets the configured grace period
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initiation_is_idempotent_and_observable() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(0));
        let token = coordinator.token();
        assert!(!token.is_shutdown());

        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown();
        assert!(token.is_shutdown());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_waiters_are_notified() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(0));
        let token = coordinator.token();
        let waiter = tokio::spawn(async move {
            token.cancelled().await;
            true
        });
        tokio::task::yield_now().await;
        coordinator.initiate_shutdown();
        assert!(waiter.await.unwrap());
    }
}
