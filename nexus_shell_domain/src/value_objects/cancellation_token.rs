// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cancellation Token
//!
//! Cooperative cancellation for asynchronous and blocking work. A token is
//! cloned into every [`CommandContext`](crate::entities::CommandContext);
//! bridge surfaces check it at I/O boundaries and return a `Cancelled`
//! error once it fires. An optional deadline makes the token fire by
//! itself; checks past the deadline report `Timeout` instead.
//!
//! Cancellation is cooperative: a running operation may complete past its
//! deadline, in which case the engine discards the result.

use crate::error::ShellError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

/// Cooperative cancellation flag with an optional deadline.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a token that never fires on its own
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline: None,
            }),
        }
    }

    /// Creates a token that fires once `deadline` passes
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline: Some(deadline),
            }),
        }
    }

    /// Fires the token
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Checks whether the token has fired or the deadline has passed
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.inner.deadline, Some(d) if Instant::now() >= d)
    }

    /// Returns an error if the token has fired.
    ///
    /// A deadline expiry reports `Timeout`; an explicit `cancel` reports
    /// `Cancelled`. Called by bridge surfaces at I/O boundaries.
    pub fn check(&self, what: &str) -> Result<(), ShellError> {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return Err(ShellError::cancelled(what.to_string()));
        }
        if matches!(self.inner.deadline, Some(d) if Instant::now() >= d) {
            return Err(ShellError::timeout(what.to_string()));
        }
        Ok(())
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
