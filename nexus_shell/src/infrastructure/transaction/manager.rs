// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transaction Manager
//!
//! A stack of active transaction frames over the mutable shell state.
//! `begin` snapshots `{cwd, env, aliases}`; operations executed under the
//! frame may register per-op rollback closures; `rollback` runs the
//! closures in LIFO order and restores the snapshot, making the state
//! bit-identical to the pre-`begin` capture.
//!
//! ## Nesting
//!
//! Frames nest: a child rollback never cascades to its parent, and a
//! child commit merges the child's rollback closures into the parent so
//! an outer rollback still undoes committed inner work.
//!
//! Errors inside rollback closures are logged and skipped - rollback
//! never throws to the caller.

use nexus_shell_domain::{
    RollbackFn, ShellError, ShellState, Transaction, TransactionState, Value,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Options for `execute_transaction`.
pub type RollbackCallback = Box<dyn FnOnce() + Send>;

/// Stack-of-frames transaction manager.
pub struct TransactionManager {
    stack: Mutex<Vec<Transaction>>,
    next_id: AtomicU64,
    state: Arc<RwLock<ShellState>>,
}

impl TransactionManager {
    /// Creates a manager over the authoritative shell state
    pub fn new(state: Arc<RwLock<ShellState>>) -> Self {
        Self {
            stack: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            state,
        }
    }

    /// Begins a transaction, returning its id
    pub fn begin(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.state.read().snapshot();
        let mut stack = self.stack.lock();
        let parent = stack.last().map(|tx| tx.id());
        stack.push(Transaction::new(id, parent, snapshot));
        debug!("Transaction {} begun (parent {:?})", id, parent);
        id
    }

    /// The innermost open transaction id
    pub fn current(&self) -> Option<u64> {
        self.stack.lock().last().map(|tx| tx.id())
    }

    /// Open transaction depth
    pub fn depth(&self) -> usize {
        self.stack.lock().len()
    }

    /// Records an operation description under the innermost frame
    pub fn record_op(&self, description: impl Into<String>) -> bool {
        let mut stack = self.stack.lock();
        match stack.last_mut() {
            Some(tx) => {
                tx.record_op(description);
                true
            }
            None => false,
        }
    }

    /// Registers a rollback closure for the most recent operation.
    ///
    /// Returns false (and drops the closure) when no transaction is open.
    pub fn register_rollback(&self, f: RollbackFn) -> bool {
        let mut stack = self.stack.lock();
        match stack.last_mut() {
            Some(tx) => {
                tx.register_rollback(f);
                true
            }
            None => false,
        }
    }

    fn pop_checked(&self, tx_id: u64) -> Result<Transaction, ShellError> {
        let mut stack = self.stack.lock();
        match stack.last() {
            Some(top) if top.id() == tx_id => Ok(stack
                .pop()
                .unwrap_or_else(|| unreachable!("stack top just observed"))),
            Some(top) => Err(ShellError::transaction_aborted(format!(
                "transaction {} is not innermost (top is {})",
                tx_id,
                top.id()
            ))),
            None => Err(ShellError::transaction_aborted(format!(
                "transaction {} is not open",
                tx_id
            ))),
        }
    }

    /// Commits the innermost transaction.
    ///
    /// A nested commit hands its rollback closures to the parent frame so
    /// an outer rollback undoes the committed inner work too.
    pub fn commit(&self, tx_id: u64) -> Result<(), ShellError> {
        let mut tx = self.pop_checked(tx_id)?;
        tx.set_state(TransactionState::Committing);
        let rollbacks = tx.take_rollbacks();

        let mut stack = self.stack.lock();
        if let Some(parent) = stack.last_mut() {
            parent.absorb_rollbacks(rollbacks);
        }
        tx.set_state(TransactionState::Committed);
        debug!("Transaction {} committed ({} ops)", tx_id, tx.ops().len());
        Ok(())
    }

    /// Rolls back the innermost transaction: closures run LIFO, then the
    /// snapshot is restored. Never throws for closure failures.
    pub fn rollback(&self, tx_id: u64) -> Result<(), ShellError> {
        let mut tx = self.pop_checked(tx_id)?;
        let rollbacks = tx.take_rollbacks();
        for f in rollbacks.into_iter().rev() {
            if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
                warn!(
                    "Rollback closure for transaction {} failed: {:?}",
                    tx_id, panic
                );
            }
        }
        self.state.write().restore(tx.snapshot());
        tx.set_state(TransactionState::RolledBack);
        debug!("Transaction {} rolled back", tx_id);
        Ok(())
    }

    /// Rolls back the innermost transaction, if any
    pub fn rollback_current(&self) -> Option<u64> {
        let id = self.current()?;
        match self.rollback(id) {
            Ok(()) => Some(id),
            Err(e) => {
                warn!("Failed to roll back transaction {}: {}", id, e);
                None
            }
        }
    }

    /// Runs `commands` under one transaction: commit on success, rollback
    /// (plus the caller's `on_rollback`) on the first failure. The failing
    /// command's error propagates unchanged.
    pub fn execute_transaction<E>(
        &self,
        commands: &[String],
        mut execute: E,
        on_rollback: Option<RollbackCallback>,
    ) -> Result<Vec<Value>, ShellError>
    where
        E: FnMut(&str) -> Result<Value, ShellError>,
    {
        let tx_id = self.begin();
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            self.record_op(command.clone());
            match execute(command) {
                Ok(value) => results.push(value),
                Err(e) => {
                    if let Err(rb) = self.rollback(tx_id) {
                        warn!("Rollback after failed command errored: {}", rb);
                    }
                    if let Some(cb) = on_rollback {
                        cb();
                    }
                    return Err(e);
                }
            }
        }
        self.commit(tx_id)?;
        Ok(results)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("depth", &self.depth())
            .finish()
    }
}
