// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transaction Entity
//!
//! A nestable scope over mutable shell state. `begin` captures a
//! [`StateSnapshot`](crate::entities::shell_state::StateSnapshot); commands
//! executed under the frame may register per-op rollback closures which run
//! in LIFO order on rollback, after which the snapshot is restored.
//!
//! Nesting: child frames stack on their parent. A child rollback never
//! cascades upward; a child commit hands its rollback closures to the
//! parent so an outer rollback still undoes the child's committed work.

use crate::entities::shell_state::StateSnapshot;

/// A rollback closure registered by an operation inside a transaction.
pub type RollbackFn = Box<dyn FnOnce() + Send>;

/// Transaction lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committing,
    Committed,
    RolledBack,
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Open => write!(f, "open"),
            TransactionState::Committing => write!(f, "committing"),
            TransactionState::Committed => write!(f, "committed"),
            TransactionState::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// One transaction frame: snapshot, recorded ops, and rollback closures.
pub struct Transaction {
    id: u64,
    parent: Option<u64>,
    snapshot: StateSnapshot,
    ops: Vec<String>,
    rollback: Vec<RollbackFn>,
    state: TransactionState,
}

impl Transaction {
    /// Creates an open transaction frame over a state snapshot
    pub fn new(id: u64, parent: Option<u64>, snapshot: StateSnapshot) -> Self {
        Self {
            id,
            parent,
            snapshot,
            ops: Vec::new(),
            rollback: Vec::new(),
            state: TransactionState::Open,
        }
    }

    /// Gets the transaction id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Gets the parent transaction id for nested frames
    pub fn parent(&self) -> Option<u64> {
        self.parent
    }

    /// Gets the pre-`begin` state snapshot
    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    /// Gets the descriptions of operations recorded under this frame
    pub fn ops(&self) -> &[String] {
        &self.ops
    }

    /// Gets the lifecycle state
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Sets the lifecycle state
    pub fn set_state(&mut self, state: TransactionState) {
        self.state = state;
    }

    /// Records an operation description under this frame
    pub fn record_op(&mut self, description: impl Into<String>) {
        self.ops.push(description.into());
    }

    /// Registers a rollback closure for the most recent operation
    pub fn register_rollback(&mut self, f: RollbackFn) {
        self.rollback.push(f);
    }

    /// Number of registered rollback closures
    pub fn rollback_count(&self) -> usize {
        self.rollback.len()
    }

    /// Removes and returns the rollback closures in registration order.
    ///
    /// The caller runs them in reverse (LIFO) on rollback, or merges them
    /// into the parent frame on a nested commit.
    pub fn take_rollbacks(&mut self) -> Vec<RollbackFn> {
        std::mem::take(&mut self.rollback)
    }

    /// Appends closures taken from a committed child frame, preserving
    /// their registration order relative to this frame's own closures.
    pub fn absorb_rollbacks(&mut self, from_child: Vec<RollbackFn>) {
        self.rollback.extend(from_child);
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("ops", &self.ops.len())
            .field("rollback", &self.rollback.len())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::shell_state::ShellState;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn snapshot() -> StateSnapshot {
        ShellState::new("/home/u", BTreeMap::new()).snapshot()
    }

    #[test]
    fn test_lifecycle_state_transitions() {
        let mut tx = Transaction::new(1, None, snapshot());
        assert_eq!(tx.state(), TransactionState::Open);
        tx.set_state(TransactionState::Committed);
        assert_eq!(tx.state(), TransactionState::Committed);
    }

    #[test]
    fn test_rollbacks_taken_in_registration_order() {
        let order = Arc::new(AtomicUsize::new(0));
        let mut tx = Transaction::new(1, None, snapshot());
        for i in 0..3usize {
            let order = order.clone();
            tx.register_rollback(Box::new(move || {
                // Encode position: earlier registrations must run later.
                order.fetch_add(i + 1, Ordering::SeqCst);
            }));
        }
        let closures = tx.take_rollbacks();
        assert_eq!(closures.len(), 3);
        assert_eq!(tx.rollback_count(), 0);
        for f in closures.into_iter().rev() {
            f();
        }
        assert_eq!(order.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_absorb_preserves_child_order() {
        let mut parent = Transaction::new(1, None, snapshot());
        let mut child = Transaction::new(2, Some(1), snapshot());
        parent.register_rollback(Box::new(|| {}));
        child.register_rollback(Box::new(|| {}));
        child.register_rollback(Box::new(|| {}));
        parent.absorb_rollbacks(child.take_rollbacks());
        assert_eq!(parent.rollback_count(), 3);
    }
}
