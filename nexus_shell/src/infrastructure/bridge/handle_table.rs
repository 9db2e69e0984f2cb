// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Native Handle Table
//!
//! Pins native resources behind opaque ids so they can cross the bridge as
//! handle values. Entries stay pinned until explicitly released; each entry
//! may hold a memory reservation that is returned to the gauge on release.
//!
//! The table is sharded: lookups hash the id onto one of a fixed number of
//! independent locks, so concurrent surface calls rarely contend.

use crate::infrastructure::runtime::memory_gauge::MemoryReservation;
use nexus_shell_domain::HandleId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const SHARD_COUNT: usize = 16;

struct Entry<T> {
    value: Arc<T>,
    _reservation: Option<MemoryReservation>,
}

/// Sharded id → resource table.
pub struct HandleTable<T> {
    shards: Vec<RwLock<HashMap<HandleId, Entry<T>>>>,
    next_id: AtomicU64,
}

impl<T> HandleTable<T> {
    /// Creates an empty table
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            next_id: AtomicU64::new(1),
        }
    }

    fn shard(&self, id: HandleId) -> &RwLock<HashMap<HandleId, Entry<T>>> {
        &self.shards[(id as usize) % SHARD_COUNT]
    }

    /// Pins a resource, returning its handle id
    pub fn pin(&self, value: T, reservation: Option<MemoryReservation>) -> HandleId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.shard(id).write().insert(
            id,
            Entry {
                value: Arc::new(value),
                _reservation: reservation,
            },
        );
        id
    }

    /// Resolves a handle id to its pinned resource
    pub fn get(&self, id: HandleId) -> Option<Arc<T>> {
        self.shard(id).read().get(&id).map(|e| e.value.clone())
    }

    /// Releases a handle, returning whether it was pinned.
    ///
    /// Any memory reservation held by the entry is returned to the gauge.
    pub fn release(&self, id: HandleId) -> bool {
        self.shard(id).write().remove(&id).is_some()
    }

    /// Number of pinned handles
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    /// Checks whether no handles are pinned
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for HandleTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleTable").field("pinned", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_get_release() {
        let table: HandleTable<String> = HandleTable::new();
        let id = table.pin("resource".to_string(), None);
        assert_eq!(table.get(id).unwrap().as_str(), "resource");
        assert_eq!(table.len(), 1);

        assert!(table.release(id));
        assert!(table.get(id).is_none());
        assert!(!table.release(id));
        assert!(table.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let table: HandleTable<u32> = HandleTable::new();
        let a = table.pin(1, None);
        let b = table.pin(2, None);
        assert_ne!(a, b);
        assert_eq!(*table.get(b).unwrap(), 2);
    }

    #[test]
    fn test_release_returns_reservation() {
        use crate::infrastructure::runtime::memory_gauge::MemoryGauge;
        let gauge = MemoryGauge::new(100);
        let table: HandleTable<u32> = HandleTable::new();
        let id = table.pin(9, Some(gauge.try_charge(40).unwrap()));
        assert_eq!(gauge.used(), 40);
        table.release(id);
        assert_eq!(gauge.used(), 0);
    }
}
