// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Audit Log
//!
//! Every capability check appends exactly one audit record. Appends go
//! through a dedicated lock-free queue so the check path never contends on
//! the reader lock; records drain into a bounded ring buffer (oldest
//! dropped first) when queried or flushed.
//!
//! ## Record Shape
//!
//! Line-oriented JSON, one record per check:
//! `{"ts": <epoch-ms>, "action": "...", "resource": "...", "granted": bool,
//! "sandbox": "..."}` - the `sandbox` field appears only for checks made
//! inside a sandbox scope.

use chrono::Utc;
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

/// Default bound on retained audit records.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Milliseconds since the Unix epoch
    pub ts: i64,
    pub action: String,
    pub resource: String,
    pub granted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
}

impl AuditEntry {
    /// Creates a record stamped now
    pub fn now(
        action: impl Into<String>,
        resource: impl Into<String>,
        granted: bool,
        sandbox: Option<String>,
    ) -> Self {
        Self {
            ts: Utc::now().timestamp_millis(),
            action: action.into(),
            resource: resource.into(),
            granted,
            sandbox,
        }
    }
}

/// Bounded audit log with a lock-free append path.
pub struct AuditLog {
    queue: SegQueue<AuditEntry>,
    ring: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
    /// Optional JSONL sink, appended on drain
    sink_path: Option<PathBuf>,
}

impl AuditLog {
    /// Creates a log bounded to `capacity` records
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: SegQueue::new(),
            ring: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            sink_path: None,
        }
    }

    /// Creates a log that additionally appends JSONL records to a file
    pub fn with_sink(capacity: usize, sink_path: PathBuf) -> Self {
        Self {
            sink_path: Some(sink_path),
            ..Self::new(capacity)
        }
    }

    /// Appends a record; never blocks the caller
    pub fn append(&self, entry: AuditEntry) {
        self.queue.push(entry);
    }

    /// Bound on retained records
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn drain_into_ring(&self) {
        let mut ring = self.ring.lock();
        let mut pending = Vec::new();
        while let Some(entry) = self.queue.pop() {
            pending.push(entry);
        }
        if pending.is_empty() {
            return;
        }
        if let Some(path) = &self.sink_path {
            if let Err(e) = append_jsonl(path, &pending) {
                warn!("Failed to append audit sink {}: {}", path.display(), e);
            }
        }
        for entry in pending {
            if ring.len() == self.capacity {
                ring.pop_front();
            }
            ring.push_back(entry);
        }
    }

    /// All retained records, oldest first
    pub fn query(&self) -> Vec<AuditEntry> {
        self.drain_into_ring();
        self.ring.lock().iter().cloned().collect()
    }

    /// Retained records matching a predicate, oldest first
    pub fn query_filtered(&self, pred: impl Fn(&AuditEntry) -> bool) -> Vec<AuditEntry> {
        self.drain_into_ring();
        self.ring.lock().iter().filter(|e| pred(e)).cloned().collect()
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.drain_into_ring();
        self.ring.lock().len()
    }

    /// Checks whether no records are retained
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes queued records into the ring (and the sink, if configured)
    pub fn flush(&self) {
        self.drain_into_ring();
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("capacity", &self.capacity)
            .field("sink", &self.sink_path)
            .finish()
    }
}

fn append_jsonl(path: &PathBuf, entries: &[AuditEntry]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    for entry in entries {
        let line = serde_json::to_string(entry).map_err(std::io::Error::other)?;
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_query() {
        let log = AuditLog::new(16);
        log.append(AuditEntry::now("fs:read", "/tmp/a", true, None));
        log.append(AuditEntry::now("proc:kill", "1", false, Some("sbx".into())));

        let entries = log.query();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "fs:read");
        assert!(entries[0].granted);
        assert_eq!(entries[1].sandbox.as_deref(), Some("sbx"));
    }

    #[test]
    fn test_ring_drops_oldest_first() {
        let log = AuditLog::new(3);
        for i in 0..5 {
            log.append(AuditEntry::now("fs:read", format!("/f{}", i), true, None));
        }
        let entries = log.query();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].resource, "/f2");
        assert_eq!(entries[2].resource, "/f4");
    }

    #[test]
    fn test_jsonl_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::with_sink(16, path.clone());
        log.append(AuditEntry::now("net:http", "api.example.com", true, None));
        log.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        let line: AuditEntry = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(line.action, "net:http");
        assert!(line.sandbox.is_none());
    }
}
