// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Recording Entity
//!
//! An append-only captured command stream for time-travel debugging. Each
//! entry records the input line, a context snapshot, the result or error,
//! and the observed latency; interleaved system snapshots capture coarse
//! host and shell state.
//!
//! ## Document Format
//!
//! The entity serialises directly into the on-disk JSON document written to
//! `<cwd>/.nexus/recordings/<name>.json`:
//!
//! ```json
//! { "id": 1, "name": "r1", "startTime": 0, "endTime": 0, "duration": 0,
//!   "metadata": { "shell": "nexus-shell", "version": "1.0.0", "platform": "linux" },
//!   "commands": [ { "id": 0, "timestamp": 0, "input": "pwd",
//!                   "context": {}, "result": null, "error": null,
//!                   "executionTime": 0 } ],
//!   "snapshots": [] }
//! ```
//!
//! Timestamps are milliseconds since the Unix epoch. Consumers must accept
//! unknown keys at the top level and inside entries; serde's default
//! ignore-unknown behaviour provides exactly that.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Producer identification embedded in every recording document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub shell: String,
    pub version: String,
    pub platform: String,
}

impl Default for RecordingMetadata {
    fn default() -> Self {
        Self {
            shell: "nexus-shell".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
        }
    }
}

/// One captured command: input, context snapshot, outcome, latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingEntry {
    /// Sequence number within the recording
    pub id: u64,
    /// Milliseconds since the Unix epoch at capture time
    pub timestamp: i64,
    pub input: String,
    /// Context snapshot captured when the command began
    pub context: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Observed latency in milliseconds
    #[serde(default)]
    pub execution_time: u64,
}

/// A point-in-time capture of system and shell state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    pub id: u64,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub snapshot_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system_state: serde_json::Value,
    #[serde(default)]
    pub shell_state: serde_json::Value,
}

/// An append-only captured command stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: u64,
    pub name: String,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub metadata: RecordingMetadata,
    #[serde(default)]
    pub commands: Vec<RecordingEntry>,
    #[serde(default)]
    pub snapshots: Vec<SystemSnapshot>,
}

impl Recording {
    /// Creates an empty recording that starts now
    pub fn start(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            start_time: Utc::now().timestamp_millis(),
            end_time: 0,
            duration: 0,
            metadata: RecordingMetadata::default(),
            commands: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    /// Appends a command entry, returning its sequence number
    pub fn record_command(&mut self, input: impl Into<String>, context: serde_json::Value) -> u64 {
        let seq = self.commands.len() as u64;
        self.commands.push(RecordingEntry {
            id: seq,
            timestamp: Utc::now().timestamp_millis(),
            input: input.into(),
            context,
            result: None,
            error: None,
            execution_time: 0,
        });
        seq
    }

    /// Attaches the outcome of a previously recorded command
    pub fn record_result(
        &mut self,
        seq: u64,
        result: Option<serde_json::Value>,
        error: Option<String>,
        execution_time_ms: u64,
    ) {
        if let Some(entry) = self.commands.get_mut(seq as usize) {
            entry.result = result;
            entry.error = error;
            entry.execution_time = execution_time_ms;
        }
    }

    /// Appends a system snapshot, returning its id
    pub fn add_snapshot(
        &mut self,
        snapshot_type: impl Into<String>,
        description: impl Into<String>,
        system_state: serde_json::Value,
        shell_state: serde_json::Value,
    ) -> u64 {
        let id = self.snapshots.len() as u64;
        self.snapshots.push(SystemSnapshot {
            id,
            timestamp: Utc::now().timestamp_millis(),
            snapshot_type: snapshot_type.into(),
            description: description.into(),
            system_state,
            shell_state,
        });
        id
    }

    /// Freezes the recording, fixing `endTime` and `duration`
    pub fn finish(&mut self) {
        self.end_time = Utc::now().timestamp_millis();
        self.duration = self.end_time - self.start_time;
    }

    /// Checks whether the recording has been frozen by `finish`
    pub fn is_finished(&self) -> bool {
        self.end_time != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_attach_result() {
        let mut rec = Recording::start(1, "r1");
        let seq = rec.record_command("pwd", serde_json::json!({"cwd": "/home/u"}));
        assert_eq!(seq, 0);
        rec.record_result(seq, Some(serde_json::json!("/home/u")), None, 3);

        let entry = &rec.commands[0];
        assert_eq!(entry.input, "pwd");
        assert_eq!(entry.execution_time, 3);
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_finish_freezes_duration() {
        let mut rec = Recording::start(1, "r1");
        assert!(!rec.is_finished());
        rec.finish();
        assert!(rec.is_finished());
        assert!(rec.duration >= 0);
        assert!(rec.end_time >= rec.start_time);
    }

    #[test]
    fn test_document_round_trip_tolerates_unknown_keys() {
        let mut rec = Recording::start(7, "demo");
        rec.record_command("date", serde_json::json!({}));
        rec.finish();

        let mut doc = serde_json::to_value(&rec).unwrap();
        doc["futureField"] = serde_json::json!({"x": 1});
        doc["commands"][0]["annotations"] = serde_json::json!(["a"]);

        let parsed: Recording = serde_json::from_value(doc).unwrap();
        assert_eq!(parsed.name, "demo");
        assert_eq!(parsed.commands.len(), 1);
        assert_eq!(parsed.commands[0].input, "date");
    }

    #[test]
    fn test_serialised_keys_are_camel_case() {
        let rec = Recording::start(1, "r1");
        let doc = serde_json::to_value(&rec).unwrap();
        assert!(doc.get("startTime").is_some());
        assert!(doc.get("endTime").is_some());
        assert!(doc.get("metadata").is_some());
    }
}
