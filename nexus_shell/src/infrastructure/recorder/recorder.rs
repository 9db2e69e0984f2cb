// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Recorder
//!
//! Captures command streams for time-travel debugging. Recording is
//! best-effort and never blocks execution: the engine records the input
//! and context snapshot before dispatch, attaches the result or error
//! after, and the recorder's mutex is held only for the append.
//!
//! One recording is active at a time; `stop` freezes and returns it for
//! persistence through the
//! [`RecordingStore`](nexus_shell_domain::RecordingStore) port.

use nexus_shell_domain::{CommandContext, Recording, ShellError, Value};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use sysinfo::System;
use tracing::{debug, warn};

/// Best-effort recorder for command streams.
pub struct ExecutionRecorder {
    active: Mutex<Option<Recording>>,
    next_id: AtomicU64,
}

impl ExecutionRecorder {
    /// Creates an idle recorder
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Starts a recording, failing if one is already active
    pub fn start(&self, name: Option<String>) -> Result<u64, ShellError> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(ShellError::invalid_argument("a recording is already active"));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = name.unwrap_or_else(|| format!("recording-{}", id));
        debug!("Recording '{}' started", name);
        *active = Some(Recording::start(id, name));
        Ok(id)
    }

    /// Checks whether a recording is active
    pub fn is_recording(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Records a command about to execute, returning its sequence number.
    ///
    /// Returns `None` when idle or when the context belongs to a replay
    /// session - replays are never re-recorded.
    pub fn record_command(&self, input: &str, ctx: &CommandContext) -> Option<u64> {
        if ctx.in_replay() {
            return None;
        }
        let mut active = self.active.lock();
        let recording = active.as_mut()?;
        let snapshot = serde_json::json!({
            "cwd": ctx.cwd().to_string_lossy(),
            "pipelineIndex": ctx.pipeline_index(),
            "pipelineLength": ctx.pipeline_length(),
            "captureStdio": ctx.capture_stdio(),
        });
        Some(recording.record_command(input, snapshot))
    }

    /// Attaches the outcome of a recorded command
    pub fn record_result(
        &self,
        seq: u64,
        result: Result<&Value, &ShellError>,
        latency_ms: u64,
    ) {
        let mut active = self.active.lock();
        let Some(recording) = active.as_mut() else {
            warn!("record_result {} with no active recording", seq);
            return;
        };
        match result {
            Ok(value) => recording.record_result(seq, Some(value.to_json()), None, latency_ms),
            Err(e) => recording.record_result(seq, None, Some(e.to_string()), latency_ms),
        }
    }

    /// Captures a system snapshot into the active recording
    pub fn create_snapshot(
        &self,
        snapshot_type: &str,
        description: &str,
        shell_state: serde_json::Value,
    ) -> Option<u64> {
        let mut active = self.active.lock();
        let recording = active.as_mut()?;

        let mut system = System::new();
        system.refresh_memory();
        let system_state = serde_json::json!({
            "memoryTotal": system.total_memory(),
            "memoryUsed": system.used_memory(),
            "platform": std::env::consts::OS,
        });
        Some(recording.add_snapshot(snapshot_type, description, system_state, shell_state))
    }

    /// Freezes and returns the active recording
    pub fn stop(&self) -> Result<Recording, ShellError> {
        let mut active = self.active.lock();
        let mut recording = active
            .take()
            .ok_or_else(|| ShellError::invalid_argument("no recording is active"))?;
        recording.finish();
        debug!(
            "Recording '{}' stopped with {} commands",
            recording.name,
            recording.commands.len()
        );
        Ok(recording)
    }
}

impl Default for ExecutionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRecorder")
            .field("recording", &self.is_recording())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_shell_domain::AllowAllGate;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn ctx() -> CommandContext {
        CommandContext::new("/home/u", BTreeMap::new(), Arc::new(AllowAllGate))
    }

    #[test]
    fn test_record_lifecycle() {
        let recorder = ExecutionRecorder::new();
        recorder.start(Some("r1".to_string())).unwrap();

        let seq = recorder.record_command("pwd", &ctx()).unwrap();
        recorder.record_result(seq, Ok(&Value::string("/home/u")), 2);

        let recording = recorder.stop().unwrap();
        assert_eq!(recording.name, "r1");
        assert_eq!(recording.commands.len(), 1);
        assert_eq!(recording.commands[0].input, "pwd");
        assert!(recording.commands[0].error.is_none());
        assert!(recording.is_finished());
    }

    #[test]
    fn test_only_one_active_recording() {
        let recorder = ExecutionRecorder::new();
        recorder.start(None).unwrap();
        assert!(recorder.start(None).is_err());
        recorder.stop().unwrap();
        assert!(recorder.start(None).is_ok());
    }

    #[test]
    fn test_replay_contexts_are_not_recorded() {
        let recorder = ExecutionRecorder::new();
        recorder.start(None).unwrap();
        let replay_ctx = ctx().with_replay(true);
        assert!(recorder.record_command("pwd", &replay_ctx).is_none());
        let recording = recorder.stop().unwrap();
        assert!(recording.commands.is_empty());
    }

    #[test]
    fn test_idle_recorder_records_nothing() {
        let recorder = ExecutionRecorder::new();
        assert!(recorder.record_command("pwd", &ctx()).is_none());
        assert!(recorder.stop().is_err());
    }

    #[test]
    fn test_snapshot_capture() {
        let recorder = ExecutionRecorder::new();
        recorder.start(None).unwrap();
        let id = recorder
            .create_snapshot("manual", "before change", serde_json::json!({"cwd": "/"}))
            .unwrap();
        let recording = recorder.stop().unwrap();
        assert_eq!(recording.snapshots.len(), 1);
        assert_eq!(recording.snapshots[id as usize].snapshot_type, "manual");
        assert!(recording.snapshots[0].system_state.get("memoryTotal").is_some());
    }
}
