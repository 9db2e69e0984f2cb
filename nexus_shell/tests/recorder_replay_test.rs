// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Recorder and Replay Integration Tests
//!
//! Recording determinism: replaying a recording against a stub spawner
//! that replays the recorded responses produces the same result sequence
//! as the original run. Also covers breakpoint pause/resume through the
//! kernel and on-disk persistence.

use nexus_shell::infrastructure::bridge::{ObjectBridge, RhaiEvaluator};
use nexus_shell::infrastructure::config::ShellConfig;
use nexus_shell::infrastructure::metrics::MetricsBatcher;
use nexus_shell::infrastructure::parser::InputParser;
use nexus_shell::infrastructure::recorder::{ExecutionRecorder, ReplayOptions};
use nexus_shell::infrastructure::runtime::{ExecutionEngine, MemoryGauge, WorkerPool};
use nexus_shell::infrastructure::security::{AuditLog, CapabilityStore};
use nexus_shell::infrastructure::transaction::TransactionManager;
use nexus_shell::Kernel;
use nexus_shell_domain::{
    BuiltinRegistry, ProcessSpawner, ShellError, ShellState, SpawnOutput, SpawnRequest, WorkerCount,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Spawner that answers from a fixed table, recording nothing real.
struct StubSpawner {
    responses: BTreeMap<String, String>,
}

impl ProcessSpawner for StubSpawner {
    fn spawn(&self, request: SpawnRequest<'_>) -> Result<SpawnOutput, ShellError> {
        let key = request.argv.join(" ");
        match self.responses.get(&key) {
            Some(stdout) => Ok(SpawnOutput {
                code: 0,
                stdout: stdout.clone(),
                stderr: String::new(),
            }),
            None => Err(ShellError::not_found(format!("command '{}'", key))),
        }
    }
}

fn stub_engine(responses: BTreeMap<String, String>) -> (Arc<ExecutionEngine>, Arc<ExecutionRecorder>) {
    let capabilities = Arc::new(CapabilityStore::new(Arc::new(AuditLog::new(256))));
    capabilities.grant("**", None).unwrap();
    let state = Arc::new(RwLock::new(ShellState::new("/", BTreeMap::new())));
    let transactions = Arc::new(TransactionManager::new(state.clone()));
    let spawner: Arc<dyn ProcessSpawner> = Arc::new(StubSpawner { responses });
    let bridge = Arc::new(ObjectBridge::new(MemoryGauge::default(), spawner.clone()));
    let recorder = Arc::new(ExecutionRecorder::new());
    let engine = Arc::new(ExecutionEngine::new(
        InputParser::new(),
        BuiltinRegistry::new(),
        Arc::new(RhaiEvaluator::new(bridge)),
        spawner,
        capabilities,
        state,
        transactions,
        recorder.clone(),
        Arc::new(MetricsBatcher::new()),
        Arc::new(WorkerPool::new(WorkerCount::new(1))),
    ));
    (engine, recorder)
}

#[test]
fn replay_against_stub_reproduces_result_sequence() {
    let responses: BTreeMap<String, String> = [
        ("alpha".to_string(), "first\n".to_string()),
        ("beta".to_string(), "second\n".to_string()),
    ]
    .into_iter()
    .collect();
    let (engine, recorder) = stub_engine(responses.clone());

    // Original run, recorded.
    recorder.start(Some("det".to_string())).unwrap();
    let original_a = engine.execute("alpha", &engine.make_context()).unwrap();
    let original_b = engine.execute("beta", &engine.make_context()).unwrap();
    let recording = recorder.stop().unwrap();

    // Replay against a fresh engine over the same stub responses.
    let (replay_engine, _) = stub_engine(responses);
    let mut session = nexus_shell::ReplaySession::new(recording, ReplayOptions::default());
    let report = session
        .run(|line| {
            let ctx = replay_engine.make_context().with_replay(true);
            replay_engine.execute(line, &ctx)
        })
        .unwrap();

    assert!(report.finished);
    assert!(report.divergences.is_empty());
    let outcomes = session.outcomes();
    assert_eq!(outcomes[0].result.as_ref().unwrap(), &original_a);
    assert_eq!(outcomes[1].result.as_ref().unwrap(), &original_b);
}

#[test]
fn replay_reports_divergence_when_responses_change() {
    let responses: BTreeMap<String, String> =
        [("alpha".to_string(), "first\n".to_string())].into_iter().collect();
    let (engine, recorder) = stub_engine(responses);

    recorder.start(None).unwrap();
    engine.execute("alpha", &engine.make_context()).unwrap();
    let recording = recorder.stop().unwrap();

    let changed: BTreeMap<String, String> =
        [("alpha".to_string(), "CHANGED\n".to_string())].into_iter().collect();
    let (replay_engine, _) = stub_engine(changed);
    let mut session = nexus_shell::ReplaySession::new(recording, ReplayOptions::default());
    let report = session
        .run(|line| {
            let ctx = replay_engine.make_context().with_replay(true);
            replay_engine.execute(line, &ctx)
        })
        .unwrap();

    assert!(report.finished);
    assert_eq!(report.divergences, vec![0]);
}

#[tokio::test]
async fn kernel_replay_with_breakpoint_pauses_and_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ShellConfig::default();
    config.security.default_policy = "developer".to_string();
    config.security.audit_logging = false;
    let kernel = Kernel::init_at(config, dir.path().to_path_buf()).unwrap();

    kernel.start_recording(Some("steps".to_string())).unwrap();
    kernel.execute_blocking("echo one").unwrap();
    kernel.execute_blocking("echo two").unwrap();
    kernel.execute_blocking("echo three").unwrap();
    kernel.stop_recording().await.unwrap();

    let mut options = ReplayOptions::default();
    options.breakpoints.insert(1);
    let mut session = kernel.replay("steps", options).await.unwrap();

    let report = kernel.drive_replay(&mut session).unwrap();
    assert_eq!(report.paused_at, Some(1));
    assert_eq!(report.executed, 1);

    let report = kernel.drive_replay(&mut session).unwrap();
    assert!(report.finished);
    assert_eq!(report.executed, 2);
    assert!(report.divergences.is_empty());
}
