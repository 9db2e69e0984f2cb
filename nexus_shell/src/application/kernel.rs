// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Kernel Façade
//!
//! The composition root and lifecycle owner of the shell core. `init`
//! wires the capability store, bridge, engine, pool, transaction manager,
//! and recorder from configuration; `shutdown` drains them in reverse.
//! Everything the outer REPL needs - execute, completion, highlight,
//! transactions, recording, metrics - goes through this façade.
//!
//! ## Ownership
//!
//! The kernel owns every component. The bridge owns the native-handle
//! table; the recorder owns its entries; pool threads own no user-visible
//! state.

use crate::application::builtins::register_core_builtins;
use crate::infrastructure::adapters::SystemSpawner;
use crate::infrastructure::bridge::{ObjectBridge, RhaiEvaluator};
use crate::infrastructure::config::ShellConfig;
use crate::infrastructure::metrics::{MetricsBatcher, MetricsService};
use crate::infrastructure::parser::{HighlightSpan, InputParser};
use crate::infrastructure::recorder::{
    ExecutionRecorder, JsonRecordingStore, ReplayOptions, ReplayReport, ReplaySession,
};
use crate::infrastructure::runtime::{ExecutionEngine, MemoryGauge, WorkerPool};
use crate::infrastructure::security::{AuditEntry, AuditLog, CapabilityStore, DEFAULT_AUDIT_CAPACITY};
use crate::infrastructure::transaction::TransactionManager;
use nexus_shell_domain::{
    BuiltinRegistry, ProcessSpawner, Recording, RecordingStore, ScriptEvaluator, ShellError,
    ShellState, Value,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Lifecycle owner and façade over the shell core.
pub struct Kernel {
    config: ShellConfig,
    state: Arc<RwLock<ShellState>>,
    capabilities: Arc<CapabilityStore>,
    bridge: Arc<ObjectBridge>,
    engine: Arc<ExecutionEngine>,
    pool: Arc<WorkerPool>,
    transactions: Arc<TransactionManager>,
    recorder: Arc<ExecutionRecorder>,
    recording_store: Arc<JsonRecordingStore>,
    metrics_batcher: Arc<MetricsBatcher>,
    metrics: MetricsService,
}

impl Kernel {
    /// Wires and starts the shell core from configuration
    pub fn init(config: ShellConfig) -> Result<Self, ShellError> {
        let cwd = std::env::current_dir()?;
        Self::init_at(config, cwd)
    }

    /// Wires the core rooted at an explicit working directory
    pub fn init_at(config: ShellConfig, cwd: PathBuf) -> Result<Self, ShellError> {
        let env: BTreeMap<String, String> = std::env::vars().collect();
        let state = Arc::new(RwLock::new(ShellState::new(&cwd, env)));

        let audit = if config.security.audit_logging {
            Arc::new(AuditLog::with_sink(
                DEFAULT_AUDIT_CAPACITY,
                cwd.join(".nexus").join("audit.log"),
            ))
        } else {
            Arc::new(AuditLog::new(DEFAULT_AUDIT_CAPACITY))
        };
        let capabilities = Arc::new(CapabilityStore::new(audit));
        capabilities.apply_policy_name(&config.security.default_policy)?;
        for pattern in &config.security.capabilities {
            capabilities.grant(pattern, None)?;
        }
        if config.shell.enable_sandbox {
            // The sandbox scope intersects the active policy with a
            // read-only allow-list.
            capabilities.create_sandbox(
                "shell",
                vec![
                    "shell:**".to_string(),
                    "fs:read:**".to_string(),
                    "fs:find:**".to_string(),
                    "proc:list:**".to_string(),
                    "proc:info:**".to_string(),
                    "utils:**".to_string(),
                ],
            )?;
            capabilities.enter_sandbox("shell")?;
        }

        let gauge = MemoryGauge::new(config.shell.max_memory);
        let spawner: Arc<dyn ProcessSpawner> = Arc::new(SystemSpawner::new());
        let bridge = Arc::new(ObjectBridge::new(gauge, spawner.clone()));
        let evaluator: Arc<dyn ScriptEvaluator> = Arc::new(RhaiEvaluator::new(bridge.clone()));

        let pool = Arc::new(WorkerPool::new(config.worker_count()));
        let transactions = Arc::new(TransactionManager::new(state.clone()));
        let recorder = Arc::new(ExecutionRecorder::new());
        let metrics_batcher = Arc::new(MetricsBatcher::new());
        let metrics = MetricsService::new()?;

        let mut builtins = BuiltinRegistry::new();
        register_core_builtins(&mut builtins, state.clone(), transactions.clone());

        let engine = Arc::new(ExecutionEngine::new(
            InputParser::new(),
            builtins,
            evaluator,
            spawner,
            capabilities.clone(),
            state.clone(),
            transactions.clone(),
            recorder.clone(),
            metrics_batcher.clone(),
            pool.clone(),
        ));
        let recording_store = Arc::new(JsonRecordingStore::new(&cwd));

        info!(
            "Kernel initialized: policy '{}', {} workers, {} byte value cap",
            config.security.default_policy,
            pool.size(),
            config.shell.max_memory
        );
        Ok(Self {
            config,
            state,
            capabilities,
            bridge,
            engine,
            pool,
            transactions,
            recorder,
            recording_store,
            metrics_batcher,
            metrics,
        })
    }

    /// The loaded configuration
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// The execution engine
    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// The capability store
    pub fn capabilities(&self) -> &Arc<CapabilityStore> {
        &self.capabilities
    }

    /// The object bridge
    pub fn bridge(&self) -> &Arc<ObjectBridge> {
        &self.bridge
    }

    /// The authoritative shell state
    pub fn state(&self) -> &Arc<RwLock<ShellState>> {
        &self.state
    }

    /// Executes one line on the worker pool
    pub async fn execute(&self, line: &str) -> Result<Value, ShellError> {
        let ctx = self.engine.make_context();
        self.engine
            .execute_async(line.to_string(), ctx)
            .join()
            .await?
    }

    /// Executes one line inline on the caller thread
    pub fn execute_blocking(&self, line: &str) -> Result<Value, ShellError> {
        let ctx = self.engine.make_context();
        self.engine.execute(line, &ctx)
    }

    /// Completion candidates for the word under the cursor
    pub fn completions(&self, line: &str, cursor: usize) -> Vec<String> {
        self.engine.parser().completions(line, cursor)
    }

    /// Highlight spans for one line
    pub fn highlight(&self, line: &str) -> Vec<HighlightSpan> {
        self.engine.parser().highlight(line)
    }

    /// Begins a transaction
    pub fn begin_transaction(&self) -> u64 {
        self.transactions.begin()
    }

    /// Commits a transaction
    pub fn commit_transaction(&self, tx_id: u64) -> Result<(), ShellError> {
        self.transactions.commit(tx_id)
    }

    /// Rolls back a transaction
    pub fn rollback_transaction(&self, tx_id: u64) -> Result<(), ShellError> {
        self.transactions.rollback(tx_id)
    }

    /// Runs commands under one transaction with an optional rollback hook
    pub fn execute_transaction(
        &self,
        commands: &[String],
        on_rollback: Option<Box<dyn FnOnce() + Send>>,
    ) -> Result<Vec<Value>, ShellError> {
        self.transactions.execute_transaction(
            commands,
            |line| self.execute_blocking(line),
            on_rollback,
        )
    }

    /// Starts a recording
    pub fn start_recording(&self, name: Option<String>) -> Result<u64, ShellError> {
        self.recorder.start(name)
    }

    /// Checks whether a recording is active
    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Captures a snapshot into the active recording
    pub fn create_snapshot(&self, snapshot_type: &str, description: &str) -> Option<u64> {
        let state = self.state.read();
        let shell_state = serde_json::json!({
            "cwd": state.cwd().to_string_lossy(),
            "envCount": state.env().len(),
            "aliases": state.aliases(),
        });
        drop(state);
        self.recorder
            .create_snapshot(snapshot_type, description, shell_state)
    }

    /// Stops the active recording, persists it, and returns it
    pub async fn stop_recording(&self) -> Result<Recording, ShellError> {
        let recording = self.recorder.stop()?;
        self.recording_store.save(&recording).await?;
        Ok(recording)
    }

    /// Loads a persisted recording by name
    pub async fn load_recording(&self, name: &str) -> Result<Recording, ShellError> {
        self.recording_store.load(name).await
    }

    /// Names of persisted recordings
    pub async fn list_recordings(&self) -> Result<Vec<String>, ShellError> {
        self.recording_store.list().await
    }

    /// Opens a replay session over a persisted recording
    pub async fn replay(
        &self,
        name: &str,
        options: ReplayOptions,
    ) -> Result<ReplaySession, ShellError> {
        let recording = self.load_recording(name).await?;
        Ok(ReplaySession::new(recording, options))
    }

    /// Runs a replay session until its next breakpoint or the end.
    ///
    /// Every re-issued command executes with `in_replay = true` so
    /// builtins and bridge methods can behave deterministically.
    pub fn drive_replay(&self, session: &mut ReplaySession) -> Result<ReplayReport, ShellError> {
        session.run(|line| {
            let ctx = self.engine.make_context().with_replay(true);
            self.engine.execute(line, &ctx)
        })
    }

    /// Renders current metrics in the Prometheus text format
    pub fn metrics_text(&self) -> Result<String, ShellError> {
        self.metrics.fold_batcher(&self.metrics_batcher);
        self.metrics.set_runtime_gauges(
            self.pool.active(),
            self.pool.size(),
            self.bridge.gauge().used(),
            self.bridge.handles().len(),
        );
        self.metrics.render()
    }

    /// Retained audit records, oldest first
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.capabilities.audit().query()
    }

    /// Stops recording (persisting it), flushes audit, drains the pool
    pub async fn shutdown(&self) -> Result<(), ShellError> {
        if self.recorder.is_recording() {
            match self.stop_recording().await {
                Ok(recording) => debug!("Final recording '{}' persisted", recording.name),
                Err(e) => debug!("Could not persist final recording: {}", e),
            }
        }
        self.capabilities.audit().flush();
        self.pool.shutdown();
        info!("Kernel shut down");
        Ok(())
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("policy", &self.config.security.default_policy)
            .field("workers", &self.pool.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel_at(dir: &std::path::Path) -> Kernel {
        let mut config = ShellConfig::default();
        config.security.default_policy = "developer".to_string();
        config.security.audit_logging = false;
        Kernel::init_at(config, dir.to_path_buf()).unwrap()
    }

    #[tokio::test]
    async fn test_execute_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = kernel_at(dir.path());
        let result = kernel.execute("echo kernel").await.unwrap();
        assert_eq!(
            result.as_map().unwrap().get("stdout").unwrap().as_str(),
            Some("kernel\n")
        );
        kernel.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cd_transaction_rollback_restores_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let kernel = kernel_at(dir.path());

        let tx = kernel.begin_transaction();
        kernel
            .execute_blocking(&format!("cd {}", sub.display()))
            .unwrap();
        assert_eq!(kernel.state().read().cwd(), sub);

        kernel.rollback_transaction(tx).unwrap();
        assert_eq!(kernel.state().read().cwd(), dir.path());
    }

    #[tokio::test]
    async fn test_recording_two_commands_persists_file() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = kernel_at(dir.path());

        kernel.start_recording(Some("r1".to_string())).unwrap();
        kernel.execute_blocking("pwd").unwrap();
        kernel.execute_blocking("echo two").unwrap();
        let recording = kernel.stop_recording().await.unwrap();

        assert_eq!(recording.commands.len(), 2);
        for entry in &recording.commands {
            assert!(!entry.input.is_empty());
            assert!(entry.result.is_some());
        }
        let path = dir.path().join(".nexus/recordings/r1.json");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_metrics_text_renders() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = kernel_at(dir.path());
        kernel.execute_blocking("echo m").unwrap();
        let text = kernel.metrics_text().unwrap();
        assert!(text.contains("nexus_shell_commands_total"));
    }
}
