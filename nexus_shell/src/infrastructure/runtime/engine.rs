// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Engine
//!
//! Dispatches parsed plans to builtins, the scripted evaluator, or the
//! external-process path, and manages pipeline data flow.
//!
//! ## Dispatch Order
//!
//! 1. Scripted plans go to the embedded evaluator
//! 2. Alias resolution on the command name - a single lookup, cycles error
//! 3. Registered builtins
//! 4. The external-process path
//!
//! ## Invocation State Machine
//!
//! `parsed → permission_check → (record) → execute → (record_result) →
//! return`. A permission failure is terminal and skips execute; recording
//! is best-effort and never blocks execute. A failing command inside a
//! transaction triggers that transaction's rollback; the command's error
//! still propagates to the caller.
//!
//! ## Pipelines
//!
//! Stages run sequentially; each stage observes the previous stage's
//! result as `pipeline_input`. The first failing stage aborts the
//! pipeline. A one-stage pipeline is identical to executing the command
//! alone.

use crate::infrastructure::metrics::MetricsBatcher;
use crate::infrastructure::parser::tokenizer::tokenize;
use crate::infrastructure::parser::InputParser;
use crate::infrastructure::recorder::ExecutionRecorder;
use crate::infrastructure::runtime::worker_pool::{TaskHandle, WorkerPool};
use crate::infrastructure::security::CapabilityStore;
use crate::infrastructure::transaction::TransactionManager;
use nexus_shell_domain::{
    BuiltinRegistry, CapabilityGate, CommandContext, InputMode, ParsedCommand, ParsedInput,
    ProcessSpawner, ScriptEvaluator, ShellError, ShellState, SpawnRequest, Value,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// The request-lifecycle engine: parse, gate, dispatch, record.
pub struct ExecutionEngine {
    parser: InputParser,
    builtins: BuiltinRegistry,
    evaluator: Arc<dyn ScriptEvaluator>,
    spawner: Arc<dyn ProcessSpawner>,
    capabilities: Arc<CapabilityStore>,
    state: Arc<RwLock<ShellState>>,
    transactions: Arc<TransactionManager>,
    recorder: Arc<ExecutionRecorder>,
    metrics: Arc<MetricsBatcher>,
    pool: Arc<WorkerPool>,
}

impl ExecutionEngine {
    /// Wires the engine over its collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mut parser: InputParser,
        builtins: BuiltinRegistry,
        evaluator: Arc<dyn ScriptEvaluator>,
        spawner: Arc<dyn ProcessSpawner>,
        capabilities: Arc<CapabilityStore>,
        state: Arc<RwLock<ShellState>>,
        transactions: Arc<TransactionManager>,
        recorder: Arc<ExecutionRecorder>,
        metrics: Arc<MetricsBatcher>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        parser.set_known_commands(builtins.names().map(String::from).collect());
        Self {
            parser,
            builtins,
            evaluator,
            spawner,
            capabilities,
            state,
            transactions,
            recorder,
            metrics,
            pool,
        }
    }

    /// The parser (completion and highlight source of truth)
    pub fn parser(&self) -> &InputParser {
        &self.parser
    }

    /// The authoritative shell state
    pub fn state(&self) -> &Arc<RwLock<ShellState>> {
        &self.state
    }

    /// The transaction manager
    pub fn transactions(&self) -> &Arc<TransactionManager> {
        &self.transactions
    }

    /// Builds a context from a consistent snapshot of the shell state
    pub fn make_context(&self) -> CommandContext {
        let state = self.state.read();
        CommandContext::new(
            state.cwd(),
            state.env().clone(),
            self.capabilities.clone() as Arc<dyn CapabilityGate>,
        )
    }

    /// Primary entry point: parse and dispatch one input line
    pub fn execute(&self, line: &str, ctx: &CommandContext) -> Result<Value, ShellError> {
        let plan = self.parser.parse(line)?;
        let seq = self.recorder.record_command(line, ctx);
        let started = Instant::now();

        let result = self.dispatch(&plan, ctx);

        if let Some(seq) = seq {
            let latency_ms = started.elapsed().as_millis() as u64;
            self.recorder.record_result(seq, result.as_ref(), latency_ms);
        }
        if result.is_err() {
            if let Some(tx) = self.transactions.rollback_current() {
                warn!("Command failure rolled back transaction {}", tx);
            }
        }
        result
    }

    fn dispatch(&self, plan: &ParsedInput, ctx: &CommandContext) -> Result<Value, ShellError> {
        match plan.mode() {
            InputMode::Scripted | InputMode::Mixed => {
                let script = plan
                    .script()
                    .ok_or_else(|| ShellError::internal_error("scripted plan without script"))?;
                self.execute_scripted(script, ctx)
            }
            InputMode::Traditional => {
                if plan.commands().is_empty() {
                    return Ok(Value::null());
                }
                self.execute_pipeline(plan.commands(), ctx)
            }
        }
    }

    /// Chains pipeline stages, threading each result into the next
    /// stage's `pipeline_input`. The final stage's value is returned.
    pub fn execute_pipeline(
        &self,
        commands: &[ParsedCommand],
        ctx: &CommandContext,
    ) -> Result<Value, ShellError> {
        let length = commands.len();
        let mut carried = ctx.pipeline_input().cloned();
        let mut result = Value::null();
        for (index, command) in commands.iter().enumerate() {
            let mut stage_ctx = ctx
                .clone()
                .with_args(command.args().to_vec())
                .with_flags(command.flags().clone())
                .for_stage(index, length);
            stage_ctx.set_pipeline_input(carried.take());

            result = self.execute_single(command, &mut stage_ctx)?;
            carried = Some(result.clone());
        }
        Ok(result)
    }

    /// Runs one command and emits its `(name, latency_us, ok)` metric
    pub fn execute_single(
        &self,
        command: &ParsedCommand,
        ctx: &mut CommandContext,
    ) -> Result<Value, ShellError> {
        let started = Instant::now();
        let outcome = self.run_single(command, ctx);
        self.metrics.record(
            command.name(),
            started.elapsed().as_micros() as u64,
            outcome.is_ok(),
        );
        outcome
    }

    fn run_single(
        &self,
        command: &ParsedCommand,
        ctx: &mut CommandContext,
    ) -> Result<Value, ShellError> {
        // Single alias lookup; no recursive expansion, cycles error.
        let resolved = {
            let state = self.state.read();
            match state.resolve_alias(command.name())? {
                Some(target) => target.to_string(),
                None => command.name().to_string(),
            }
        };

        // Permission failure is terminal and skips execute.
        ctx.capabilities().require("shell:execute", &resolved)?;

        if let Some(builtin) = self.builtins.get(&resolved) {
            debug!("Running builtin '{}'", resolved);
            return builtin.run(ctx);
        }
        self.execute_external(command, &resolved, ctx)
    }

    fn execute_external(
        &self,
        command: &ParsedCommand,
        resolved: &str,
        ctx: &CommandContext,
    ) -> Result<Value, ShellError> {
        // Rebuild raw argv from the segment text: flag folding applies to
        // builtins only, external processes receive the tokens verbatim.
        let tokens = tokenize(command.raw())?;
        let mut argv: Vec<String> = tokens.into_iter().map(|t| t.text).collect();
        if command.background() && argv.last().map(String::as_str) == Some("&") {
            argv.pop();
        }
        if argv.is_empty() {
            return Err(ShellError::invalid_argument("empty command"));
        }
        argv[0] = resolved.to_string();

        let stdin = ctx.pipeline_input().map(stdin_payload);

        if command.background() {
            return self.spawn_background(argv, stdin, ctx);
        }

        let output = self.spawner.spawn(SpawnRequest {
            argv: &argv,
            cwd: ctx.cwd(),
            env: ctx.env(),
            stdin: stdin.as_deref(),
            capture: ctx.capture_stdio(),
            cancellation: ctx.cancellation().clone(),
        })?;
        Ok(output.into_value())
    }

    fn spawn_background(
        &self,
        argv: Vec<String>,
        stdin: Option<Vec<u8>>,
        ctx: &CommandContext,
    ) -> Result<Value, ShellError> {
        let spawner = self.spawner.clone();
        let cwd = ctx.cwd().to_path_buf();
        let env = ctx.env().clone();
        let cancellation = ctx.cancellation().clone();
        let name = argv[0].clone();

        drop(self.pool.submit(move || {
            let result = spawner.spawn(SpawnRequest {
                argv: &argv,
                cwd: &cwd,
                env: &env,
                stdin: stdin.as_deref(),
                capture: true,
                cancellation,
            });
            if let Err(e) = result {
                warn!("Background command '{}' failed: {}", argv[0], e);
            }
        }));
        Ok(Value::map_from(vec![
            ("background", Value::boolean(true)),
            ("command", Value::string(name)),
        ]))
    }

    /// Hands a script to the embedded evaluator
    pub fn execute_scripted(&self, script: &str, ctx: &CommandContext) -> Result<Value, ShellError> {
        ctx.capabilities().require("shell:eval", "script")?;
        let started = Instant::now();
        let result = self.evaluator.eval(script, ctx);
        self.metrics.record(
            "script",
            started.elapsed().as_micros() as u64,
            result.is_ok(),
        );
        result
    }

    /// Submits a line to the worker pool, returning a future
    pub fn execute_async(
        self: &Arc<Self>,
        line: String,
        ctx: CommandContext,
    ) -> TaskHandle<Result<Value, ShellError>> {
        let engine = self.clone();
        self.pool.submit(move || engine.execute(&line, &ctx))
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("builtins", &self.builtins.len())
            .finish()
    }
}

/// Maps a pipeline value onto the next stage's stdin bytes.
///
/// External-process results feed their stdout; strings and bytes feed
/// verbatim; anything else feeds its JSON rendering.
fn stdin_payload(value: &Value) -> Vec<u8> {
    if let Some(map) = value.as_map() {
        if let Some(stdout) = map.get("stdout").and_then(Value::as_str) {
            return stdout.as_bytes().to_vec();
        }
    }
    if let Some(text) = value.as_str() {
        return text.as_bytes().to_vec();
    }
    if let Some(bytes) = value.as_bytes() {
        return bytes.to_vec();
    }
    value.to_json().to_string().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::SystemSpawner;
    use crate::infrastructure::bridge::{ObjectBridge, RhaiEvaluator};
    use crate::infrastructure::runtime::memory_gauge::MemoryGauge;
    use crate::infrastructure::security::AuditLog;
    use nexus_shell_domain::{BuiltinCommand, WorkerCount};
    use std::collections::BTreeMap;

    struct UpperBuiltin;

    impl BuiltinCommand for UpperBuiltin {
        fn name(&self) -> &str {
            "upper"
        }

        fn run(&self, ctx: &mut CommandContext) -> Result<Value, ShellError> {
            let input = ctx
                .take_pipeline_input()
                .map(|v| {
                    // Upstream external stages deliver {stdout, ...} maps.
                    v.as_map()
                        .and_then(|m| m.get("stdout").and_then(Value::as_str).map(String::from))
                        .or_else(|| v.as_str().map(String::from))
                        .unwrap_or_default()
                })
                .unwrap_or_default();
            Ok(Value::string(input.to_uppercase()))
        }
    }

    fn engine_at(cwd: &std::path::Path) -> Arc<ExecutionEngine> {
        let audit = Arc::new(AuditLog::new(1024));
        let capabilities = Arc::new(CapabilityStore::new(audit));
        capabilities.grant("**", None).unwrap();

        let state = Arc::new(RwLock::new(ShellState::new(cwd, BTreeMap::new())));
        let transactions = Arc::new(TransactionManager::new(state.clone()));
        let spawner: Arc<dyn ProcessSpawner> = Arc::new(SystemSpawner::new());
        let bridge = Arc::new(ObjectBridge::new(MemoryGauge::default(), spawner.clone()));
        let evaluator: Arc<dyn ScriptEvaluator> = Arc::new(RhaiEvaluator::new(bridge));

        let mut builtins = BuiltinRegistry::new();
        builtins.register(Arc::new(UpperBuiltin));

        Arc::new(ExecutionEngine::new(
            InputParser::new(),
            builtins,
            evaluator,
            spawner,
            capabilities,
            state,
            transactions,
            Arc::new(ExecutionRecorder::new()),
            Arc::new(MetricsBatcher::new()),
            Arc::new(WorkerPool::new(WorkerCount::new(2))),
        ))
    }

    fn engine() -> Arc<ExecutionEngine> {
        engine_at(std::path::Path::new("/"))
    }

    #[test]
    fn test_external_pipeline_echo_wc() {
        let engine = engine();
        let ctx = engine.make_context();
        let result = engine.execute("echo hello | wc -c", &ctx).unwrap();
        let map = result.as_map().unwrap();
        assert_eq!(map.get("code").unwrap().as_int(), Some(0));
        assert_eq!(map.get("stdout").unwrap().as_str().map(str::trim), Some("6"));
        assert_eq!(map.get("stderr").unwrap().as_str(), Some(""));
        assert_eq!(map.get("success").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_one_stage_pipeline_identity() {
        let engine = engine();
        let ctx = engine.make_context();
        let piped = engine.execute("echo solo", &ctx).unwrap();
        let direct = engine
            .execute_pipeline(
                &engine.parser().parse("echo solo").unwrap().commands().to_vec(),
                &ctx,
            )
            .unwrap();
        assert_eq!(piped, direct);
    }

    #[test]
    fn test_builtin_receives_pipeline_input() {
        let engine = engine();
        let ctx = engine.make_context();
        let result = engine.execute("echo word | upper", &ctx).unwrap();
        assert_eq!(result.as_str(), Some("WORD\n"));
    }

    #[test]
    fn test_unknown_binary_is_not_found() {
        let engine = engine();
        let ctx = engine.make_context();
        let err = engine
            .execute("surely-not-installed-anywhere", &ctx)
            .unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }

    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let engine = engine();
        let ctx = engine.make_context();
        let result = engine.execute("false", &ctx).unwrap();
        assert_eq!(
            result.as_map().unwrap().get("success").unwrap().as_bool(),
            Some(false)
        );
    }

    #[test]
    fn test_alias_cycle_errors() {
        let engine = engine();
        engine.state().write().set_alias("a", "b");
        engine.state().write().set_alias("b", "a");
        let ctx = engine.make_context();
        let err = engine.execute("a", &ctx).unwrap_err();
        assert_eq!(err.kind(), "AliasCycle");
    }

    #[test]
    fn test_alias_resolves_one_step() {
        let engine = engine();
        engine.state().write().set_alias("say", "echo");
        let ctx = engine.make_context();
        let result = engine.execute("say hi", &ctx).unwrap();
        assert_eq!(
            result.as_map().unwrap().get("stdout").unwrap().as_str(),
            Some("hi\n")
        );
    }

    #[test]
    fn test_scripted_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_at(dir.path());
        let ctx = engine.make_context();
        let result = engine.execute("let x = 40; x + 2", &ctx).unwrap();
        assert_eq!(result.as_int(), Some(42));
    }

    #[test]
    fn test_permission_denial_is_terminal() {
        let audit = Arc::new(AuditLog::new(64));
        let capabilities = Arc::new(CapabilityStore::new(audit));
        // No grants at all: shell:execute denied.
        let state = Arc::new(RwLock::new(ShellState::new("/", BTreeMap::new())));
        let transactions = Arc::new(TransactionManager::new(state.clone()));
        let spawner: Arc<dyn ProcessSpawner> = Arc::new(SystemSpawner::new());
        let bridge = Arc::new(ObjectBridge::new(MemoryGauge::default(), spawner.clone()));
        let engine = ExecutionEngine::new(
            InputParser::new(),
            BuiltinRegistry::new(),
            Arc::new(RhaiEvaluator::new(bridge)),
            spawner,
            capabilities.clone(),
            state,
            transactions,
            Arc::new(ExecutionRecorder::new()),
            Arc::new(MetricsBatcher::new()),
            Arc::new(WorkerPool::new(WorkerCount::new(1))),
        );
        let ctx = engine.make_context();
        let err = engine.execute("echo blocked", &ctx).unwrap_err();
        assert_eq!(err.kind(), "PermissionDenied");
        // The denial was audited.
        assert!(capabilities.audit().query_filtered(|e| !e.granted).len() == 1);
    }

    #[tokio::test]
    async fn test_execute_async_returns_future() {
        let engine = engine();
        let ctx = engine.make_context();
        let handle = engine.execute_async("echo async".to_string(), ctx);
        let result = handle.join().await.unwrap().unwrap();
        assert_eq!(
            result.as_map().unwrap().get("stdout").unwrap().as_str(),
            Some("async\n")
        );
    }
}
