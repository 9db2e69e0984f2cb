// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scripted Evaluator (rhai embedding)
//!
//! Implements the [`ScriptEvaluator`] port over an embedded rhai engine.
//! A fresh engine is built per evaluation; the `fs` / `proc` / `net` /
//! `utils` surfaces are registered as API types whose methods delegate to
//! the live bridge, and instances bound to the calling command context are
//! pushed into the evaluation scope - so `fs.readFile("x")` is an ordinary
//! method call, and every scripted host interaction funnels through the
//! same capability-checked surfaces native callers use.
//!
//! ## Contract Details
//!
//! - the previous pipeline stage's value is visible as `input`
//! - surface errors cross the runtime boundary as typed values, so a
//!   `PermissionDenied` raised inside a script is indistinguishable from
//!   one raised natively
//! - parse failures map to `SyntaxError` with a byte offset into the
//!   script
//! - watch/monitor handles expose `stop()` and `events()`; scripted
//!   callbacks across threads are not expressible in a sync embedding
//! - `fs.dir` is an alias of `fs.listDir`
//!
//! The engine carries its own resource limits (operations, call depth);
//! the bridge's memory gauge covers only marshalled values.

use crate::infrastructure::bridge::marshal::{self, ScriptHandle};
use crate::infrastructure::bridge::{
    ExecOptions, FindOptions, FindPattern, FindType, ObjectBridge, RequestOptions, RetryOptions,
};
use nexus_shell_domain::{CommandContext, ScriptEvaluator, ShellError, Value};
use rhai::{
    Array, Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, Map, NativeCallContext,
    Position, Scope,
};
use std::collections::BTreeMap;
use std::sync::Arc;

const MAX_OPERATIONS: u64 = 5_000_000;
const MAX_CALL_LEVELS: usize = 64;

/// Shared binding of the bridge to one command context.
#[derive(Clone)]
struct SurfaceBinding {
    bridge: Arc<ObjectBridge>,
    ctx: CommandContext,
}

/// Scripted face of the `fs.*` surface.
#[derive(Clone)]
struct FsApi(SurfaceBinding);

/// Scripted face of the `proc.*` surface.
#[derive(Clone)]
struct ProcApi(SurfaceBinding);

/// Scripted face of the `net.*` surface.
#[derive(Clone)]
struct NetApi(SurfaceBinding);

/// Scripted face of the `utils.*` surface.
#[derive(Clone)]
struct UtilsApi(SurfaceBinding);

/// rhai-backed implementation of the scripted evaluator port.
pub struct RhaiEvaluator {
    bridge: Arc<ObjectBridge>,
}

impl RhaiEvaluator {
    /// Creates an evaluator bound to the bridge
    pub fn new(bridge: Arc<ObjectBridge>) -> Self {
        Self { bridge }
    }

    fn build_engine(&self) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(MAX_OPERATIONS);
        engine.set_max_call_levels(MAX_CALL_LEVELS);

        engine.register_type_with_name::<ScriptHandle>("Handle");
        engine.register_type_with_name::<FsApi>("fs");
        engine.register_type_with_name::<ProcApi>("proc");
        engine.register_type_with_name::<NetApi>("net");
        engine.register_type_with_name::<UtilsApi>("utils");

        register_handle_methods(&mut engine, self.bridge.clone());
        register_fs_methods(&mut engine);
        register_proc_methods(&mut engine);
        register_net_methods(&mut engine);
        register_utils_methods(&mut engine);
        engine
    }
}

impl ScriptEvaluator for RhaiEvaluator {
    fn eval(&self, script: &str, ctx: &CommandContext) -> Result<Value, ShellError> {
        let engine = self.build_engine();
        let binding = SurfaceBinding {
            bridge: self.bridge.clone(),
            ctx: ctx.clone(),
        };

        // Plain variables, not constants: surface methods take `&mut self`
        // receivers and rhai treats those as non-pure calls.
        let mut scope = Scope::new();
        scope.push("fs", FsApi(binding.clone()));
        scope.push("proc", ProcApi(binding.clone()));
        scope.push("net", NetApi(binding.clone()));
        scope.push("utils", UtilsApi(binding));
        let input = ctx
            .pipeline_input()
            .map(marshal::to_scripted)
            .unwrap_or(Dynamic::UNIT);
        scope.push_dynamic("input", input);

        match engine.eval_with_scope::<Dynamic>(&mut scope, script) {
            Ok(result) => self.bridge.to_native(&result),
            Err(err) => Err(map_eval_error(*err, script)),
        }
    }
}

impl std::fmt::Debug for RhaiEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhaiEvaluator").finish()
    }
}

fn register_handle_methods(engine: &mut Engine, bridge: Arc<ObjectBridge>) {
    let b = bridge.clone();
    engine.register_fn(
        "stop",
        move |handle: &mut ScriptHandle| -> Result<(), Box<EvalAltResult>> {
            b.stop_handle(handle.id).map_err(fail)
        },
    );
    let b = bridge.clone();
    engine.register_fn(
        "events",
        move |handle: &mut ScriptHandle| -> Result<Array, Box<EvalAltResult>> {
            let events = b.handle_events(handle.id).map_err(fail)?;
            Ok(events.iter().map(marshal::to_scripted).collect())
        },
    );
    engine.register_fn("release", move |handle: &mut ScriptHandle| -> bool {
        bridge.release(handle.id)
    });
}

fn register_fs_methods(engine: &mut Engine) {
    engine.register_fn(
        "readFile",
        |api: &mut FsApi, path: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api.0.bridge.fs().read_file(&api.0.ctx, &path, None).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
    engine.register_fn(
        "readFile",
        |api: &mut FsApi, path: ImmutableString, opts: Map| -> Result<Dynamic, Box<EvalAltResult>> {
            let encoding = opt_string(&opts, "encoding");
            let value = api
                .0
                .bridge
                .fs()
                .read_file(&api.0.ctx, &path, encoding.as_deref())
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "writeFile",
        |api: &mut FsApi, path: ImmutableString, content: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
            let native = api.0.bridge.to_native(&content).map_err(fail)?;
            let value = api.0.bridge.fs().write_file(&api.0.ctx, &path, &native).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
    engine.register_fn(
        "writeFile",
        |api: &mut FsApi, path: ImmutableString, content: Dynamic, _opts: Map| -> Result<Dynamic, Box<EvalAltResult>> {
            let native = api.0.bridge.to_native(&content).map_err(fail)?;
            let value = api.0.bridge.fs().write_file(&api.0.ctx, &path, &native).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    // `dir` is the listing's short alias.
    engine.register_fn(
        "listDir",
        |api: &mut FsApi, path: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            list_dir(api, &path)
        },
    );
    engine.register_fn(
        "dir",
        |api: &mut FsApi, path: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            list_dir(api, &path)
        },
    );

    engine.register_fn(
        "stat",
        |api: &mut FsApi, path: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api.0.bridge.fs().stat(&api.0.ctx, &path).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "watch",
        |api: &mut FsApi, path: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api.0.bridge.fs().watch(&api.0.ctx, &path, None).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "find",
        |api: &mut FsApi, pattern: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let pattern = FindPattern::parse(&pattern).map_err(fail)?;
            let value = api
                .0
                .bridge
                .fs()
                .find(&api.0.ctx, &pattern, &FindOptions::default())
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
    engine.register_fn(
        "find",
        |api: &mut FsApi, pattern: ImmutableString, opts: Map| -> Result<Dynamic, Box<EvalAltResult>> {
            let pattern = FindPattern::parse(&pattern).map_err(fail)?;
            let options = find_options(&opts).map_err(fail)?;
            let value = api.0.bridge.fs().find(&api.0.ctx, &pattern, &options).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
}

fn list_dir(api: &mut FsApi, path: &str) -> Result<Dynamic, Box<EvalAltResult>> {
    let value = api.0.bridge.fs().list_dir(&api.0.ctx, path).map_err(fail)?;
    Ok(marshal::to_scripted(&value))
}

fn register_proc_methods(engine: &mut Engine) {
    engine.register_fn(
        "exec",
        |api: &mut ProcApi, cmd: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api
                .0
                .bridge
                .proc()
                .exec(&api.0.ctx, &cmd, &ExecOptions::default())
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
    engine.register_fn(
        "exec",
        |api: &mut ProcApi, cmd: ImmutableString, opts: Map| -> Result<Dynamic, Box<EvalAltResult>> {
            let options = exec_options(&opts).map_err(fail)?;
            let value = api.0.bridge.proc().exec(&api.0.ctx, &cmd, &options).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "list",
        |api: &mut ProcApi| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api.0.bridge.proc().list(&api.0.ctx).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "kill",
        |api: &mut ProcApi, pid: i64| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api
                .0
                .bridge
                .proc()
                .kill(&api.0.ctx, as_pid(pid)?, "SIGTERM")
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
    engine.register_fn(
        "kill",
        |api: &mut ProcApi, pid: i64, signal: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api
                .0
                .bridge
                .proc()
                .kill(&api.0.ctx, as_pid(pid)?, &signal)
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "info",
        |api: &mut ProcApi, pid: i64| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api.0.bridge.proc().info(&api.0.ctx, as_pid(pid)?).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "monitor",
        |api: &mut ProcApi, interval_ms: i64| -> Result<Dynamic, Box<EvalAltResult>> {
            let interval = u64::try_from(interval_ms)
                .map_err(|_| fail(ShellError::invalid_argument("negative interval")))?;
            let value = api
                .0
                .bridge
                .proc()
                .monitor(&api.0.ctx, interval, None)
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
}

fn register_net_methods(engine: &mut Engine) {
    engine.register_fn(
        "get",
        |api: &mut NetApi, url: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api
                .0
                .bridge
                .net()
                .get(&api.0.ctx, &url, &RequestOptions::default())
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
    engine.register_fn(
        "get",
        |api: &mut NetApi, url: ImmutableString, opts: Map| -> Result<Dynamic, Box<EvalAltResult>> {
            let options = request_options(&opts);
            let value = api.0.bridge.net().get(&api.0.ctx, &url, &options).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "post",
        |api: &mut NetApi, url: ImmutableString, body: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
            let native = api.0.bridge.to_native(&body).map_err(fail)?;
            let value = api
                .0
                .bridge
                .net()
                .post(&api.0.ctx, &url, &native, &RequestOptions::default())
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
    engine.register_fn(
        "post",
        |api: &mut NetApi, url: ImmutableString, body: Dynamic, opts: Map| -> Result<Dynamic, Box<EvalAltResult>> {
            let native = api.0.bridge.to_native(&body).map_err(fail)?;
            let options = request_options(&opts);
            let value = api
                .0
                .bridge
                .net()
                .post(&api.0.ctx, &url, &native, &options)
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "download",
        |api: &mut NetApi, url: ImmutableString, path: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api
                .0
                .bridge
                .net()
                .download(&api.0.ctx, &url, &path, None)
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
}

fn register_utils_methods(engine: &mut Engine) {
    engine.register_fn(
        "sleep",
        |api: &mut UtilsApi, ms: i64| -> Result<Dynamic, Box<EvalAltResult>> {
            let ms = u64::try_from(ms)
                .map_err(|_| fail(ShellError::invalid_argument("negative sleep")))?;
            let value = api.0.bridge.utils().sleep(&api.0.ctx, ms).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "uuid",
        |api: &mut UtilsApi| -> Result<Dynamic, Box<EvalAltResult>> {
            let value = api.0.bridge.utils().uuid(&api.0.ctx).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "hash",
        |api: &mut UtilsApi, data: Dynamic, alg: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let native = api.0.bridge.to_native(&data).map_err(fail)?;
            let value = api.0.bridge.utils().hash(&api.0.ctx, &native, &alg).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "formatBytes",
        |api: &mut UtilsApi, n: i64| -> Result<Dynamic, Box<EvalAltResult>> {
            let n = u64::try_from(n)
                .map_err(|_| fail(ShellError::invalid_argument("negative byte count")))?;
            let value = api.0.bridge.utils().format_bytes(&api.0.ctx, n).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "retry",
        |call: NativeCallContext, api: &mut UtilsApi, f: FnPtr| -> Result<Dynamic, Box<EvalAltResult>> {
            run_retry(api, &call, &f, RetryOptions::default())
        },
    );
    engine.register_fn(
        "retry",
        |call: NativeCallContext, api: &mut UtilsApi, f: FnPtr, opts: Map| -> Result<Dynamic, Box<EvalAltResult>> {
            let options = retry_options(&opts);
            run_retry(api, &call, &f, options)
        },
    );

    engine.register_fn(
        "deepMerge",
        |api: &mut UtilsApi, a: Dynamic, b: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
            let base = api.0.bridge.to_native(&a).map_err(fail)?;
            let patch = api.0.bridge.to_native(&b).map_err(fail)?;
            let value = api
                .0
                .bridge
                .utils()
                .deep_merge(&api.0.ctx, &base, &patch)
                .map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );

    engine.register_fn(
        "deepClone",
        |api: &mut UtilsApi, v: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
            let native = api.0.bridge.to_native(&v).map_err(fail)?;
            let value = api.0.bridge.utils().deep_clone(&api.0.ctx, &native).map_err(fail)?;
            Ok(marshal::to_scripted(&value))
        },
    );
}

fn run_retry(
    api: &UtilsApi,
    call: &NativeCallContext,
    f: &FnPtr,
    options: RetryOptions,
) -> Result<Dynamic, Box<EvalAltResult>> {
    let result = api
        .0
        .bridge
        .utils()
        .retry(&api.0.ctx, &options, |_attempt| {
            let outcome: Dynamic = f
                .call_within_context(call, ())
                .map_err(|e| map_eval_error(*e, ""))?;
            api.0.bridge.to_native(&outcome)
        })
        .map_err(fail)?;
    Ok(marshal::to_scripted(&result))
}

/// Wraps a surface error so it crosses the runtime boundary typed.
fn fail(err: ShellError) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(err),
        Position::NONE,
    ))
}

/// Unwraps runtime errors back into the domain taxonomy.
fn map_eval_error(err: EvalAltResult, script: &str) -> ShellError {
    match err {
        EvalAltResult::ErrorRuntime(payload, _) => payload
            .clone()
            .try_cast::<ShellError>()
            .unwrap_or_else(|| ShellError::execution_failure(payload.to_string())),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => map_eval_error(*inner, script),
        EvalAltResult::ErrorParsing(parse_err, pos) => {
            ShellError::syntax(parse_err.to_string(), offset_of(script, pos))
        }
        other => ShellError::execution_failure(other.to_string()),
    }
}

/// Converts a rhai line/column position into a byte offset.
fn offset_of(script: &str, pos: Position) -> usize {
    let (Some(line), Some(col)) = (pos.line(), pos.position()) else {
        return 0;
    };
    let mut offset = 0usize;
    for (idx, text) in script.lines().enumerate() {
        if idx + 1 == line {
            return (offset + col.saturating_sub(1)).min(script.len());
        }
        offset += text.len() + 1;
    }
    script.len()
}

fn as_pid(pid: i64) -> Result<u32, Box<EvalAltResult>> {
    u32::try_from(pid).map_err(|_| fail(ShellError::invalid_argument(format!("bad pid {}", pid))))
}

fn opt_string(map: &Map, key: &str) -> Option<String> {
    map.get(key)
        .cloned()
        .and_then(|d| d.into_immutable_string().ok())
        .map(|s| s.to_string())
}

fn opt_u64(map: &Map, key: &str) -> Option<u64> {
    map.get(key)
        .and_then(|d| d.as_int().ok())
        .and_then(|i| u64::try_from(i).ok())
}

fn find_options(opts: &Map) -> Result<FindOptions, ShellError> {
    let entry_type = match opt_string(opts, "type").as_deref() {
        None => None,
        Some("file") => Some(FindType::File),
        Some("directory") | Some("dir") => Some(FindType::Directory),
        Some(other) => {
            return Err(ShellError::invalid_argument(format!(
                "unknown find type '{}'",
                other
            )))
        }
    };
    Ok(FindOptions {
        path: opt_string(opts, "path"),
        entry_type,
        max_depth: opt_u64(opts, "maxDepth").unwrap_or(10) as usize,
    })
}

fn exec_options(opts: &Map) -> Result<ExecOptions, ShellError> {
    let mut options = ExecOptions {
        cwd: opt_string(opts, "cwd"),
        timeout_ms: opt_u64(opts, "timeout"),
        ..ExecOptions::default()
    };
    if let Some(args) = opts.get("args").cloned().and_then(|d| d.try_cast::<Array>()) {
        for arg in args {
            options.args.push(
                arg.into_immutable_string()
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            );
        }
    }
    if let Some(env) = opts.get("env").cloned().and_then(|d| d.try_cast::<Map>()) {
        let mut vars = BTreeMap::new();
        for (k, v) in &env {
            if let Ok(value) = v.clone().into_immutable_string() {
                vars.insert(k.to_string(), value.to_string());
            }
        }
        options.env = vars;
    }
    Ok(options)
}

fn request_options(opts: &Map) -> RequestOptions {
    let mut options = RequestOptions {
        timeout_ms: opt_u64(opts, "timeout"),
        ..RequestOptions::default()
    };
    if let Some(headers) = opts
        .get("headers")
        .cloned()
        .and_then(|d| d.try_cast::<Map>())
    {
        for (k, v) in &headers {
            if let Ok(value) = v.clone().into_immutable_string() {
                options.headers.insert(k.to_string(), value.to_string());
            }
        }
    }
    options
}

fn retry_options(opts: &Map) -> RetryOptions {
    let mut options = RetryOptions::default();
    if let Some(attempts) = opt_u64(opts, "attempts") {
        options.attempts = attempts as u32;
    }
    if let Some(delay) = opt_u64(opts, "delay") {
        options.delay_ms = delay;
    }
    if let Some(backoff) = opts.get("backoff").and_then(|d| d.as_float().ok()) {
        options.backoff = backoff;
    }
    if let Some(jitter) = opts.get("jitter").and_then(|d| d.as_bool().ok()) {
        options.jitter = jitter;
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::system_spawner::SystemSpawner;
    use crate::infrastructure::runtime::memory_gauge::MemoryGauge;
    use nexus_shell_domain::AllowAllGate;

    fn evaluator() -> RhaiEvaluator {
        let bridge = Arc::new(ObjectBridge::new(
            MemoryGauge::default(),
            Arc::new(SystemSpawner::new()),
        ));
        RhaiEvaluator::new(bridge)
    }

    fn ctx_at(dir: &std::path::Path) -> CommandContext {
        CommandContext::new(dir, BTreeMap::new(), Arc::new(AllowAllGate))
    }

    #[test]
    fn test_plain_expression() {
        let dir = tempfile::tempdir().unwrap();
        let result = evaluator().eval("21 * 2", &ctx_at(dir.path())).unwrap();
        assert_eq!(result.as_int(), Some(42));
    }

    #[test]
    fn test_fs_surface_from_script() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("greeting.txt"), b"hello script").unwrap();
        let result = evaluator()
            .eval("fs.readFile(\"greeting.txt\")", &ctx_at(dir.path()))
            .unwrap();
        assert_eq!(result.as_str(), Some("hello script"));
    }

    #[test]
    fn test_dir_filter_map_chain() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.bin"), vec![0u8; 2048]).unwrap();
        std::fs::write(dir.path().join("small.bin"), vec![0u8; 16]).unwrap();

        let script = "fs.dir(\".\").filter(|f| f.size > 1024).map(|f| f.name)";
        let result = evaluator().eval(script, &ctx_at(dir.path())).unwrap();
        let names = result.as_list().unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].as_str(), Some("big.bin"));
    }

    #[test]
    fn test_permission_denied_surfaces_typed() {
        struct DenyAll;
        impl nexus_shell_domain::CapabilityGate for DenyAll {
            fn check(&self, _action: &str, _resource: &str) -> bool {
                false
            }
        }
        let dir = tempfile::tempdir().unwrap();
        let ctx = CommandContext::new(dir.path(), BTreeMap::new(), Arc::new(DenyAll));
        let err = evaluator().eval("fs.readFile(\"x\")", &ctx).unwrap_err();
        assert_eq!(err.kind(), "PermissionDenied");
    }

    #[test]
    fn test_parse_error_is_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = evaluator()
            .eval("let x = (", &ctx_at(dir.path()))
            .unwrap_err();
        assert_eq!(err.kind(), "SyntaxError");
        assert!(err.offset().unwrap() <= "let x = (".len());
    }

    #[test]
    fn test_pipeline_input_visible_as_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ctx_at(dir.path());
        ctx.set_pipeline_input(Some(Value::int(5)));
        let result = evaluator().eval("input + 1", &ctx).unwrap();
        assert_eq!(result.as_int(), Some(6));
    }

    #[test]
    fn test_utils_from_script() {
        let dir = tempfile::tempdir().unwrap();
        let result = evaluator()
            .eval("utils.formatBytes(2048)", &ctx_at(dir.path()))
            .unwrap();
        assert_eq!(result.as_str(), Some("2.00 KiB"));

        let merged = evaluator()
            .eval(
                "utils.deepMerge(#{a: 1, n: #{x: 1}}, #{n: #{y: 2}})",
                &ctx_at(dir.path()),
            )
            .unwrap();
        let map = merged.as_map().unwrap();
        assert_eq!(map.get("a").unwrap().as_int(), Some(1));
        let nested = map.get("n").unwrap().as_map().unwrap();
        assert_eq!(nested.get("x").unwrap().as_int(), Some(1));
        assert_eq!(nested.get("y").unwrap().as_int(), Some(2));
    }

    #[test]
    fn test_retry_closure() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"
            let n = 0;
            utils.retry(|| { n += 1; if n < 3 { throw "not yet" } n }, #{attempts: 5, delay: 1})
        "#;
        let result = evaluator().eval(script, &ctx_at(dir.path())).unwrap();
        assert_eq!(result.as_int(), Some(3));
    }

    #[test]
    fn test_handle_stop_from_script() {
        let dir = tempfile::tempdir().unwrap();
        let script = "let h = fs.watch(\".\"); h.stop(); h";
        let result = evaluator().eval(script, &ctx_at(dir.path())).unwrap();
        assert!(result.as_handle().is_some());
    }
}
