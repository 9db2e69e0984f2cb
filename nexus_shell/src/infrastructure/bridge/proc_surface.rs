// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Surface
//!
//! Process inspection and control: `proc:exec`, `proc:list`, `proc:kill`,
//! `proc:info`, `proc:monitor`. Spawning goes through the engine's process
//! spawner port; inspection reads the host process table through sysinfo.
//!
//! Monitor sessions sample the process table on a background thread into a
//! drainable queue pinned behind a handle, mirroring watch sessions on the
//! filesystem surface.

use crate::infrastructure::bridge::handle_table::HandleTable;
use crate::infrastructure::bridge::NativeResource;
use crossbeam::queue::SegQueue;
use nexus_shell_domain::{
    CancellationToken, CommandContext, ProcessSpawner, ShellError, SpawnRequest, Value,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tracing::debug;

/// Native callback invoked for each monitor sample.
pub type MonitorCallback = Box<dyn Fn(&Value) + Send + Sync>;

/// A live process monitor pinned behind a handle.
pub struct MonitorSession {
    running: Arc<AtomicBool>,
    samples: Arc<SegQueue<Value>>,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl MonitorSession {
    /// Stops sampling and joins the monitor thread; idempotent
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }

    /// Drains queued samples, oldest first
    pub fn take_samples(&self) -> Vec<Value> {
        let mut drained = Vec::new();
        while let Some(sample) = self.samples.pop() {
            drained.push(sample);
        }
        drained
    }
}

impl std::fmt::Debug for MonitorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorSession")
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

/// Options for `proc.exec`.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub env: BTreeMap<String, String>,
    pub timeout_ms: Option<u64>,
}

/// The `proc.*` surface.
pub struct ProcSurface {
    handles: Arc<HandleTable<NativeResource>>,
    spawner: Arc<dyn ProcessSpawner>,
    system: Mutex<System>,
}

impl ProcSurface {
    pub(crate) fn new(
        handles: Arc<HandleTable<NativeResource>>,
        spawner: Arc<dyn ProcessSpawner>,
    ) -> Self {
        Self {
            handles,
            spawner,
            system: Mutex::new(System::new_all()),
        }
    }

    /// `proc.exec(cmd, {args?, cwd?, env?, timeout?})` →
    /// `{code, stdout, stderr, success}`
    pub fn exec(
        &self,
        ctx: &CommandContext,
        cmd: &str,
        options: &ExecOptions,
    ) -> Result<Value, ShellError> {
        ctx.capabilities().require("proc:exec", cmd)?;

        let mut argv = Vec::with_capacity(1 + options.args.len());
        argv.push(cmd.to_string());
        argv.extend(options.args.iter().cloned());

        let cwd = options
            .cwd
            .as_deref()
            .map(|p| ctx.resolve_path(p))
            .unwrap_or_else(|| ctx.cwd().to_path_buf());

        let mut env = ctx.env().clone();
        for (k, v) in &options.env {
            env.insert(k.clone(), v.clone());
        }

        let cancellation = match options.timeout_ms {
            Some(ms) => CancellationToken::with_deadline(Instant::now() + Duration::from_millis(ms)),
            None => ctx.cancellation().clone(),
        };

        let output = self.spawner.spawn(SpawnRequest {
            argv: &argv,
            cwd: &cwd,
            env: &env,
            stdin: None,
            capture: true,
            cancellation,
        })?;
        Ok(output.into_value())
    }

    /// `proc.list()` - `{pid, name, cpu, memory, uptime}` per process
    pub fn list(&self, ctx: &CommandContext) -> Result<Value, ShellError> {
        ctx.capabilities().require("proc:list", "*")?;
        ctx.cancellation().check("proc.list")?;

        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::All, true);
        let mut entries = Vec::new();
        for (pid, process) in system.processes() {
            entries.push(Value::map_from(vec![
                ("pid", Value::int(pid.as_u32() as i64)),
                ("name", Value::string(process.name().to_string_lossy())),
                ("cpu", Value::float(process.cpu_usage() as f64)),
                ("memory", Value::int(process.memory() as i64)),
                ("uptime", Value::int(process.run_time() as i64)),
            ]));
        }
        Ok(Value::list(entries))
    }

    /// `proc.kill(pid, signal="SIGTERM")` - resolves once delivered
    pub fn kill(&self, ctx: &CommandContext, pid: u32, signal: &str) -> Result<Value, ShellError> {
        ctx.capabilities().require("proc:kill", &pid.to_string())?;

        let sig = parse_signal(signal)?;
        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::All, true);
        let process = system
            .process(Pid::from_u32(pid))
            .ok_or_else(|| ShellError::not_found(format!("process {}", pid)))?;
        match process.kill_with(sig) {
            Some(true) => {
                debug!("Delivered {} to pid {}", signal, pid);
                Ok(Value::boolean(true))
            }
            Some(false) => Err(ShellError::execution_failure(format!(
                "failed to signal process {}",
                pid
            ))),
            None => Err(ShellError::invalid_argument(format!(
                "signal '{}' unsupported on this platform",
                signal
            ))),
        }
    }

    /// `proc.info(pid)` - detailed record or null
    pub fn info(&self, ctx: &CommandContext, pid: u32) -> Result<Value, ShellError> {
        ctx.capabilities().require("proc:info", &pid.to_string())?;

        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::All, true);
        let Some(process) = system.process(Pid::from_u32(pid)) else {
            return Ok(Value::null());
        };
        Ok(Value::map_from(vec![
            ("pid", Value::int(pid as i64)),
            ("name", Value::string(process.name().to_string_lossy())),
            (
                "exe",
                process
                    .exe()
                    .map(|p| Value::string(p.to_string_lossy()))
                    .unwrap_or_else(Value::null),
            ),
            ("status", Value::string(process.status().to_string())),
            (
                "parent",
                process
                    .parent()
                    .map(|p| Value::int(p.as_u32() as i64))
                    .unwrap_or_else(Value::null),
            ),
            ("cpu", Value::float(process.cpu_usage() as f64)),
            ("memory", Value::int(process.memory() as i64)),
            ("startTime", Value::int(process.start_time() as i64)),
            ("uptime", Value::int(process.run_time() as i64)),
        ]))
    }

    /// `proc.monitor(cb, interval_ms)` - handle with `stop()`
    pub fn monitor(
        &self,
        ctx: &CommandContext,
        interval_ms: u64,
        callback: Option<MonitorCallback>,
    ) -> Result<Value, ShellError> {
        ctx.capabilities().require("proc:monitor", "*")?;
        if interval_ms == 0 {
            return Err(ShellError::invalid_argument("monitor interval must be > 0"));
        }

        let running = Arc::new(AtomicBool::new(true));
        let samples: Arc<SegQueue<Value>> = Arc::new(SegQueue::new());
        let flag = running.clone();
        let queue = samples.clone();
        let interval = Duration::from_millis(interval_ms);

        let thread = std::thread::Builder::new()
            .name("nexus-proc-monitor".to_string())
            .spawn(move || {
                let mut system = System::new_all();
                while flag.load(Ordering::SeqCst) {
                    system.refresh_all();
                    let sample = Value::map_from(vec![
                        (
                            "timestamp",
                            Value::int(chrono::Utc::now().timestamp_millis()),
                        ),
                        ("processCount", Value::int(system.processes().len() as i64)),
                        ("cpu", Value::float(system.global_cpu_usage() as f64)),
                        ("memoryUsed", Value::int(system.used_memory() as i64)),
                        ("memoryTotal", Value::int(system.total_memory() as i64)),
                    ]);
                    if let Some(cb) = &callback {
                        cb(&sample);
                    }
                    queue.push(sample);

                    // Sleep in slices so stop() is prompt.
                    let mut remaining = interval;
                    while flag.load(Ordering::SeqCst) && remaining > Duration::ZERO {
                        let slice = remaining.min(Duration::from_millis(50));
                        std::thread::sleep(slice);
                        remaining = remaining.saturating_sub(slice);
                    }
                }
            })
            .map_err(|e| ShellError::internal_error(format!("monitor thread: {}", e)))?;

        let session = MonitorSession {
            running,
            samples,
            thread: Mutex::new(Some(thread)),
        };
        let id = self.handles.pin(NativeResource::Monitor(session), None);
        Ok(Value::handle(id))
    }
}

impl std::fmt::Debug for ProcSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcSurface").finish()
    }
}

fn parse_signal(signal: &str) -> Result<Signal, ShellError> {
    match signal.to_uppercase().as_str() {
        "SIGTERM" | "TERM" => Ok(Signal::Term),
        "SIGKILL" | "KILL" => Ok(Signal::Kill),
        "SIGINT" | "INT" => Ok(Signal::Interrupt),
        "SIGHUP" | "HUP" => Ok(Signal::Hangup),
        "SIGUSR1" | "USR1" => Ok(Signal::User1),
        "SIGUSR2" | "USR2" => Ok(Signal::User2),
        other => Err(ShellError::invalid_argument(format!(
            "unknown signal '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::system_spawner::SystemSpawner;
    use crate::infrastructure::bridge::ObjectBridge;
    use crate::infrastructure::runtime::memory_gauge::MemoryGauge;
    use nexus_shell_domain::AllowAllGate;

    fn bridge() -> ObjectBridge {
        ObjectBridge::new(MemoryGauge::default(), Arc::new(SystemSpawner::new()))
    }

    fn ctx() -> CommandContext {
        CommandContext::new("/", BTreeMap::new(), Arc::new(AllowAllGate))
    }

    #[test]
    fn test_list_includes_this_process() {
        let bridge = bridge();
        let listing = bridge.proc().list(&ctx()).unwrap();
        let entries = listing.as_list().unwrap();
        assert!(!entries.is_empty());
        let own = std::process::id() as i64;
        assert!(entries
            .iter()
            .any(|e| e.as_map().unwrap().get("pid").unwrap().as_int() == Some(own)));
    }

    #[test]
    fn test_info_unknown_pid_is_null() {
        let bridge = bridge();
        // PIDs near u32::MAX are not allocatable on supported platforms.
        let info = bridge.proc().info(&ctx(), u32::MAX - 7).unwrap();
        assert!(info.is_null());
    }

    #[test]
    fn test_parse_signal_variants() {
        assert!(parse_signal("SIGTERM").is_ok());
        assert!(parse_signal("kill").is_ok());
        assert_eq!(
            parse_signal("SIGWHAT").unwrap_err().kind(),
            "InvalidArgument"
        );
    }

    #[test]
    fn test_monitor_samples_and_stop() {
        let bridge = bridge();
        let handle = bridge.proc().monitor(&ctx(), 20, None).unwrap();
        let id = handle.as_handle().unwrap();

        std::thread::sleep(Duration::from_millis(120));
        let samples = bridge.handle_events(id).unwrap();
        assert!(!samples.is_empty());
        let map = samples[0].as_map().unwrap();
        assert!(map.get("processCount").unwrap().as_int().unwrap() > 0);

        bridge.stop_handle(id).unwrap();
    }

    #[test]
    fn test_exec_runs_binary() {
        let bridge = bridge();
        let result = bridge
            .proc()
            .exec(
                &ctx(),
                "echo",
                &ExecOptions {
                    args: vec!["hi".to_string()],
                    ..ExecOptions::default()
                },
            )
            .unwrap();
        let map = result.as_map().unwrap();
        assert_eq!(map.get("success").unwrap().as_bool(), Some(true));
        assert_eq!(map.get("stdout").unwrap().as_str(), Some("hi\n"));
    }
}
