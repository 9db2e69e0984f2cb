// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Object Bridge
//!
//! The only code path exposing the native filesystem, process table, and
//! network to scripted code. Three responsibilities:
//!
//! - **Marshalling** between the native value model and the embedded
//!   runtime's representation ([`marshal`])
//! - **Native surfaces** `fs` / `proc` / `net` / `utils` with fixed method
//!   lists
//! - **Capability gating**: every surface method checks before work, and a
//!   denial surfaces identically to scripted and native callers
//!
//! The bridge owns the native-handle table: handles pin watch sessions,
//! monitor sessions, and downloaded files until released.

pub mod fs_surface;
pub mod handle_table;
pub mod marshal;
pub mod net_surface;
pub mod proc_surface;
pub mod script_engine;
pub mod utils_surface;

pub use fs_surface::{FindOptions, FindPattern, FindType, FsSurface, WatchCallback, WatchSession};
pub use handle_table::HandleTable;
pub use marshal::{ScriptHandle, MAX_MARSHAL_DEPTH};
pub use net_surface::{NetSurface, RequestOptions};
pub use proc_surface::{ExecOptions, MonitorCallback, MonitorSession, ProcSurface};
pub use script_engine::RhaiEvaluator;
pub use utils_surface::{RetryOptions, UtilsSurface};

use crate::infrastructure::runtime::memory_gauge::MemoryGauge;
use nexus_shell_domain::{HandleId, ProcessSpawner, ShellError, Value};
use rhai::Dynamic;
use std::path::PathBuf;
use std::sync::Arc;

/// A native object pinned behind a handle.
#[derive(Debug)]
pub enum NativeResource {
    Watch(WatchSession),
    Monitor(MonitorSession),
    File(PathBuf),
}

/// The bridge façade owning surfaces, the handle table, and the gauge.
pub struct ObjectBridge {
    handles: Arc<HandleTable<NativeResource>>,
    gauge: MemoryGauge,
    fs: FsSurface,
    proc: ProcSurface,
    net: NetSurface,
    utils: UtilsSurface,
}

impl ObjectBridge {
    /// Wires the bridge over a memory gauge and the process spawner port
    pub fn new(gauge: MemoryGauge, spawner: Arc<dyn ProcessSpawner>) -> Self {
        let handles = Arc::new(HandleTable::new());
        Self {
            fs: FsSurface::new(handles.clone(), gauge.clone()),
            proc: ProcSurface::new(handles.clone(), spawner),
            net: NetSurface::new(handles.clone(), gauge.clone()),
            utils: UtilsSurface::new(),
            handles,
            gauge,
        }
    }

    /// The `fs.*` surface
    pub fn fs(&self) -> &FsSurface {
        &self.fs
    }

    /// The `proc.*` surface
    pub fn proc(&self) -> &ProcSurface {
        &self.proc
    }

    /// The `net.*` surface
    pub fn net(&self) -> &NetSurface {
        &self.net
    }

    /// The `utils.*` surface
    pub fn utils(&self) -> &UtilsSurface {
        &self.utils
    }

    /// The native-handle table
    pub fn handles(&self) -> &Arc<HandleTable<NativeResource>> {
        &self.handles
    }

    /// The live-value memory gauge
    pub fn gauge(&self) -> &MemoryGauge {
        &self.gauge
    }

    /// Marshals a native value into the runtime representation
    pub fn to_scripted(&self, value: &Value) -> Dynamic {
        marshal::to_scripted(value)
    }

    /// Marshals a runtime value into the native model
    pub fn to_native(&self, value: &Dynamic) -> Result<Value, ShellError> {
        marshal::to_native(value, &self.gauge)
    }

    /// Resolves a pinned resource
    pub fn resource(&self, id: HandleId) -> Result<Arc<NativeResource>, ShellError> {
        self.handles
            .get(id)
            .ok_or_else(|| ShellError::not_found(format!("handle {}", id)))
    }

    /// Stops a session handle (watch/monitor) and releases it
    pub fn stop_handle(&self, id: HandleId) -> Result<(), ShellError> {
        let resource = self.resource(id)?;
        match resource.as_ref() {
            NativeResource::Watch(session) => session.stop(),
            NativeResource::Monitor(session) => session.stop(),
            NativeResource::File(_) => {}
        }
        self.handles.release(id);
        Ok(())
    }

    /// Drains the queued events/samples of a session handle
    pub fn handle_events(&self, id: HandleId) -> Result<Vec<Value>, ShellError> {
        let resource = self.resource(id)?;
        match resource.as_ref() {
            NativeResource::Watch(session) => Ok(session.take_events()),
            NativeResource::Monitor(session) => Ok(session.take_samples()),
            NativeResource::File(_) => Ok(Vec::new()),
        }
    }

    /// Releases a pinned handle without stopping anything
    pub fn release(&self, id: HandleId) -> bool {
        self.handles.release(id)
    }
}

impl std::fmt::Debug for ObjectBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBridge")
            .field("pinned_handles", &self.handles.len())
            .field("live_bytes", &self.gauge.used())
            .finish()
    }
}
