// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Surface
//!
//! The only code path exposing the host filesystem to scripted and native
//! callers. Every method issues its capability check before doing work:
//! read-class methods (`readFile`, `listDir`, `stat`) check `fs:read`,
//! writes check `fs:write`, and `watch`/`find` carry their own actions,
//! each keyed on the resolved absolute path. Relative paths resolve
//! against the calling context's snapshotted cwd, never the process cwd.
//!
//! Watch sessions deliver events into a drainable queue pinned behind a
//! handle; native callers may also register a callback invoked on the
//! watcher thread.

use crate::infrastructure::bridge::handle_table::HandleTable;
use crate::infrastructure::bridge::NativeResource;
use crate::infrastructure::runtime::memory_gauge::MemoryGauge;
use crossbeam::queue::SegQueue;
use nexus_shell_domain::{CommandContext, ShellError, Value};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

/// Native callback invoked for each watch event.
pub type WatchCallback = Box<dyn Fn(&Value) + Send + Sync>;

/// A live filesystem watch pinned behind a handle.
pub struct WatchSession {
    path: PathBuf,
    watcher: Mutex<Option<RecommendedWatcher>>,
    events: Arc<SegQueue<Value>>,
}

impl WatchSession {
    /// The watched path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stops delivering events; idempotent
    pub fn stop(&self) {
        self.watcher.lock().take();
    }

    /// Drains queued events, oldest first
    pub fn take_events(&self) -> Vec<Value> {
        let mut drained = Vec::new();
        while let Some(event) = self.events.pop() {
            drained.push(event);
        }
        drained
    }
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession").field("path", &self.path).finish()
    }
}

/// Pattern forms accepted by `find`.
#[derive(Debug, Clone)]
pub enum FindPattern {
    Substring(String),
    Regex(Regex),
}

impl FindPattern {
    /// Parses the scripted pattern form: `/re/` is a regex, anything else
    /// a name substring.
    pub fn parse(pattern: &str) -> Result<Self, ShellError> {
        if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
            let body = &pattern[1..pattern.len() - 1];
            let re = Regex::new(body)
                .map_err(|e| ShellError::invalid_argument(format!("bad find regex: {}", e)))?;
            Ok(FindPattern::Regex(re))
        } else {
            Ok(FindPattern::Substring(pattern.to_string()))
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            FindPattern::Substring(s) => name.contains(s.as_str()),
            FindPattern::Regex(re) => re.is_match(name),
        }
    }
}

/// Entry type filter for `find`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindType {
    File,
    Directory,
}

/// Options for `find`.
#[derive(Debug, Clone)]
pub struct FindOptions {
    pub path: Option<String>,
    pub entry_type: Option<FindType>,
    pub max_depth: usize,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            path: None,
            entry_type: None,
            max_depth: 10,
        }
    }
}

/// The `fs.*` surface.
pub struct FsSurface {
    handles: Arc<HandleTable<NativeResource>>,
    gauge: MemoryGauge,
}

impl FsSurface {
    pub(crate) fn new(handles: Arc<HandleTable<NativeResource>>, gauge: MemoryGauge) -> Self {
        Self { handles, gauge }
    }

    /// `fs.readFile(path, {encoding?})` - string or bytes
    pub fn read_file(
        &self,
        ctx: &CommandContext,
        path: &str,
        encoding: Option<&str>,
    ) -> Result<Value, ShellError> {
        let resolved = ctx.resolve_path(path);
        ctx.capabilities()
            .require("fs:read", &resolved.to_string_lossy())?;
        ctx.cancellation().check("fs.readFile")?;

        let bytes = std::fs::read(&resolved)?;
        self.gauge.check(bytes.len() as u64)?;
        match encoding.map(|e| e.to_lowercase()) {
            None => Ok(match String::from_utf8(bytes) {
                Ok(text) => Value::string(text),
                Err(raw) => Value::bytes(raw.into_bytes()),
            }),
            Some(enc) if enc == "utf8" || enc == "utf-8" => {
                let text = String::from_utf8(bytes).map_err(|_| {
                    ShellError::invalid_argument(format!("{} is not valid UTF-8", path))
                })?;
                Ok(Value::string(text))
            }
            Some(enc) if enc == "binary" || enc == "bytes" || enc == "raw" => {
                Ok(Value::bytes(bytes))
            }
            Some(other) => Err(ShellError::invalid_argument(format!(
                "unsupported encoding '{}'",
                other
            ))),
        }
    }

    /// `fs.writeFile(path, content)` - overwrite; creates the file; fails
    /// when the parent directory is missing
    pub fn write_file(
        &self,
        ctx: &CommandContext,
        path: &str,
        content: &Value,
    ) -> Result<Value, ShellError> {
        let resolved = ctx.resolve_path(path);
        ctx.capabilities()
            .require("fs:write", &resolved.to_string_lossy())?;
        ctx.cancellation().check("fs.writeFile")?;

        let bytes: Vec<u8> = match (content.as_str(), content.as_bytes()) {
            (Some(s), _) => s.as_bytes().to_vec(),
            (_, Some(b)) => b.to_vec(),
            _ => content.to_json().to_string().into_bytes(),
        };
        std::fs::write(&resolved, &bytes)?;
        debug!("Wrote {} bytes to {}", bytes.len(), resolved.display());
        Ok(Value::int(bytes.len() as i64))
    }

    /// `fs.listDir(path)` - entries in filesystem order
    pub fn list_dir(&self, ctx: &CommandContext, path: &str) -> Result<Value, ShellError> {
        let resolved = ctx.resolve_path(path);
        ctx.capabilities()
            .require("fs:read", &resolved.to_string_lossy())?;
        ctx.cancellation().check("fs.listDir")?;

        let mut entries = Vec::new();
        for dirent in std::fs::read_dir(&resolved)? {
            let dirent = dirent?;
            let file_type = dirent.file_type()?;
            let entry_path = dirent.path();
            let size = dirent.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(Value::map_from(vec![
                ("name", Value::string(dirent.file_name().to_string_lossy())),
                ("isFile", Value::boolean(file_type.is_file())),
                ("isDirectory", Value::boolean(file_type.is_dir())),
                ("path", Value::string(entry_path.to_string_lossy())),
                ("size", Value::int(size as i64)),
            ]));
        }
        let listing = Value::list(entries);
        self.gauge.check(listing.meta().size())?;
        Ok(listing)
    }

    /// `fs.stat(path)`
    pub fn stat(&self, ctx: &CommandContext, path: &str) -> Result<Value, ShellError> {
        let resolved = ctx.resolve_path(path);
        ctx.capabilities()
            .require("fs:read", &resolved.to_string_lossy())?;

        let meta = std::fs::metadata(&resolved)?;
        Ok(Value::map_from(vec![
            ("size", Value::int(meta.len() as i64)),
            ("isFile", Value::boolean(meta.is_file())),
            ("isDirectory", Value::boolean(meta.is_dir())),
            ("modified", Value::int(epoch_ms(meta.modified().ok()))),
            ("created", Value::int(epoch_ms(meta.created().ok()))),
            ("mode", Value::int(permission_mode(&meta))),
        ]))
    }

    /// `fs.watch(path, cb)` - handle with `stop()`; events carry
    /// `{eventType, filename, path}`
    pub fn watch(
        &self,
        ctx: &CommandContext,
        path: &str,
        callback: Option<WatchCallback>,
    ) -> Result<Value, ShellError> {
        let resolved = ctx.resolve_path(path);
        ctx.capabilities()
            .require("fs:watch", &resolved.to_string_lossy())?;

        let events: Arc<SegQueue<Value>> = Arc::new(SegQueue::new());
        let queue = events.clone();
        let watched = resolved.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let kind = event_kind_name(&event.kind);
                    for event_path in &event.paths {
                        let value = Value::map_from(vec![
                            ("eventType", Value::string(kind)),
                            (
                                "filename",
                                Value::string(
                                    event_path
                                        .file_name()
                                        .map(|n| n.to_string_lossy().into_owned())
                                        .unwrap_or_default(),
                                ),
                            ),
                            ("path", Value::string(event_path.to_string_lossy())),
                        ]);
                        if let Some(cb) = &callback {
                            cb(&value);
                        }
                        queue.push(value);
                    }
                }
                Err(e) => warn!("Watch error on {}: {}", watched.display(), e),
            }
        })
        .map_err(|e| ShellError::execution_failure(format!("watch setup: {}", e)))?;

        watcher
            .watch(&resolved, RecursiveMode::NonRecursive)
            .map_err(|e| ShellError::execution_failure(format!("watch {}: {}", path, e)))?;

        let session = WatchSession {
            path: resolved,
            watcher: Mutex::new(Some(watcher)),
            events,
        };
        let id = self.handles.pin(NativeResource::Watch(session), None);
        Ok(Value::handle(id))
    }

    /// `fs.find(pattern, {path?, type?, maxDepth})` - recursive name search
    pub fn find(
        &self,
        ctx: &CommandContext,
        pattern: &FindPattern,
        options: &FindOptions,
    ) -> Result<Value, ShellError> {
        let base = options
            .path
            .as_deref()
            .map(|p| ctx.resolve_path(p))
            .unwrap_or_else(|| ctx.cwd().to_path_buf());
        ctx.capabilities()
            .require("fs:find", &base.to_string_lossy())?;

        let mut found = Vec::new();
        self.walk(ctx, &base, pattern, options, 0, &mut found)?;
        let listing = Value::list(found);
        self.gauge.check(listing.meta().size())?;
        Ok(listing)
    }

    fn walk(
        &self,
        ctx: &CommandContext,
        dir: &Path,
        pattern: &FindPattern,
        options: &FindOptions,
        depth: usize,
        found: &mut Vec<Value>,
    ) -> Result<(), ShellError> {
        if depth >= options.max_depth {
            return Ok(());
        }
        ctx.cancellation().check("fs.find")?;
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            // Unreadable subdirectories are skipped, not fatal.
            Err(_) => return Ok(()),
        };
        for dirent in entries.flatten() {
            let Ok(file_type) = dirent.file_type() else {
                continue;
            };
            let name = dirent.file_name().to_string_lossy().into_owned();
            let entry_path = dirent.path();
            let type_ok = match options.entry_type {
                Some(FindType::File) => file_type.is_file(),
                Some(FindType::Directory) => file_type.is_dir(),
                None => true,
            };
            if type_ok && pattern.matches(&name) {
                found.push(Value::map_from(vec![
                    ("name", Value::string(name)),
                    ("isFile", Value::boolean(file_type.is_file())),
                    ("isDirectory", Value::boolean(file_type.is_dir())),
                    ("path", Value::string(entry_path.to_string_lossy())),
                ]));
            }
            if file_type.is_dir() {
                self.walk(ctx, &entry_path, pattern, options, depth + 1, found)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FsSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsSurface").finish()
    }
}

fn epoch_ms(time: Option<std::time::SystemTime>) -> i64 {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(unix)]
fn permission_mode(meta: &std::fs::Metadata) -> i64 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() as i64
}

#[cfg(not(unix))]
fn permission_mode(meta: &std::fs::Metadata) -> i64 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

fn event_kind_name(kind: &notify::EventKind) -> &'static str {
    use notify::EventKind;
    match kind {
        EventKind::Create(_) => "create",
        EventKind::Modify(_) => "modify",
        EventKind::Remove(_) => "remove",
        EventKind::Access(_) => "access",
        _ => "other",
    }
}
