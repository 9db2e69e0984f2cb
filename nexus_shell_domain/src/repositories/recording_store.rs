// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Recording Store Port
//!
//! Persistence port for recordings. The infrastructure implementation
//! writes the JSON document format to `<cwd>/.nexus/recordings/<name>.json`
//! (UTF-8, 2-space indent); this port only fixes the operations. The port
//! is async because persistence is I/O-bound.

use crate::entities::Recording;
use crate::error::ShellError;
use async_trait::async_trait;

/// Saves and loads frozen recordings.
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Persists a frozen recording under its name
    async fn save(&self, recording: &Recording) -> Result<(), ShellError>;

    /// Loads a recording by name
    async fn load(&self, name: &str) -> Result<Recording, ShellError>;

    /// Lists the names of persisted recordings
    async fn list(&self) -> Result<Vec<String>, ShellError>;
}
