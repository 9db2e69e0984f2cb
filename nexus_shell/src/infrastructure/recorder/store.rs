// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # JSON Recording Store
//!
//! Implements the [`RecordingStore`] port over
//! `<root>/.nexus/recordings/<name>.json`: UTF-8, 2-space indent,
//! unknown-key-tolerant on load. Recording names are confined to a single
//! path component so a crafted name cannot escape the store directory.

use async_trait::async_trait;
use nexus_shell_domain::{Recording, RecordingStore, ShellError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem-backed recording store.
#[derive(Debug, Clone)]
pub struct JsonRecordingStore {
    root: PathBuf,
}

impl JsonRecordingStore {
    /// Creates a store rooted at `<base>/.nexus/recordings`
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            root: base.as_ref().join(".nexus").join("recordings"),
        }
    }

    /// The store directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, ShellError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(ShellError::invalid_argument(format!(
                "bad recording name '{}'",
                name
            )));
        }
        Ok(self.root.join(format!("{}.json", name)))
    }
}

#[async_trait]
impl RecordingStore for JsonRecordingStore {
    async fn save(&self, recording: &Recording) -> Result<(), ShellError> {
        let path = self.path_for(&recording.name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let document = serde_json::to_string_pretty(recording)?;
        tokio::fs::write(&path, document).await?;
        debug!("Saved recording '{}' to {}", recording.name, path.display());
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Recording, ShellError> {
        let path = self.path_for(name)?;
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShellError::not_found(format!("recording '{}'", name))
            } else {
                ShellError::from(e)
            }
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn list(&self) -> Result<Vec<String>, ShellError> {
        let mut names = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordingStore::new(dir.path());

        let mut recording = Recording::start(1, "session-a");
        let seq = recording.record_command("pwd", serde_json::json!({"cwd": "/"}));
        recording.record_result(seq, Some(serde_json::json!("/")), None, 4);
        recording.finish();

        store.save(&recording).await.unwrap();
        let loaded = store.load("session-a").await.unwrap();
        assert_eq!(loaded, recording);
    }

    #[tokio::test]
    async fn test_document_is_indented_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordingStore::new(dir.path());
        let mut recording = Recording::start(1, "fmt");
        recording.finish();
        store.save(&recording).await.unwrap();

        let raw = std::fs::read_to_string(store.root().join("fmt.json")).unwrap();
        assert!(raw.starts_with("{\n  \""));
        assert!(raw.contains("\"startTime\""));
    }

    #[tokio::test]
    async fn test_list_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordingStore::new(dir.path());
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(
            store.load("absent").await.unwrap_err().kind(),
            "NotFound"
        );

        let mut a = Recording::start(1, "aa");
        a.finish();
        let mut b = Recording::start(2, "bb");
        b.finish();
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["aa", "bb"]);
    }

    #[tokio::test]
    async fn test_names_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordingStore::new(dir.path());
        let mut evil = Recording::start(1, "../escape");
        evil.finish();
        assert_eq!(
            store.save(&evil).await.unwrap_err().kind(),
            "InvalidArgument"
        );
    }
}
