// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shell Configuration
//!
//! JSON configuration for the shell process:
//!
//! ```json
//! {
//!   "shell":       { "maxMemory": "50MB", "enableJIT": false,
//!                    "enableSandbox": false, "enableDebug": false,
//!                    "threadPoolSize": 8 },
//!   "security":    { "defaultPolicy": "sandbox", "auditLogging": true,
//!                    "capabilities": ["fs:read:/var/log/**"] },
//!   "performance": { "monitoring": true,
//!                    "thresholds": { "memoryWarning": "40MB",
//!                                    "latencyWarning": 1000 } }
//! }
//! ```
//!
//! Unknown keys are ignored; missing keys take the documented defaults.
//! Byte-spec fields accept a raw byte count or a `<n>MB`-style string.
//! `NEXUS_*` environment variables override the file after load.

use byte_unit::Byte;
use nexus_shell_bootstrap::EnvOverrides;
use nexus_shell_domain::{ShellError, WorkerCount};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Default live-value memory cap (50 MiB).
const DEFAULT_MAX_MEMORY: u64 = 50 * 1024 * 1024;

/// Parses a byte-spec: raw count or `"50MB"`-style string.
pub fn parse_byte_spec(raw: &str) -> Result<u64, ShellError> {
    Byte::parse_str(raw, true)
        .map(|b| b.as_u64())
        .map_err(|e| ShellError::invalid_argument(format!("bad byte spec '{}': {}", raw, e)))
}

fn deserialize_byte_spec<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Spec {
        Count(u64),
        Text(String),
    }
    match Spec::deserialize(deserializer)? {
        Spec::Count(n) => Ok(n),
        Spec::Text(s) => parse_byte_spec(&s).map_err(serde::de::Error::custom),
    }
}

/// `shell` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShellSection {
    #[serde(deserialize_with = "deserialize_byte_spec")]
    pub max_memory: u64,
    #[serde(rename = "enableJIT")]
    pub enable_jit: bool,
    pub enable_sandbox: bool,
    pub enable_debug: bool,
    pub thread_pool_size: usize,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            max_memory: DEFAULT_MAX_MEMORY,
            enable_jit: false,
            enable_sandbox: false,
            enable_debug: false,
            thread_pool_size: WorkerCount::from_hardware().count(),
        }
    }
}

/// `security` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecuritySection {
    pub default_policy: String,
    pub audit_logging: bool,
    pub capabilities: Vec<String>,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            default_policy: "sandbox".to_string(),
            audit_logging: true,
            capabilities: Vec::new(),
        }
    }
}

/// `performance.thresholds` subsection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thresholds {
    #[serde(deserialize_with = "deserialize_byte_spec")]
    pub memory_warning: u64,
    /// Milliseconds
    pub latency_warning: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            memory_warning: 40 * 1024 * 1024,
            latency_warning: 1_000,
        }
    }
}

/// `performance` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceSection {
    pub monitoring: bool,
    pub thresholds: Thresholds,
}

impl Default for PerformanceSection {
    fn default() -> Self {
        Self {
            monitoring: true,
            thresholds: Thresholds::default(),
        }
    }
}

/// Complete shell configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShellConfig {
    pub shell: ShellSection,
    pub security: SecuritySection,
    pub performance: PerformanceSection,
}

impl ShellConfig {
    /// Loads configuration: the file if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, ShellError> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        ShellError::not_found(format!("config file {}", path.display()))
                    } else {
                        ShellError::from(e)
                    }
                })?;
                let config: ShellConfig = serde_json::from_str(&raw).map_err(|e| {
                    ShellError::invalid_argument(format!(
                        "config parse {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                debug!("Loaded configuration from {}", path.display());
                Ok(config)
            }
        }
    }

    /// Applies `NEXUS_*` environment overrides on top of the loaded file
    pub fn apply_env(&mut self, env: &EnvOverrides) {
        if let Some(debug) = env.debug {
            self.shell.enable_debug = debug;
        }
        if let Some(spec) = &env.max_memory {
            match parse_byte_spec(spec) {
                Ok(bytes) => self.shell.max_memory = bytes,
                Err(e) => warn!("Ignoring NEXUS_MAX_MEMORY: {}", e),
            }
        }
    }

    /// The worker pool size as a bounded count
    pub fn worker_count(&self) -> WorkerCount {
        WorkerCount::new(self.shell.thread_pool_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShellConfig::default();
        assert_eq!(config.shell.max_memory, DEFAULT_MAX_MEMORY);
        assert_eq!(config.security.default_policy, "sandbox");
        assert!(config.security.audit_logging);
        assert_eq!(config.performance.thresholds.latency_warning, 1_000);
    }

    #[test]
    fn test_parse_full_document_with_byte_specs() {
        let raw = r#"{
            "shell": { "maxMemory": "64MB", "threadPoolSize": 4, "enableDebug": true },
            "security": { "defaultPolicy": "developer",
                          "capabilities": ["fs:read:/var/log/**"] },
            "performance": { "thresholds": { "memoryWarning": 1048576,
                                             "latencyWarning": 250 } },
            "futureSection": { "ignored": true }
        }"#;
        let config: ShellConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.shell.max_memory, 64_000_000);
        assert_eq!(config.shell.thread_pool_size, 4);
        assert!(config.shell.enable_debug);
        assert_eq!(config.security.default_policy, "developer");
        assert_eq!(config.security.capabilities.len(), 1);
        assert_eq!(config.performance.thresholds.memory_warning, 1_048_576);
        assert_eq!(config.performance.thresholds.latency_warning, 250);
    }

    #[test]
    fn test_unknown_keys_inside_sections_are_ignored() {
        let raw = r#"{ "shell": { "maxMemory": 1024, "experimental": 1 } }"#;
        let config: ShellConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.shell.max_memory, 1024);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ShellConfig::default();
        let env = EnvOverrides {
            debug: Some(true),
            max_memory: Some("1MB".to_string()),
            plugin_path: None,
            js_path: None,
        };
        config.apply_env(&env);
        assert!(config.shell.enable_debug);
        assert_eq!(config.shell.max_memory, 1_000_000);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = ShellConfig::load(Some(Path::new("/definitely/absent.json"))).unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }
}
