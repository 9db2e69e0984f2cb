// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # System Process Spawner
//!
//! Implements the [`ProcessSpawner`] port on top of `std::process`.
//! `argv[0]` resolves through host PATH rules; no shell metacharacter
//! re-interpretation occurs. Pipeline input bytes are written to the
//! child's stdin from a helper thread so large payloads cannot deadlock
//! against a filling stdout pipe.
//!
//! The spawner polls the child with `try_wait` so cooperative cancellation
//! and deadlines hold at the process boundary: once the token fires the
//! child is killed and `Cancelled`/`Timeout` propagates.

use nexus_shell_domain::{ProcessSpawner, ShellError, SpawnOutput, SpawnRequest};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

/// `std::process`-backed spawner.
#[derive(Debug, Default, Clone)]
pub struct SystemSpawner;

impl SystemSpawner {
    /// Creates a new spawner
    pub fn new() -> Self {
        Self
    }
}

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, request: SpawnRequest<'_>) -> Result<SpawnOutput, ShellError> {
        let Some((program, args)) = request.argv.split_first() else {
            return Err(ShellError::invalid_argument("empty argv"));
        };

        let mut command = Command::new(program);
        command.args(args).current_dir(request.cwd).env_clear();
        for (k, v) in request.env {
            command.env(k, v);
        }
        if request.capture {
            command
                .stdin(if request.stdin.is_some() {
                    Stdio::piped()
                } else {
                    Stdio::null()
                })
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        } else {
            command.stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ShellError::not_found(format!("command '{}' not found", program))
            }
            _ => ShellError::execution_failure(format!("spawn '{}': {}", program, e)),
        })?;
        debug!("Spawned '{}' (pid {})", program, child.id());

        // Feed stdin off-thread; the writer closes the pipe when done.
        let stdin_writer = match (request.stdin, child.stdin.take()) {
            (Some(bytes), Some(mut stdin)) => {
                let payload = bytes.to_vec();
                Some(std::thread::spawn(move || {
                    if let Err(e) = stdin.write_all(&payload) {
                        warn!("Failed to write child stdin: {}", e);
                    }
                }))
            }
            _ => None,
        };

        // Drain stdout/stderr concurrently with the wait loop.
        let stdout_reader = child.stdout.take().map(|mut out| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf);
                buf
            })
        });
        let stderr_reader = child.stderr.take().map(|mut err| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf);
                buf
            })
        });

        let status = loop {
            if let Err(cancel) = request.cancellation.check("process wait") {
                if let Err(e) = child.kill() {
                    warn!("Failed to kill cancelled child: {}", e);
                }
                let _ = child.wait();
                return Err(cancel);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => std::thread::sleep(Duration::from_millis(5)),
                Err(e) => {
                    return Err(ShellError::execution_failure(format!(
                        "wait '{}': {}",
                        program, e
                    )))
                }
            }
        };

        if let Some(writer) = stdin_writer {
            let _ = writer.join();
        }
        let stdout = stdout_reader
            .and_then(|t| t.join().ok())
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default();
        let stderr = stderr_reader
            .and_then(|t| t.join().ok())
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default();

        Ok(SpawnOutput {
            code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_shell_domain::CancellationToken;
    use std::collections::BTreeMap;
    use std::path::Path;

    fn request<'a>(
        argv: &'a [String],
        stdin: Option<&'a [u8]>,
        env: &'a BTreeMap<String, String>,
        cancellation: CancellationToken,
    ) -> SpawnRequest<'a> {
        SpawnRequest {
            argv,
            cwd: Path::new("/"),
            env,
            stdin,
            capture: true,
            cancellation,
        }
    }

    #[test]
    fn test_captures_stdout_and_exit_code() {
        let argv = vec!["echo".to_string(), "hello".to_string()];
        let env = BTreeMap::new();
        let out = SystemSpawner::new()
            .spawn(request(&argv, None, &env, CancellationToken::new()))
            .unwrap();
        assert_eq!(out.code, 0);
        assert_eq!(out.stdout, "hello\n");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn test_stdin_feeds_child() {
        let argv = vec!["wc".to_string(), "-c".to_string()];
        let env = BTreeMap::new();
        let out = SystemSpawner::new()
            .spawn(request(
                &argv,
                Some(b"hello\n"),
                &env,
                CancellationToken::new(),
            ))
            .unwrap();
        assert_eq!(out.code, 0);
        assert_eq!(out.stdout.trim(), "6");
    }

    #[test]
    fn test_missing_binary_is_not_found() {
        let argv = vec!["definitely-not-a-binary-i-hope".to_string()];
        let env = BTreeMap::new();
        let err = SystemSpawner::new()
            .spawn(request(&argv, None, &env, CancellationToken::new()))
            .unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }

    #[test]
    fn test_nonzero_exit_is_data_not_error() {
        let argv = vec!["false".to_string()];
        let env = BTreeMap::new();
        let out = SystemSpawner::new()
            .spawn(request(&argv, None, &env, CancellationToken::new()))
            .unwrap();
        assert_ne!(out.code, 0);
    }

    #[test]
    fn test_deadline_kills_child() {
        let argv = vec!["sleep".to_string(), "5".to_string()];
        let env = BTreeMap::new();
        let token = CancellationToken::with_deadline(
            std::time::Instant::now() + Duration::from_millis(50),
        );
        let started = std::time::Instant::now();
        let err = SystemSpawner::new()
            .spawn(request(&argv, None, &env, token))
            .unwrap_err();
        assert_eq!(err.kind(), "Timeout");
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
