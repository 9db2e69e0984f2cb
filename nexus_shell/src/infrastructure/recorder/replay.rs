// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Replay Sessions
//!
//! Deterministic re-execution of a recording. Commands are re-issued in
//! order through the caller's executor; a breakpoint at index *i* pauses
//! before command *i* and awaits an explicit `resume`. Speeds below 1.0
//! insert `(1000/speed − 1000)` ms between commands. Divergences between
//! recorded and replayed results are reported, and abort the session only
//! when the caller opted in.

use nexus_shell_domain::{Recording, ShellError, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Options controlling a replay session.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Playback speed; values below 1.0 slow the replay down
    pub speed: f64,
    /// Pause before these command indices
    pub breakpoints: BTreeSet<usize>,
    /// Pause before every command
    pub step_mode: bool,
    /// First command index to replay
    pub start_from: usize,
    /// Abort the session on the first divergence
    pub abort_on_divergence: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            breakpoints: BTreeSet::new(),
            step_mode: false,
            start_from: 0,
            abort_on_divergence: false,
        }
    }
}

/// Outcome of one replayed command.
#[derive(Debug)]
pub struct ReplayOutcome {
    pub index: usize,
    pub input: String,
    pub result: Result<Value, ShellError>,
    pub diverged: bool,
}

/// Progress report returned by each `run`/`resume` call.
#[derive(Debug)]
pub struct ReplayReport {
    pub executed: usize,
    pub divergences: Vec<usize>,
    /// Index the session paused before, if a breakpoint was hit
    pub paused_at: Option<usize>,
    pub finished: bool,
}

/// A replay in progress over one recording.
pub struct ReplaySession {
    recording: Recording,
    options: ReplayOptions,
    position: usize,
    outcomes: Vec<ReplayOutcome>,
}

impl ReplaySession {
    /// Creates a session positioned at `start_from`
    pub fn new(recording: Recording, options: ReplayOptions) -> Self {
        let position = options.start_from;
        Self {
            recording,
            options,
            position,
            outcomes: Vec::new(),
        }
    }

    /// The recording under replay
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Index of the next command to execute
    pub fn position(&self) -> usize {
        self.position
    }

    /// Checks whether every command has been replayed
    pub fn is_finished(&self) -> bool {
        self.position >= self.recording.commands.len()
    }

    /// Outcomes collected so far
    pub fn outcomes(&self) -> &[ReplayOutcome] {
        &self.outcomes
    }

    fn inter_command_delay(&self) -> Option<Duration> {
        if self.options.speed >= 1.0 || self.options.speed <= 0.0 {
            return None;
        }
        let ms = (1000.0 / self.options.speed - 1000.0).max(0.0);
        Some(Duration::from_millis(ms as u64))
    }

    /// Replays until the next breakpoint or the end of the recording.
    ///
    /// The executor receives each recorded input line and must run it with
    /// `in_replay = true` in its context. Call again to resume after a
    /// pause; a hit breakpoint is consumed so the resumed run proceeds
    /// past it.
    pub fn run<F>(&mut self, mut execute: F) -> Result<ReplayReport, ShellError>
    where
        F: FnMut(&str) -> Result<Value, ShellError>,
    {
        let mut executed = 0usize;
        let mut divergences = Vec::new();

        while self.position < self.recording.commands.len() {
            let index = self.position;
            let step_pause = self.options.step_mode && executed > 0;
            if step_pause || self.options.breakpoints.remove(&index) {
                debug!("Replay paused before command {}", index);
                return Ok(ReplayReport {
                    executed,
                    divergences,
                    paused_at: Some(index),
                    finished: false,
                });
            }

            if executed > 0 {
                if let Some(delay) = self.inter_command_delay() {
                    std::thread::sleep(delay);
                }
            }

            let entry = &self.recording.commands[index];
            let input = entry.input.clone();
            let recorded_result = entry.result.clone();
            let result = execute(&input);

            let diverged = match (&result, &recorded_result) {
                (Ok(value), Some(expected)) => value.to_json() != *expected,
                (Ok(_), None) => entry.error.is_some(),
                (Err(_), Some(_)) => true,
                (Err(_), None) => entry.error.is_none(),
            };
            if diverged {
                warn!("Replay divergence at command {} ('{}')", index, input);
                divergences.push(index);
            }

            self.outcomes.push(ReplayOutcome {
                index,
                input,
                result,
                diverged,
            });
            self.position += 1;
            executed += 1;

            if diverged && self.options.abort_on_divergence {
                return Err(ShellError::execution_failure(format!(
                    "replay diverged at command {}",
                    index
                )));
            }
        }

        Ok(ReplayReport {
            executed,
            divergences,
            paused_at: None,
            finished: true,
        })
    }
}

impl std::fmt::Debug for ReplaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaySession")
            .field("recording", &self.recording.name)
            .field("position", &self.position)
            .field("finished", &self.is_finished())
            .finish()
    }
}
