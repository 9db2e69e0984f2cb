// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Utilities Surface
//!
//! Small host utilities exposed to both calling domains: sleep, uuid,
//! hashing, byte formatting, retry with backoff, and deep merge/clone over
//! the value model. Like every surface method these issue a capability
//! check before doing work; replay contexts skip real sleeping so replays
//! stay fast and deterministic.

use nexus_shell_domain::services::checksum::HashAlgorithm;
use nexus_shell_domain::{CommandContext, ShellError, Value};
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Options for `utils.retry`.
#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub attempts: u32,
    pub delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt
    pub backoff: f64,
    /// Add up to `delay/2` of random jitter between attempts
    pub jitter: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 100,
            backoff: 2.0,
            jitter: false,
        }
    }
}

/// The `utils.*` surface.
#[derive(Debug, Default)]
pub struct UtilsSurface;

impl UtilsSurface {
    pub(crate) fn new() -> Self {
        Self
    }

    /// `utils.sleep(ms)` - skipped under replay contexts
    pub fn sleep(&self, ctx: &CommandContext, ms: u64) -> Result<Value, ShellError> {
        ctx.capabilities().require("utils:sleep", &ms.to_string())?;
        if ctx.in_replay() {
            debug!("Skipping sleep({}) under replay", ms);
            return Ok(Value::null());
        }
        // Sleep in slices so cancellation stays prompt.
        let mut remaining = Duration::from_millis(ms);
        while remaining > Duration::ZERO {
            ctx.cancellation().check("utils.sleep")?;
            let slice = remaining.min(Duration::from_millis(50));
            std::thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
        Ok(Value::null())
    }

    /// `utils.uuid()` - random v4 identifier
    pub fn uuid(&self, ctx: &CommandContext) -> Result<Value, ShellError> {
        ctx.capabilities().require("utils:uuid", "*")?;
        Ok(Value::string(uuid::Uuid::new_v4().to_string()))
    }

    /// `utils.hash(data, alg)` - hex digest of a string or bytes value
    pub fn hash(&self, ctx: &CommandContext, data: &Value, alg: &str) -> Result<Value, ShellError> {
        ctx.capabilities().require("utils:hash", alg)?;
        let algorithm: HashAlgorithm = alg.parse()?;
        let bytes: Vec<u8> = match (data.as_str(), data.as_bytes()) {
            (Some(s), _) => s.as_bytes().to_vec(),
            (_, Some(b)) => b.to_vec(),
            _ => data.to_json().to_string().into_bytes(),
        };
        Ok(Value::string(algorithm.digest_hex(&bytes)))
    }

    /// `utils.formatBytes(n)` - human-readable byte size
    pub fn format_bytes(&self, ctx: &CommandContext, n: u64) -> Result<Value, ShellError> {
        ctx.capabilities()
            .require("utils:format", &n.to_string())?;
        let size = byte_unit::Byte::from_u64(n)
            .get_appropriate_unit(byte_unit::UnitType::Binary);
        Ok(Value::string(format!("{:.2}", size)))
    }

    /// `utils.retry(fn, opts)` - retries a fallible operation with backoff
    pub fn retry<F>(
        &self,
        ctx: &CommandContext,
        options: &RetryOptions,
        mut operation: F,
    ) -> Result<Value, ShellError>
    where
        F: FnMut(u32) -> Result<Value, ShellError>,
    {
        ctx.capabilities()
            .require("utils:retry", &options.attempts.to_string())?;
        if options.attempts == 0 {
            return Err(ShellError::invalid_argument("retry needs at least 1 attempt"));
        }

        let mut delay = Duration::from_millis(options.delay_ms);
        let mut last_error = None;
        for attempt in 1..=options.attempts {
            ctx.cancellation().check("utils.retry")?;
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!("Retry attempt {}/{} failed: {}", attempt, options.attempts, e);
                    last_error = Some(e);
                }
            }
            if attempt < options.attempts && !ctx.in_replay() {
                let mut wait = delay;
                if options.jitter {
                    let extra = rand::rng().random_range(0..=delay.as_millis().max(1) as u64 / 2);
                    wait += Duration::from_millis(extra);
                }
                std::thread::sleep(wait);
                delay = Duration::from_millis((delay.as_millis() as f64 * options.backoff) as u64);
            }
        }
        Err(last_error
            .unwrap_or_else(|| ShellError::internal_error("retry finished without outcome")))
    }

    /// `utils.deepMerge(a, b)` - recursive map merge, `b` wins conflicts
    pub fn deep_merge(
        &self,
        ctx: &CommandContext,
        base: &Value,
        patch: &Value,
    ) -> Result<Value, ShellError> {
        ctx.capabilities().require("utils:merge", "*")?;
        Ok(base.deep_merge(patch))
    }

    /// `utils.deepClone(v)` - structural copy with fresh identities
    pub fn deep_clone(&self, ctx: &CommandContext, value: &Value) -> Result<Value, ShellError> {
        ctx.capabilities().require("utils:clone", "*")?;
        Ok(value.deep_clone())
    }
}
