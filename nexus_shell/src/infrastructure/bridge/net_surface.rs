// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Network Surface
//!
//! HTTP access for scripted and native callers: `net:http` checks key on
//! the target host, `net:download` additionally requires `fs:write` on the
//! destination path. The client is reqwest's blocking client - bridge
//! calls always run on pool threads, never on the async runtime.
//!
//! Response values are maps `{status, ok, headers, body}`; a non-2xx
//! status is data, not an error. Object bodies posted through `net.post`
//! are JSON-serialised.

use crate::infrastructure::bridge::handle_table::HandleTable;
use crate::infrastructure::bridge::NativeResource;
use crate::infrastructure::runtime::memory_gauge::MemoryGauge;
use nexus_shell_domain::{CommandContext, ShellError, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout when the caller does not pass one.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

/// Options for `net.get` / `net.post`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: Option<u64>,
}

/// The `net.*` surface.
pub struct NetSurface {
    handles: Arc<HandleTable<NativeResource>>,
    gauge: MemoryGauge,
}

impl NetSurface {
    pub(crate) fn new(handles: Arc<HandleTable<NativeResource>>, gauge: MemoryGauge) -> Self {
        Self { handles, gauge }
    }

    fn client(&self, options: &RequestOptions) -> Result<reqwest::blocking::Client, ShellError> {
        let timeout = Duration::from_millis(options.timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS));
        reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ShellError::internal_error(format!("http client: {}", e)))
    }

    fn check_host(&self, ctx: &CommandContext, action: &str, url: &str) -> Result<(), ShellError> {
        let host = host_of(url)?;
        ctx.capabilities().require(action, &host)
    }

    /// `net.get(url, {headers?, timeout?})`
    pub fn get(
        &self,
        ctx: &CommandContext,
        url: &str,
        options: &RequestOptions,
    ) -> Result<Value, ShellError> {
        self.check_host(ctx, "net:http", url)?;
        ctx.cancellation().check("net.get")?;

        let client = self.client(options)?;
        let mut request = client.get(url);
        for (k, v) in &options.headers {
            request = request.header(k, v);
        }
        let response = request
            .send()
            .map_err(|e| map_reqwest_error("GET", url, e))?;
        self.into_response_value(response)
    }

    /// `net.post(url, body, {headers?, timeout?})` - object bodies are
    /// JSON-serialised
    pub fn post(
        &self,
        ctx: &CommandContext,
        url: &str,
        body: &Value,
        options: &RequestOptions,
    ) -> Result<Value, ShellError> {
        self.check_host(ctx, "net:http", url)?;
        ctx.cancellation().check("net.post")?;

        let client = self.client(options)?;
        let mut request = client.post(url);
        for (k, v) in &options.headers {
            request = request.header(k, v);
        }
        request = match (body.as_str(), body.as_bytes()) {
            (Some(text), _) => request.body(text.to_string()),
            (_, Some(raw)) => request.body(raw.to_vec()),
            _ => request.json(&body.to_json()),
        };
        let response = request
            .send()
            .map_err(|e| map_reqwest_error("POST", url, e))?;
        self.into_response_value(response)
    }

    /// `net.download(url, path, {onProgress?})` - persists the body to
    /// `path` and returns a handle to the file
    pub fn download(
        &self,
        ctx: &CommandContext,
        url: &str,
        path: &str,
        mut on_progress: Option<Box<dyn FnMut(u64) + Send>>,
    ) -> Result<Value, ShellError> {
        self.check_host(ctx, "net:download", url)?;
        let destination = ctx.resolve_path(path);
        ctx.capabilities()
            .require("fs:write", &destination.to_string_lossy())?;
        ctx.cancellation().check("net.download")?;

        let client = self.client(&RequestOptions::default())?;
        let mut response = client
            .get(url)
            .send()
            .map_err(|e| map_reqwest_error("GET", url, e))?;
        if !response.status().is_success() {
            return Err(ShellError::execution_failure(format!(
                "download {} failed with status {}",
                url,
                response.status()
            )));
        }

        let mut file = std::fs::File::create(&destination)?;
        let written = response
            .copy_to(&mut file)
            .map_err(|e| ShellError::execution_failure(format!("download body: {}", e)))?;
        if let Some(cb) = on_progress.as_mut() {
            cb(written);
        }
        debug!("Downloaded {} bytes to {}", written, destination.display());

        let id = self.handles.pin(NativeResource::File(destination), None);
        Ok(Value::handle(id))
    }

    fn into_response_value(
        &self,
        response: reqwest::blocking::Response,
    ) -> Result<Value, ShellError> {
        let status = response.status();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            headers.insert(
                name.as_str().to_string(),
                Value::string(String::from_utf8_lossy(value.as_bytes())),
            );
        }
        let bytes = response
            .bytes()
            .map_err(|e| ShellError::execution_failure(format!("response body: {}", e)))?;
        self.gauge.check(bytes.len() as u64)?;
        let body = match std::str::from_utf8(&bytes) {
            Ok(text) => Value::string(text),
            Err(_) => Value::bytes(bytes.to_vec()),
        };
        Ok(Value::map_from(vec![
            ("status", Value::int(status.as_u16() as i64)),
            ("ok", Value::boolean(status.is_success())),
            ("headers", Value::map(headers)),
            ("body", body),
        ]))
    }
}

impl std::fmt::Debug for NetSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetSurface").finish()
    }
}

fn host_of(url: &str) -> Result<String, ShellError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ShellError::invalid_argument(format!("bad url '{}': {}", url, e)))?;
    parsed
        .host_str()
        .map(|h| h.to_string())
        .ok_or_else(|| ShellError::invalid_argument(format!("url '{}' has no host", url)))
}

fn map_reqwest_error(method: &str, url: &str, error: reqwest::Error) -> ShellError {
    if error.is_timeout() {
        ShellError::timeout(format!("{} {}", method, url))
    } else {
        ShellError::execution_failure(format!("{} {}: {}", method, url, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_extraction() {
        assert_eq!(host_of("https://api.example.com/v1/x").unwrap(), "api.example.com");
        assert_eq!(host_of("http://localhost:8080/").unwrap(), "localhost");
        assert_eq!(host_of("not a url").unwrap_err().kind(), "InvalidArgument");
    }
}
