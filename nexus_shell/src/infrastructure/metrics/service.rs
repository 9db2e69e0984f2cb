// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Service
//!
//! Prometheus registry for the shell core. The engine's hot path never
//! touches prometheus directly - it feeds the lock-free
//! [`MetricsBatcher`](crate::infrastructure::metrics::MetricsBatcher) and
//! this service folds the aggregate into registered collectors when the
//! kernel publishes.
//!
//! Exposed collectors:
//!
//! - `nexus_shell_commands_total` / `nexus_shell_command_errors_total`
//! - `nexus_shell_command_latency_seconds` (histogram)
//! - `nexus_shell_active_workers` / `nexus_shell_pool_size`
//! - `nexus_shell_live_value_bytes` / `nexus_shell_pinned_handles`

use crate::infrastructure::metrics::batcher::MetricsBatcher;
use nexus_shell_domain::ShellError;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Prometheus-facing metrics service.
pub struct MetricsService {
    registry: Arc<Registry>,
    commands_total: IntCounter,
    command_errors_total: IntCounter,
    command_latency: Histogram,
    active_workers: IntGauge,
    pool_size: IntGauge,
    live_value_bytes: IntGauge,
    pinned_handles: IntGauge,
    // High-water marks of the batcher already folded into the counters.
    folded_commands: AtomicU64,
    folded_errors: AtomicU64,
}

impl MetricsService {
    /// Creates the service with all collectors registered
    pub fn new() -> Result<Self, ShellError> {
        let registry = Registry::new();

        let commands_total = IntCounter::with_opts(
            Opts::new("commands_total", "Total commands executed").namespace("nexus_shell"),
        )
        .map_err(|e| ShellError::internal_error(format!("commands_total metric: {}", e)))?;

        let command_errors_total = IntCounter::with_opts(
            Opts::new("command_errors_total", "Total failed commands").namespace("nexus_shell"),
        )
        .map_err(|e| ShellError::internal_error(format!("command_errors_total metric: {}", e)))?;

        let command_latency = Histogram::with_opts(
            HistogramOpts::new("command_latency_seconds", "Command execution latency")
                .namespace("nexus_shell")
                .buckets(vec![0.0001, 0.001, 0.01, 0.1, 1.0, 10.0]),
        )
        .map_err(|e| ShellError::internal_error(format!("command_latency metric: {}", e)))?;

        let active_workers = IntGauge::with_opts(
            Opts::new("active_workers", "Worker pool tasks currently executing")
                .namespace("nexus_shell"),
        )
        .map_err(|e| ShellError::internal_error(format!("active_workers metric: {}", e)))?;

        let pool_size = IntGauge::with_opts(
            Opts::new("pool_size", "Configured worker pool size").namespace("nexus_shell"),
        )
        .map_err(|e| ShellError::internal_error(format!("pool_size metric: {}", e)))?;

        let live_value_bytes = IntGauge::with_opts(
            Opts::new("live_value_bytes", "Live value payload bytes charged to the gauge")
                .namespace("nexus_shell"),
        )
        .map_err(|e| ShellError::internal_error(format!("live_value_bytes metric: {}", e)))?;

        let pinned_handles = IntGauge::with_opts(
            Opts::new("pinned_handles", "Native handles pinned by the bridge")
                .namespace("nexus_shell"),
        )
        .map_err(|e| ShellError::internal_error(format!("pinned_handles metric: {}", e)))?;

        for collector in [
            Box::new(commands_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(command_errors_total.clone()),
            Box::new(command_latency.clone()),
            Box::new(active_workers.clone()),
            Box::new(pool_size.clone()),
            Box::new(live_value_bytes.clone()),
            Box::new(pinned_handles.clone()),
        ] {
            registry
                .register(collector)
                .map_err(|e| ShellError::internal_error(format!("metric registration: {}", e)))?;
        }

        debug!("MetricsService initialized with Prometheus registry");
        Ok(Self {
            registry: Arc::new(registry),
            commands_total,
            command_errors_total,
            command_latency,
            active_workers,
            pool_size,
            live_value_bytes,
            pinned_handles,
            folded_commands: AtomicU64::new(0),
            folded_errors: AtomicU64::new(0),
        })
    }

    /// Folds the batcher's aggregate into the prometheus collectors
    pub fn fold_batcher(&self, batcher: &MetricsBatcher) {
        let commands = batcher.commands_total();
        let errors = batcher.errors_total();

        let seen = self.folded_commands.swap(commands, Ordering::SeqCst);
        let new_commands = commands.saturating_sub(seen);
        self.commands_total.inc_by(new_commands);

        let seen_errors = self.folded_errors.swap(errors, Ordering::SeqCst);
        self.command_errors_total
            .inc_by(errors.saturating_sub(seen_errors));

        if new_commands > 0 {
            // Approximate: fold the mean latency of the window once per
            // new command so the histogram keeps moving.
            let mean_s = (batcher.latency_total_us() as f64 / commands.max(1) as f64) / 1e6;
            for _ in 0..new_commands.min(1_000) {
                self.command_latency.observe(mean_s);
            }
        }
    }

    /// Updates runtime gauges
    pub fn set_runtime_gauges(
        &self,
        active_workers: usize,
        pool_size: usize,
        live_value_bytes: u64,
        pinned_handles: usize,
    ) {
        self.active_workers.set(active_workers as i64);
        self.pool_size.set(pool_size as i64);
        self.live_value_bytes.set(live_value_bytes as i64);
        self.pinned_handles.set(pinned_handles as i64);
    }

    /// Renders the registry in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, ShellError> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| ShellError::internal_error(format!("metrics encoding: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| ShellError::internal_error(format!("metrics encoding: {}", e)))
    }

    /// The underlying registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl std::fmt::Debug for MetricsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsService").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_batcher_is_incremental() {
        let service = MetricsService::new().unwrap();
        let batcher = MetricsBatcher::new();

        batcher.record("a", 100, true);
        batcher.record("b", 100, false);
        service.fold_batcher(&batcher);
        assert_eq!(service.commands_total.get(), 2);
        assert_eq!(service.command_errors_total.get(), 1);

        batcher.record("c", 100, true);
        service.fold_batcher(&batcher);
        assert_eq!(service.commands_total.get(), 3);
        assert_eq!(service.command_errors_total.get(), 1);
    }

    #[test]
    fn test_render_contains_namespaced_metrics() {
        let service = MetricsService::new().unwrap();
        service.set_runtime_gauges(2, 8, 1024, 3);
        let text = service.render().unwrap();
        assert!(text.contains("nexus_shell_pool_size 8"));
        assert!(text.contains("nexus_shell_live_value_bytes 1024"));
    }
}
