// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command Metrics Batcher
//!
//! Lock-free counters on the engine's hot path. Every `execute_single`
//! emits `(name, latency_us, ok)` here; the batcher touches only atomics
//! and a fixed-bucket histogram, and the prometheus service drains the
//! aggregate on publish.
//!
//! Averages hide tail latency, so the batcher keeps a coarse distribution
//! alongside the totals.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Latency bucket upper bounds in microseconds.
const BUCKET_BOUNDS_US: [u64; 6] = [100, 1_000, 10_000, 100_000, 1_000_000, u64::MAX];

/// Fixed-bucket lock-free latency histogram.
#[derive(Debug, Default)]
pub struct LatencyHistogram {
    buckets: [AtomicU64; 6],
}

impl LatencyHistogram {
    /// Records one observation
    pub fn record(&self, latency_us: u64) {
        for (i, bound) in BUCKET_BOUNDS_US.iter().enumerate() {
            if latency_us <= *bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
    }

    /// Bucket counts in bound order
    pub fn snapshot(&self) -> [u64; 6] {
        std::array::from_fn(|i| self.buckets[i].load(Ordering::Relaxed))
    }

    /// Approximate percentile using bucket upper bounds
    pub fn percentile(&self, p: f64) -> u64 {
        let counts = self.snapshot();
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return 0;
        }
        let target = ((total as f64) * p / 100.0).ceil() as u64;
        let mut seen = 0;
        for (i, count) in counts.iter().enumerate() {
            seen += count;
            if seen >= target {
                return BUCKET_BOUNDS_US[i];
            }
        }
        BUCKET_BOUNDS_US[BUCKET_BOUNDS_US.len() - 1]
    }
}

/// Aggregate command counters drained by the metrics service.
#[derive(Debug, Default)]
pub struct MetricsBatcher {
    commands_total: AtomicU64,
    errors_total: AtomicU64,
    latency_total_us: AtomicU64,
    latency: LatencyHistogram,
}

impl MetricsBatcher {
    /// Creates an empty batcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one command completion
    pub fn record(&self, name: &str, latency_us: u64, ok: bool) {
        self.commands_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.errors_total.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_total_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency.record(latency_us);
        trace!("command={} latency_us={} ok={}", name, latency_us, ok);
    }

    /// Commands recorded so far
    pub fn commands_total(&self) -> u64 {
        self.commands_total.load(Ordering::Relaxed)
    }

    /// Failed commands recorded so far
    pub fn errors_total(&self) -> u64 {
        self.errors_total.load(Ordering::Relaxed)
    }

    /// Sum of observed latencies in microseconds
    pub fn latency_total_us(&self) -> u64 {
        self.latency_total_us.load(Ordering::Relaxed)
    }

    /// The latency distribution
    pub fn latency(&self) -> &LatencyHistogram {
        &self.latency
    }
}
