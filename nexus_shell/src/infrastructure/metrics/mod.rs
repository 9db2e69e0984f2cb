// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Infrastructure
//!
//! A lock-free batcher on the engine's hot path and a prometheus service
//! that folds the aggregate on publish.

pub mod batcher;
pub mod service;

pub use batcher::{LatencyHistogram, MetricsBatcher};
pub use service::MetricsService;
