// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Memory Gauge
//!
//! Token accounting for live value payload bytes. The bridge charges the
//! gauge at value construction and at handle materialisation; crossing the
//! configured cap (default 50 MiB) fails with `MemoryExceeded`. The gauge
//! does not track the embedded runtime's own heap - that runtime carries
//! its own limit.
//!
//! Charges are RAII: dropping a [`MemoryReservation`] releases its bytes.
//! Handle-table entries hold their reservation for as long as the native
//! object stays pinned.

use nexus_shell_domain::ShellError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default cap on live value payload bytes (50 MiB).
pub const DEFAULT_MEMORY_CAP: u64 = 50 * 1024 * 1024;

#[derive(Debug)]
struct GaugeInner {
    cap: u64,
    used: AtomicU64,
}

/// Shared accounting of live value payload bytes.
#[derive(Debug, Clone)]
pub struct MemoryGauge {
    inner: Arc<GaugeInner>,
}

impl MemoryGauge {
    /// Creates a gauge with the given cap in bytes
    pub fn new(cap: u64) -> Self {
        Self {
            inner: Arc::new(GaugeInner {
                cap,
                used: AtomicU64::new(0),
            }),
        }
    }

    /// Gets the configured cap
    pub fn cap(&self) -> u64 {
        self.inner.cap
    }

    /// Gets the bytes currently charged
    pub fn used(&self) -> u64 {
        self.inner.used.load(Ordering::SeqCst)
    }

    /// Charges `bytes`, failing with `MemoryExceeded` past the cap
    pub fn try_charge(&self, bytes: u64) -> Result<MemoryReservation, ShellError> {
        let mut current = self.inner.used.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_add(bytes);
            if next > self.inner.cap {
                return Err(ShellError::memory_exceeded(format!(
                    "{} live bytes + {} requested exceeds cap of {}",
                    current, bytes, self.inner.cap
                )));
            }
            match self.inner.used.compare_exchange(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return Ok(MemoryReservation {
                        gauge: self.inner.clone(),
                        bytes,
                    })
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Checks a prospective allocation without holding the charge.
    ///
    /// This is the construction-time check for transient values that are
    /// returned to the caller rather than pinned in the handle table.
    pub fn check(&self, bytes: u64) -> Result<(), ShellError> {
        let _reservation = self.try_charge(bytes)?;
        Ok(())
    }
}

impl Default for MemoryGauge {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAP)
    }
}

/// RAII charge against a [`MemoryGauge`].
#[derive(Debug)]
pub struct MemoryReservation {
    gauge: Arc<GaugeInner>,
    bytes: u64,
}

impl MemoryReservation {
    /// Bytes held by this reservation
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for MemoryReservation {
    fn drop(&mut self) {
        self.gauge.used.fetch_sub(self.bytes, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_and_release() {
        let gauge = MemoryGauge::new(100);
        let r = gauge.try_charge(60).unwrap();
        assert_eq!(gauge.used(), 60);
        drop(r);
        assert_eq!(gauge.used(), 0);
    }

    #[test]
    fn test_cap_is_enforced() {
        let gauge = MemoryGauge::new(100);
        let _held = gauge.try_charge(80).unwrap();
        let err = gauge.try_charge(40).unwrap_err();
        assert_eq!(err.kind(), "MemoryExceeded");
        // The failed charge held nothing.
        assert_eq!(gauge.used(), 80);
    }

    #[test]
    fn test_check_is_transient() {
        let gauge = MemoryGauge::new(100);
        gauge.check(90).unwrap();
        assert_eq!(gauge.used(), 0);
        assert_eq!(gauge.check(200).unwrap_err().kind(), "MemoryExceeded");
    }
}
