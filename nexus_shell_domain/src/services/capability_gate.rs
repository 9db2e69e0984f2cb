// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Capability Gate Port
//!
//! The domain-facing face of the capability store. Every boundary-crossing
//! operation - engine dispatch, bridge surface call - consults this port
//! before doing work. The infrastructure implementation adds grant maps,
//! sandboxes, policies, and audit; the domain only needs the verdict.

use crate::error::ShellError;

/// Answers `allow(action, resource)` for boundary-crossing operations.
pub trait CapabilityGate: Send + Sync {
    /// Checks whether `action` is allowed on `resource`
    fn check(&self, action: &str, resource: &str) -> bool;

    /// Checks and converts a denial into a `PermissionDenied` error
    fn require(&self, action: &str, resource: &str) -> Result<(), ShellError> {
        if self.check(action, resource) {
            Ok(())
        } else {
            Err(ShellError::permission_denied(format!(
                "{}:{}",
                action, resource
            )))
        }
    }
}

/// Gate that allows everything. Test fixture and pre-init placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllGate;

impl CapabilityGate for AllowAllGate {
    fn check(&self, _action: &str, _resource: &str) -> bool {
        true
    }
}
