// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Capability
//!
//! A named grant of a set of actions on a resource pattern, with optional
//! expiry. Capabilities supplement the pattern-keyed grant map: a check
//! passes when either a grant pattern or a live capability covers the
//! requested `action:resource` key.
//!
//! Resource patterns use the anchored glob rules of
//! [`ResourcePattern`](crate::value_objects::ResourcePattern): `*` matches
//! within a path segment, `**` across segments.

use crate::error::ShellError;
use crate::value_objects::resource_pattern::ResourcePattern;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named grant of actions on a resource pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    name: String,
    resource_pattern: ResourcePattern,
    actions: BTreeSet<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Capability {
    /// Creates a new capability
    pub fn new(
        name: impl Into<String>,
        resource_pattern: impl Into<String>,
        actions: impl IntoIterator<Item = String>,
    ) -> Result<Self, ShellError> {
        Ok(Self {
            name: name.into(),
            resource_pattern: ResourcePattern::new(resource_pattern)?,
            actions: actions.into_iter().collect(),
            expires_at: None,
        })
    }

    /// Sets an expiry timestamp, returning the updated capability
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Gets the capability name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the resource pattern
    pub fn resource_pattern(&self) -> &ResourcePattern {
        &self.resource_pattern
    }

    /// Gets the granted actions
    pub fn actions(&self) -> &BTreeSet<String> {
        &self.actions
    }

    /// Gets the expiry timestamp, if any
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Checks whether the capability has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }

    /// Checks whether this capability covers an action on a resource.
    ///
    /// Expired capabilities cover nothing.
    pub fn covers(&self, action: &str, resource: &str, now: DateTime<Utc>) -> bool {
        if self.is_expired(now) {
            return false;
        }
        self.actions.contains(action) && self.resource_pattern.matches(resource)
    }
}
