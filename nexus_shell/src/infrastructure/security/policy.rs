// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Security Policies
//!
//! A policy is a named ordered list of `(allow|deny, pattern)` rules
//! applied to the grant map. Order matters: the capability store scans
//! wildcard grants in insertion order, so each policy lists its specific
//! denies before its broad allows.
//!
//! ## Built-in Policies
//!
//! - **sandbox** - deny-heavy, read-only: filesystem reads, process
//!   listing, and utilities are allowed; writes, kills, and the network
//!   are explicitly denied
//! - **developer** - broad allow with explicit sensitive denies (init
//!   process, credential files)
//! - **production** - middle ground: full filesystem and network, process
//!   execution and inspection, no process kills

use serde::{Deserialize, Serialize};

/// Allow or deny verdict attached to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDecision {
    Allow,
    Deny,
}

/// One policy rule: verdict plus a grant-map pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub decision: RuleDecision,
    pub pattern: String,
}

impl PolicyRule {
    /// Creates an allow rule
    pub fn allow(pattern: impl Into<String>) -> Self {
        Self {
            decision: RuleDecision::Allow,
            pattern: pattern.into(),
        }
    }

    /// Creates a deny rule
    pub fn deny(pattern: impl Into<String>) -> Self {
        Self {
            decision: RuleDecision::Deny,
            pattern: pattern.into(),
        }
    }
}

/// A named ordered rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub rules: Vec<PolicyRule>,
}

impl Policy {
    /// Looks up a built-in policy by name
    pub fn built_in(name: &str) -> Option<Policy> {
        match name {
            "sandbox" => Some(Self::sandbox()),
            "developer" => Some(Self::developer()),
            "production" => Some(Self::production()),
            _ => None,
        }
    }

    /// Deny-heavy read-only policy
    pub fn sandbox() -> Policy {
        Policy {
            name: "sandbox".to_string(),
            rules: vec![
                PolicyRule::deny("fs:write:**"),
                PolicyRule::deny("proc:kill:**"),
                PolicyRule::deny("proc:exec:**"),
                PolicyRule::deny("net:**"),
                PolicyRule::allow("shell:execute:**"),
                PolicyRule::allow("shell:eval:**"),
                PolicyRule::allow("fs:read:**"),
                PolicyRule::allow("fs:find:**"),
                PolicyRule::allow("proc:list:**"),
                PolicyRule::allow("proc:info:**"),
                PolicyRule::allow("utils:**"),
            ],
        }
    }

    /// Broad allow with explicit sensitive denies
    pub fn developer() -> Policy {
        Policy {
            name: "developer".to_string(),
            rules: vec![
                PolicyRule::deny("proc:kill:1"),
                PolicyRule::deny("fs:read:/etc/shadow"),
                PolicyRule::deny("fs:write:/etc/**"),
                PolicyRule::allow("**"),
            ],
        }
    }

    /// Middle ground for operational use
    pub fn production() -> Policy {
        Policy {
            name: "production".to_string(),
            rules: vec![
                PolicyRule::deny("proc:kill:**"),
                PolicyRule::deny("fs:write:/etc/**"),
                PolicyRule::deny("fs:read:/etc/shadow"),
                PolicyRule::allow("shell:**"),
                PolicyRule::allow("fs:**"),
                PolicyRule::allow("proc:exec:**"),
                PolicyRule::allow("proc:list:**"),
                PolicyRule::allow("proc:info:**"),
                PolicyRule::allow("proc:monitor:**"),
                PolicyRule::allow("net:**"),
                PolicyRule::allow("utils:**"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_lookup() {
        assert!(Policy::built_in("sandbox").is_some());
        assert!(Policy::built_in("developer").is_some());
        assert!(Policy::built_in("production").is_some());
        assert!(Policy::built_in("custom").is_none());
    }

    #[test]
    fn test_denies_precede_allows() {
        for policy in [Policy::sandbox(), Policy::developer(), Policy::production()] {
            let first_allow = policy
                .rules
                .iter()
                .position(|r| r.decision == RuleDecision::Allow);
            let last_deny = policy
                .rules
                .iter()
                .rposition(|r| r.decision == RuleDecision::Deny);
            if let (Some(allow), Some(deny)) = (first_allow, last_deny) {
                assert!(deny < allow, "policy {} interleaves rules", policy.name);
            }
        }
    }
}
