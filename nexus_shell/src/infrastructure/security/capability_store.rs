// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Capability Store
//!
//! The permission core consulted on every boundary-crossing operation.
//! Holds the pattern-keyed grant map, named capabilities with expiry,
//! sandbox scopes, and the audit log.
//!
//! ## Check Algorithm
//!
//! 1. Compose the query key `action:resource` (e.g. `fs:write:/etc/shadow`)
//! 2. Inside a sandbox, the sandbox's explicit allow-list gates the check:
//!    an unmatched key is denied outright; a matched key proceeds to the
//!    process-wide grants (sandboxes intersect, they never widen)
//! 3. Exact key lookup in the grant map
//! 4. Otherwise the wildcard grants are scanned in insertion order; the
//!    first match wins
//! 5. Otherwise live named capabilities may cover the key
//! 6. Default: deny
//!
//! Every check appends exactly one audit record, granted or not.

use crate::infrastructure::security::audit::{AuditEntry, AuditLog};
use crate::infrastructure::security::policy::{Policy, RuleDecision};
use chrono::Utc;
use nexus_shell_domain::{Capability, CapabilityGate, ResourcePattern, ShellError};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Grant map with exact-first lookup and insertion-ordered wildcards.
#[derive(Debug, Default)]
struct GrantTable {
    exact: HashMap<String, bool>,
    wildcards: Vec<(ResourcePattern, bool)>,
}

impl GrantTable {
    fn insert(&mut self, pattern: &str, allow: bool) -> Result<(), ShellError> {
        if pattern.contains('*') {
            if let Some(slot) = self
                .wildcards
                .iter_mut()
                .find(|(p, _)| p.pattern() == pattern)
            {
                slot.1 = allow;
            } else {
                self.wildcards.push((ResourcePattern::new(pattern)?, allow));
            }
        } else {
            self.exact.insert(pattern.to_string(), allow);
        }
        Ok(())
    }

    fn lookup(&self, key: &str) -> Option<bool> {
        if let Some(decision) = self.exact.get(key) {
            return Some(*decision);
        }
        self.wildcards
            .iter()
            .find(|(p, _)| p.matches(key))
            .map(|(_, decision)| *decision)
    }
}

/// Handle to a created sandbox scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxHandle {
    id: String,
}

impl SandboxHandle {
    /// The sandbox id to pass to `enter_sandbox`
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// The permission core: grants, capabilities, sandboxes, audit.
pub struct CapabilityStore {
    grants: RwLock<GrantTable>,
    capabilities: RwLock<BTreeMap<String, Capability>>,
    sandboxes: RwLock<HashMap<String, Vec<ResourcePattern>>>,
    sandbox_stack: RwLock<Vec<String>>,
    active_policy: RwLock<Option<String>>,
    audit: Arc<AuditLog>,
}

impl CapabilityStore {
    /// Creates an empty store wired to an audit log
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self {
            grants: RwLock::new(GrantTable::default()),
            capabilities: RwLock::new(BTreeMap::new()),
            sandboxes: RwLock::new(HashMap::new()),
            sandbox_stack: RwLock::new(Vec::new()),
            active_policy: RwLock::new(None),
            audit,
        }
    }

    /// Gets the audit log
    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    fn compose(pattern: &str, resource: Option<&str>) -> String {
        match resource {
            Some(r) => format!("{}:{}", pattern, r),
            None => pattern.to_string(),
        }
    }

    /// Records an allow for `pattern` (optionally scoped to a resource).
    /// Idempotent: re-granting an existing pattern is a no-op.
    pub fn grant(&self, pattern: &str, resource: Option<&str>) -> Result<(), ShellError> {
        let key = Self::compose(pattern, resource);
        debug!("Granting {}", key);
        self.grants.write().insert(&key, true)
    }

    /// Records an explicit deny for `pattern`, granted before or not.
    pub fn revoke(&self, pattern: &str, resource: Option<&str>) -> Result<(), ShellError> {
        let key = Self::compose(pattern, resource);
        debug!("Revoking {}", key);
        self.grants.write().insert(&key, false)
    }

    /// Answers `allow(action, resource)`, appending one audit record.
    pub fn check(&self, action: &str, resource: &str) -> bool {
        let key = format!("{}:{}", action, resource);
        let sandbox = self.sandbox_stack.read().last().cloned();

        let granted = self.decide(&key, sandbox.as_deref());
        self.audit
            .append(AuditEntry::now(action, resource, granted, sandbox));
        granted
    }

    fn decide(&self, key: &str, sandbox: Option<&str>) -> bool {
        if let Some(id) = sandbox {
            let sandboxes = self.sandboxes.read();
            let allowed = sandboxes
                .get(id)
                .map(|patterns| patterns.iter().any(|p| p.matches(key)))
                .unwrap_or(false);
            if !allowed {
                return false;
            }
        }
        if let Some(decision) = self.grants.read().lookup(key) {
            return decision;
        }
        // Named capabilities cover keys not decided by the grant map.
        let now = Utc::now();
        if let Some((action, resource)) = split_key(key) {
            if self
                .capabilities
                .read()
                .values()
                .any(|cap| cap.covers(action, resource, now))
            {
                return true;
            }
        }
        false
    }

    /// Adds a named capability
    pub fn add_capability(&self, capability: Capability) {
        info!("Adding capability '{}'", capability.name());
        self.capabilities
            .write()
            .insert(capability.name().to_string(), capability);
    }

    /// Removes a named capability, returning whether it existed
    pub fn remove_capability(&self, name: &str) -> bool {
        self.capabilities.write().remove(name).is_some()
    }

    /// Checks whether a named capability exists (expired ones count as
    /// present until removed)
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.read().contains_key(name)
    }

    /// Applies a policy's rules to the grant map in order
    pub fn apply_policy(&self, policy: &Policy) -> Result<(), ShellError> {
        info!("Applying policy '{}'", policy.name);
        let mut grants = self.grants.write();
        for rule in &policy.rules {
            grants.insert(&rule.pattern, rule.decision == RuleDecision::Allow)?;
        }
        *self.active_policy.write() = Some(policy.name.clone());
        Ok(())
    }

    /// Applies a built-in policy by name
    pub fn apply_policy_name(&self, name: &str) -> Result<(), ShellError> {
        let policy = Policy::built_in(name)
            .ok_or_else(|| ShellError::not_found(format!("policy '{}'", name)))?;
        self.apply_policy(&policy)
    }

    /// The most recently applied policy name
    pub fn active_policy(&self) -> Option<String> {
        self.active_policy.read().clone()
    }

    /// Registers a sandbox scope with an explicit allow-list
    pub fn create_sandbox(
        &self,
        id: impl Into<String>,
        allowed: Vec<String>,
    ) -> Result<SandboxHandle, ShellError> {
        let id = id.into();
        let patterns = allowed
            .iter()
            .map(|p| ResourcePattern::new(p.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        self.sandboxes.write().insert(id.clone(), patterns);
        Ok(SandboxHandle { id })
    }

    /// Enters a registered sandbox scope
    pub fn enter_sandbox(&self, id: &str) -> Result<(), ShellError> {
        if !self.sandboxes.read().contains_key(id) {
            return Err(ShellError::not_found(format!("sandbox '{}'", id)));
        }
        self.sandbox_stack.write().push(id.to_string());
        Ok(())
    }

    /// Exits the innermost sandbox scope, returning its id
    pub fn exit_sandbox(&self) -> Option<String> {
        self.sandbox_stack.write().pop()
    }

    /// The innermost active sandbox id
    pub fn current_sandbox(&self) -> Option<String> {
        self.sandbox_stack.read().last().cloned()
    }
}

impl CapabilityGate for CapabilityStore {
    fn check(&self, action: &str, resource: &str) -> bool {
        CapabilityStore::check(self, action, resource)
    }
}

impl std::fmt::Debug for CapabilityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityStore")
            .field("active_policy", &self.active_policy.read().clone())
            .field("sandboxes", &self.sandboxes.read().len())
            .finish()
    }
}

/// Splits a composed key back into `(action, resource)`.
///
/// Actions are two segments (`fs:read`); everything after the second colon
/// is the resource.
fn split_key(key: &str) -> Option<(&str, &str)> {
    let first = key.find(':')?;
    let second = key[first + 1..].find(':')? + first + 1;
    Some((&key[..second], &key[second + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CapabilityStore {
        CapabilityStore::new(Arc::new(AuditLog::new(64)))
    }

    #[test]
    fn test_default_deny() {
        let s = store();
        assert!(!s.check("fs:read", "/etc/hosts"));
    }

    #[test]
    fn test_exact_beats_wildcard_regardless_of_order() {
        let s = store();
        s.grant("fs:read:**", None).unwrap();
        s.revoke("fs:read", Some("/etc/shadow")).unwrap();
        assert!(s.check("fs:read", "/var/log/syslog"));
        assert!(!s.check("fs:read", "/etc/shadow"));
    }

    #[test]
    fn test_first_matching_wildcard_wins() {
        let s = store();
        s.revoke("fs:write:/etc/**", None).unwrap();
        s.grant("fs:write:**", None).unwrap();
        assert!(!s.check("fs:write", "/etc/passwd"));
        assert!(s.check("fs:write", "/tmp/x"));
    }

    #[test]
    fn test_grant_is_idempotent_and_revoke_records_deny() {
        let s = store();
        s.grant("net:http:**", None).unwrap();
        s.grant("net:http:**", None).unwrap();
        assert!(s.check("net:http", "api.example.com"));

        // Revoking an ungranted pattern records an explicit deny.
        s.revoke("net:download:**", None).unwrap();
        assert!(!s.check("net:download", "cdn.example.com"));
    }

    #[test]
    fn test_capability_covers_after_grant_map() {
        let s = store();
        let cap = Capability::new(
            "log-reader",
            "/var/log/**",
            ["fs:read".to_string()],
        )
        .unwrap();
        s.add_capability(cap);
        assert!(s.has_capability("log-reader"));
        assert!(s.check("fs:read", "/var/log/syslog"));
        assert!(!s.check("fs:write", "/var/log/syslog"));

        assert!(s.remove_capability("log-reader"));
        assert!(!s.check("fs:read", "/var/log/syslog"));
    }

    #[test]
    fn test_sandbox_intersects_grants() {
        let s = store();
        s.grant("**", None).unwrap();
        s.create_sandbox("sbx", vec!["fs:read:**".to_string()]).unwrap();
        s.enter_sandbox("sbx").unwrap();

        assert!(s.check("fs:read", "/tmp/a"));
        assert!(!s.check("fs:write", "/tmp/a"));

        assert_eq!(s.exit_sandbox().as_deref(), Some("sbx"));
        assert!(s.check("fs:write", "/tmp/a"));
    }

    #[test]
    fn test_every_check_produces_one_audit_record() {
        let s = store();
        s.grant("fs:read:**", None).unwrap();
        s.check("fs:read", "/a");
        s.check("fs:write", "/a");
        let entries = s.audit().query();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].granted);
        assert!(!entries[1].granted);
    }

    #[test]
    fn test_sandbox_policy_denies_proc_kill() {
        let s = store();
        s.apply_policy(&Policy::sandbox()).unwrap();
        assert!(!s.check("proc:kill", "1"));
        assert!(s.check("fs:read", "/var/log/syslog"));
        let denied = s.audit().query_filtered(|e| !e.granted);
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].action, "proc:kill");
    }

    #[test]
    fn test_split_key() {
        assert_eq!(
            split_key("fs:read:/var/log"),
            Some(("fs:read", "/var/log"))
        );
        assert_eq!(split_key("proc:kill:1"), Some(("proc:kill", "1")));
        assert_eq!(split_key("nocolon"), None);
    }
}
