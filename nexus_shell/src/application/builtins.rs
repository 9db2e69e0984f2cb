// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Core Builtins
//!
//! The handful of builtins the core itself requires: the ones that mutate
//! shell state (`cd`, `alias`, `unalias`, `export`) and their read-side
//! companion `pwd`. The broader command surface (file, process, network,
//! system, dev wrappers) registers through the same
//! [`BuiltinRegistry`](nexus_shell_domain::BuiltinRegistry) port from
//! outside the core.
//!
//! State mutations take the single writer lock and record an operation on
//! the innermost transaction frame; the frame's snapshot makes them
//! undoable without per-op closures.

use crate::infrastructure::transaction::TransactionManager;
use nexus_shell_domain::{
    BuiltinCommand, BuiltinRegistry, CommandContext, ShellError, ShellState, Value,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registers the core builtins into a registry
pub fn register_core_builtins(
    registry: &mut BuiltinRegistry,
    state: Arc<RwLock<ShellState>>,
    transactions: Arc<TransactionManager>,
) {
    registry.register(Arc::new(Cd {
        state: state.clone(),
        transactions: transactions.clone(),
    }));
    registry.register(Arc::new(Pwd));
    registry.register(Arc::new(Alias {
        state: state.clone(),
        transactions: transactions.clone(),
    }));
    registry.register(Arc::new(Unalias {
        state: state.clone(),
        transactions: transactions.clone(),
    }));
    registry.register(Arc::new(Export {
        state,
        transactions,
    }));
}

/// `cd <dir>` - changes the working directory.
struct Cd {
    state: Arc<RwLock<ShellState>>,
    transactions: Arc<TransactionManager>,
}

impl BuiltinCommand for Cd {
    fn name(&self) -> &str {
        "cd"
    }

    fn description(&self) -> &str {
        "change the working directory"
    }

    fn run(&self, ctx: &mut CommandContext) -> Result<Value, ShellError> {
        let target = match ctx.args().first() {
            Some(arg) => ctx.resolve_path(arg),
            None => ctx
                .env()
                .get("HOME")
                .map(std::path::PathBuf::from)
                .ok_or_else(|| ShellError::invalid_argument("cd: no directory and no HOME"))?,
        };
        if !target.is_dir() {
            return Err(ShellError::not_found(format!(
                "cd: {}",
                target.display()
            )));
        }
        self.state.write().set_cwd(&target);
        self.transactions
            .record_op(format!("cd {}", target.display()));
        Ok(Value::string(target.to_string_lossy()))
    }
}

/// `pwd` - prints the working directory captured at command start.
struct Pwd;

impl BuiltinCommand for Pwd {
    fn name(&self) -> &str {
        "pwd"
    }

    fn description(&self) -> &str {
        "print the working directory"
    }

    fn run(&self, ctx: &mut CommandContext) -> Result<Value, ShellError> {
        Ok(Value::string(ctx.cwd().to_string_lossy()))
    }
}

/// `alias [name=target | name target]` - defines or lists aliases.
struct Alias {
    state: Arc<RwLock<ShellState>>,
    transactions: Arc<TransactionManager>,
}

impl BuiltinCommand for Alias {
    fn name(&self) -> &str {
        "alias"
    }

    fn description(&self) -> &str {
        "define or list command aliases"
    }

    fn run(&self, ctx: &mut CommandContext) -> Result<Value, ShellError> {
        match ctx.args() {
            [] => {
                let state = self.state.read();
                let entries: BTreeMap<String, Value> = state
                    .aliases()
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::string(v.clone())))
                    .collect();
                Ok(Value::map(entries))
            }
            [definition] => {
                let (name, target) = definition.split_once('=').ok_or_else(|| {
                    ShellError::invalid_argument("alias: expected name=target")
                })?;
                self.define(name, target)
            }
            [name, target] => self.define(name, target),
            _ => Err(ShellError::invalid_argument("alias: too many arguments")),
        }
    }
}

impl Alias {
    fn define(&self, name: &str, target: &str) -> Result<Value, ShellError> {
        if name.is_empty() || target.is_empty() {
            return Err(ShellError::invalid_argument("alias: empty name or target"));
        }
        self.state.write().set_alias(name, target);
        self.transactions
            .record_op(format!("alias {}={}", name, target));
        Ok(Value::string(format!("{}={}", name, target)))
    }
}

/// `unalias <name>` - removes an alias.
struct Unalias {
    state: Arc<RwLock<ShellState>>,
    transactions: Arc<TransactionManager>,
}

impl BuiltinCommand for Unalias {
    fn name(&self) -> &str {
        "unalias"
    }

    fn description(&self) -> &str {
        "remove a command alias"
    }

    fn run(&self, ctx: &mut CommandContext) -> Result<Value, ShellError> {
        let name = ctx
            .args()
            .first()
            .ok_or_else(|| ShellError::invalid_argument("unalias: missing name"))?;
        match self.state.write().remove_alias(name) {
            Some(_) => {
                self.transactions.record_op(format!("unalias {}", name));
                Ok(Value::boolean(true))
            }
            None => Err(ShellError::not_found(format!("alias '{}'", name))),
        }
    }
}

/// `export KEY=VALUE` - sets an environment variable; lists without args.
struct Export {
    state: Arc<RwLock<ShellState>>,
    transactions: Arc<TransactionManager>,
}

impl BuiltinCommand for Export {
    fn name(&self) -> &str {
        "export"
    }

    fn description(&self) -> &str {
        "set an environment variable"
    }

    fn run(&self, ctx: &mut CommandContext) -> Result<Value, ShellError> {
        match ctx.args() {
            [] => {
                let state = self.state.read();
                let entries: BTreeMap<String, Value> = state
                    .env()
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::string(v.clone())))
                    .collect();
                Ok(Value::map(entries))
            }
            [assignment] => {
                let (key, value) = assignment.split_once('=').ok_or_else(|| {
                    ShellError::invalid_argument("export: expected KEY=VALUE")
                })?;
                if key.is_empty() {
                    return Err(ShellError::invalid_argument("export: empty key"));
                }
                self.state.write().set_env(key, value);
                self.transactions
                    .record_op(format!("export {}={}", key, value));
                Ok(Value::string(format!("{}={}", key, value)))
            }
            _ => Err(ShellError::invalid_argument("export: one KEY=VALUE expected")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_shell_domain::AllowAllGate;

    fn fixture() -> (BuiltinRegistry, Arc<RwLock<ShellState>>, Arc<TransactionManager>) {
        let state = Arc::new(RwLock::new(ShellState::new("/", BTreeMap::new())));
        let transactions = Arc::new(TransactionManager::new(state.clone()));
        let mut registry = BuiltinRegistry::new();
        register_core_builtins(&mut registry, state.clone(), transactions.clone());
        (registry, state, transactions)
    }

    fn ctx_with(state: &Arc<RwLock<ShellState>>, args: &[&str]) -> CommandContext {
        let snapshot = state.read().snapshot();
        CommandContext::new(
            snapshot.cwd(),
            snapshot.env().clone(),
            Arc::new(AllowAllGate),
        )
        .with_args(args.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_cd_changes_state_and_errors_on_missing() {
        let (registry, state, _txm) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let cd = registry.get("cd").unwrap();

        let path = dir.path().to_string_lossy().into_owned();
        cd.run(&mut ctx_with(&state, &[&path])).unwrap();
        assert_eq!(state.read().cwd(), dir.path());

        let err = cd
            .run(&mut ctx_with(&state, &["/definitely/absent/dir"]))
            .unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }

    #[test]
    fn test_cd_inside_transaction_rolls_back() {
        let (registry, state, txm) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let before = state.read().snapshot();

        let tx = txm.begin();
        let path = dir.path().to_string_lossy().into_owned();
        registry
            .get("cd")
            .unwrap()
            .run(&mut ctx_with(&state, &[&path]))
            .unwrap();
        assert_eq!(state.read().cwd(), dir.path());

        txm.rollback(tx).unwrap();
        assert_eq!(state.read().snapshot(), before);
    }

    #[test]
    fn test_alias_define_list_remove() {
        let (registry, state, _txm) = fixture();
        registry
            .get("alias")
            .unwrap()
            .run(&mut ctx_with(&state, &["ll=ls"]))
            .unwrap();
        assert_eq!(
            state.read().aliases().get("ll").map(String::as_str),
            Some("ls")
        );

        let listing = registry
            .get("alias")
            .unwrap()
            .run(&mut ctx_with(&state, &[]))
            .unwrap();
        assert!(listing.as_map().unwrap().contains_key("ll"));

        registry
            .get("unalias")
            .unwrap()
            .run(&mut ctx_with(&state, &["ll"]))
            .unwrap();
        assert!(state.read().aliases().is_empty());
    }

    #[test]
    fn test_export_sets_env() {
        let (registry, state, _txm) = fixture();
        registry
            .get("export")
            .unwrap()
            .run(&mut ctx_with(&state, &["EDITOR=vi"]))
            .unwrap();
        assert_eq!(
            state.read().env().get("EDITOR").map(String::as_str),
            Some("vi")
        );
    }

    #[test]
    fn test_pwd_reports_context_cwd() {
        let (registry, state, _txm) = fixture();
        let result = registry
            .get("pwd")
            .unwrap()
            .run(&mut ctx_with(&state, &[]))
            .unwrap();
        assert_eq!(result.as_str(), Some("/"));
    }
}
