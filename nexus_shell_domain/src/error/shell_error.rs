// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the hierarchical error system for the Nexus shell
//! domain. Every failure that can cross a component boundary - parser,
//! engine, bridge, capability store, transaction manager, recorder - is
//! expressed as one of the variants below and flows up the `execute` stack
//! unchanged.
//!
//! ## Overview
//!
//! The error system is designed around a fixed taxonomy:
//!
//! - **SyntaxError**: Malformed input detected by the parser, with a byte
//!   offset into the original line
//! - **PermissionDenied**: A capability check refused the operation
//! - **NotFound**: Missing command, binary, file, or recording
//! - **InvalidArgument**: Structurally valid input with unusable content
//! - **ExecutionFailure**: A command or script failed while running
//! - **Timeout**: A deadline elapsed before the operation completed
//! - **Cancelled**: A cancellation token fired at an I/O boundary
//! - **MemoryExceeded**: The live-value payload cap was reached
//! - **TransactionAborted**: A transaction was rolled back under the caller
//! - **AliasCycle**: Alias resolution would require more than one step
//! - **InternalError**: Unexpected failures that indicate a defect
//!
//! ## Error Handling Patterns
//!
//! Errors are created through the helper constructors, matched on with
//! `kind()` or `category()`, and never swallowed: the engine attaches them
//! to recordings and audit entries but always re-propagates to the
//! top-level caller.

use thiserror::Error;

/// Domain-specific errors for the shell core.
///
/// Each variant carries a descriptive message. `SyntaxError` additionally
/// carries the byte offset of the offending character within the original
/// input line, which is guaranteed to lie within `[0, input.len()]`.
///
/// ## Design Principles
///
/// - **Specific**: Each variant represents one failure mode of the taxonomy
/// - **Actionable**: Messages provide enough context for debugging
/// - **Total**: Every boundary-crossing failure maps onto exactly one variant
/// - **Recoverable**: Some variants indicate retry-able conditions
#[derive(Error, Debug, Clone)]
pub enum ShellError {
    #[error("Syntax error at offset {offset}: {message}")]
    SyntaxError { message: String, offset: usize },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Execution failed: {0}")]
    ExecutionFailure(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Memory limit exceeded: {0}")]
    MemoryExceeded(String),

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Alias cycle: {0}")]
    AliasCycle(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ShellError {
    /// Creates a new syntax error with a byte offset into the input
    pub fn syntax(msg: impl Into<String>, offset: usize) -> Self {
        Self::SyntaxError {
            message: msg.into(),
            offset,
        }
    }

    /// Creates a new permission-denied error
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Creates a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a new invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates a new execution-failure error
    pub fn execution_failure(msg: impl Into<String>) -> Self {
        Self::ExecutionFailure(msg.into())
    }

    /// Creates a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a new cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Creates a new memory-exceeded error
    pub fn memory_exceeded(msg: impl Into<String>) -> Self {
        Self::MemoryExceeded(msg.into())
    }

    /// Creates a new transaction-aborted error
    pub fn transaction_aborted(msg: impl Into<String>) -> Self {
        Self::TransactionAborted(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Gets the taxonomy kind tag for user-visible one-line reporting
    pub fn kind(&self) -> &'static str {
        match self {
            ShellError::SyntaxError { .. } => "SyntaxError",
            ShellError::PermissionDenied(_) => "PermissionDenied",
            ShellError::NotFound(_) => "NotFound",
            ShellError::InvalidArgument(_) => "InvalidArgument",
            ShellError::ExecutionFailure(_) => "ExecutionFailure",
            ShellError::Timeout(_) => "Timeout",
            ShellError::Cancelled(_) => "Cancelled",
            ShellError::MemoryExceeded(_) => "MemoryExceeded",
            ShellError::TransactionAborted(_) => "TransactionAborted",
            ShellError::AliasCycle(_) => "AliasCycle",
            ShellError::InternalError(_) => "InternalError",
        }
    }

    /// Gets the error category for metrics and audit labelling
    pub fn category(&self) -> &'static str {
        match self {
            ShellError::SyntaxError { .. } => "parse",
            ShellError::PermissionDenied(_) => "security",
            ShellError::NotFound(_) => "lookup",
            ShellError::InvalidArgument(_) => "validation",
            ShellError::ExecutionFailure(_) => "execution",
            ShellError::Timeout(_) => "timeout",
            ShellError::Cancelled(_) => "cancellation",
            ShellError::MemoryExceeded(_) => "resource",
            ShellError::TransactionAborted(_) => "transaction",
            ShellError::AliasCycle(_) => "lookup",
            ShellError::InternalError(_) => "internal",
        }
    }

    /// Gets the parser offset if this is a syntax error
    pub fn offset(&self) -> Option<usize> {
        match self {
            ShellError::SyntaxError { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Checks if the error indicates a retry-able condition
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ShellError::Timeout(_) | ShellError::MemoryExceeded(_))
    }

    /// Checks if the error is security related
    pub fn is_security_error(&self) -> bool {
        matches!(self, ShellError::PermissionDenied(_))
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for ShellError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ShellError::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => ShellError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::TimedOut => ShellError::Timeout(err.to_string()),
            _ => ShellError::ExecutionFailure(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ShellError {
    fn from(err: serde_json::Error) -> Self {
        ShellError::InvalidArgument(format!("JSON: {}", err))
    }
}
