// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for combridge.

use thiserror::Error;

use crate::types::{MemberKind, NativeStatus};

/// Top-level error type for all bridge operations.
///
/// Variants that concern a node in the object tree carry the dotted `path` of
/// that node so a failure deep inside `a.b.c(x)` can be located.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Dispatch errors --
    #[error("{path}: no member named '{name}' ({status})")]
    UnresolvedMember {
        path: String,
        name: String,
        status: NativeStatus,
    },

    #[error("{path}: native call failed ({status})")]
    NativeCallFailed { path: String, status: NativeStatus },

    #[error("{path}: '{name}' was already resolved as a {actual} but a {expected} was required")]
    ClassificationConflict {
        path: String,
        name: String,
        expected: MemberKind,
        actual: MemberKind,
    },

    #[error("{path}: not a valid invocation target")]
    InvalidInvocationTarget { path: String },

    #[error("{path}: not a component, it has no members")]
    NotAnObject { path: String },

    #[error("malformed member path '{0}'")]
    InvalidPath(String),

    // -- Marshalling --
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    // -- Activation --
    #[error("cannot activate component '{prog_id}' ({status})")]
    ActivationFailed { prog_id: String, status: NativeStatus },

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Re-anchor a node-scoped error at `node_path`.
    ///
    /// Errors without a path (marshalling, activation, I/O) are returned
    /// unchanged.
    pub fn at(mut self, node_path: &str) -> Self {
        match &mut self {
            BridgeError::UnresolvedMember { path, .. }
            | BridgeError::NativeCallFailed { path, .. }
            | BridgeError::ClassificationConflict { path, .. }
            | BridgeError::InvalidInvocationTarget { path }
            | BridgeError::NotAnObject { path } => *path = node_path.to_string(),
            _ => {}
        }
        self
    }

    /// The native status code behind this error, if any.
    pub fn native_status(&self) -> Option<NativeStatus> {
        match self {
            BridgeError::UnresolvedMember { status, .. }
            | BridgeError::NativeCallFailed { status, .. }
            | BridgeError::ActivationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_rewrites_node_path() {
        let err = BridgeError::NativeCallFailed {
            path: "Workbooks".into(),
            status: NativeStatus::DISP_E_MEMBERNOTFOUND,
        }
        .at("Excel.Application.Workbooks");
        assert_eq!(
            err.to_string(),
            "Excel.Application.Workbooks: native call failed (0x80020003)"
        );
    }

    #[test]
    fn at_leaves_pathless_errors_alone() {
        let err = BridgeError::UnsupportedValue("[1,2]".into()).at("A.B");
        assert!(matches!(err, BridgeError::UnsupportedValue(ref v) if v == "[1,2]"));
    }

    #[test]
    fn conflict_message_names_both_kinds() {
        let err = BridgeError::ClassificationConflict {
            path: "Excel.Application".into(),
            name: "Workbooks".into(),
            expected: MemberKind::Field,
            actual: MemberKind::Method,
        };
        let msg = err.to_string();
        assert!(msg.contains("already resolved as a METHOD"));
        assert!(msg.contains("a FIELD was required"));
    }

    #[test]
    fn native_status_is_exposed() {
        let err = BridgeError::ActivationFailed {
            prog_id: "Nope.Application".into(),
            status: NativeStatus::REGDB_E_CLASSNOTREG,
        };
        assert_eq!(err.native_status(), Some(NativeStatus::REGDB_E_CLASSNOTREG));
        assert!(BridgeError::Config("x".into()).native_status().is_none());
    }
}
