//! Error types for the VoltLab circuit engine.
//!
//! This module provides a unified error type [`VoltLabError`] covering the
//! hard failures of the mutation API and snapshot loading. Expected circuit
//! states (open circuit, short fault, disconnected or malformed wiring,
//! unsupported region topology) are NOT errors: they are first-class results
//! reported through the [`Analysis`](crate::analysis::Analysis) outcome.

use thiserror::Error;

use crate::workbench::{ElementId, JunctionId, TerminalId, WireId};

/// Result type alias using [`VoltLabError`].
pub type Result<T> = std::result::Result<T, VoltLabError>;

/// Unified error type for all VoltLab operations.
#[derive(Error, Debug)]
pub enum VoltLabError {
    // ============ Parameter Validation Errors ============
    /// A component parameter is out of its valid domain (negative
    /// resistance, non-finite voltage, tap fraction outside [0, 1], ...).
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParameter { param: &'static str, message: String },

    // ============ Handle Errors ============
    /// Element handle does not refer to a live element.
    #[error("Unknown element handle {id}")]
    UnknownElement { id: ElementId },

    /// Wire handle does not refer to a live wire.
    #[error("Unknown wire handle {id}")]
    UnknownWire { id: WireId },

    /// Terminal handle does not refer to a live terminal.
    #[error("Unknown terminal handle {id}")]
    UnknownTerminal { id: TerminalId },

    /// Junction handle does not refer to a live junction.
    #[error("Unknown junction handle {id}")]
    UnknownJunction { id: JunctionId },

    // ============ Topology Mutation Errors ============
    /// A kind-specific operation was applied to the wrong element kind
    /// (e.g. setting a tap fraction on a lamp).
    #[error("Element {id} is a {found}, expected a {expected}")]
    KindMismatch {
        id: ElementId,
        expected: &'static str,
        found: &'static str,
    },

    /// Virtual terminals (the rheostat tap) exist only for analysis and
    /// cannot be wired.
    #[error("Terminal {id} is virtual and cannot be wired")]
    VirtualTerminal { id: TerminalId },

    // ============ Snapshot Errors ============
    /// A snapshot document references elements or terminals that do not
    /// exist in the document itself.
    #[error("Malformed snapshot: {message}")]
    Snapshot { message: String },

    // ============ I/O Errors (CLI only) ============
    /// Error reading a snapshot file.
    #[error("Failed to read snapshot file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error decoding a snapshot document.
    #[error("Failed to decode snapshot: {0}")]
    SnapshotDecode(#[from] serde_json::Error),
}

impl VoltLabError {
    /// Create an invalid-parameter error.
    pub fn invalid_parameter(param: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param,
            message: message.into(),
        }
    }

    /// Create a snapshot error.
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }
}

/// Reject a non-finite or negative value for a resistance-like parameter.
pub(crate) fn check_resistance(param: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(VoltLabError::invalid_parameter(param, "must be finite"));
    }
    if value < 0.0 {
        return Err(VoltLabError::invalid_parameter(param, "must not be negative"));
    }
    Ok(())
}

/// Reject a tap fraction outside [0, 1].
pub(crate) fn check_fraction(param: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(VoltLabError::invalid_parameter(
            param,
            "must be a fraction in [0, 1]",
        ));
    }
    Ok(())
}
