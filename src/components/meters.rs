//! Ideal meters: Ammeter and Voltmeter.
//!
//! Meter readings are derived by the solver, never stored on the meter:
//! the ammeter reads the current through its own branch, the voltmeter the
//! potential difference between the nodes of its two terminals.

/// An ideal ammeter: zero internal resistance.
///
/// Its two terminals collapse into one equipotential node; the branch
/// current through it is recovered from the node's zero-resistance subgraph
/// after the solve.
#[derive(Debug, Clone, Default)]
pub struct Ammeter;

impl Ammeter {
    pub fn new() -> Self {
        Self
    }
}

/// An ideal voltmeter: infinite internal resistance.
///
/// Contributes no load: it has no internal path, so it never joins nodes
/// and never carries current.
#[derive(Debug, Clone, Default)]
pub struct Voltmeter;

impl Voltmeter {
    pub fn new() -> Self {
        Self
    }
}
