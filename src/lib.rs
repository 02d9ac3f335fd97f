//! # VoltLab Core
//!
//! A DC circuit analysis engine for a virtual electronics workbench.
//!
//! This library provides:
//! - A typed component model (battery, resistor, rheostat, lamp, switch,
//!   ammeter, voltmeter, fan, wires) over arena-based topology storage
//! - Equipotential grouping of terminals via union-find over the
//!   zero-resistance link set
//! - Series/parallel network reduction yielding total resistance, branch
//!   currents and node potentials
//! - Fault injection (open/short) on components and wires, with fault
//!   propagation through grouping and reduction
//! - Derived meter readings and work states, and a serializable snapshot
//!   of the persisted component/wire graph
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`workbench`] - Arena storage, topology mutations and adjacency
//! - [`components`] - Element models and their resistance behavior
//! - [`analysis`] - Grouping, classification, path enumeration, reduction
//!   and the solver
//! - [`snapshot`] - The persisted-field schema for save/load collaborators
//! - [`error`] - Unified error type
//!
//! ## Analysis Method
//!
//! Every structural or state change invalidates the previous result; the
//! caller asks for a fresh pass:
//!
//! 1. Group terminals into equipotential nodes (zero-resistance links:
//!    healthy/shorted wires, closed switches, ideal ammeters, shorted
//!    elements)
//! 2. Fold each battery region's resistive network by series/parallel
//!    combination (series: sum; parallel: reciprocal sum)
//! 3. Distribute source current back through the fold: series branches
//!    share current, parallel branches split by conductance, node
//!    potentials assigned outward from the reference (battery negative
//!    pole, fixed at 0)
//! 4. Derive meter readings and work states from the solved state
//!
//! Open circuits, short circuits and disconnected wiring are first-class
//! results, not errors. The engine is single-threaded, synchronous and
//! allocation-light; the caller serializes access.
//!
//! ## Usage
//!
//! ```
//! use voltlab_core::components::{Battery, ElementKind, Resistor};
//! use voltlab_core::workbench::{TerminalKey, Workbench};
//! use voltlab_core::analysis::analyze;
//!
//! # fn main() -> voltlab_core::Result<()> {
//! let mut bench = Workbench::new();
//! let bat = bench.add_element(ElementKind::Battery(Battery::new(6.0)))?;
//! let r = bench.add_element(ElementKind::Resistor(Resistor::new(3.0)))?;
//! let pos = bench.element(bat).unwrap().terminal_by_key(TerminalKey::Right).unwrap();
//! let neg = bench.element(bat).unwrap().terminal_by_key(TerminalKey::Left).unwrap();
//! let left = bench.element(r).unwrap().terminal_by_key(TerminalKey::Left).unwrap();
//! let right = bench.element(r).unwrap().terminal_by_key(TerminalKey::Right).unwrap();
//! bench.connect(pos, left)?;
//! bench.connect(right, neg)?;
//!
//! let analysis = analyze(&mut bench);
//! assert_eq!(analysis.branch_current(r), Some(2.0));
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod components;
pub mod error;
pub mod snapshot;
pub mod workbench;

// Re-export main types for convenience
pub use analysis::{analyze, Analysis, RegionOutcome};
pub use error::{Result, VoltLabError};
pub use snapshot::Snapshot;
pub use workbench::Workbench;
