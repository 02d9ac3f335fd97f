//! Electrical analysis passes.
//!
//! The pipeline, rerun in full on every graph change:
//!
//! 1. [`nodes`] groups terminals into equipotential nodes over the
//!    zero-resistance link set (union-find).
//! 2. [`classify`] supplies the per-kind internal resistance table and the
//!    pass-through / branch-point rules.
//! 3. [`paths`] enumerates the reduced traversal edges.
//! 4. [`reduce`] folds each region's resistive network by series/parallel
//!    combination.
//! 5. [`solver`] distributes potentials, branch currents, meter readings
//!    and work states back onto the workbench.

mod classify;
mod nodes;
mod paths;
mod reduce;
mod solver;

pub use classify::{
    has_branch, internal_links, internal_resistance, is_pass_through, InternalLink,
};
pub use nodes::{LinkVia, Node, NodeSet, ZeroLink};
pub use paths::{
    enumerate_paths, is_connected, path_elements_from, reachable_terminals, PathElement, PathVia,
};
pub use reduce::{reduce, BranchEdge, Distribution, Reduction, ReducedNetwork};
pub use solver::{analyze, Analysis, Region, RegionOutcome, SolvedBranch};

/// Currents below this magnitude count as no flow when deriving work
/// states and flow directions.
pub const CURRENT_EPSILON: f64 = 1e-9;
