//! Workbench topology graph: arenas, handles and adjacency.

mod graph;
mod types;

pub use graph::{Junction, Terminal, Wire, Workbench};
pub use types::{
    ElementId, FaultState, FlowDirection, JunctionId, NodeId, Point, Polarity, TerminalId,
    TerminalKey, WireArea, WireEnd, WireId, WorkState,
};
