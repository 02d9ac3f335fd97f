//! Core types for the workbench topology graph.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A stable handle to an element in the workbench arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A stable handle to a wire in the workbench arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WireId(pub usize);

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}", self.0)
    }
}

/// A stable handle to a terminal in the workbench arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalId(pub usize);

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// A stable handle to a junction in the workbench arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JunctionId(pub usize);

impl fmt::Display for JunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "J{}", self.0)
    }
}

/// A computed equipotential node. Only valid against the [`NodeSet`]
/// produced by the analysis pass that issued it.
///
/// [`NodeSet`]: crate::analysis::NodeSet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Role of a terminal on its owning element.
///
/// The set of keys an element exposes is fixed by its kind; see
/// [`ElementKind::terminal_layout`](crate::components::ElementKind::terminal_layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminalKey {
    Left,
    Right,
    LeftUp,
    RightUp,
    LeftDown,
    RightDown,
    /// Synthetic rheostat tap terminal. Virtual: never wired directly,
    /// aggregates both up terminals.
    MiddleUp,
}

impl fmt::Display for TerminalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminalKey::Left => "Left",
            TerminalKey::Right => "Right",
            TerminalKey::LeftUp => "LeftUp",
            TerminalKey::RightUp => "RightUp",
            TerminalKey::LeftDown => "LeftDown",
            TerminalKey::RightDown => "RightDown",
            TerminalKey::MiddleUp => "MiddleUp",
        };
        f.write_str(s)
    }
}

/// Injected fault on a component or wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultState {
    /// Healthy.
    #[default]
    None,
    /// Broken: conducts nothing, regardless of the component's own state.
    Open,
    /// Shorted: conducts as a zero-resistance link, regardless of the
    /// component's own state.
    Short,
}

/// Whether a component is currently doing its job (lamp lit, fan spinning,
/// switch closed). Derived by the solver for loads, set by the caller for
/// switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkState {
    #[default]
    StoppedOrOpen,
    Working,
}

/// Electrical polarity of a terminal, assigned during analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Polarity {
    #[default]
    Unset,
    Positive,
    Negative,
}

/// Direction of current flow through a terminal, assigned during analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowDirection {
    #[default]
    Unknown,
    /// Direction is not meaningful (shorted component conducting both ways).
    TwoWay,
    /// Current enters the owning element at this terminal.
    Inward,
    /// Current leaves the owning element at this terminal.
    Outward,
}

/// Position of a junction within its owning wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireArea {
    StartPoint,
    StartHandle,
    EndHandle,
    EndPoint,
    /// Not part of any wire. Kept for graceful handling of malformed
    /// graphs; never produced by the mutation API.
    No,
}

impl WireArea {
    /// Whether this junction is an electrical endpoint (handles are Bezier
    /// control points only).
    pub fn is_endpoint(&self) -> bool {
        matches!(self, WireArea::StartPoint | WireArea::EndPoint)
    }
}

/// A point on the workbench canvas, in logical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`.
    pub fn lerp(&self, other: Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Which electrical end of a wire an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireEnd {
    Start,
    End,
}
